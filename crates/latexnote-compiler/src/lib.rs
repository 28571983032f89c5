//! # LaTeXNote Compiler
//!
//! Turns LaTeX source into PDF bytes by driving an installed TeX toolchain.
//!
//! ## Overview
//!
//! Two layers, leaves first:
//!
//! - [`locator`] - discovers which engines (Tectonic, pdflatex) are installed
//!   and answer a `--version` probe, once at startup
//! - [`compiler`] - validates source, runs the engines inside an isolated
//!   [`Workspace`] with hard timeouts, falls back from Tectonic to pdflatex,
//!   and returns a [`CompilationOutcome`]
//!
//! All process execution goes through the [`CommandRunner`] trait, so the
//! orchestration is testable without a TeX distribution.
//!
//! ## Design Philosophy
//!
//! - **Explicit outcomes**: expected failures (bad input, engine errors,
//!   timeouts) are values, not errors; only startup can fail with
//!   [`CompileError`]
//! - **No hidden globals**: the discovered [`Toolchains`] are injected into
//!   [`Compiler::new`] and are immutable afterwards
//! - **Scoped cleanup**: every request owns a temp directory that is removed
//!   on every exit path
//!
//! ## Examples
//!
//! ```no_run
//! use latexnote_compiler::{CompilationOutcome, Compiler, CompilerConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let compiler = Compiler::discover(&CompilerConfig::default()).await?;
//! println!("{:?}", compiler.capabilities());
//!
//! match compiler.compile("\\documentclass{article}\\begin{document}Hi\\end{document}").await {
//!     CompilationOutcome::Success { pdf } => println!("{} bytes", pdf.len()),
//!     CompilationOutcome::Failure(failure) => eprintln!("{}", failure),
//! }
//! # Ok(())
//! # }
//! ```

pub mod artifacts;
pub mod compiler;
pub mod config;
pub mod error;
pub mod locator;
pub mod outcome;
pub mod runner;
pub mod validate;
pub mod workspace;

pub use artifacts::fingerprint;
pub use compiler::Compiler;
pub use config::{Candidate, CompilerConfig, LocatorConfig};
pub use error::{CompileError, ConfigError, ValidationError};
pub use locator::{EngineKind, Locator, ToolchainDescriptor, Toolchains};
pub use outcome::{
    Capabilities, CompilationFailure, CompilationOutcome, Diagnostic, DiagnosticSource,
    FailureKind,
};
pub use runner::{CommandRunner, ExitState, Invocation, RunOutput, TokioCommandRunner};
pub use validate::validate;
pub use workspace::Workspace;
