//! Compilation engine.
//!
//! ## Overview
//!
//! [`Compiler::compile`] turns LaTeX source into PDF bytes using at most two
//! engines inside a disposable [`Workspace`]:
//!
//! ```text
//! validate ─► workspace ─► Tectonic ──ok──────────────────────┐
//!                            │ failed / unavailable           │
//!                            ▼                                ▼
//!                          pdflatex ×2 ──ok──► output check ─► Success
//!                            │ failed                │ missing
//!                            ▼                       ▼
//!                          Failure               Failure
//! ```
//!
//! The workspace guard is dropped on every path out of `compile`, so callers
//! never observe intermediate `.aux`/`.log` files.
//!
//! ## Construction
//!
//! The toolchain set is discovered once by a [`Locator`] and handed to
//! [`Compiler::new`]; the compiler itself holds no mutable state and can be
//! shared across tasks behind an `Arc`.
//!
//! ```no_run
//! use latexnote_compiler::{CompilerConfig, Compiler};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let compiler = Compiler::discover(&CompilerConfig::default()).await?;
//! let outcome = compiler
//!     .compile("\\documentclass{article}\\begin{document}Hi\\end{document}")
//!     .await;
//! let pdf = outcome.into_result()?;
//! # Ok(())
//! # }
//! ```

mod pdflatex;
mod tectonic;

use crate::artifacts::fingerprint;
use crate::config::CompilerConfig;
use crate::error::CompileError;
use crate::locator::{EngineKind, Locator, Toolchains};
use crate::outcome::{
    Capabilities, CompilationFailure, CompilationOutcome, Diagnostic, DiagnosticSource,
    FailureKind,
};
use crate::runner::{CommandRunner, TokioCommandRunner};
use crate::validate::validate;
use crate::workspace::Workspace;
use log::{debug, error, info, warn};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Engines in preference order.
const ENGINE_ORDER: [EngineKind; 2] = [EngineKind::Tectonic, EngineKind::PdfLatex];

/// Compiles LaTeX source with the discovered toolchains.
#[derive(Debug, Clone)]
pub struct Compiler {
    toolchains: Arc<Toolchains>,
    runner: Arc<dyn CommandRunner>,
    compile_timeout: Duration,
    workspace_root: Option<PathBuf>,
}

impl Compiler {
    /// Builds a compiler from an already discovered toolchain set.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::ToolchainUnavailable`] if neither engine is
    /// usable; the subsystem refuses to start rather than failing every request.
    pub fn new(
        toolchains: Toolchains,
        runner: Arc<dyn CommandRunner>,
        config: &CompilerConfig,
    ) -> Result<Self, CompileError> {
        if !toolchains.any_available() {
            error!("Neither Tectonic nor pdflatex is available");
            return Err(CompileError::ToolchainUnavailable);
        }

        Ok(Self {
            toolchains: Arc::new(toolchains),
            runner,
            compile_timeout: config.compile_timeout(),
            workspace_root: config.workspace_root.clone(),
        })
    }

    /// Discovers toolchains with real processes and builds the compiler.
    pub async fn discover(config: &CompilerConfig) -> Result<Self, CompileError> {
        let runner: Arc<dyn CommandRunner> = Arc::new(TokioCommandRunner);
        let toolchains = Locator::new(config.locator.clone(), runner.clone())
            .discover()
            .await;
        Self::new(toolchains, runner, config)
    }

    /// Cached discovery state; never spawns a process.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::from(self.toolchains.as_ref())
    }

    pub fn toolchains(&self) -> &Toolchains {
        &self.toolchains
    }

    /// Compiles `source` to PDF.
    ///
    /// Every failure mode (bad input, engine errors, timeouts, missing output,
    /// workspace I/O) is reported as [`CompilationOutcome::Failure`].
    pub async fn compile(&self, source: &str) -> CompilationOutcome {
        if let Err(e) = validate(source) {
            info!("Rejected LaTeX source: {}", e);
            return CompilationOutcome::Failure(CompilationFailure::validation(&e));
        }

        let workspace = match Workspace::create(self.workspace_root.as_deref(), source) {
            Ok(workspace) => workspace,
            Err(e) => {
                error!("Failed to prepare compilation workspace: {}", e);
                return CompilationOutcome::Failure(CompilationFailure::internal(format!(
                    "failed to prepare compilation workspace: {}",
                    e
                )));
            }
        };

        let outcome = self.compile_in(&workspace).await;
        drop(workspace);
        outcome
    }

    async fn compile_in(&self, workspace: &Workspace) -> CompilationOutcome {
        let mut diagnostics = Vec::new();
        let mut succeeded = None;

        for kind in ENGINE_ORDER {
            let Some(program) = self.toolchains.get(kind).executable.as_deref() else {
                debug!("{} unavailable, skipping", kind);
                continue;
            };

            info!("Attempting compilation with {}", kind);
            let attempt = match kind {
                EngineKind::Tectonic => {
                    tectonic::compile(self.runner.as_ref(), program, workspace, self.compile_timeout)
                        .await
                }
                EngineKind::PdfLatex => {
                    pdflatex::compile(self.runner.as_ref(), program, workspace, self.compile_timeout)
                        .await
                }
            };

            match attempt {
                Ok(()) => {
                    succeeded = Some(kind);
                    break;
                }
                Err(message) => {
                    warn!("{} compilation failed: {}", kind, message);
                    diagnostics.push(Diagnostic::engine(kind, message));
                }
            }
        }

        match succeeded {
            Some(engine) => self.extract(workspace, engine, diagnostics).await,
            None => CompilationOutcome::Failure(CompilationFailure::new(
                FailureKind::Compilation,
                diagnostics,
            )),
        }
    }

    /// Reads the PDF left behind by a successful engine run.
    async fn extract(
        &self,
        workspace: &Workspace,
        engine: EngineKind,
        mut diagnostics: Vec<Diagnostic>,
    ) -> CompilationOutcome {
        let missing = |message: &str| Diagnostic {
            source: DiagnosticSource::Output,
            message: message.to_string(),
        };

        match tokio::fs::read(workspace.output_path()).await {
            Ok(pdf) if !pdf.is_empty() => {
                info!(
                    "Successfully compiled LaTeX to PDF with {} ({} bytes, sha256 {})",
                    engine,
                    pdf.len(),
                    fingerprint(&pdf)
                );
                CompilationOutcome::Success { pdf }
            }
            Ok(_) => {
                warn!("{} produced an empty PDF", engine);
                diagnostics.push(missing(
                    "PDF file was empty despite successful compilation",
                ));
                CompilationOutcome::Failure(CompilationFailure::new(
                    FailureKind::OutputMissing,
                    diagnostics,
                ))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("{} reported success but produced no PDF", engine);
                diagnostics.push(missing(
                    "PDF file was not created despite successful compilation",
                ));
                CompilationOutcome::Failure(CompilationFailure::new(
                    FailureKind::OutputMissing,
                    diagnostics,
                ))
            }
            Err(e) => {
                error!("Failed to read compiled PDF: {}", e);
                CompilationOutcome::Failure(CompilationFailure::internal(format!(
                    "failed to read compiled PDF: {}",
                    e
                )))
            }
        }
    }
}
