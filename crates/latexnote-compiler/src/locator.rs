//! Toolchain discovery.
//!
//! The [`Locator`] answers "is engine X usable, and at what path?" without
//! running a real compilation. For each engine it walks the configured
//! [`Candidate`] list in order, runs `<candidate> --version` with a short
//! timeout, and records the first candidate that exits with status 0.
//! An engine with no responding candidate is simply marked unavailable.

use crate::config::{Candidate, LocatorConfig};
use crate::runner::{CommandRunner, Invocation};
use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// The two engines the compiler knows how to drive, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Primary engine.
    Tectonic,
    /// Secondary engine, run twice to settle cross-references.
    PdfLatex,
}

impl EngineKind {
    /// Executable name looked up on the search path.
    pub fn program(self) -> &'static str {
        match self {
            EngineKind::Tectonic => "tectonic",
            EngineKind::PdfLatex => "pdflatex",
        }
    }

    /// Human-readable label used in diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            EngineKind::Tectonic => "Tectonic",
            EngineKind::PdfLatex => "pdflatex",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of probing one engine. Immutable once discovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolchainDescriptor {
    pub kind: EngineKind,
    pub executable: Option<PathBuf>,
}

impl ToolchainDescriptor {
    pub fn available(kind: EngineKind, executable: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            executable: Some(executable.into()),
        }
    }

    pub fn unavailable(kind: EngineKind) -> Self {
        Self {
            kind,
            executable: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.executable.is_some()
    }
}

/// The discovered capability set, computed once at startup and read-only after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toolchains {
    pub tectonic: ToolchainDescriptor,
    pub pdflatex: ToolchainDescriptor,
}

impl Toolchains {
    pub fn new(tectonic: ToolchainDescriptor, pdflatex: ToolchainDescriptor) -> Self {
        Self { tectonic, pdflatex }
    }

    pub fn get(&self, kind: EngineKind) -> &ToolchainDescriptor {
        match kind {
            EngineKind::Tectonic => &self.tectonic,
            EngineKind::PdfLatex => &self.pdflatex,
        }
    }

    pub fn any_available(&self) -> bool {
        self.tectonic.is_available() || self.pdflatex.is_available()
    }
}

/// Probes candidate executables for each [`EngineKind`].
#[derive(Debug, Clone)]
pub struct Locator {
    config: LocatorConfig,
    runner: Arc<dyn CommandRunner>,
}

impl Locator {
    pub fn new(config: LocatorConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    /// Probes both engines concurrently.
    pub async fn discover(&self) -> Toolchains {
        let (tectonic, pdflatex) = tokio::join!(
            self.probe(EngineKind::Tectonic),
            self.probe(EngineKind::PdfLatex)
        );
        Toolchains::new(tectonic, pdflatex)
    }

    /// Returns the first candidate for `kind` that answers `--version` with
    /// status 0 within the probe timeout.
    pub async fn probe(&self, kind: EngineKind) -> ToolchainDescriptor {
        for candidate in self.config.candidates(kind) {
            let Some(program) = self.resolve(candidate) else {
                debug!("{} candidate {:?} not found", kind, candidate);
                continue;
            };

            let invocation = Invocation::new(
                program.clone(),
                ["--version"],
                self.config.probe_timeout(),
            );
            match self.runner.run(&invocation).await {
                Ok(output) if output.success() => {
                    info!("Detected {} at {}", kind, program.display());
                    return ToolchainDescriptor::available(kind, program);
                }
                Ok(output) => {
                    debug!("{} probe of {} failed: {}", kind, program.display(), output.exit)
                }
                Err(e) => debug!("{} probe of {} failed: {:#}", kind, program.display(), e),
            }
        }

        warn!("{} not found", kind);
        ToolchainDescriptor::unavailable(kind)
    }

    fn resolve(&self, candidate: &Candidate) -> Option<PathBuf> {
        match candidate {
            Candidate::Path { path } => Some(path.clone()),
            Candidate::SearchPath { name } => match &self.config.search_path {
                Some(paths) => {
                    let cwd = std::env::current_dir().ok()?;
                    which::which_in(name, Some(paths), cwd).ok()
                }
                None => which::which(name).ok(),
            },
        }
    }
}
