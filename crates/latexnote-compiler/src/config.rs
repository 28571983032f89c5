//! Compiler configuration.
//!
//! Configuration is plain serde data so it can be loaded from a JSON file;
//! every field has a default, so a partial (or empty `{}`) file is valid.
//!
//! ```json
//! {
//!   "compile_timeout_secs": 30,
//!   "locator": {
//!     "tectonic": [
//!       { "kind": "search_path", "name": "tectonic" },
//!       { "kind": "path", "path": "/opt/tectonic/bin/tectonic" }
//!     ]
//!   }
//! }
//! ```

use crate::error::ConfigError;
use crate::locator::EngineKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_COMPILE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;

/// Platform install directories, most common first.
const TECTONIC_LOCATIONS: &[&str] = &[
    "/opt/homebrew/bin/tectonic", // Homebrew on Apple Silicon
    "/usr/local/bin/tectonic",    // Homebrew on Intel
    "/usr/bin/tectonic",
];

const PDFLATEX_LOCATIONS: &[&str] = &[
    "/opt/homebrew/bin/pdflatex",
    "/usr/local/bin/pdflatex",
    "/usr/bin/pdflatex",
    "/Library/TeX/texbin/pdflatex", // MacTeX
];

/// One place to look for an engine executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Candidate {
    /// Look the name up on the process search path (or the configured override).
    SearchPath { name: String },
    /// A fixed executable path.
    Path { path: PathBuf },
}

impl Candidate {
    pub fn search_path(name: &str) -> Self {
        Candidate::SearchPath {
            name: name.to_string(),
        }
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        Candidate::Path { path: path.into() }
    }
}

/// Settings for toolchain discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    pub probe_timeout_secs: u64,
    /// Replaces `PATH` when resolving [`Candidate::SearchPath`] entries.
    pub search_path: Option<String>,
    pub tectonic: Vec<Candidate>,
    pub pdflatex: Vec<Candidate>,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            search_path: None,
            tectonic: default_candidates(EngineKind::Tectonic),
            pdflatex: default_candidates(EngineKind::PdfLatex),
        }
    }
}

impl LocatorConfig {
    /// Candidates for `kind`, in priority order.
    pub fn candidates(&self, kind: EngineKind) -> &[Candidate] {
        match kind {
            EngineKind::Tectonic => &self.tectonic,
            EngineKind::PdfLatex => &self.pdflatex,
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

fn default_candidates(kind: EngineKind) -> Vec<Candidate> {
    let locations = match kind {
        EngineKind::Tectonic => TECTONIC_LOCATIONS,
        EngineKind::PdfLatex => PDFLATEX_LOCATIONS,
    };
    std::iter::once(Candidate::search_path(kind.program()))
        .chain(locations.iter().map(|p| Candidate::path(*p)))
        .collect()
}

/// Top-level configuration for the compilation subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Wall-clock limit for each engine run.
    pub compile_timeout_secs: u64,
    /// Directory under which per-request workspaces are created.
    /// Defaults to the system temp directory.
    pub workspace_root: Option<PathBuf>,
    pub locator: LocatorConfig,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            compile_timeout_secs: DEFAULT_COMPILE_TIMEOUT_SECS,
            workspace_root: None,
            locator: LocatorConfig::default(),
        }
    }
}

impl CompilerConfig {
    pub fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compile_timeout_secs)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.compile_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "compile_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.locator.probe_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "locator.probe_timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
