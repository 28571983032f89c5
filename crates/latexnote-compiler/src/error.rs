use std::path::PathBuf;
use thiserror::Error;

/// Structural problems found in LaTeX source before any engine runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("LaTeX content cannot be empty")]
    Empty,
    #[error("Missing \\begin{{document}}")]
    MissingBeginDocument,
    #[error("Missing \\end{{document}}")]
    MissingEndDocument,
    #[error("\\end{{document}} appears before \\begin{{document}}")]
    EndBeforeBegin,
}

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors that prevent the compiler from being constructed at all.
///
/// Per-request failures never surface here; they are reported through
/// [`CompilationOutcome::Failure`](crate::CompilationOutcome::Failure).
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("neither Tectonic nor pdflatex is available on this system")]
    ToolchainUnavailable,
    #[error(transparent)]
    Config(#[from] ConfigError),
}
