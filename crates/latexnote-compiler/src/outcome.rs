use crate::error::ValidationError;
use crate::locator::{EngineKind, Toolchains};
use serde::Serialize;
use std::fmt;

/// Terminal result of a compilation request. Never partial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilationOutcome {
    Success { pdf: Vec<u8> },
    Failure(CompilationFailure),
}

impl CompilationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CompilationOutcome::Success { .. })
    }

    pub fn into_result(self) -> Result<Vec<u8>, CompilationFailure> {
        match self {
            CompilationOutcome::Success { pdf } => Ok(pdf),
            CompilationOutcome::Failure(failure) => Err(failure),
        }
    }
}

/// Why a request failed, as seen by the boundary layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Input rejected before any engine ran.
    Validation,
    /// Every attempted engine failed.
    Compilation,
    /// An engine signalled success but left no usable PDF behind.
    OutputMissing,
    /// The host failed us (workspace I/O); not the caller's fault.
    Internal,
}

impl FailureKind {
    /// HTTP status a front end should answer with.
    pub fn status_code(self) -> u16 {
        match self {
            FailureKind::Validation | FailureKind::Compilation | FailureKind::OutputMissing => 400,
            FailureKind::Internal => 500,
        }
    }

    pub fn is_client_error(self) -> bool {
        self.status_code() < 500
    }
}

/// Where a diagnostic came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticSource {
    Validation,
    Engine(EngineKind),
    Output,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub source: DiagnosticSource,
    pub message: String,
}

impl Diagnostic {
    pub fn engine(kind: EngineKind, message: impl Into<String>) -> Self {
        Self {
            source: DiagnosticSource::Engine(kind),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            DiagnosticSource::Engine(kind) => write!(f, "{} error: {}", kind.label(), self.message),
            _ => f.write_str(&self.message),
        }
    }
}

/// A failed request with its diagnostics in attempt order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilationFailure {
    pub kind: FailureKind,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompilationFailure {
    pub fn new(kind: FailureKind, diagnostics: Vec<Diagnostic>) -> Self {
        Self { kind, diagnostics }
    }

    pub fn validation(error: &ValidationError) -> Self {
        Self::new(
            FailureKind::Validation,
            vec![Diagnostic {
                source: DiagnosticSource::Validation,
                message: error.to_string(),
            }],
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            FailureKind::Internal,
            vec![Diagnostic {
                source: DiagnosticSource::Internal,
                message: message.into(),
            }],
        )
    }

    /// Message safe to hand to a remote caller. Internal failures are
    /// replaced by a generic line so host paths never leak.
    pub fn public_message(&self) -> String {
        match self.kind {
            FailureKind::Internal => "Internal server error during compilation".to_string(),
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for CompilationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for diagnostic in &self.diagnostics {
            if !first {
                writeln!(f)?;
            }
            write!(f, "{}", diagnostic)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for CompilationFailure {}

/// Read-only status answer for health endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub tectonic_available: bool,
    pub pdflatex_available: bool,
}

impl Capabilities {
    pub fn ready(&self) -> bool {
        self.tectonic_available || self.pdflatex_available
    }

    pub fn status(&self) -> &'static str {
        if self.ready() {
            "ready"
        } else {
            "no_compilers"
        }
    }

    pub fn message(&self) -> &'static str {
        if self.ready() {
            "LaTeX compilation is ready"
        } else {
            "No LaTeX compilers found. Please install Tectonic or pdflatex."
        }
    }
}

impl From<&Toolchains> for Capabilities {
    fn from(toolchains: &Toolchains) -> Self {
        Self {
            tectonic_available: toolchains.tectonic.is_available(),
            pdflatex_available: toolchains.pdflatex.is_available(),
        }
    }
}
