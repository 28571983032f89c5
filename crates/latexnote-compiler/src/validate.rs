//! Structural sanity check run before any process is spawned.
//!
//! This is deliberately shallow: fragments without `\documentclass` are
//! accepted as-is, full documents must carry both document markers in order.

use crate::error::ValidationError;

const DOCUMENT_CLASS: &str = "\\documentclass";
const BEGIN_DOCUMENT: &str = "\\begin{document}";
const END_DOCUMENT: &str = "\\end{document}";

/// Rejects empty input and full documents with missing or misordered markers.
pub fn validate(source: &str) -> Result<(), ValidationError> {
    if source.trim().is_empty() {
        return Err(ValidationError::Empty);
    }

    if !source.contains(DOCUMENT_CLASS) {
        return Ok(());
    }

    let begin = source
        .find(BEGIN_DOCUMENT)
        .ok_or(ValidationError::MissingBeginDocument)?;
    let end = source
        .rfind(END_DOCUMENT)
        .ok_or(ValidationError::MissingEndDocument)?;

    if end < begin {
        return Err(ValidationError::EndBeforeBegin);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_and_whitespace() {
        assert_eq!(validate(""), Err(ValidationError::Empty));
        assert_eq!(validate(" \n\t  \r\n"), Err(ValidationError::Empty));
    }

    #[test]
    fn test_accepts_complete_document() {
        let source = "\\documentclass{article}\\begin{document}Hello\\end{document}";
        assert_eq!(validate(source), Ok(()));
    }

    #[test]
    fn test_accepts_fragment_without_documentclass() {
        assert_eq!(validate("$e^{i\\pi} + 1 = 0$"), Ok(()));
    }

    #[test]
    fn test_missing_begin_document() {
        let err = validate("\\documentclass{article}Hello").unwrap_err();
        assert_eq!(err, ValidationError::MissingBeginDocument);
        assert!(err.to_string().contains("\\begin{document}"));
    }

    #[test]
    fn test_missing_end_document() {
        let err = validate("\\documentclass{article}\\begin{document}Hello").unwrap_err();
        assert_eq!(err, ValidationError::MissingEndDocument);
        assert_eq!(err.to_string(), "Missing \\end{document}");
    }

    #[test]
    fn test_end_before_begin() {
        let source = "\\documentclass{article}\\end{document}Hello\\begin{document}";
        assert_eq!(validate(source), Err(ValidationError::EndBeforeBegin));
    }
}
