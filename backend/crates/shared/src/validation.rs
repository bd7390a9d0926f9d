//! Boundary validation for free-text request fields.
//!
//! Request DTOs carry raw strings; use cases pass them through these helpers
//! before any domain type is built, so malformed input surfaces as a
//! 400 with a field-specific message and never reaches persistence.

use crate::error::app_error::{AppError, AppResult};

/// Trim `value` and require it to be non-empty, at most `max_chars` code
/// points, and free of control characters other than tab and newline.
pub fn required_text(field: &'static str, value: &str, max_chars: usize) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::bad_request(format!("{field} is required")));
    }
    check_text(field, trimmed, max_chars)?;
    Ok(trimmed.to_string())
}

/// Like [`required_text`], but blank input is treated as absent.
pub fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max_chars: usize,
) -> AppResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(trimmed) => {
            check_text(field, trimmed, max_chars)?;
            Ok(Some(trimmed.to_string()))
        }
    }
}

fn check_text(field: &'static str, value: &str, max_chars: usize) -> AppResult<()> {
    if value.chars().count() > max_chars {
        return Err(AppError::bad_request(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    if value
        .chars()
        .any(|c| c.is_control() && c != '\n' && c != '\t')
    {
        return Err(AppError::bad_request(format!(
            "{field} contains invalid characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text_trims() {
        assert_eq!(required_text("subject", "  Hello  ", 10).unwrap(), "Hello");
    }

    #[test]
    fn test_required_text_rejects_blank() {
        let err = required_text("subject", "   ", 10).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.message(), "subject is required");
    }

    #[test]
    fn test_required_text_counts_code_points() {
        assert!(required_text("name", "äöü", 3).is_ok());
        assert!(required_text("name", "äöüß", 3).is_err());
    }

    #[test]
    fn test_control_characters_rejected() {
        assert!(required_text("text", "line one\nline two", 100).is_ok());
        assert!(required_text("text", "bell\u{7}", 100).is_err());
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text("company", None, 10).unwrap(), None);
        assert_eq!(optional_text("company", Some("  "), 10).unwrap(), None);
        assert_eq!(
            optional_text("company", Some(" Acme "), 10).unwrap(),
            Some("Acme".to_string())
        );
        assert!(optional_text("company", Some("x".repeat(11).as_str()), 10).is_err());
    }
}
