pub mod accounts;
pub mod content;
pub mod users;

/// Trimmed value, `None` when absent or blank
pub(crate) fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Untouched value, `None` when absent or blank. Passwords go through here
/// so that surrounding whitespace stays significant.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trimmed() {
        assert_eq!(trimmed(Some("  Ann ".into())).as_deref(), Some("Ann"));
        assert_eq!(trimmed(Some("   ".into())), None);
        assert_eq!(trimmed(None), None);
    }

    #[test]
    fn test_non_blank_keeps_whitespace() {
        assert_eq!(non_blank(Some(" pw ".into())).as_deref(), Some(" pw "));
        assert_eq!(non_blank(Some("".into())), None);
    }
}
