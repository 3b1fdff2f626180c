//! String utilities for the domain layer.

/// Truncate a string to a maximum length with ellipsis (UTF-8 safe)
///
/// Uses byte length for max_len but ensures truncation occurs at valid
/// UTF-8 character boundaries. Used for tool argument summaries in logs.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let target = max_len.saturating_sub(3);
        let mut end = target.min(s.len());
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_input() {
        assert_eq!(truncate("cast_id", 20), "cast_id");
        assert_eq!(truncate(r#"{"cast_id":"4kn3Xu8r"}"#, 12), "{\"cast_id...");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("café-générique", 30), "café-générique");
        // Never split inside a multi-byte character
        let out = truncate("généralité", 6);
        assert!(out.ends_with("..."));
        assert!(out.is_char_boundary(out.len()));
    }
}
