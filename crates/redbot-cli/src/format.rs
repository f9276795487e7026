use chrono::NaiveDateTime;
use redbot_core::SecurityMode;

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a parsed timestamp for table display
pub fn format_timestamp(value: Option<NaiveDateTime>) -> String {
    value
        .map(|dt| dt.format("%b %d, %Y %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Mask a secret, keeping the last four characters visible
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        "*".repeat(count)
    } else {
        let tail: String = secret.chars().skip(count - 4).collect();
        format!("{}{}", "*".repeat(count - 4), tail)
    }
}

/// Short indicator for the active security mode
pub fn security_indicator(mode: SecurityMode) -> &'static str {
    match mode {
        SecurityMode::Disabled => "off",
        SecurityMode::Symmetric => "shared key",
        SecurityMode::Asymmetric => "token + signature",
    }
}

/// Pad a cell to a fixed width after truncation
pub fn cell(value: &str, width: usize) -> String {
    format!("{:<width$}", truncate_string(value, width), width = width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("añoñoño", 5), "añ...");
    }

    #[test]
    fn test_format_timestamp() {
        let dt = NaiveDate::from_ymd_opt(2025, 3, 4)
            .unwrap()
            .and_hms_opt(5, 6, 0)
            .unwrap();
        assert_eq!(format_timestamp(Some(dt)), "Mar 04, 2025 05:06");
        assert_eq!(format_timestamp(None), "-");
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("abcdefgh"), "****efgh");
        assert_eq!(mask_secret("abc"), "***");
        assert_eq!(mask_secret(""), "");
    }

    #[test]
    fn test_cell_pads_and_truncates() {
        assert_eq!(cell("ab", 4), "ab  ");
        assert_eq!(cell("abcdefgh", 6), "abc...");
    }
}
