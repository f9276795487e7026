use chrono::{DateTime, NaiveDateTime};

/// Parse a backend timestamp.
///
/// The services emit either RFC 3339 or naive ISO-8601 (no offset,
/// optional fractional seconds). Offsets are normalized to UTC.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_formats() {
        let naive = parse_timestamp("2025-03-01T10:15:30.123456").unwrap();
        assert_eq!(naive.format("%Y-%m-%d %H:%M").to_string(), "2025-03-01 10:15");

        let offset = parse_timestamp("2025-03-01T10:15:30+02:00").unwrap();
        assert_eq!(offset.format("%H:%M").to_string(), "08:15");

        assert!(parse_timestamp("2025-03-01 10:15:30").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
