//! Datetime conversions used by the serializer and the metadata
//! extractor.
//!
//! // 时间工具:序列化用的带标签 RFC 3339 字符串,以及 HTTP 日期解析。

use chrono::{DateTime, SecondsFormat, Utc};

use crate::common::constants::DATETIME_TAG;

/// Renders a datetime in the tagged form stored by the serializer,
/// e.g. `datetime:2024-05-01T12:30:00.000000Z`.
pub fn to_tagged(value: &DateTime<Utc>) -> String {
    format!(
        "{DATETIME_TAG}:{}",
        value.to_rfc3339_opts(SecondsFormat::Micros, true)
    )
}

/// Parses the tagged serialized form back into a datetime. Returns
/// `None` when the tag or the payload does not match.
pub fn from_tagged(value: &str) -> Option<DateTime<Utc>> {
    let payload = value.strip_prefix(DATETIME_TAG)?.strip_prefix(':')?;
    DateTime::parse_from_rfc3339(payload)
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

/// Parses an HTTP date header value, e.g.
/// `Tue, 15 Nov 1994 08:12:31 GMT`.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_tagged_round_trip() {
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let tagged = to_tagged(&date);
        assert!(tagged.starts_with("datetime:2024-05-01T12:30:00"));
        assert_eq!(from_tagged(&tagged), Some(date));
    }

    #[test]
    fn test_from_tagged_rejects_untagged_values() {
        assert_eq!(from_tagged("2024-05-01T12:30:00Z"), None);
        assert_eq!(from_tagged("datetime:not-a-date"), None);
    }

    #[test]
    fn test_parse_http_date() {
        let date = parse_http_date("Tue, 15 Nov 1994 08:12:31 GMT").unwrap();
        assert_eq!(date, Utc.with_ymd_and_hms(1994, 11, 15, 8, 12, 31).unwrap());
        assert_eq!(parse_http_date("yesterday"), None);
    }
}
