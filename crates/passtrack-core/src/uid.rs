//! Application UID parsing and validation.
//!
//! A UID is a 25-digit application number. Characters 9..17 embed the
//! reception date as `YYYYMMDD`; the first four digits are a fixed series
//! prefix.

use chrono::{NaiveDate, Utc};

/// Full UID length in characters.
pub const UID_LENGTH: usize = 25;

/// Every real application number starts with this series prefix.
pub const UID_PREFIX: &str = "2000";

/// Display suffix length (last N digits of the UID).
pub const SHORT_UID_LENGTH: usize = 6;

/// Marker prepended to the short form, e.g. `*007421`.
pub const SHORT_UID_MARKER: char = '*';

/// Sentinel returned when a reception date cannot be recovered from a UID.
/// Callers must treat it as "unknown", never as a date.
pub const UNKNOWN_DATE: &str = "-";

/// Byte offset of the embedded `YYYYMMDD` date.
const DATE_OFFSET: usize = 9;

/// Embedded dates further than this from today are placeholder junk
/// (all-zero / all-nine UIDs land here).
const PLAUSIBLE_YEARS: i64 = 5;

/// True iff `uid` is structurally a real application number: exact length,
/// known series prefix, and a decodable, plausible embedded date.
pub fn is_valid_uid(uid: &str) -> bool {
    uid.len() == UID_LENGTH
        && uid.starts_with(UID_PREFIX)
        && parse_reception_date_from_uid(uid) != UNKNOWN_DATE
}

/// True iff `short_uid` has the display length (suffix plus marker).
pub fn is_valid_short_uid(short_uid: &str) -> bool {
    short_uid.chars().count() == SHORT_UID_LENGTH + 1
}

/// Extract the reception date embedded in a UID as `YYYY-MM-DD`.
///
/// Returns [`UNKNOWN_DATE`] on any shape mismatch, non-numeric digits,
/// impossible calendar date, or a date too far from today.
pub fn parse_reception_date_from_uid(uid: &str) -> String {
    let Some(head) = uid.get(..DATE_OFFSET) else {
        return UNKNOWN_DATE.to_string();
    };
    let Some(raw) = uid.get(DATE_OFFSET..DATE_OFFSET + 8) else {
        return UNKNOWN_DATE.to_string();
    };
    if !head.bytes().all(|b| b.is_ascii_digit()) || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return UNKNOWN_DATE.to_string();
    }

    let formatted = format!("{}-{}-{}", &raw[..4], &raw[4..6], &raw[6..8]);
    match NaiveDate::parse_from_str(&formatted, "%Y-%m-%d") {
        Ok(date) if is_plausible_date(date) => formatted,
        _ => UNKNOWN_DATE.to_string(),
    }
}

/// `*` + last six digits, the user-facing form of a UID.
pub fn parse_short_uid_from_uid(uid: &str) -> String {
    let start = uid.len().saturating_sub(SHORT_UID_LENGTH);
    let suffix = uid.get(start..).unwrap_or(uid);
    format!("{SHORT_UID_MARKER}{suffix}")
}

/// Days elapsed since a `YYYY-MM-DD` reception date. `None` when the date
/// is the sentinel or otherwise unparseable.
pub fn days_since_reception(reception_date: &str) -> Option<i64> {
    let date = NaiveDate::parse_from_str(reception_date, "%Y-%m-%d").ok()?;
    Some((Utc::now().date_naive() - date).num_days())
}

fn is_plausible_date(date: NaiveDate) -> bool {
    let today = Utc::now().date_naive();
    (date - today).num_days().abs() <= PLAUSIBLE_YEARS * 366
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    /// A UID with a real embedded date close to today.
    fn fresh_uid() -> String {
        let date = Utc::now().date_naive();
        format!(
            "200038101{:04}{:02}{:02}00007421",
            date.year(),
            date.month(),
            date.day()
        )
    }

    #[test]
    fn test_valid_uid() {
        let uid = fresh_uid();
        assert_eq!(uid.len(), UID_LENGTH);
        assert!(is_valid_uid(&uid));
    }

    #[test]
    fn test_invalid_uid_wrong_length() {
        assert!(!is_valid_uid("42"));
        assert!(!is_valid_uid(""));
        let long = fresh_uid() + "0";
        assert!(!is_valid_uid(&long));
    }

    #[test]
    fn test_invalid_uid_wrong_prefix() {
        assert!(!is_valid_uid("0000011111222223333344444"));
    }

    #[test]
    fn test_invalid_uid_placeholder_dates() {
        // All-zero and all-nine placeholders decode to impossible or
        // far-out-of-range dates.
        assert!(!is_valid_uid("2000000000000000000000000"));
        assert!(!is_valid_uid("2000999999999999999999999"));
    }

    #[test]
    fn test_parse_reception_date_round_trip() {
        let uid = fresh_uid();
        let date = Utc::now().date_naive();
        assert_eq!(
            parse_reception_date_from_uid(&uid),
            format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
        );
    }

    #[test]
    fn test_parse_reception_date_invalid_month() {
        // Month 00 is not a calendar date.
        assert_eq!(
            parse_reception_date_from_uid("2000381012023000500007421"),
            UNKNOWN_DATE
        );
    }

    #[test]
    fn test_parse_reception_date_non_numeric() {
        assert_eq!(
            parse_reception_date_from_uid("20003810120ab90500007421x"),
            UNKNOWN_DATE
        );
        assert_eq!(parse_reception_date_from_uid("short"), UNKNOWN_DATE);
    }

    #[test]
    fn test_parse_reception_date_far_future() {
        assert_eq!(
            parse_reception_date_from_uid("2000381019999090500007421"),
            UNKNOWN_DATE
        );
    }

    #[test]
    fn test_short_uid() {
        assert_eq!(
            parse_short_uid_from_uid("2000381012023090500007421"),
            "*007421"
        );
        assert!(is_valid_short_uid("*007421"));
        assert!(!is_valid_short_uid("007421"));
        assert!(!is_valid_short_uid("*07421"));
    }

    #[test]
    fn test_days_since_reception() {
        let today = Utc::now().date_naive();
        let formatted = format!(
            "{:04}-{:02}-{:02}",
            today.year(),
            today.month(),
            today.day()
        );
        assert_eq!(days_since_reception(&formatted), Some(0));
        assert_eq!(days_since_reception(UNKNOWN_DATE), None);
        assert_eq!(days_since_reception("garbage"), None);
    }
}
