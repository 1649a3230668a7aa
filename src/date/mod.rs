//! Date formatting
//!
//! Renders instants into caller-supplied patterns such as `YYYY/MM/DD`, which
//! is how the default upload folder is built.
//!
//! # Tokens
//!
//! | Token | Value | Token | Value |
//! |-------|-------|-------|-------|
//! | `YYYY` | 4-digit year | `YY` | 2-digit year |
//! | `MMMM` | `January` | `MMM` | `Jan` |
//! | `MM` | `01`-`12` | `M` | `1`-`12` |
//! | `DD` | `01`-`31` | `D` | `1`-`31` |
//! | `HH` | `00`-`23` | `H` | `0`-`23` |
//! | `hh` | `01`-`12` | `h` | `1`-`12` |
//! | `mm` | `00`-`59` | `m` | `0`-`59` |
//! | `ss` | `00`-`59` | `s` | `0`-`59` |
//! | `SSS` | `000`-`999` | `a` | `AM` / `PM` |
//!
//! The pattern is scanned once and the longest token at each position wins,
//! so `YYYY` is never read as two `YY` and substituted text is never rescanned.
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use upyun_relay::date::format_instant;
//!
//! let instant = Utc.with_ymd_and_hms(2024, 1, 5, 9, 8, 7).unwrap();
//! assert_eq!(format_instant("YYYY-MM-DD HH:mm:ss", &instant), "2024-01-05 09:08:07");
//! ```

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Pattern used for the default upload folder
pub const DEFAULT_FOLDER_PATTERN: &str = "YYYY/MM/DD";

/// Longest first: a shorter token must never shadow a longer one.
const TOKENS: [&str; 18] = [
    "YYYY", "MMMM", "SSS", "MMM", "YY", "MM", "DD", "HH", "hh", "mm", "ss", "M", "D", "H", "h",
    "m", "s", "a",
];

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const NAIVE_DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Date errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    #[error("Invalid date input: {0}")]
    InvalidDate(String),
}

/// What to do when a date input cannot be parsed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidDatePolicy {
    /// Log a warning and format the current time instead
    #[default]
    UseCurrentTime,
    /// Return [`DateError::InvalidDate`]
    Fail,
}

/// A date-like value accepted by [`DateFormatter::format`]
#[derive(Debug, Clone, PartialEq)]
pub enum DateInput {
    Instant(DateTime<Local>),
    /// Milliseconds since the Unix epoch
    Millis(i64),
    Text(String),
}

impl<Tz: TimeZone> From<DateTime<Tz>> for DateInput {
    fn from(value: DateTime<Tz>) -> Self {
        DateInput::Instant(value.with_timezone(&Local))
    }
}

impl From<i64> for DateInput {
    fn from(value: i64) -> Self {
        DateInput::Millis(value)
    }
}

impl From<&str> for DateInput {
    fn from(value: &str) -> Self {
        DateInput::Text(value.to_string())
    }
}

impl From<String> for DateInput {
    fn from(value: String) -> Self {
        DateInput::Text(value)
    }
}

/// Pattern formatter in the local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct DateFormatter {
    policy: InvalidDatePolicy,
}

impl DateFormatter {
    /// Create a formatter with the given invalid-input policy
    pub fn new(policy: InvalidDatePolicy) -> Self {
        Self { policy }
    }

    /// The configured invalid-input policy
    pub fn policy(&self) -> InvalidDatePolicy {
        self.policy
    }

    /// Format `input` (or the current time when `None`) with `pattern`
    pub fn format(&self, pattern: &str, input: Option<DateInput>) -> Result<String, DateError> {
        let instant = self.resolve(input)?;
        Ok(format_instant(pattern, &instant))
    }

    /// Format the current local time with `pattern`
    pub fn format_now(&self, pattern: &str) -> String {
        format_instant(pattern, &Local::now())
    }

    /// Turn an optional input into a local instant, applying the policy
    pub fn resolve(&self, input: Option<DateInput>) -> Result<DateTime<Local>, DateError> {
        let Some(input) = input else {
            return Ok(Local::now());
        };

        let (parsed, raw) = match input {
            DateInput::Instant(instant) => return Ok(instant),
            DateInput::Millis(millis) => (from_millis(millis), millis.to_string()),
            DateInput::Text(text) => (parse_date_text(&text), text),
        };

        match (parsed, self.policy) {
            (Some(instant), _) => Ok(instant),
            (None, InvalidDatePolicy::UseCurrentTime) => {
                warn!(input = %raw, "Invalid date input, using current time");
                Ok(Local::now())
            }
            (None, InvalidDatePolicy::Fail) => Err(DateError::InvalidDate(raw)),
        }
    }
}

/// Format an instant in its own timezone
pub fn format_instant<Tz: TimeZone>(pattern: &str, instant: &DateTime<Tz>) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut rest = pattern;

    while let Some(ch) = rest.chars().next() {
        match TOKENS.iter().find(|token| rest.starts_with(**token)) {
            Some(token) => {
                out.push_str(&token_value(token, instant));
                rest = &rest[token.len()..];
            }
            None => {
                out.push(ch);
                rest = &rest[ch.len_utf8()..];
            }
        }
    }

    out
}

fn token_value<Tz: TimeZone>(token: &str, instant: &DateTime<Tz>) -> String {
    let hour12 = match instant.hour() % 12 {
        0 => 12,
        h => h,
    };
    let month = MONTHS[instant.month0() as usize];

    match token {
        "YYYY" => format!("{:04}", instant.year()),
        "YY" => format!("{:02}", instant.year().rem_euclid(100)),
        "MMMM" => month.to_string(),
        "MMM" => month[..3].to_string(),
        "MM" => format!("{:02}", instant.month()),
        "M" => instant.month().to_string(),
        "DD" => format!("{:02}", instant.day()),
        "D" => instant.day().to_string(),
        "HH" => format!("{:02}", instant.hour()),
        "H" => instant.hour().to_string(),
        "hh" => format!("{:02}", hour12),
        "h" => hour12.to_string(),
        "mm" => format!("{:02}", instant.minute()),
        "m" => instant.minute().to_string(),
        "ss" => format!("{:02}", instant.second()),
        "s" => instant.second().to_string(),
        // leap seconds report nanos >= 1e9
        "SSS" => format!("{:03}", (instant.nanosecond() / 1_000_000).min(999)),
        "a" => (if instant.hour() >= 12 { "PM" } else { "AM" }).to_string(),
        _ => token.to_string(),
    }
}

/// Current time as milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn from_millis(millis: i64) -> Option<DateTime<Local>> {
    DateTime::from_timestamp_millis(millis).map(|utc| utc.with_timezone(&Local))
}

fn parse_date_text(text: &str) -> Option<DateTime<Local>> {
    let text = text.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.with_timezone(&Local));
    }

    if let Ok(millis) = text.parse::<i64>() {
        return from_millis(millis);
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Local.from_local_datetime(&naive).earliest();
        }
    }

    for format in NAIVE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            let naive = date.and_hms_opt(0, 0, 0)?;
            return Local.from_local_datetime(&naive).earliest();
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn fixed_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, 9, 8, 7).unwrap()
    }

    #[test]
    fn test_zero_padded_fields() {
        assert_eq!(
            format_instant("YYYY-MM-DD HH:mm:ss", &fixed_instant()),
            "2024-01-05 09:08:07"
        );
    }

    #[test]
    fn test_unpadded_fields() {
        assert_eq!(format_instant("YY M/D H:m:s", &fixed_instant()), "24 1/5 9:8:7");
    }

    #[test]
    fn test_month_names_do_not_leak_into_other_tokens() {
        // "January" contains an 'a' and "Jan" an 'a'; neither may be rewritten to AM/PM
        assert_eq!(format_instant("MMMM MMM a", &fixed_instant()), "January Jan AM");
    }

    #[test]
    fn test_twelve_hour_clock() {
        let midnight = Utc.with_ymd_and_hms(2024, 3, 1, 0, 5, 0).unwrap();
        assert_eq!(format_instant("hh:mm a", &midnight), "12:05 AM");

        let afternoon = Utc.with_ymd_and_hms(2024, 3, 1, 15, 5, 0).unwrap();
        assert_eq!(format_instant("h:mm a", &afternoon), "3:05 PM");
    }

    #[test]
    fn test_milliseconds() {
        let instant = DateTime::from_timestamp_millis(1_704_445_687_045).unwrap();
        assert_eq!(format_instant("ss.SSS", &instant), "07.045");
    }

    #[test]
    fn test_non_token_text_preserved() {
        assert_eq!(
            format_instant("YYYY年MM月DD日 [x]", &fixed_instant()),
            "2024年01月05日 [x]"
        );
    }

    #[test]
    fn test_formats_in_instant_timezone() {
        let offset = FixedOffset::east_opt(8 * 3600).unwrap();
        let shanghai = fixed_instant().with_timezone(&offset);
        assert_eq!(format_instant("YYYY/MM/DD HH", &shanghai), "2024/01/05 17");
    }

    #[test]
    fn test_default_folder_pattern_shape() {
        let folder = DateFormatter::default().format_now(DEFAULT_FOLDER_PATTERN);
        let parts: Vec<&str> = folder.split('/').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 4);
        assert_eq!(parts[1].len(), 2);
        assert_eq!(parts[2].len(), 2);
    }

    #[test]
    fn test_parses_text_inputs() {
        let formatter = DateFormatter::new(InvalidDatePolicy::Fail);
        let expected = format_instant("YYYY-MM-DD HH:mm:ss", &fixed_instant().with_timezone(&Local));

        let from_rfc3339 = formatter
            .format("YYYY-MM-DD HH:mm:ss", Some("2024-01-05T09:08:07.000Z".into()))
            .unwrap();
        assert_eq!(from_rfc3339, expected);

        let from_millis = formatter
            .format("YYYY-MM-DD HH:mm:ss", Some(fixed_instant().timestamp_millis().into()))
            .unwrap();
        assert_eq!(from_millis, expected);

        let local_date = formatter.format("YYYY-MM-DD HH:mm", Some("2023/12/31".into())).unwrap();
        assert_eq!(local_date, "2023-12-31 00:00");
    }

    #[test]
    fn test_invalid_input_fails_under_fail_policy() {
        let formatter = DateFormatter::new(InvalidDatePolicy::Fail);
        let result = formatter.format("YYYY", Some("not a date".into()));
        assert_eq!(result, Err(DateError::InvalidDate("not a date".into())));
    }

    #[test]
    fn test_invalid_input_falls_back_to_now() {
        let formatter = DateFormatter::new(InvalidDatePolicy::UseCurrentTime);
        let before = Local::now().year();
        let year: i32 = formatter
            .format("YYYY", Some("not a date".into()))
            .unwrap()
            .parse()
            .unwrap();
        assert!(year >= before);
    }

    #[test]
    fn test_policy_deserializes_from_snake_case() {
        let policy: InvalidDatePolicy = serde_yaml::from_str("fail").unwrap();
        assert_eq!(policy, InvalidDatePolicy::Fail);
        let policy: InvalidDatePolicy = serde_yaml::from_str("use_current_time").unwrap();
        assert_eq!(policy, InvalidDatePolicy::UseCurrentTime);
    }
}
