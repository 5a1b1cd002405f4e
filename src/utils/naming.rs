//! Resource naming helpers.
//!
//! Execution names, request tokens and pipeline names all have to satisfy the
//! platform's length rules. These helpers build and normalize them.

use chrono::{DateTime, TimeZone};
use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

use crate::error::InputError;

/// Maximum length accepted for a pipeline name.
pub const PIPELINE_NAME_MAX_LEN: usize = 82;

/// Maximum length accepted for endpoint and model names.
pub const RESOURCE_NAME_MAX_LEN: usize = 63;

/// Format used for timestamp suffixes.
const DATETIME_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

fn resource_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9](-*[a-zA-Z0-9])*$").expect("valid regex"))
}

/// Formats a point in time as `YYYY-MM-DD-HH-MM-SS`.
pub fn datetime_str<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format(DATETIME_FORMAT).to_string()
}

/// Builds `"{prefix}-{YYYY-MM-DD-HH-MM-SS}"`.
pub fn timestamped_name<Tz: TimeZone>(prefix: &str, time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}-{}", prefix, datetime_str(time))
}

/// Pads `argument` when it is shorter than `min_length`.
///
/// The padding is `"_ "` followed by `min_length - len` zeros, so the result
/// is longer than `min_length`.
pub fn ensure_min_length(argument: &str, min_length: usize) -> String {
    let len = argument.chars().count();
    if len < min_length {
        return format!("{}_ {}", argument, "0".repeat(min_length - len));
    }
    argument.to_string()
}

/// Truncates a pipeline name to [`PIPELINE_NAME_MAX_LEN`] characters.
pub fn normalize_pipeline_name(name: &str) -> String {
    truncate_name(name, PIPELINE_NAME_MAX_LEN)
}

/// Truncates `name` to `max_len` characters, warning when it does.
pub fn truncate_name(name: &str, max_len: usize) -> String {
    let len = name.chars().count();
    if len > max_len {
        warn!(
            name = %name,
            len,
            max_len,
            "Provided name is too long, it will be truncated"
        );
        return name.chars().take(max_len).collect();
    }
    name.to_string()
}

/// Checks an endpoint or model name against the platform naming rules.
pub fn validate_resource_name(name: &str) -> Result<(), InputError> {
    if name.is_empty() || name.len() > RESOURCE_NAME_MAX_LEN {
        return Err(InputError::InvalidName {
            name: name.to_string(),
            reason: format!("length must be between 1 and {}", RESOURCE_NAME_MAX_LEN),
        });
    }
    if !resource_name_regex().is_match(name) {
        return Err(InputError::InvalidName {
            name: name.to_string(),
            reason: "only alphanumerics and inner hyphens are allowed".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 4, 5, 6, 7, 8).unwrap()
    }

    #[test]
    fn test_datetime_str() {
        assert_eq!(datetime_str(&fixed_time()), "2023-04-05-06-07-08");
    }

    #[test]
    fn test_timestamped_name() {
        assert_eq!(
            timestamped_name("training-exec", &fixed_time()),
            "training-exec-2023-04-05-06-07-08"
        );
    }

    #[test]
    fn test_ensure_min_length_pads_with_quirk() {
        // 3 chars, min 5: "_ " then two zeros, 7 chars total.
        assert_eq!(ensure_min_length("abc", 5), "abc_ 00");
        assert_eq!(ensure_min_length("abc", 5).len(), 7);

        let token = "abcdefghijklmno";
        assert_eq!(ensure_min_length(token, 17), format!("{}_ 00", token));
    }

    #[test]
    fn test_ensure_min_length_long_enough() {
        assert_eq!(ensure_min_length("abcde", 5), "abcde");
        assert_eq!(ensure_min_length("abcdef", 5), "abcdef");
        assert_eq!(ensure_min_length("", 0), "");
    }

    #[test]
    fn test_normalize_pipeline_name() {
        let short = "a".repeat(82);
        assert_eq!(normalize_pipeline_name(&short), short);

        let long = "b".repeat(83);
        let normalized = normalize_pipeline_name(&long);
        assert_eq!(normalized.len(), 82);
        assert_eq!(normalized, long[..82]);

        assert_eq!(normalize_pipeline_name("pipe"), "pipe");
    }

    #[test]
    fn test_validate_resource_name() {
        assert!(validate_resource_name("churn-endpoint-1").is_ok());
        assert!(validate_resource_name("").is_err());
        assert!(validate_resource_name("-leading").is_err());
        assert!(validate_resource_name("trailing-").is_err());
        assert!(validate_resource_name("under_score").is_err());
        assert!(validate_resource_name(&"x".repeat(64)).is_err());
    }
}
