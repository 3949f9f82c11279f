use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

const TIMEZONE_CONFIG_FILE: &str = "taskdeck-time.toml";
const TIMEZONE_ENV_VAR: &str = "TASKDECK_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str = "TASKDECK_TIME_CONFIG";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
    timezone: Option<String>,
    time: Option<TimezoneSection>,
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
    timezone: Option<String>,
}

/// The timezone "today" is computed in. Resolved once per process:
/// `TASKDECK_TIMEZONE` env var, then a `taskdeck-time.toml` file, then UTC.
pub fn project_timezone() -> &'static Tz {
    static PROJECT_TZ: OnceLock<Tz> = OnceLock::new();
    PROJECT_TZ.get_or_init(resolve_project_timezone)
}

/// Calendar date of `now` in the project timezone, time-of-day zeroed.
#[must_use]
pub fn today(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(project_timezone()).date_naive()
}

#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a due-date input as the user typed it. Accepts `YYYY-MM-DD`,
/// `today`, `tomorrow`, and `+Nd` (N days from today). Empty and
/// unrecognised inputs are `None`; classifying those is the validator's
/// job, not this function's.
pub fn parse_due_input(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    let token = raw.trim();
    if token.is_empty() {
        return None;
    }

    match token.to_ascii_lowercase().as_str() {
        "today" => return Some(today),
        "tomorrow" => return today.checked_add_days(Days::new(1)),
        _ => {}
    }

    if let Some(re) = relative_days_re()
        && let Some(caps) = re.captures(token)
    {
        let days: u64 = caps.name("num")?.as_str().parse().ok()?;
        return today.checked_add_days(Days::new(days));
    }

    NaiveDate::parse_from_str(token, "%Y-%m-%d").ok()
}

fn relative_days_re() -> Option<&'static Regex> {
    static RELATIVE_RE: OnceLock<Option<Regex>> = OnceLock::new();
    RELATIVE_RE
        .get_or_init(|| Regex::new(r"^\+(?P<num>\d+)d$").ok())
        .as_ref()
}

fn resolve_project_timezone() -> Tz {
    if let Ok(raw) = std::env::var(TIMEZONE_ENV_VAR)
        && let Some(tz) = parse_timezone(&raw, TIMEZONE_ENV_VAR)
    {
        return tz;
    }

    if let Some(path) = timezone_config_path()
        && let Some(tz) = load_timezone_from_file(&path)
    {
        return tz;
    }

    tracing::info!("no timezone configured; using UTC");
    chrono_tz::UTC
}

fn timezone_config_path() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var(TIMEZONE_CONFIG_ENV_VAR) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    std::env::current_dir()
        .ok()
        .map(|dir| dir.join(TIMEZONE_CONFIG_FILE))
}

fn load_timezone_from_file(path: &Path) -> Option<Tz> {
    if !path.exists() {
        tracing::debug!(file = %path.display(), "timezone config file not found");
        return None;
    }

    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::error!(
                file = %path.display(),
                error = %err,
                "failed reading timezone config file"
            );
            return None;
        }
    };

    let parsed = match toml::from_str::<TimezoneConfig>(&raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::error!(
                file = %path.display(),
                error = %err,
                "failed parsing timezone config file"
            );
            return None;
        }
    };

    let timezone = parsed
        .timezone
        .or_else(|| parsed.time.and_then(|section| section.timezone));
    let Some(timezone) = timezone else {
        tracing::warn!(file = %path.display(), "timezone config had no timezone field");
        return None;
    };

    parse_timezone(&timezone, &format!("file:{}", path.display()))
}

fn parse_timezone(raw: &str, source: &str) -> Option<Tz> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        tracing::warn!(source, "timezone source was empty");
        return None;
    }

    match trimmed.parse::<Tz>() {
        Ok(tz) => {
            tracing::info!(source, timezone = %trimmed, "configured project timezone");
            Some(tz)
        }
        Err(err) => {
            tracing::error!(
                source,
                timezone = %trimmed,
                error = %err,
                "failed to parse timezone id"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::NaiveDate;
    use tempfile::tempdir;

    use super::{load_timezone_from_file, parse_due_input, parse_timezone};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn parses_iso_dates() {
        let today = day(2024, 1, 10);
        assert_eq!(parse_due_input("2024-01-15", today), Some(day(2024, 1, 15)));
        assert_eq!(parse_due_input(" 2024-01-15 ", today), Some(day(2024, 1, 15)));
    }

    #[test]
    fn parses_named_and_relative_dates() {
        let today = day(2024, 1, 10);
        assert_eq!(parse_due_input("today", today), Some(today));
        assert_eq!(parse_due_input("Tomorrow", today), Some(day(2024, 1, 11)));
        assert_eq!(parse_due_input("+7d", today), Some(day(2024, 1, 17)));
    }

    #[test]
    fn rejects_empty_and_garbage() {
        let today = day(2024, 1, 10);
        assert_eq!(parse_due_input("", today), None);
        assert_eq!(parse_due_input("someday", today), None);
        assert_eq!(parse_due_input("2024-13-40", today), None);
        assert_eq!(parse_due_input("15/01/2024", today), None);
    }

    #[test]
    fn timezone_file_supports_flat_and_sectioned_keys() {
        let temp = tempdir().expect("tempdir");

        let flat = temp.path().join("flat.toml");
        fs::write(&flat, "timezone = \"Europe/Berlin\"\n").expect("write flat config");
        assert_eq!(load_timezone_from_file(&flat), Some(chrono_tz::Europe::Berlin));

        let sectioned = temp.path().join("sectioned.toml");
        fs::write(&sectioned, "[time]\ntimezone = \"America/New_York\"\n")
            .expect("write sectioned config");
        assert_eq!(
            load_timezone_from_file(&sectioned),
            Some(chrono_tz::America::New_York)
        );
    }

    #[test]
    fn bad_timezone_ids_are_ignored() {
        assert_eq!(parse_timezone("Atlantis/Nowhere", "test"), None);
        assert_eq!(parse_timezone("  ", "test"), None);
        assert_eq!(parse_timezone("UTC", "test"), Some(chrono_tz::UTC));
    }
}
