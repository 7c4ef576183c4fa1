//! Shared request-parameter parsing and validation.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{de::Error as _, Deserialize, Deserializer};

use crate::error::{AppError, AppResult};
use crate::location::parse_zone;

/// Parse an instant. Strings without an offset are taken as UTC.
///
/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM:SS[.f]` (with `T` or a space) and
/// bare dates (midnight UTC).
#[must_use]
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// `deserialize_with` helper for optional instants.
pub fn optional_instant<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| {
        parse_instant(&s).ok_or_else(|| D::Error::custom(format!("invalid timestamp '{s}'")))
    })
    .transpose()
}

/// `deserialize_with` helper distinguishing an absent field (`None`) from an
/// explicit `null` (`Some(None)`).
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// [`nullable`] for instants.
pub fn nullable_instant<'de, D>(deserializer: D) -> Result<Option<Option<DateTime<Utc>>>, D::Error>
where
    D: Deserializer<'de>,
{
    optional_instant(deserializer).map(Some)
}

pub fn validate_time_range(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> AppResult<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(AppError::validation(
                "end_time",
                "end time must not be before start time",
            ));
        }
    }
    Ok(())
}

/// Resolve `limit`/`offset` against a default and a hard cap.
pub fn pagination(limit: Option<u64>, offset: Option<u64>, max_limit: u64) -> AppResult<(u64, u64)> {
    let limit = limit.unwrap_or(100.min(max_limit));
    if limit == 0 || limit > max_limit {
        return Err(AppError::validation(
            "limit",
            format!("must be between 1 and {max_limit}"),
        ));
    }
    Ok((limit, offset.unwrap_or(0)))
}

/// Trimmed value, or `None` when blank.
#[must_use]
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn require_not_blank(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(field, "must not be blank"));
    }
    Ok(())
}

/// Column widths of the bounded text fields.
pub const SYSTEM_ID_MAX_LEN: usize = 64;
pub const NAME_MAX_LEN: usize = 128;
pub const INVERTER_MODEL_MAX_LEN: usize = 128;
pub const TIMEZONE_MAX_LEN: usize = 64;
pub const LOCATION_NAME_MAX_LEN: usize = 256;

/// Length in characters, matching `VARCHAR(n)` semantics.
pub fn require_max_len(field: &str, value: Option<&str>, max: usize) -> AppResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(AppError::validation(
            field,
            format!("must be at most {max} characters"),
        )),
        _ => Ok(()),
    }
}

pub fn require_finite(field: &str, value: Option<f64>) -> AppResult<()> {
    match value {
        Some(v) if !v.is_finite() => Err(AppError::validation(field, "must be a finite number")),
        _ => Ok(()),
    }
}

pub fn require_range(field: &str, value: Option<f64>, min: f64, max: f64) -> AppResult<()> {
    require_finite(field, value)?;
    match value {
        Some(v) if !(min..=max).contains(&v) => Err(AppError::validation(
            field,
            format!("must be between {min} and {max}"),
        )),
        _ => Ok(()),
    }
}

pub fn require_non_negative(field: &str, value: Option<f64>) -> AppResult<()> {
    require_finite(field, value)?;
    match value {
        Some(v) if v < 0.0 => Err(AppError::validation(field, "must not be negative")),
        _ => Ok(()),
    }
}

/// Explicit timezones must name a real IANA zone.
pub fn require_timezone(field: &str, value: Option<&str>) -> AppResult<()> {
    match value {
        Some(tz) if !tz.trim().is_empty() && parse_zone(tz).is_none() => Err(
            AppError::validation(field, format!("unknown IANA timezone '{tz}'")),
        ),
        _ => Ok(()),
    }
}
