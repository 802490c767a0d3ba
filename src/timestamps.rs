//! Windows time format decoding
//!
//! AD stores timestamps in two formats: LDAP generalized time strings
//! (`whenCreated`, `whenChanged`) and Windows FILETIME values carried as
//! decimal strings (`lastLogon`, `pwdLastSet`, `accountExpires`, ...).
//! FILETIME counts 100-nanosecond ticks since 1601-01-01 UTC.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

use crate::errors::{AdError, Result};

/// Offset between the Windows FILETIME epoch (1601-01-01) and the Unix
/// epoch (1970-01-01), in 100-nanosecond ticks
pub const FILETIME_UNIX_EPOCH_DIFF: i64 = 116_444_736_000_000_000;

/// FILETIME ticks per second
const TICKS_PER_SECOND: i64 = 10_000_000;

/// accountExpires sentinel meaning the account never expires
pub const ACCOUNT_NEVER_EXPIRES: i64 = 9_223_372_036_854_775_807;

fn decode_err(attribute: &str, message: impl Into<String>) -> AdError {
    AdError::DecodeFailed {
        attribute: attribute.to_string(),
        message: message.into(),
    }
}

/// Converts an LDAP generalized time string to a local date-time string.
///
/// Input is the AD wire form `YYYYMMDDHHMMSS.0Z` (e.g. `20230101120000.0Z`);
/// output is `YYYY-MM-DD HH:MM:SS` in the local timezone.
pub fn generalized_time_to_date_time(generalized_time: &str) -> Result<String> {
    if generalized_time.is_empty() {
        return Err(decode_err("generalizedTime", "empty generalized time string"));
    }

    let bare = generalized_time
        .strip_suffix(".0Z")
        .ok_or_else(|| {
            decode_err(
                "generalizedTime",
                format!("unexpected generalized time format: {}", generalized_time),
            )
        })?;

    let naive = NaiveDateTime::parse_from_str(bare, "%Y%m%d%H%M%S").map_err(|e| {
        decode_err(
            "generalizedTime",
            format!("failed to parse '{}': {}", generalized_time, e),
        )
    })?;

    let utc: DateTime<Utc> = Utc.from_utc_datetime(&naive);
    Ok(utc
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string())
}

/// Converts a Windows FILETIME decimal string to a UTC date-time string.
///
/// A value of 0 means the event never occurred (e.g. never logged on) and is
/// an error here; callers render it as "Never". Values before the Unix epoch
/// are rejected as invalid data.
pub fn parse_file_time(file_time_str: &str) -> Result<String> {
    if file_time_str.is_empty() {
        return Err(decode_err("fileTime", "empty fileTime string"));
    }

    let file_time: i64 = file_time_str.parse().map_err(|e| {
        decode_err("fileTime", format!("failed to parse fileTime: {}", e))
    })?;

    if file_time == 0 {
        return Err(decode_err(
            "fileTime",
            "zero value for fileTime (never occurred)",
        ));
    }

    if file_time < FILETIME_UNIX_EPOCH_DIFF {
        return Err(decode_err(
            "fileTime",
            format!("invalid filetime value '{}'", file_time),
        ));
    }

    let unix_seconds = (file_time - FILETIME_UNIX_EPOCH_DIFF) / TICKS_PER_SECOND;
    let timestamp = DateTime::from_timestamp(unix_seconds, 0).ok_or_else(|| {
        decode_err(
            "fileTime",
            format!("filetime value out of range: {}", file_time),
        )
    })?;

    Ok(timestamp.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Decodes an accountExpires value.
///
/// The sentinels `0` and `9223372036854775807` both mean the account never
/// expires and render as `"9223372036854775807, never"`. Any other value is
/// a FILETIME and renders as `"<raw>,<UTC date-time>"`. An empty attribute
/// decodes to an empty string.
pub fn account_expires(raw: &str) -> Result<String> {
    if raw.is_empty() {
        return Ok(String::new());
    }

    let ft: i64 = raw.parse().map_err(|e| {
        decode_err(
            "accountExpires",
            format!("invalid accountExpires value: {}", e),
        )
    })?;

    if ft == 0 || ft == ACCOUNT_NEVER_EXPIRES {
        return Ok(format!("{}, never", ACCOUNT_NEVER_EXPIRES));
    }

    let unix_seconds = (ft - FILETIME_UNIX_EPOCH_DIFF) / TICKS_PER_SECOND;
    if unix_seconds < 0 {
        return Err(decode_err(
            "accountExpires",
            format!("accountExpires value out of range: {}", ft),
        ));
    }

    let t = DateTime::from_timestamp(unix_seconds, 0).ok_or_else(|| {
        decode_err(
            "accountExpires",
            format!("accountExpires value out of range: {}", ft),
        )
    })?;

    Ok(format!("{},{}", raw, t.format("%Y-%m-%d %H:%M:%S")))
}
