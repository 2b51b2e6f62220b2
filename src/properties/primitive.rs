//! Parse and format rules for primitive kinds
//!
//! Every `parse_*` function is the inverse of the matching `format_*`
//! function: `parse(format(v)) == v` for every representable value.

use std::fmt::Display;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeDelta};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{ODataError, Result};

static DURATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-)?P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)(?:\.(\d+))?S)?)?$")
        .expect("duration pattern is valid")
});

static DECIMAL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?$")
        .expect("decimal pattern is valid")
});

/// `/Date(milliseconds[+-offset])/` as written by verbose JSON services
static LEGACY_DATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/Date\((-?\d+)(?:([+-])(\d{1,4}))?\)/$").expect("legacy date pattern is valid")
});

const NAIVE_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const TIME_OF_DAY_FORMAT: &str = "%H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_integer<T>(kind: &str, wire: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    wire.trim()
        .parse::<T>()
        .map_err(|e| ODataError::coercion(kind, wire, e))
}

pub fn parse_boolean(kind: &str, wire: &str) -> Result<bool> {
    match wire.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ODataError::coercion(kind, wire, "expected true or false")),
    }
}

pub fn parse_double(kind: &str, wire: &str) -> Result<f64> {
    match wire.trim() {
        "INF" => Ok(f64::INFINITY),
        "-INF" => Ok(f64::NEG_INFINITY),
        "NaN" => Ok(f64::NAN),
        other => other
            .parse::<f64>()
            .map_err(|e| ODataError::coercion(kind, wire, e)),
    }
}

pub fn parse_single(kind: &str, wire: &str) -> Result<f32> {
    match wire.trim() {
        "INF" => Ok(f32::INFINITY),
        "-INF" => Ok(f32::NEG_INFINITY),
        "NaN" => Ok(f32::NAN),
        other => other
            .parse::<f32>()
            .map_err(|e| ODataError::coercion(kind, wire, e)),
    }
}

/// Shortest text that reads back as the same `f64`
pub fn format_double(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "INF" } else { "-INF" }.to_string()
    } else {
        value.to_string()
    }
}

pub fn format_single(value: f32) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "INF" } else { "-INF" }.to_string()
    } else {
        value.to_string()
    }
}

/// Parse plain or exponent decimal text, normalised so that `2.50 == 2.5`
/// in both value and text
pub fn parse_decimal(kind: &str, wire: &str) -> Result<Decimal> {
    let trimmed = wire.trim();
    if !DECIMAL_PATTERN.is_match(trimmed) {
        return Err(ODataError::coercion(kind, wire, "not a decimal number"));
    }
    let parsed = if trimmed.contains(['e', 'E']) {
        Decimal::from_scientific(&trimmed.replace("e+", "e").replace("E+", "e"))
    } else {
        Decimal::from_str(trimmed)
    };
    parsed
        .map(|value| value.normalize())
        .map_err(|e| ODataError::coercion(kind, wire, e))
}

pub fn format_decimal(value: &Decimal) -> String {
    value.normalize().to_string()
}

pub fn parse_guid(kind: &str, wire: &str) -> Result<Uuid> {
    Uuid::parse_str(wire.trim()).map_err(|e| ODataError::coercion(kind, wire, e))
}

pub fn parse_binary(kind: &str, wire: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(wire.trim())
        .map_err(|e| ODataError::coercion(kind, wire, e))
}

pub fn format_binary(value: &[u8]) -> String {
    STANDARD.encode(value)
}

fn parse_legacy_date(kind: &str, wire: &str) -> Option<Result<DateTime<FixedOffset>>> {
    let captures = LEGACY_DATE_PATTERN.captures(wire)?;
    let parsed = (|| -> Result<DateTime<FixedOffset>> {
        let millis: i64 = captures[1]
            .parse()
            .map_err(|e| ODataError::coercion(kind, wire, e))?;
        let offset_minutes: i32 = match (captures.get(2), captures.get(3)) {
            (Some(sign), Some(minutes)) => {
                let minutes: i32 = minutes
                    .as_str()
                    .parse()
                    .map_err(|e| ODataError::coercion(kind, wire, e))?;
                if sign.as_str() == "-" { -minutes } else { minutes }
            }
            _ => 0,
        };
        let offset = FixedOffset::east_opt(offset_minutes * 60)
            .ok_or_else(|| ODataError::coercion(kind, wire, "offset out of range"))?;
        let instant = DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| ODataError::coercion(kind, wire, "timestamp out of range"))?;
        Ok(instant.with_timezone(&offset))
    })();
    Some(parsed)
}

pub fn parse_datetime(kind: &str, wire: &str) -> Result<NaiveDateTime> {
    let trimmed = wire.trim();
    if let Ok(value) = NaiveDateTime::parse_from_str(trimmed, NAIVE_DATETIME_FORMAT) {
        return Ok(value);
    }
    if let Ok(value) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M") {
        return Ok(value);
    }
    if let Ok(value) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(value.naive_utc());
    }
    match parse_legacy_date(kind, trimmed) {
        Some(parsed) => parsed.map(|value| value.naive_utc()),
        None => Err(ODataError::coercion(kind, wire, "expected an ISO-8601 date and time")),
    }
}

pub fn format_datetime(value: &NaiveDateTime) -> String {
    value.format(NAIVE_DATETIME_FORMAT).to_string()
}

pub fn parse_datetime_offset(kind: &str, wire: &str) -> Result<DateTime<FixedOffset>> {
    let trimmed = wire.trim();
    match DateTime::parse_from_rfc3339(trimmed) {
        Ok(value) => Ok(value),
        Err(e) => parse_legacy_date(kind, trimmed)
            .unwrap_or_else(|| Err(ODataError::coercion(kind, wire, e))),
    }
}

pub fn format_datetime_offset(value: &DateTime<FixedOffset>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn parse_date(kind: &str, wire: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(wire.trim(), DATE_FORMAT).map_err(|e| ODataError::coercion(kind, wire, e))
}

pub fn format_date(value: &NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

pub fn parse_time_of_day(kind: &str, wire: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(wire.trim(), TIME_OF_DAY_FORMAT)
        .map_err(|e| ODataError::coercion(kind, wire, e))
}

pub fn format_time_of_day(value: &NaiveTime) -> String {
    value.format(TIME_OF_DAY_FORMAT).to_string()
}

/// Parse a day-time ISO-8601 duration such as `P1DT2H30M4.5S`
pub fn parse_duration(kind: &str, wire: &str) -> Result<TimeDelta> {
    let trimmed = wire.trim();
    let invalid = |reason: &str| ODataError::coercion(kind, wire, reason);

    let captures = DURATION_PATTERN
        .captures(trimmed)
        .ok_or_else(|| invalid("expected an ISO-8601 duration"))?;
    if trimmed.ends_with('P') || trimmed.ends_with('T') {
        return Err(invalid("duration has no components"));
    }

    let component = |index: usize| -> Result<i64> {
        captures
            .get(index)
            .map(|m| m.as_str().parse::<i64>())
            .transpose()
            .map(|v| v.unwrap_or(0))
            .map_err(|e| ODataError::coercion(kind, wire, e))
    };

    let (days, hours, minutes, whole_seconds) =
        (component(2)?, component(3)?, component(4)?, component(5)?);
    let seconds = days
        .checked_mul(86_400)
        .and_then(|s| s.checked_add(hours.checked_mul(3_600)?))
        .and_then(|s| s.checked_add(minutes.checked_mul(60)?))
        .and_then(|s| s.checked_add(whole_seconds))
        .ok_or_else(|| invalid("duration out of range"))?;

    let nanos = match captures.get(6) {
        Some(fraction) => {
            let digits: String = fraction.as_str().chars().take(9).collect();
            format!("{:0<9}", digits)
                .parse::<u32>()
                .map_err(|e| ODataError::coercion(kind, wire, e))?
        }
        None => 0,
    };

    let magnitude = TimeDelta::new(seconds, nanos).ok_or_else(|| invalid("duration out of range"))?;
    Ok(if captures.get(1).is_some() { -magnitude } else { magnitude })
}

pub fn format_duration(value: &TimeDelta) -> String {
    let negative = *value < TimeDelta::zero();
    let magnitude = if negative { -*value } else { *value };

    let total = magnitude.num_seconds();
    let nanos = magnitude.subsec_nanos();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push('P');
    if days > 0 {
        out.push_str(&format!("{}D", days));
    }

    let has_time = hours > 0 || minutes > 0 || seconds > 0 || nanos > 0;
    if has_time || days == 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{}H", hours));
        }
        if minutes > 0 {
            out.push_str(&format!("{}M", minutes));
        }
        if seconds > 0 || nanos > 0 || !has_time {
            out.push_str(&seconds.to_string());
            if nanos > 0 {
                let fraction = format!("{:09}", nanos);
                out.push('.');
                out.push_str(fraction.trim_end_matches('0'));
            }
            out.push('S');
        }
    }
    out
}
