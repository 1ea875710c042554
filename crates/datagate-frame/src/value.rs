//! Conversions from Polars `AnyValue` to the plain value shapes the rule
//! evaluators work with.

use chrono::NaiveDate;
use polars::prelude::AnyValue;

use datagate_model::Value;

/// Converts an `AnyValue` to its string representation.
/// Null becomes the empty string; floats drop trailing zeros.
pub fn value_to_string(value: &AnyValue<'_>) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::Int8(v) => v.to_string(),
        AnyValue::Int16(v) => v.to_string(),
        AnyValue::Int32(v) => v.to_string(),
        AnyValue::Int64(v) => v.to_string(),
        AnyValue::UInt8(v) => v.to_string(),
        AnyValue::UInt16(v) => v.to_string(),
        AnyValue::UInt32(v) => v.to_string(),
        AnyValue::UInt64(v) => v.to_string(),
        AnyValue::Float32(v) => format_numeric(f64::from(*v)),
        AnyValue::Float64(v) => format_numeric(*v),
        AnyValue::String(s) => (*s).to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
        other => other.to_string(),
    }
}

/// Formats a float without trailing zeros.
fn format_numeric(v: f64) -> String {
    let s = format!("{v}");
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

/// Converts an `AnyValue` to f64, parsing numeric strings as well.
pub fn value_to_f64(value: &AnyValue<'_>) -> Option<f64> {
    match value {
        AnyValue::Null => None,
        AnyValue::Int8(v) => Some(f64::from(*v)),
        AnyValue::Int16(v) => Some(f64::from(*v)),
        AnyValue::Int32(v) => Some(f64::from(*v)),
        AnyValue::Int64(v) => Some(*v as f64),
        AnyValue::UInt8(v) => Some(f64::from(*v)),
        AnyValue::UInt16(v) => Some(f64::from(*v)),
        AnyValue::UInt32(v) => Some(f64::from(*v)),
        AnyValue::UInt64(v) => Some(*v as f64),
        AnyValue::Float32(v) => Some(f64::from(*v)),
        AnyValue::Float64(v) => Some(*v),
        AnyValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        AnyValue::String(s) => parse_f64(s),
        AnyValue::StringOwned(s) => parse_f64(s),
        _ => None,
    }
}

fn parse_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// True when the value is null or an empty/whitespace-only string.
pub fn is_missing_value(value: &AnyValue<'_>) -> bool {
    match value {
        AnyValue::Null => true,
        AnyValue::String(s) => s.trim().is_empty(),
        AnyValue::StringOwned(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Parses a date from common representations: `YYYY-MM-DD`, RFC 3339,
/// and `YYYY/MM/DD`.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(trimmed, "%Y/%m/%d").ok()
}

/// Extracts a date from an `AnyValue`, via its string form.
pub fn value_to_date(value: &AnyValue<'_>) -> Option<NaiveDate> {
    if is_missing_value(value) {
        return None;
    }
    parse_date(&value_to_string(value))
}

/// Converts an `AnyValue` to an expression-language [`Value`], preferring
/// the numeric interpretation so comparisons behave numerically.
pub fn value_to_expr_value(value: &AnyValue<'_>) -> Value {
    if is_missing_value(value) {
        return Value::Null;
    }
    match value {
        AnyValue::Boolean(b) => Value::Bool(*b),
        AnyValue::String(_) | AnyValue::StringOwned(_) => {
            let text = value_to_string(value);
            match text.trim().parse::<f64>() {
                Ok(n) => Value::Num(n),
                Err(_) => Value::Str(text),
            }
        }
        other => match value_to_f64(other) {
            Some(n) => Value::Num(n),
            None => Value::Str(value_to_string(other)),
        },
    }
}
