use polars::prelude::{AnyValue, DataFrame};

use datagate_model::CaseInsensitiveColumns;

use crate::value::{is_missing_value, value_to_f64, value_to_string};

/// Case-insensitive lookup over the frame's column names.
pub fn column_lookup(df: &DataFrame) -> CaseInsensitiveColumns {
    CaseInsensitiveColumns::new(df.get_column_names_owned())
}

/// Fraction of rows where `column` holds a non-missing value.
/// Returns 0.0 for an absent column or an empty frame.
pub fn presence_ratio(df: &DataFrame, column: &str) -> f64 {
    let height = df.height();
    if height == 0 {
        return 0.0;
    }
    let Ok(series) = df.column(column) else {
        return 0.0;
    };
    let mut present = 0usize;
    for idx in 0..height {
        let value = series.get(idx).unwrap_or(AnyValue::Null);
        if !is_missing_value(&value) {
            present += 1;
        }
    }
    present as f64 / height as f64
}

/// Non-missing values of `column` as trimmed strings.
pub fn non_null_strings(df: &DataFrame, column: &str) -> Vec<String> {
    let Ok(series) = df.column(column) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for idx in 0..df.height() {
        let value = series.get(idx).unwrap_or(AnyValue::Null);
        if is_missing_value(&value) {
            continue;
        }
        out.push(value_to_string(&value).trim().to_string());
    }
    out
}

/// Every cell of `column` as `Option<String>`, preserving row positions.
pub fn string_values(df: &DataFrame, column: &str) -> Vec<Option<String>> {
    let Ok(series) = df.column(column) else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let value = series.get(idx).unwrap_or(AnyValue::Null);
        if is_missing_value(&value) {
            out.push(None);
        } else {
            out.push(Some(value_to_string(&value)));
        }
    }
    out
}

/// Finite numeric values of `column`, non-numeric cells skipped.
pub fn numeric_values(df: &DataFrame, column: &str) -> Vec<f64> {
    let Ok(series) = df.column(column) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for idx in 0..df.height() {
        let value = series.get(idx).unwrap_or(AnyValue::Null);
        if let Some(v) = value_to_f64(&value) {
            if v.is_finite() {
                out.push(v);
            }
        }
    }
    out
}
