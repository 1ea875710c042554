//! Profiler/generator collaborators: how a standard is synthesized when
//! none exists for a guarded dataset.

use polars::prelude::{AnyValue, DataFrame};

use datagate_frame::{is_missing_value, value_to_date, value_to_f64, value_to_string};
use datagate_standards::generator::{
    generate_standard, ColumnProfile, DatasetProfile, GenerationOptions,
};
use datagate_standards::standard::ExpectedType;
use datagate_standards::Standard;

use crate::error::GuardError;

/// Summarizes a bounded sample of a frame into a [`DatasetProfile`].
pub trait DatasetProfiler {
    fn profile(&self, df: &DataFrame, sample_rows: usize) -> Result<DatasetProfile, GuardError>;
}

/// Turns a profile into a standard document.
pub trait StandardGenerator {
    fn generate(&self, id: &str, profile: &DatasetProfile) -> Result<Standard, GuardError>;
}

/// Distinct-value cap below which a string column is treated as
/// categorical.
const CATEGORY_CAP: usize = 12;

/// Column-wise profiler over the frame's leading rows.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameProfiler;

impl DatasetProfiler for FrameProfiler {
    fn profile(&self, df: &DataFrame, sample_rows: usize) -> Result<DatasetProfile, GuardError> {
        let rows = df.height().min(sample_rows.max(1));
        if df.width() == 0 {
            return Err(GuardError::Profile {
                message: "frame has no columns to profile".to_string(),
            });
        }

        let mut columns = Vec::with_capacity(df.width());
        for name in df.get_column_names_owned() {
            let series = df.column(&name).map_err(|e| GuardError::Profile {
                message: e.to_string(),
            })?;

            let mut present = 0usize;
            let mut numeric = 0usize;
            let mut dates = 0usize;
            let mut min_value = f64::INFINITY;
            let mut max_value = f64::NEG_INFINITY;
            let mut min_length = usize::MAX;
            let mut max_length = 0usize;
            let mut distinct: Vec<String> = Vec::new();
            let mut overflowed = false;

            for idx in 0..rows {
                let value = series.get(idx).unwrap_or(AnyValue::Null);
                if is_missing_value(&value) {
                    continue;
                }
                present += 1;
                if let Some(v) = value_to_f64(&value) {
                    numeric += 1;
                    min_value = min_value.min(v);
                    max_value = max_value.max(v);
                }
                if value_to_date(&value).is_some() {
                    dates += 1;
                }
                let text = value_to_string(&value);
                let len = text.chars().count();
                min_length = min_length.min(len);
                max_length = max_length.max(len);
                if !overflowed && !distinct.contains(&text) {
                    if distinct.len() < CATEGORY_CAP {
                        distinct.push(text);
                    } else {
                        overflowed = true;
                    }
                }
            }

            let inferred_type = if present == 0 {
                ExpectedType::String
            } else if dates == present {
                ExpectedType::Date
            } else if numeric == present {
                ExpectedType::Numeric
            } else {
                ExpectedType::String
            };
            let numeric_column = inferred_type == ExpectedType::Numeric && numeric > 0;

            let mut categories = None;
            if inferred_type == ExpectedType::String && !overflowed && !distinct.is_empty() {
                distinct.sort();
                categories = Some(distinct);
            }

            columns.push(ColumnProfile {
                name: name.to_string(),
                inferred_type,
                presence_ratio: if rows == 0 {
                    0.0
                } else {
                    present as f64 / rows as f64
                },
                min_value: numeric_column.then_some(min_value),
                max_value: numeric_column.then_some(max_value),
                categories,
                min_length: (present > 0).then_some(min_length),
                max_length: (present > 0).then_some(max_length),
            });
        }

        Ok(DatasetProfile {
            columns,
            row_count: rows,
        })
    }
}

/// Default generator: the standards crate's inference.
#[derive(Debug, Clone)]
pub struct DefaultGenerator {
    options: GenerationOptions,
}

impl DefaultGenerator {
    pub fn new(options: GenerationOptions) -> Self {
        Self { options }
    }
}

impl Default for DefaultGenerator {
    fn default() -> Self {
        Self::new(GenerationOptions::default())
    }
}

impl StandardGenerator for DefaultGenerator {
    fn generate(&self, id: &str, profile: &DatasetProfile) -> Result<Standard, GuardError> {
        Ok(generate_standard(id, profile, &self.options))
    }
}
