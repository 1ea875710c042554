//! Polars `AnyValue`/`DataFrame` helpers shared by the rule evaluators,
//! the audit trail, and the protection guard.

mod column;
mod value;

pub use column::{
    column_lookup, non_null_strings, numeric_values, presence_ratio, string_values,
};
pub use value::{
    is_missing_value, parse_date, value_to_date, value_to_expr_value, value_to_f64,
    value_to_string,
};
