//! Consistency rules: do values agree with each other across columns?

use polars::prelude::{AnyValue, DataFrame};
use serde_json::json;

use datagate_frame::{column_lookup, is_missing_value, value_to_expr_value, value_to_string};
use datagate_model::{CaseInsensitiveColumns, Dimension, Expr, RuleResult, Value};
use datagate_standards::catalog::{ComparisonOp, CrossFieldMode, FieldComparison};

use crate::engine::{details, EXAMPLE_CAP};

/// Per-row boolean invariant over columns, in expression or comparison form.
pub fn cross_field(df: &DataFrame, mode: &CrossFieldMode, name: &str, weight: f64) -> RuleResult {
    match mode {
        CrossFieldMode::Expression(expression) => expression_rows(df, expression, name, weight),
        CrossFieldMode::Comparisons(comparisons) => comparison_rows(df, comparisons, name, weight),
    }
}

/// Per-row `|expression - target| <= tolerance`.
pub fn calculation_consistency(
    df: &DataFrame,
    expression: &str,
    target_column: &str,
    tolerance: f64,
    name: &str,
    weight: f64,
) -> RuleResult {
    let expr = match Expr::parse(expression) {
        Ok(expr) => expr,
        Err(e) => {
            return RuleResult::degraded(
                name,
                Dimension::Consistency,
                weight,
                format!("invalid expression '{expression}': {e}"),
            );
        }
    };
    let lookup = column_lookup(df);
    let Some(target) = lookup.get(target_column).map(str::to_string) else {
        return RuleResult::degraded(
            name,
            Dimension::Consistency,
            weight,
            format!("column '{target_column}' not found"),
        );
    };
    let Ok(target_series) = df.column(&target) else {
        return RuleResult::degraded(
            name,
            Dimension::Consistency,
            weight,
            format!("column '{target_column}' not found"),
        );
    };

    let height = df.height();
    let mut invalid = 0usize;
    let mut examples = Vec::new();

    for idx in 0..height {
        let resolve = row_resolver(df, &lookup, idx);
        let target_value = target_series.get(idx).unwrap_or(AnyValue::Null);
        let row_ok = match (expr.eval_num(&resolve).ok(), value_num(&target_value)) {
            (Some(computed), Some(actual)) => (computed - actual).abs() <= tolerance,
            _ => false,
        };
        if !row_ok {
            invalid += 1;
            if examples.len() < EXAMPLE_CAP {
                examples.push(format!(
                    "row {idx}: {target_column} = {}",
                    value_to_string(&target_value)
                ));
            }
        }
    }

    finish(name, height, invalid, examples, weight, |ratio| {
        format!(
            "{invalid} row(s) deviate from '{expression}' beyond {tolerance} ({:.1}% consistent)",
            ratio * 100.0
        )
    })
}

/// Per-value conformity to a single representation.
pub fn uniform_representation(
    df: &DataFrame,
    column: &str,
    format: &datagate_standards::catalog::UniformFormat,
    name: &str,
    weight: f64,
) -> RuleResult {
    use datagate_standards::catalog::UniformFormat;

    let conformity: Box<dyn Fn(&str) -> bool> = match format {
        UniformFormat::Pattern(pattern) => {
            let anchored = format!("^(?:{pattern})$");
            match regex::Regex::new(&anchored) {
                Ok(regex) => Box::new(move |text: &str| regex.is_match(text)),
                Err(e) => {
                    return RuleResult::degraded(
                        name,
                        Dimension::Consistency,
                        weight,
                        format!("invalid pattern '{pattern}': {e}"),
                    );
                }
            }
        }
        UniformFormat::Categorical {
            allowed,
            case_insensitive,
        } => {
            let case_insensitive = *case_insensitive;
            let allowed: Vec<String> = if case_insensitive {
                allowed.iter().map(|v| v.to_lowercase()).collect()
            } else {
                allowed.clone()
            };
            Box::new(move |text: &str| {
                let probe = if case_insensitive {
                    text.to_lowercase()
                } else {
                    text.to_string()
                };
                allowed.iter().any(|a| *a == probe)
            })
        }
        UniformFormat::Length(length) => {
            let length = *length;
            Box::new(move |text: &str| text.chars().count() == length)
        }
    };

    let Ok(series) = df.column(column) else {
        return RuleResult::degraded(
            name,
            Dimension::Consistency,
            weight,
            format!("column '{column}' not found"),
        );
    };

    let mut checked = 0usize;
    let mut conforming = 0usize;
    let mut examples = Vec::new();
    for idx in 0..df.height() {
        let value = series.get(idx).unwrap_or(AnyValue::Null);
        if is_missing_value(&value) {
            continue;
        }
        checked += 1;
        let text = value_to_string(&value);
        if conformity(text.trim()) {
            conforming += 1;
        } else if examples.len() < EXAMPLE_CAP {
            examples.push(text);
        }
    }

    let ratio = if checked == 0 {
        1.0
    } else {
        conforming as f64 / checked as f64
    };
    RuleResult {
        rule: name.to_string(),
        dimension: Dimension::Consistency,
        valid: conforming == checked,
        score: (weight * ratio).clamp(0.0, weight),
        weight,
        narrative: format!("{column}: {conforming}/{checked} values uniformly represented"),
        examples,
        details: details(&[
            ("checked", json!(checked)),
            ("conforming", json!(conforming)),
            ("uniformity_ratio", json!(ratio)),
        ]),
    }
}

fn expression_rows(df: &DataFrame, expression: &str, name: &str, weight: f64) -> RuleResult {
    let expr = match Expr::parse(expression) {
        Ok(expr) => expr,
        Err(e) => {
            return RuleResult::degraded(
                name,
                Dimension::Consistency,
                weight,
                format!("invalid expression '{expression}': {e}"),
            );
        }
    };
    let lookup = column_lookup(df);
    let height = df.height();
    let mut invalid = 0usize;
    let mut examples = Vec::new();

    for idx in 0..height {
        let resolve = row_resolver(df, &lookup, idx);
        // An unresolvable or missing operand marks the row inconsistent.
        let row_ok = expr.eval_bool(&resolve).unwrap_or(false);
        if !row_ok {
            invalid += 1;
            if examples.len() < EXAMPLE_CAP {
                examples.push(format!("row {idx}"));
            }
        }
    }

    finish(name, height, invalid, examples, weight, |ratio| {
        format!(
            "'{expression}' holds for {:.1}% of rows ({invalid} violation(s))",
            ratio * 100.0
        )
    })
}

fn comparison_rows(
    df: &DataFrame,
    comparisons: &[FieldComparison],
    name: &str,
    weight: f64,
) -> RuleResult {
    let lookup = column_lookup(df);
    for comparison in comparisons {
        for field in [&comparison.field1, &comparison.field2] {
            if lookup.get(field).is_none() {
                return RuleResult::degraded(
                    name,
                    Dimension::Consistency,
                    weight,
                    format!("column '{field}' not found"),
                );
            }
        }
    }

    let height = df.height();
    let mut invalid = 0usize;
    let mut examples = Vec::new();

    for idx in 0..height {
        let resolve = row_resolver(df, &lookup, idx);
        let row_ok = comparisons.iter().all(|comparison| {
            match (resolve(&comparison.field1), resolve(&comparison.field2)) {
                (Some(left), Some(right)) => compare(&left, comparison.operator, &right),
                // Either side missing: the relation cannot be confirmed.
                _ => false,
            }
        });
        if !row_ok {
            invalid += 1;
            if examples.len() < EXAMPLE_CAP {
                let shown: Vec<String> = comparisons
                    .iter()
                    .map(|c| {
                        format!(
                            "{}={} {} {}={}",
                            c.field1,
                            display(resolve(&c.field1)),
                            c.operator.as_str(),
                            c.field2,
                            display(resolve(&c.field2)),
                        )
                    })
                    .collect();
                examples.push(format!("row {idx}: {}", shown.join("; ")));
            }
        }
    }

    finish(name, height, invalid, examples, weight, |ratio| {
        format!(
            "{invalid} row(s) violate field comparisons ({:.1}% consistent)",
            ratio * 100.0
        )
    })
}

fn compare(left: &Value, op: ComparisonOp, right: &Value) -> bool {
    let ordering = match (as_num(left), as_num(right)) {
        (Some(l), Some(r)) => l.partial_cmp(&r),
        _ => match (left, right) {
            (Value::Str(l), Value::Str(r)) => Some(l.cmp(r)),
            _ => None,
        },
    };
    let Some(ordering) = ordering else {
        return false;
    };
    match op {
        ComparisonOp::Eq => ordering == std::cmp::Ordering::Equal,
        ComparisonOp::Ne => ordering != std::cmp::Ordering::Equal,
        ComparisonOp::Lt => ordering == std::cmp::Ordering::Less,
        ComparisonOp::Le => ordering != std::cmp::Ordering::Greater,
        ComparisonOp::Gt => ordering == std::cmp::Ordering::Greater,
        ComparisonOp::Ge => ordering != std::cmp::Ordering::Less,
    }
}

fn as_num(value: &Value) -> Option<f64> {
    match value {
        Value::Num(n) => Some(*n),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Str(s) => s.trim().parse().ok(),
        Value::Null => None,
    }
}

fn value_num(value: &AnyValue<'_>) -> Option<f64> {
    if is_missing_value(value) {
        None
    } else {
        datagate_frame::value_to_f64(value)
    }
}

fn display(value: Option<Value>) -> String {
    match value {
        Some(Value::Num(n)) => n.to_string(),
        Some(Value::Str(s)) => s,
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Null) | None => "<missing>".to_string(),
    }
}

/// Build a per-row identifier resolver over the frame's columns.
fn row_resolver<'a>(
    df: &'a DataFrame,
    lookup: &'a CaseInsensitiveColumns,
    idx: usize,
) -> impl Fn(&str) -> Option<Value> + 'a {
    move |identifier: &str| {
        let actual = lookup.get(identifier)?;
        let series = df.column(actual).ok()?;
        let value = series.get(idx).unwrap_or(AnyValue::Null);
        if is_missing_value(&value) {
            None
        } else {
            Some(value_to_expr_value(&value))
        }
    }
}

fn finish<F>(
    name: &str,
    height: usize,
    invalid: usize,
    examples: Vec<String>,
    weight: f64,
    narrative: F,
) -> RuleResult
where
    F: Fn(f64) -> String,
{
    let ratio = if height == 0 {
        1.0
    } else {
        (height - invalid) as f64 / height as f64
    };
    RuleResult {
        rule: name.to_string(),
        dimension: Dimension::Consistency,
        valid: invalid == 0,
        score: (weight * ratio).clamp(0.0, weight),
        weight,
        narrative: narrative(ratio),
        examples,
        details: details(&[
            ("rows", json!(height)),
            ("invalid_rows", json!(invalid)),
            ("consistency_ratio", json!(ratio)),
        ]),
    }
}
