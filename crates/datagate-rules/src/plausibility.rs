//! Plausibility rules: are the values statistically believable?

use std::collections::BTreeMap;

use polars::prelude::DataFrame;
use serde_json::json;

use datagate_frame::{non_null_strings, numeric_values};
use datagate_model::{Dimension, RuleResult};
use datagate_standards::catalog::{Distribution, OutlierMethod};

use crate::engine::{details, EXAMPLE_CAP};
use crate::stats;

/// Flag statistical outliers by z-score, modified z-score, or IQR fences.
pub fn outlier_detection(
    df: &DataFrame,
    column: &str,
    method: OutlierMethod,
    threshold: f64,
    multiplier: f64,
    exclude_outliers: bool,
    name: &str,
    weight: f64,
) -> RuleResult {
    let values = numeric_values(df, column);
    if values.len() < 3 {
        return RuleResult::degraded(
            name,
            Dimension::Plausibility,
            weight,
            format!("{column}: too few numeric values for outlier detection"),
        );
    }

    let mut sorted = values.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let is_outlier: Box<dyn Fn(f64) -> bool> = match method {
        OutlierMethod::Zscore => {
            let mean = stats::mean(&values);
            let std_dev = stats::std_dev(&values);
            if std_dev == 0.0 {
                Box::new(|_| false)
            } else {
                Box::new(move |x| ((x - mean) / std_dev).abs() > threshold)
            }
        }
        OutlierMethod::ModifiedZscore => {
            let median = stats::median(&sorted);
            let mad = stats::mad(&sorted, median);
            if mad == 0.0 {
                Box::new(|_| false)
            } else {
                Box::new(move |x| (0.6745 * (x - median) / mad).abs() > threshold)
            }
        }
        OutlierMethod::Iqr => {
            let q1 = stats::quantile(&sorted, 0.25);
            let q3 = stats::quantile(&sorted, 0.75);
            let iqr = q3 - q1;
            let lower = q1 - multiplier * iqr;
            let upper = q3 + multiplier * iqr;
            Box::new(move |x| x < lower || x > upper)
        }
    };

    let mut outliers = 0usize;
    let mut examples = Vec::new();
    for &x in &values {
        if is_outlier(x) {
            outliers += 1;
            if examples.len() < EXAMPLE_CAP {
                examples.push(format!("{x}"));
            }
        }
    }

    let plausibility_ratio = 1.0 - outliers as f64 / values.len() as f64;
    let (valid, score) = if exclude_outliers {
        (outliers == 0, (weight * plausibility_ratio).clamp(0.0, weight))
    } else {
        // Report only: outliers noted in details, score unaffected.
        (true, weight)
    };

    RuleResult {
        rule: name.to_string(),
        dimension: Dimension::Plausibility,
        valid,
        score,
        weight,
        narrative: format!(
            "{column}: {outliers} outlier(s) of {} values ({method:?})",
            values.len()
        ),
        examples,
        details: details(&[
            ("outlier_count", json!(outliers)),
            ("checked", json!(values.len())),
            ("plausibility_ratio", json!(plausibility_ratio)),
        ]),
    }
}

/// Goodness-of-fit test against a configured theoretical distribution.
pub fn value_distribution(
    df: &DataFrame,
    column: &str,
    distribution: &Distribution,
    p_threshold: f64,
    name: &str,
    weight: f64,
) -> RuleResult {
    let (statistic, p_value, test) = match distribution {
        Distribution::Normal { mean, std_dev } => {
            let mut values = numeric_values(df, column);
            if values.len() < 5 || *std_dev <= 0.0 {
                return RuleResult::degraded(
                    name,
                    Dimension::Plausibility,
                    weight,
                    format!("{column}: insufficient data for a distribution test"),
                );
            }
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let (mean, std_dev) = (*mean, *std_dev);
            let (d, p) = stats::ks_test_one_sample(&values, |x| {
                stats::standard_normal_cdf((x - mean) / std_dev)
            });
            (d, p, "ks")
        }
        Distribution::Uniform { min, max } => {
            let mut values = numeric_values(df, column);
            if values.len() < 5 || max <= min {
                return RuleResult::degraded(
                    name,
                    Dimension::Plausibility,
                    weight,
                    format!("{column}: insufficient data for a distribution test"),
                );
            }
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let (min, max) = (*min, *max);
            let (d, p) = stats::ks_test_one_sample(&values, |x| {
                ((x - min) / (max - min)).clamp(0.0, 1.0)
            });
            (d, p, "ks")
        }
        Distribution::Categorical { probabilities } => {
            let observed_values = non_null_strings(df, column);
            if observed_values.is_empty() {
                return RuleResult::degraded(
                    name,
                    Dimension::Plausibility,
                    weight,
                    format!("{column}: no values for a distribution test"),
                );
            }
            let n = observed_values.len() as f64;
            let mut counts: BTreeMap<&str, f64> = BTreeMap::new();
            for value in &observed_values {
                *counts.entry(value.as_str()).or_insert(0.0) += 1.0;
            }
            let cells: Vec<(f64, f64)> = probabilities
                .iter()
                .map(|(value, probability)| {
                    (
                        counts.get(value.as_str()).copied().unwrap_or(0.0),
                        probability * n,
                    )
                })
                .collect();
            let (chi_sq, degrees) = stats::chi_squared_statistic(&cells);
            (chi_sq, stats::chi_squared_p_value(chi_sq, degrees), "chi_squared")
        }
    };

    let valid = p_value >= p_threshold;
    RuleResult {
        rule: name.to_string(),
        dimension: Dimension::Plausibility,
        valid,
        score: if valid { weight } else { 0.0 },
        weight,
        narrative: format!(
            "{column}: {test} p-value {p_value:.4} vs threshold {p_threshold}"
        ),
        examples: Vec::new(),
        details: details(&[
            ("test", json!(test)),
            ("statistic", json!(statistic)),
            ("p_value", json!(p_value)),
            ("p_threshold", json!(p_threshold)),
        ]),
    }
}

/// Values inside `[min, max]`, optionally on a log scale or against
/// quantile-derived bounds; min and max violations counted separately.
pub fn range_check(
    df: &DataFrame,
    column: &str,
    min: Option<f64>,
    max: Option<f64>,
    log_scale: bool,
    quantile_bounds: Option<(f64, f64)>,
    name: &str,
    weight: f64,
) -> RuleResult {
    let values = numeric_values(df, column);
    if values.is_empty() {
        return RuleResult::degraded(
            name,
            Dimension::Plausibility,
            weight,
            format!("{column}: no numeric values to range-check"),
        );
    }

    let (lower, upper) = if let Some((lower_q, upper_q)) = quantile_bounds {
        let mut sorted = values.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        (
            Some(stats::quantile(&sorted, lower_q)),
            Some(stats::quantile(&sorted, upper_q)),
        )
    } else {
        (min, max)
    };

    let transform = |x: f64| -> Option<f64> {
        if log_scale {
            (x > 0.0).then(|| x.ln())
        } else {
            Some(x)
        }
    };
    let lower = lower.and_then(transform);
    let upper = upper.and_then(transform);

    let mut min_violations = 0usize;
    let mut max_violations = 0usize;
    let mut examples = Vec::new();
    for &x in &values {
        let Some(probe) = transform(x) else {
            // Non-positive value on a log scale counts against the floor.
            min_violations += 1;
            if examples.len() < EXAMPLE_CAP {
                examples.push(format!("{x}"));
            }
            continue;
        };
        let below = lower.is_some_and(|lo| probe < lo);
        let above = upper.is_some_and(|hi| probe > hi);
        if below {
            min_violations += 1;
        }
        if above {
            max_violations += 1;
        }
        if (below || above) && examples.len() < EXAMPLE_CAP {
            examples.push(format!("{x}"));
        }
    }

    let violations = min_violations + max_violations;
    let plausibility_ratio = (1.0 - violations as f64 / values.len() as f64).max(0.0);
    RuleResult {
        rule: name.to_string(),
        dimension: Dimension::Plausibility,
        valid: violations == 0,
        score: (weight * plausibility_ratio).clamp(0.0, weight),
        weight,
        narrative: format!(
            "{column}: {min_violations} below-range, {max_violations} above-range of {}",
            values.len()
        ),
        examples,
        details: details(&[
            ("min_violations", json!(min_violations)),
            ("max_violations", json!(max_violations)),
            ("checked", json!(values.len())),
            ("log_scale", json!(log_scale)),
        ]),
    }
}

/// Relative-frequency checks per distinct value plus a distinct-count cap.
pub fn pattern_frequency(
    df: &DataFrame,
    column: &str,
    min_frequency: Option<f64>,
    max_frequency: Option<f64>,
    expected_frequencies: &BTreeMap<String, f64>,
    tolerance: f64,
    max_distinct: Option<usize>,
    name: &str,
    weight: f64,
) -> RuleResult {
    let observed_values = non_null_strings(df, column);
    if observed_values.is_empty() {
        return RuleResult::degraded(
            name,
            Dimension::Plausibility,
            weight,
            format!("{column}: no values to profile"),
        );
    }

    let n = observed_values.len() as f64;
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for value in observed_values {
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut flagged = 0usize;
    let mut examples = Vec::new();
    for (value, count) in &counts {
        let frequency = *count as f64 / n;
        let mut bad = min_frequency.is_some_and(|min| frequency < min)
            || max_frequency.is_some_and(|max| frequency > max);
        if let Some(expected) = expected_frequencies.get(value) {
            if (frequency - expected).abs() > tolerance {
                bad = true;
            }
        }
        if bad {
            flagged += 1;
            if examples.len() < EXAMPLE_CAP {
                examples.push(format!("{value}: {:.1}%", frequency * 100.0));
            }
        }
    }

    let distinct = counts.len();
    let too_many_distinct = max_distinct.is_some_and(|cap| distinct > cap);
    let ratio = if distinct == 0 {
        1.0
    } else {
        (distinct - flagged) as f64 / distinct as f64
    };
    let ratio = if too_many_distinct { 0.0 } else { ratio };

    RuleResult {
        rule: name.to_string(),
        dimension: Dimension::Plausibility,
        valid: flagged == 0 && !too_many_distinct,
        score: (weight * ratio).clamp(0.0, weight),
        weight,
        narrative: if too_many_distinct {
            format!(
                "{column}: {distinct} distinct values exceed the cap of {}",
                max_distinct.unwrap_or(0)
            )
        } else {
            format!("{column}: {flagged} of {distinct} distinct values outside frequency bounds")
        },
        examples,
        details: details(&[
            ("distinct", json!(distinct)),
            ("flagged", json!(flagged)),
            ("too_many_distinct", json!(too_many_distinct)),
        ]),
    }
}
