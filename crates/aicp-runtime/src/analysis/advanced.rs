use async_trait::async_trait;

use super::stats;
use super::table::numeric_columns;
use super::{SummaryInput, SummaryKind, Summarizer};
use crate::executor::QueryResult;

const OUTLIER_Z: f64 = 2.5;
const STRONG_CORRELATION: f64 = 0.30;
const MAX_CORRELATIONS: usize = 5;

/// Primary-metric profile: median/IQR, three quantile tiers, z-score outliers
/// and the strongest pairwise correlations.
#[derive(Debug, Default, Clone, Copy)]
pub struct AdvancedSummarizer;

fn is_id_like(column: &str) -> bool {
    let lower = column.to_lowercase();
    lower.contains("id") || lower.ends_with("_id")
}

impl AdvancedSummarizer {
    pub fn analyze(result: &QueryResult) -> String {
        if result.rows.is_empty() {
            return "No advanced analysis: result has no rows.".to_string();
        }
        let numeric = numeric_columns(result);
        if numeric.is_empty() {
            return "No advanced analysis: result has no numeric columns.".to_string();
        }

        let mut lines = Vec::new();
        let (primary_index, primary_values) = numeric
            .iter()
            .find(|(i, _)| !is_id_like(&result.columns[*i]))
            .unwrap_or(&numeric[0]);
        let metric = &result.columns[*primary_index];
        lines.push(format!("Primary metric used for deeper analysis: {metric}"));

        if stats::distinct_count(primary_values) > 1 {
            profile_metric(metric, primary_values, &mut lines);
        }

        if numeric.len() >= 2 {
            correlations(result, &numeric, &mut lines);
        } else {
            lines.push("Correlation analysis skipped: only one numeric column present.".to_string());
        }

        lines.join("\n")
    }
}

fn profile_metric(metric: &str, values: &[f64], lines: &mut Vec<String>) {
    let sorted = stats::sorted(values);
    let q = |p: f64| stats::quantile_sorted(&sorted, p).unwrap_or(f64::NAN);
    let (min, max) = (sorted[0], sorted[sorted.len() - 1]);
    lines.push(format!(
        "{metric}: median={:.2}, IQR=[{:.2}, {:.2}], min={min:.2}, max={max:.2}.",
        q(0.5),
        q(0.25),
        q(0.75),
    ));

    let edges = [q(0.0), q(1.0 / 3.0), q(2.0 / 3.0), q(1.0)];
    if edges.windows(2).any(|w| w[0] >= w[1]) {
        lines.push("Not enough distinct values to build quantile-based tiers.".to_string());
    } else {
        let mut counts = [0usize; 3];
        for v in values {
            let tier = if *v <= edges[1] {
                0
            } else if *v <= edges[2] {
                1
            } else {
                2
            };
            counts[tier] += 1;
        }
        lines.push("Quantile-based tiers for primary metric:".to_string());
        for (label, count) in ["low", "medium", "high"].iter().zip(counts) {
            let pct = count as f64 * 100.0 / values.len() as f64;
            lines.push(format!("  - {label}: {count} rows ({pct:.1}%)"));
        }
    }

    match (stats::mean(values), stats::std_dev(values)) {
        (Some(mean), Some(std)) if std > 0.0 => {
            let outliers = values
                .iter()
                .filter(|v| ((*v - mean) / std).abs() > OUTLIER_Z)
                .count();
            if outliers > 0 {
                let frac = outliers as f64 * 100.0 / values.len() as f64;
                lines.push(format!(
                    "Detected {outliers} potential outliers (> 2.5σ) for {metric}, representing {frac:.1}% of rows."
                ));
            } else {
                lines.push(format!("No strong outliers (> 2.5σ) detected for {metric}."));
            }
        }
        _ => lines.push(format!(
            "Standard deviation is zero or undefined for {metric}."
        )),
    }
}

fn correlations(result: &QueryResult, numeric: &[(usize, Vec<f64>)], lines: &mut Vec<String>) {
    let mut strong = Vec::new();
    for (a_pos, (a, _)) in numeric.iter().enumerate() {
        for (b, _) in &numeric[a_pos + 1..] {
            let pairs: Vec<(f64, f64)> = result
                .rows
                .iter()
                .filter_map(|row| Some((row.get(*a)?.as_f64()?, row.get(*b)?.as_f64()?)))
                .collect();
            if let Some(r) = stats::pearson(&pairs)
                && r.abs() >= STRONG_CORRELATION
            {
                strong.push((*a, *b, r));
            }
        }
    }

    if strong.is_empty() {
        lines.push("No strong numeric correlations (|r| ≥ 0.30) found.".to_string());
        return;
    }
    strong.sort_by(|x, y| y.2.abs().total_cmp(&x.2.abs()));
    lines.push("Top numeric correlations (|r| ≥ 0.30):".to_string());
    for (a, b, r) in strong.into_iter().take(MAX_CORRELATIONS) {
        lines.push(format!(
            "  - {} vs {}: r = {r:.2}",
            result.columns[a], result.columns[b]
        ));
    }
}

#[async_trait]
impl Summarizer for AdvancedSummarizer {
    fn kind(&self) -> SummaryKind {
        SummaryKind::Advanced
    }

    async fn summarize(&self, input: SummaryInput<'_>) -> anyhow::Result<String> {
        Ok(Self::analyze(input.result))
    }
}
