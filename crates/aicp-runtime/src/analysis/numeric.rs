use async_trait::async_trait;

use super::stats::{self, format_number};
use super::table::{numeric_columns, Align, markdown_table};
use super::{SummaryInput, SummaryKind, Summarizer};
use crate::executor::QueryResult;

/// Describe-style table (count, mean, std, quartiles) for numeric columns.
#[derive(Debug, Default, Clone, Copy)]
pub struct NumericSummarizer;

impl NumericSummarizer {
    pub fn describe(result: &QueryResult) -> String {
        if result.rows.is_empty() {
            return "(no numeric summary – no rows)".to_string();
        }
        let columns = numeric_columns(result);
        if columns.is_empty() {
            return "(no numeric columns)".to_string();
        }

        let headers: Vec<String> = ["", "count", "mean", "std", "min", "25%", "50%", "75%", "max"]
            .iter()
            .map(|h| h.to_string())
            .collect();
        let mut align = vec![Align::Right; headers.len()];
        align[0] = Align::Left;

        let rows: Vec<Vec<String>> = columns
            .iter()
            .map(|(index, values)| {
                let sorted = stats::sorted(values);
                let q = |p: f64| stats::quantile_sorted(&sorted, p).unwrap_or(f64::NAN);
                vec![
                    result.columns[*index].clone(),
                    values.len().to_string(),
                    format_number(stats::mean(values).unwrap_or(f64::NAN)),
                    format_number(stats::std_dev(values).unwrap_or(f64::NAN)),
                    format_number(q(0.0)),
                    format_number(q(0.25)),
                    format_number(q(0.5)),
                    format_number(q(0.75)),
                    format_number(q(1.0)),
                ]
            })
            .collect();

        markdown_table(&headers, &align, &rows)
    }
}

#[async_trait]
impl Summarizer for NumericSummarizer {
    fn kind(&self) -> SummaryKind {
        SummaryKind::Numeric
    }

    async fn summarize(&self, input: SummaryInput<'_>) -> anyhow::Result<String> {
        Ok(Self::describe(input.result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn describes_numeric_columns_only() {
        let result = QueryResult::new(
            vec!["sex".into(), "age".into()],
            vec![
                vec![json!("F"), json!(10)],
                vec![json!("M"), json!(20)],
                vec![json!("F"), json!(30)],
                vec![json!("M"), json!(40)],
            ],
        );
        let table = NumericSummarizer::describe(&result);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "| age | 4 | 25 | 12.9099 | 10 | 17.5 | 25 | 32.5 | 40 |");
    }

    #[test]
    fn placeholders_for_empty_and_text_only() {
        assert_eq!(
            NumericSummarizer::describe(&QueryResult::new(vec!["a".into()], vec![])),
            "(no numeric summary – no rows)"
        );
        let text_only = QueryResult::new(vec!["a".into()], vec![vec![json!("x")]]);
        assert_eq!(NumericSummarizer::describe(&text_only), "(no numeric columns)");
    }
}
