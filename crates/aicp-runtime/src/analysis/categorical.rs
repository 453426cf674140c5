use async_trait::async_trait;
use std::collections::HashMap;

use super::table::{markdown_table, text_column, Align};
use super::{SummaryInput, SummaryKind, Summarizer};
use crate::executor::QueryResult;

/// Value counts for text columns with a small number of distinct values.
#[derive(Debug, Clone, Copy)]
pub struct CategoricalSummarizer {
    max_unique: usize,
}

impl CategoricalSummarizer {
    pub fn new(max_unique: usize) -> Self {
        Self { max_unique }
    }

    pub fn value_counts(&self, result: &QueryResult) -> String {
        if result.rows.is_empty() {
            return "(no categorical summary – no rows)".to_string();
        }

        let mut pieces = Vec::new();
        for (index, name) in result.columns.iter().enumerate() {
            let Some(values) = text_column(result, index) else {
                continue;
            };
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for v in &values {
                *counts.entry(v).or_default() += 1;
            }
            if counts.is_empty() || counts.len() > self.max_unique {
                continue;
            }

            let mut ordered: Vec<(&str, usize)> = counts.into_iter().collect();
            ordered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            let rows: Vec<Vec<String>> = ordered
                .into_iter()
                .map(|(value, count)| vec![value.to_string(), count.to_string()])
                .collect();
            let headers = vec![name.clone(), "count".to_string()];
            pieces.push(format!(
                "Column: {name}\n{}",
                markdown_table(&headers, &[Align::Left, Align::Right], &rows)
            ));
        }

        if pieces.is_empty() {
            "(no small categorical columns)".to_string()
        } else {
            pieces.join("\n\n")
        }
    }
}

#[async_trait]
impl Summarizer for CategoricalSummarizer {
    fn kind(&self) -> SummaryKind {
        SummaryKind::Categorical
    }

    async fn summarize(&self, input: SummaryInput<'_>) -> anyhow::Result<String> {
        Ok(self.value_counts(input.result))
    }
}
