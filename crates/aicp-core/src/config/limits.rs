//! Result and prompt size limits.

use serde::{Deserialize, Serialize};

use crate::HARD_MAX_RESULT_ROWS;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Default row cap for a query. Never above [`HARD_MAX_RESULT_ROWS`].
    #[serde(default = "default_max_result_rows")]
    pub max_result_rows: usize,

    /// Rows included in the response preview.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,

    /// Schema descriptions longer than this are truncated before prompting.
    #[serde(default = "default_max_schema_chars")]
    pub max_schema_chars: usize,

    /// Text columns with at most this many distinct values get value counts.
    #[serde(default = "default_max_category_unique")]
    pub max_category_unique: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_result_rows: default_max_result_rows(),
            preview_rows: default_preview_rows(),
            max_schema_chars: default_max_schema_chars(),
            max_category_unique: default_max_category_unique(),
        }
    }
}

impl LimitsConfig {
    /// Clamp a caller-requested row cap into `[1, max_result_rows]`.
    pub fn effective_row_cap(&self, requested: Option<usize>) -> usize {
        let ceiling = self.max_result_rows.clamp(1, HARD_MAX_RESULT_ROWS);
        requested.unwrap_or(ceiling).clamp(1, ceiling)
    }
}

fn default_max_result_rows() -> usize {
    HARD_MAX_RESULT_ROWS
}

fn default_preview_rows() -> usize {
    20
}

fn default_max_schema_chars() -> usize {
    4500
}

fn default_max_category_unique() -> usize {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_cap_defaults_and_clamps() {
        let limits = LimitsConfig::default();
        assert_eq!(limits.effective_row_cap(None), 1000);
        assert_eq!(limits.effective_row_cap(Some(50)), 50);
        assert_eq!(limits.effective_row_cap(Some(50_000)), 1000);
        assert_eq!(limits.effective_row_cap(Some(0)), 1);
    }

    #[test]
    fn configured_cap_never_exceeds_hard_bound() {
        let limits = LimitsConfig {
            max_result_rows: 10_000,
            ..Default::default()
        };
        assert_eq!(limits.effective_row_cap(None), HARD_MAX_RESULT_ROWS);
    }
}
