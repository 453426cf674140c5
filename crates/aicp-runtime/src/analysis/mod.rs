//! Post-execution summaries.
//!
//! Summarizers run after a successful execution and never fail the request:
//! an error becomes a degraded outcome carrying placeholder text.

mod advanced;
mod categorical;
mod numeric;
pub mod stats;
pub mod table;

pub use advanced::AdvancedSummarizer;
pub use categorical::CategoricalSummarizer;
pub use numeric::NumericSummarizer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::executor::QueryResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryKind {
    Numeric,
    Categorical,
    Advanced,
    Narrative,
}

impl SummaryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
            Self::Advanced => "advanced",
            Self::Narrative => "narrative",
        }
    }

    /// Text shown in place of a summary that could not be produced.
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Narrative => "AI summary unavailable.",
            _ => "(summary unavailable)",
        }
    }
}

impl std::fmt::Display for SummaryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStatus {
    Ready,
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryOutcome {
    pub kind: SummaryKind,
    pub status: SummaryStatus,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SummaryOutcome {
    pub fn ready(kind: SummaryKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            status: SummaryStatus::Ready,
            text: text.into(),
            error: None,
        }
    }

    pub fn degraded(kind: SummaryKind, error: impl Into<String>) -> Self {
        Self {
            kind,
            status: SummaryStatus::Degraded,
            text: kind.placeholder().to_string(),
            error: Some(error.into()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.status == SummaryStatus::Degraded
    }
}

/// What a summarizer sees: the question, the executed SQL, the result and
/// every summary produced before it in the same run.
#[derive(Debug, Clone, Copy)]
pub struct SummaryInput<'a> {
    pub question: &'a str,
    pub sql: &'a str,
    pub result: &'a QueryResult,
    pub previous: &'a [SummaryOutcome],
}

impl SummaryInput<'_> {
    /// Text of an earlier summary of `kind`, if one ran.
    pub fn previous_text(&self, kind: SummaryKind) -> Option<&str> {
        self.previous
            .iter()
            .find(|o| o.kind == kind)
            .map(|o| o.text.as_str())
    }
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    fn kind(&self) -> SummaryKind;

    async fn summarize(&self, input: SummaryInput<'_>) -> anyhow::Result<String>;
}
