use aicp_runtime::analysis::table::preview_markdown;
use aicp_runtime::{SummaryInput, SummaryKind, Summarizer};
use async_trait::async_trait;
use std::sync::Arc;

use crate::client::{ChatMessage, ChatModel};
use crate::prompt::{self, NarrativeContext};

const PREVIEW_ROWS: usize = 10;

/// Plain-language analysis of a result, written by the chat model from the
/// preview and the summaries computed before it.
pub struct NarrativeSummarizer {
    model: Arc<dyn ChatModel>,
}

impl NarrativeSummarizer {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Summarizer for NarrativeSummarizer {
    fn kind(&self) -> SummaryKind {
        SummaryKind::Narrative
    }

    async fn summarize(&self, input: SummaryInput<'_>) -> anyhow::Result<String> {
        let missing = "(not computed)";
        let preview = preview_markdown(input.result, PREVIEW_ROWS);
        let user = prompt::narrative_user_prompt(&NarrativeContext {
            question: input.question,
            sql: input.sql,
            preview: &preview,
            numeric: input.previous_text(SummaryKind::Numeric).unwrap_or(missing),
            categorical: input
                .previous_text(SummaryKind::Categorical)
                .unwrap_or(missing),
            advanced: input.previous_text(SummaryKind::Advanced).unwrap_or(missing),
        });
        let messages = [
            ChatMessage::system(prompt::NARRATIVE_SYSTEM_PROMPT),
            ChatMessage::user(user),
        ];
        self.model.complete(&messages).await
    }
}
