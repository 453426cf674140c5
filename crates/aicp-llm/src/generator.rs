use aicp_runtime::{GenerationRequest, SqlGenerator};
use async_trait::async_trait;
use std::sync::Arc;

use crate::client::{ChatMessage, ChatModel};
use crate::prompt;

/// Turns questions into candidate SQL through a chat model.
///
/// The reply is returned as-is; fence stripping and every safety check happen
/// in the pipeline's gates.
pub struct LlmSqlGenerator {
    model: Arc<dyn ChatModel>,
    schema: String,
}

impl LlmSqlGenerator {
    pub fn new(model: Arc<dyn ChatModel>, schema: impl Into<String>) -> Self {
        Self {
            model,
            schema: schema.into(),
        }
    }
}

#[async_trait]
impl SqlGenerator for LlmSqlGenerator {
    async fn generate(&self, request: GenerationRequest<'_>) -> anyhow::Result<String> {
        let messages = [
            ChatMessage::system(prompt::sql_system_prompt(&self.schema, request.policy_hint)),
            ChatMessage::user(prompt::sql_user_prompt(
                request.schema_text,
                request.question,
                request.role,
            )),
        ];
        let sql = self.model.complete(&messages).await?;
        tracing::debug!(role = %request.role, chars = sql.len(), "candidate SQL generated");
        Ok(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aicp_core::Role;
    use std::sync::Mutex;

    struct EchoModel {
        seen: Mutex<Vec<ChatMessage>>,
    }

    #[async_trait]
    impl ChatModel for EchoModel {
        async fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
            self.seen.lock().unwrap().extend_from_slice(messages);
            Ok("```sql\nSELECT 1\n```".to_string())
        }
    }

    #[tokio::test]
    async fn passes_hint_and_question_through() {
        let model = Arc::new(EchoModel {
            seen: Mutex::new(Vec::new()),
        });
        let generator = LlmSqlGenerator::new(model.clone(), "dbo");

        let sql = generator
            .generate(GenerationRequest {
                schema_text: "Table dbo.patients(id int)",
                policy_hint: "HINT-TEXT",
                role: Role::Admin,
                question: "How many patients?",
            })
            .await
            .unwrap();

        // Returned untouched; the gates strip fences.
        assert_eq!(sql, "```sql\nSELECT 1\n```");
        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].content.contains("HINT-TEXT"));
        assert!(seen[1].content.contains("User question: How many patients?"));
    }
}
