use aicp_core::Role;
use async_trait::async_trait;

/// Everything the text generator is told about one question.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    /// Description of the tables and columns the SQL may use.
    pub schema_text: &'a str,
    /// The policy's scope hint, steering the generator toward compliant SQL.
    pub policy_hint: &'a str,
    pub role: Role,
    pub question: &'a str,
}

/// Opaque natural-language-to-SQL service.
///
/// The returned string is untrusted candidate SQL; it may carry code fences
/// or anything else and is validated before use.
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest<'_>) -> anyhow::Result<String>;
}
