//! Chat-model collaborators.
//!
//! [`ChatModel`] is the seam to the remote model; [`OpenAiChatClient`] speaks
//! the OpenAI chat-completions protocol. [`LlmSqlGenerator`] and
//! [`NarrativeSummarizer`] build prompts on top of any `ChatModel`.

mod client;
mod generator;
mod narrative;
pub mod prompt;

pub use client::{ChatMessage, ChatModel, OpenAiChatClient};
pub use generator::LlmSqlGenerator;
pub use narrative::NarrativeSummarizer;
