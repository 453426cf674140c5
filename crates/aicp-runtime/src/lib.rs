//! Query pipeline runtime.
//!
//! Sequences one natural-language question through
//! `Generating → SafetyChecking → ScopeChecking → Executing → Summarizing → Done`.
//! Generation, execution and summarization are external collaborators behind
//! traits; this crate owns the ordering and the failure semantics.

pub mod access;
pub mod analysis;
pub mod audit;
pub mod executor;
pub mod generator;
pub mod orchestrator;
pub mod session;

pub use access::{AccessResolver, AuthError, StaticAccessResolver};
pub use analysis::{
    AdvancedSummarizer, CategoricalSummarizer, NumericSummarizer, SummaryInput, SummaryKind,
    SummaryOutcome, SummaryStatus, Summarizer,
};
pub use audit::{AuditOutcome, AuditSink, MemoryAuditSink, PipelineEvent, TracingAuditSink};
pub use executor::{QueryExecutor, QueryResult};
pub use generator::{GenerationRequest, SqlGenerator};
pub use orchestrator::{PipelineError, PipelineStage, QueryPipeline, QueryReport, QueryRequest};
pub use session::{Session, SessionError, SessionStore};
