//! The query pipeline.
//!
//! One request is one attempt: `Generating → SafetyChecking → ScopeChecking →
//! Executing → Summarizing → Done`. Rejections stop the run before execution;
//! generation and execution errors fail it; summary errors only degrade it.

use aicp_core::{AccessContext, LimitsConfig};
use aicp_policy::lexical::extract_tables;
use aicp_policy::{
    PolicyBuilder, PolicyError, Rejection, RejectionCategory, TableRef, ValidationOutcome,
    check_statement_safety, enforce_scope,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::analysis::{SummaryInput, SummaryOutcome, Summarizer};
use crate::audit::{AuditOutcome, AuditSink, PipelineEvent, TracingAuditSink};
use crate::executor::{QueryExecutor, QueryResult};
use crate::generator::{GenerationRequest, SqlGenerator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Generating,
    SafetyChecking,
    ScopeChecking,
    Executing,
    Summarizing,
    Done,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generating => "generating",
            Self::SafetyChecking => "safety_checking",
            Self::ScopeChecking => "scope_checking",
            Self::Executing => "executing",
            Self::Summarizing => "summarizing",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a run ended without a result.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A gate refused the candidate SQL. The executor was not called.
    #[error("query rejected: {0}")]
    Rejected(Rejection),

    /// The text generator failed or timed out.
    #[error("SQL generation failed: {0}")]
    Generation(String),

    /// The executor failed (syntax, timeout, connectivity).
    #[error("query execution failed: {0}")]
    Execution(String),

    /// The user's record cannot produce a policy.
    #[error(transparent)]
    Configuration(#[from] PolicyError),
}

impl PipelineError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Rejected(rejection) => rejection.reason.code(),
            Self::Generation(_) => "generation_error",
            Self::Execution(_) => "execution_error",
            Self::Configuration(err) => err.code(),
        }
    }

    /// Stage the run stopped in. Configuration errors occur before generation.
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Self::Rejected(rejection) => Some(match rejection.reason.category() {
                RejectionCategory::Safety => PipelineStage::SafetyChecking,
                RejectionCategory::Scope => PipelineStage::ScopeChecking,
            }),
            Self::Generation(_) => Some(PipelineStage::Generating),
            Self::Execution(_) => Some(PipelineStage::Executing),
            Self::Configuration(_) => None,
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    /// Requested row cap; clamped into the configured bounds.
    #[serde(default)]
    pub max_rows: Option<usize>,
    #[serde(default = "default_include_sql")]
    pub include_sql: bool,
}

fn default_include_sql() -> bool {
    true
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            max_rows: None,
            include_sql: true,
        }
    }

    pub fn max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub question: String,
    /// The validated SQL that was executed.
    pub sql: String,
    /// Tables the statement reads from.
    pub tables: Vec<TableRef>,
    pub result: QueryResult,
    pub summaries: Vec<SummaryOutcome>,
    pub stages: Vec<PipelineStage>,
    pub row_cap: usize,
    #[serde(skip)]
    pub duration: Duration,
}

impl QueryReport {
    pub fn row_count(&self) -> usize {
        self.result.row_count()
    }

    pub fn truncated(&self) -> bool {
        self.result.truncated
    }

    pub fn execution_time_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }
}

/// Sequences generation, validation, execution and summarization for one
/// question at a time. Holds no per-request state.
pub struct QueryPipeline {
    generator: Arc<dyn SqlGenerator>,
    executor: Arc<dyn QueryExecutor>,
    summarizers: Vec<Arc<dyn Summarizer>>,
    audit: Arc<dyn AuditSink>,
    policies: PolicyBuilder,
    limits: LimitsConfig,
    schema_text: String,
}

impl QueryPipeline {
    pub fn new(
        generator: Arc<dyn SqlGenerator>,
        executor: Arc<dyn QueryExecutor>,
        schema_text: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            executor,
            summarizers: Vec::new(),
            audit: Arc::new(TracingAuditSink),
            policies: PolicyBuilder::default(),
            limits: LimitsConfig::default(),
            schema_text: schema_text.into(),
        }
    }

    pub fn with_policy_builder(mut self, policies: PolicyBuilder) -> Self {
        self.policies = policies;
        self
    }

    pub fn with_limits(mut self, limits: LimitsConfig) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Summarizers run in registration order; each sees the earlier outputs.
    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizers.push(summarizer);
        self
    }

    pub fn schema_text(&self) -> &str {
        &self.schema_text
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    pub fn policies(&self) -> &PolicyBuilder {
        &self.policies
    }

    pub async fn run(
        &self,
        ctx: &AccessContext,
        request: &QueryRequest,
    ) -> Result<QueryReport, PipelineError> {
        let started = Instant::now();
        let mut stages = Vec::with_capacity(6);
        let mut candidate = None;

        let outcome = self
            .execute_stages(ctx, request, &mut stages, &mut candidate)
            .await;
        let elapsed = started.elapsed();

        let audit_outcome = match &outcome {
            Ok((result, _)) => AuditOutcome::Executed {
                row_count: result.row_count(),
                truncated: result.truncated,
            },
            Err(PipelineError::Rejected(rejection)) => AuditOutcome::Rejected {
                reason: rejection.reason.code().to_string(),
                message: rejection.message.clone(),
            },
            Err(err) => AuditOutcome::Failed {
                stage: err
                    .stage()
                    .map_or("policy", |stage| stage.as_str())
                    .to_string(),
                message: err.to_string(),
            },
        };
        self.audit.record(
            PipelineEvent::new(
                ctx.user_id,
                ctx.role,
                ctx.scope_id(),
                &request.question,
                audit_outcome,
            )
            .sql(candidate.as_deref())
            .duration_ms(elapsed.as_millis() as u64),
        );

        let (result, row_cap) = outcome?;
        let sql = candidate.unwrap_or_default();

        stages.push(PipelineStage::Summarizing);
        let summaries = self.summarize(&request.question, &sql, &result).await;
        stages.push(PipelineStage::Done);

        Ok(QueryReport {
            question: request.question.clone(),
            tables: extract_tables(&sql).into_iter().collect(),
            sql,
            result,
            summaries,
            stages,
            row_cap,
            duration: started.elapsed(),
        })
    }

    /// Generation through execution. `candidate` holds the latest SQL text so
    /// audit events can include it even when a later stage fails.
    async fn execute_stages(
        &self,
        ctx: &AccessContext,
        request: &QueryRequest,
        stages: &mut Vec<PipelineStage>,
        candidate: &mut Option<String>,
    ) -> Result<(QueryResult, usize), PipelineError> {
        // Built fresh per request; never cached across users.
        let policy = self.policies.build(ctx)?;

        stages.push(PipelineStage::Generating);
        let raw = self
            .generator
            .generate(GenerationRequest {
                schema_text: &self.schema_text,
                policy_hint: policy.scope_filter_hint(),
                role: ctx.role,
                question: &request.question,
            })
            .await
            .map_err(|err| {
                tracing::warn!(user_id = ctx.user_id, error = %err, "SQL generation failed");
                PipelineError::Generation(format!("{err:#}"))
            })?;
        *candidate = Some(raw.clone());

        stages.push(PipelineStage::SafetyChecking);
        let cleaned = accepted(check_statement_safety(&raw), ctx)?;
        *candidate = Some(cleaned.clone());

        stages.push(PipelineStage::ScopeChecking);
        let sql = accepted(enforce_scope(&cleaned, &policy), ctx)?;

        stages.push(PipelineStage::Executing);
        let row_cap = self.limits.effective_row_cap(request.max_rows);
        let mut result = self.executor.execute(&sql, row_cap).await.map_err(|err| {
            tracing::warn!(user_id = ctx.user_id, error = %err, "query execution failed");
            PipelineError::Execution(format!("{err:#}"))
        })?;
        result.enforce_cap(row_cap);

        tracing::info!(
            user_id = ctx.user_id,
            role = %ctx.role,
            row_count = result.row_count(),
            truncated = result.truncated,
            "query executed"
        );
        Ok((result, row_cap))
    }

    async fn summarize(&self, question: &str, sql: &str, result: &QueryResult) -> Vec<SummaryOutcome> {
        let mut outcomes: Vec<SummaryOutcome> = Vec::with_capacity(self.summarizers.len());
        for summarizer in &self.summarizers {
            let input = SummaryInput {
                question,
                sql,
                result,
                previous: &outcomes,
            };
            let outcome = match summarizer.summarize(input).await {
                Ok(text) => SummaryOutcome::ready(summarizer.kind(), text),
                Err(err) => {
                    tracing::warn!(kind = %summarizer.kind(), error = %err, "summary degraded");
                    SummaryOutcome::degraded(summarizer.kind(), format!("{err:#}"))
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}

fn accepted(outcome: ValidationOutcome, ctx: &AccessContext) -> Result<String, PipelineError> {
    outcome.into_result().map_err(|rejection| {
        tracing::info!(
            user_id = ctx.user_id,
            role = %ctx.role,
            reason = %rejection.reason,
            "candidate SQL rejected"
        );
        PipelineError::Rejected(rejection)
    })
}
