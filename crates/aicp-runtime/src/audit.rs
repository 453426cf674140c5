//! Pipeline audit events.
//!
//! Every run emits exactly one event: executed, rejected or failed. Sinks
//! must not fail the request, so `record` returns nothing.

use aicp_core::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use uuid::Uuid;

/// Terminal outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AuditOutcome {
    Executed { row_count: usize, truncated: bool },
    Rejected { reason: String, message: String },
    Failed { stage: String, message: String },
}

impl std::fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Executed { .. } => write!(f, "EXECUTED"),
            Self::Rejected { .. } => write!(f, "REJECTED"),
            Self::Failed { .. } => write!(f, "FAILED"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub user_id: i64,
    pub role: Role,
    /// The doctor or pharmacy id the run was scoped to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_id: Option<i64>,
    pub question: String,
    /// Candidate SQL, once generation succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(flatten)]
    pub outcome: AuditOutcome,
    pub duration_ms: u64,
}

impl PipelineEvent {
    pub fn new(
        user_id: i64,
        role: Role,
        scope_id: Option<i64>,
        question: impl Into<String>,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            user_id,
            role,
            scope_id,
            question: question.into(),
            sql: None,
            outcome,
            duration_ms: 0,
        }
    }

    pub fn sql(mut self, sql: Option<&str>) -> Self {
        self.sql = sql.map(str::to_string);
        self
    }

    pub fn duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = ms;
        self
    }
}

pub trait AuditSink: Send + Sync {
    fn record(&self, event: PipelineEvent);
}

/// Writes events as structured `tracing` records under the `aicp::audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: PipelineEvent) {
        match &event.outcome {
            AuditOutcome::Executed {
                row_count,
                truncated,
            } => tracing::info!(
                target: "aicp::audit",
                event_id = %event.event_id,
                user_id = event.user_id,
                role = %event.role,
                scope_id = ?event.scope_id,
                sql = event.sql.as_deref().unwrap_or(""),
                row_count,
                truncated,
                duration_ms = event.duration_ms,
                "query executed"
            ),
            AuditOutcome::Rejected { reason, message } => tracing::warn!(
                target: "aicp::audit",
                event_id = %event.event_id,
                user_id = event.user_id,
                role = %event.role,
                scope_id = ?event.scope_id,
                sql = event.sql.as_deref().unwrap_or(""),
                reason = %reason,
                message = %message,
                duration_ms = event.duration_ms,
                "query rejected"
            ),
            AuditOutcome::Failed { stage, message } => tracing::error!(
                target: "aicp::audit",
                event_id = %event.event_id,
                user_id = event.user_id,
                role = %event.role,
                stage = %stage,
                message = %message,
                duration_ms = event.duration_ms,
                "query failed"
            ),
        }
    }
}

/// Keeps events in memory. Used by tests and the CLI `ask` command.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: PipelineEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}
