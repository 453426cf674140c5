//! Shared application state.

use aicp_core::ServerConfig;
use aicp_runtime::{AccessResolver, QueryPipeline, SessionStore};
use async_trait::async_trait;
use std::sync::Arc;

/// Readiness check for the backing database.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn database_ok(&self) -> bool;
}

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pipeline: Arc<QueryPipeline>,
    resolver: Arc<dyn AccessResolver>,
    health: Arc<dyn HealthCheck>,
    sessions: SessionStore,
    server: ServerConfig,
}

impl AppState {
    pub fn new(
        pipeline: Arc<QueryPipeline>,
        resolver: Arc<dyn AccessResolver>,
        health: Arc<dyn HealthCheck>,
        server: ServerConfig,
    ) -> Self {
        let sessions = SessionStore::with_ttl_hours(server.session_ttl_hours);
        Self {
            inner: Arc::new(AppStateInner {
                pipeline,
                resolver,
                health,
                sessions,
                server,
            }),
        }
    }

    pub fn pipeline(&self) -> &QueryPipeline {
        &self.inner.pipeline
    }

    pub fn resolver(&self) -> &dyn AccessResolver {
        self.inner.resolver.as_ref()
    }

    pub fn health(&self) -> &dyn HealthCheck {
        self.inner.health.as_ref()
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    pub fn server_config(&self) -> &ServerConfig {
        &self.inner.server
    }
}
