//! Wiring of production collaborators from configuration.

use aicp_adapter_pg::{PgAccessResolver, PgExecutor, describe_schema};
use aicp_core::PortalConfig;
use aicp_llm::{ChatModel, LlmSqlGenerator, NarrativeSummarizer, OpenAiChatClient};
use aicp_policy::PolicyBuilder;
use aicp_runtime::{
    AccessResolver, AdvancedSummarizer, CategoricalSummarizer, NumericSummarizer, QueryPipeline,
};
use async_trait::async_trait;
use std::sync::Arc;

use crate::state::{AppState, HealthCheck};

/// Everything a front end needs to serve questions.
pub struct Services {
    pub pipeline: Arc<QueryPipeline>,
    pub resolver: Arc<dyn AccessResolver>,
    pub health: Arc<dyn HealthCheck>,
}

impl Services {
    pub fn into_state(self, config: &PortalConfig) -> AppState {
        AppState::new(self.pipeline, self.resolver, self.health, config.server.clone())
    }
}

struct DatabaseHealth(Arc<PgExecutor>);

#[async_trait]
impl HealthCheck for DatabaseHealth {
    async fn database_ok(&self) -> bool {
        match self.0.ping().await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "database health check failed");
                false
            }
        }
    }
}

/// Connect to the database and chat model, describe the schema once, and
/// assemble the pipeline with every summarizer.
pub async fn connect_services(config: &PortalConfig) -> anyhow::Result<Services> {
    let pool = aicp_adapter_pg::connect(&config.database).await?;
    let schema_text = describe_schema(
        &pool,
        &config.access.schema,
        config.limits.max_schema_chars,
    )
    .await?;

    let model: Arc<dyn ChatModel> = Arc::new(OpenAiChatClient::from_config(&config.llm)?);
    let executor = Arc::new(PgExecutor::from_config(pool.clone(), &config.database));
    let resolver = Arc::new(PgAccessResolver::new(pool, &config.access)?);

    let pipeline = QueryPipeline::new(
        Arc::new(LlmSqlGenerator::new(model.clone(), config.access.schema.clone())),
        executor.clone(),
        schema_text,
    )
    .with_policy_builder(PolicyBuilder::new(config.access.clone()))
    .with_limits(config.limits.clone())
    .with_summarizer(Arc::new(NumericSummarizer))
    .with_summarizer(Arc::new(CategoricalSummarizer::new(
        config.limits.max_category_unique,
    )))
    .with_summarizer(Arc::new(AdvancedSummarizer))
    .with_summarizer(Arc::new(NarrativeSummarizer::new(model)));

    Ok(Services {
        pipeline: Arc::new(pipeline),
        resolver,
        health: Arc::new(DatabaseHealth(executor)),
    })
}
