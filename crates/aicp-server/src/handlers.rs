use aicp_core::AccessContext;
use aicp_policy::Policy;
use aicp_runtime::{AuthError, QueryReport, QueryRequest, SummaryKind};
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::state::AppState;

type ApiResult = Result<Json<Value>, ApiError>;

fn user_json(ctx: &AccessContext) -> Value {
    json!({
        "id": ctx.user_id,
        "display_name": ctx.display_name,
        "role": ctx.role,
        "doctor_id": ctx.doctor_id,
        "pharmacy_id": ctx.pharmacy_id,
    })
}

fn policy_for(state: &AppState, ctx: &AccessContext) -> Result<Policy, ApiError> {
    state
        .pipeline()
        .policies()
        .build(ctx)
        .map_err(|err| ApiError::Forbidden(err.to_string()))
}

pub async fn index() -> Json<Value> {
    Json(json!({
        "service": "AICP Research Portal API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "auth": "/api/auth/login",
            "query": "/api/query",
            "schema": "/api/schema",
            "logout": "/api/auth/logout",
            "health": "/health",
        },
    }))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database = state.health().database_ok().await;
    let schema = !state.pipeline().schema_text().is_empty();
    let healthy = database && schema;
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(json!({
            "status": if healthy { "healthy" } else { "unhealthy" },
            "checks": { "database": database, "llm": true, "schema": schema },
            "active_sessions": state.sessions().len(),
        })),
    )
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    api_key: String,
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = payload?;
    let api_key = body.api_key.trim();
    if api_key.is_empty() {
        return Err(ApiError::BadRequest("api_key is required".into()));
    }

    let ctx = state
        .resolver()
        .resolve(api_key)
        .await
        .map_err(|err| match err {
            AuthError::Backend(source) => ApiError::Internal(source),
            other => {
                tracing::info!(reason = %other, "login refused");
                ApiError::Unauthorized(format!("Authentication failed: {other}"))
            }
        })?;
    let policy = state
        .pipeline()
        .policies()
        .build(&ctx)
        .map_err(|err| ApiError::Unauthorized(format!("Authentication failed: {err}")))?;

    let session = state.sessions().create(ctx);
    let expires_at = session.last_activity + state.sessions().ttl();
    tracing::info!(user_id = session.context.user_id, role = %session.context.role, "login");

    Ok(Json(json!({
        "success": true,
        "token": session.token,
        "user": user_json(&session.context),
        "policy": {
            "role": policy.role(),
            "notes": policy.notes(),
            "scope_filter_hint": policy.scope_filter_hint(),
        },
        "expires_at": expires_at.to_rfc3339(),
    })))
}

pub async fn logout(State(state): State<AppState>, Authenticated(session): Authenticated) -> ApiResult {
    state.sessions().invalidate(&session.token);
    tracing::info!(user_id = session.context.user_id, "logout");
    Ok(Json(json!({ "success": true, "message": "Logged out successfully" })))
}

#[derive(Debug, Deserialize)]
pub struct QueryBody {
    #[serde(default)]
    question: String,
    #[serde(default)]
    max_rows: Option<i64>,
    #[serde(default)]
    include_sql: Option<bool>,
}

pub async fn query(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    payload: Result<Json<QueryBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = payload?;
    let question = body.question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("question is required".into()));
    }

    let request = QueryRequest {
        question: question.to_string(),
        max_rows: body.max_rows.map(|n| n.max(1) as usize),
        include_sql: body.include_sql.unwrap_or(true),
    };
    let report = state
        .pipeline()
        .run(&session.context, &request)
        .await
        .map_err(|source| ApiError::Query {
            question: request.question.clone(),
            source,
        })?;

    let preview_rows = state.pipeline().limits().preview_rows;
    Ok(Json(query_response(&report, request.include_sql, preview_rows)))
}

fn query_response(report: &QueryReport, include_sql: bool, preview_rows: usize) -> Value {
    let mut analysis = Map::new();
    for summary in &report.summaries {
        let key = match summary.kind {
            SummaryKind::Narrative => "ai_summary".to_string(),
            kind => format!("{kind}_summary"),
        };
        analysis.insert(key, Value::String(summary.text.clone()));
    }

    let execution_ms = (report.duration.as_secs_f64() * 100_000.0).round() / 100.0;
    let mut response = json!({
        "success": true,
        "question": report.question,
        "row_count": report.row_count(),
        "column_count": report.result.column_count(),
        "columns": report.result.columns,
        "data": report.result.records(report.row_count()),
        "preview": report.result.records(preview_rows),
        "analysis": analysis,
        "stages": report.stages,
        "execution_time_ms": execution_ms,
        "truncated": report.truncated(),
    });
    if include_sql {
        response["sql"] = Value::String(report.sql.clone());
    }
    response
}

pub async fn schema(State(state): State<AppState>, Authenticated(session): Authenticated) -> ApiResult {
    let policy = policy_for(&state, &session.context)?;
    Ok(Json(json!({
        "success": true,
        "schema": state.pipeline().schema_text(),
        "policy_notes": policy.notes(),
        "role": policy.role(),
    })))
}

pub async fn profile(State(state): State<AppState>, Authenticated(session): Authenticated) -> ApiResult {
    let policy = policy_for(&state, &session.context)?;
    Ok(Json(json!({
        "success": true,
        "user": user_json(&session.context),
        "policy": { "role": policy.role(), "notes": policy.notes() },
        "session": {
            "created_at": session.created_at.to_rfc3339(),
            "last_activity": session.last_activity.to_rfc3339(),
        },
    })))
}

pub async fn sessions(State(state): State<AppState>) -> ApiResult {
    if !state.server_config().expose_sessions {
        return Err(ApiError::Forbidden("Not available in production".into()));
    }
    let sessions: Vec<Value> = state
        .sessions()
        .list()
        .iter()
        .map(|s| {
            json!({
                "user_id": s.context.user_id,
                "display_name": s.context.display_name,
                "role": s.context.role,
                "created_at": s.created_at.to_rfc3339(),
                "last_activity": s.last_activity.to_rfc3339(),
            })
        })
        .collect();
    Ok(Json(json!({ "active_sessions": sessions.len(), "sessions": sessions })))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
