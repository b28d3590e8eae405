//! HTTP API for the Commission Engine.
//!
//! This module exposes a small REST API around the commission engine
//! using the [`axum`](https://crates.io/crates/axum) framework.  Clients
//! submit an order and an agent id and receive the computed commission
//! in JSON, or query recorded commissions and summaries.  Calculation
//! responses keep the `{success, commission | error}` envelope the
//! dashboards already consume.

use crate::config::AppConfig;
use crate::engine::{CalculationOptions, CommissionEngine};
use crate::error::{CommissionError, CommissionResult, ConfigError};
use crate::models::{Agent, Commission, Order};
use crate::rules::CommissionRules;
use crate::store::{DateRange, InMemoryStore};
use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Application state shared across requests.
pub struct AppState {
    pub engine: CommissionEngine,
}

impl AppState {
    pub fn new(engine: CommissionEngine) -> Self {
        Self { engine }
    }

    /// State backed by a fresh [`InMemoryStore`] seeded with `agents`.
    pub fn in_memory(rules: CommissionRules, agents: Vec<Agent>) -> Self {
        // One store serves both the agent directory and the ledger
        let store = Arc::new(InMemoryStore::with_agents(agents));
        Self::new(CommissionEngine::new(Arc::new(rules), store.clone(), store))
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        // Rule tables and agents are optional files; defaults otherwise
        let rules = config.load_rules()?;
        let agents = config.load_agents()?;
        info!(agents = agents.len(), custom_rules = config.rules_path.is_some(), "state initialised");
        Ok(Self::in_memory(rules, agents))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateRequest {
    pub order: Order,
    pub agent_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateRequest {
    pub order: Order,
    pub agent_id: String,
    #[serde(default)]
    pub monthly_total: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl RangeQuery {
    fn range(&self) -> Option<DateRange> {
        if self.start.is_none() && self.end.is_none() {
            None
        } else {
            Some(DateRange {
                start: self.start,
                end: self.end,
            })
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CalculationResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commission: Option<Commission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IntoResponse for CommissionError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "code": self.code(),
            "error": self.to_string(),
        }));
        (self.status_code(), body).into_response()
    }
}

/// Failure envelope for a request body that does not deserialize
/// into the expected shape (e.g. an order without a `total`).
fn rejected(rejection: JsonRejection) -> Response {
    let body = CalculationResponse {
        success: false,
        commission: None,
        error: Some(rejection.body_text()),
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

fn envelope(result: CommissionResult<Commission>) -> Response {
    match result {
        Ok(commission) => Json(CalculationResponse {
            success: true,
            commission: Some(commission),
            error: None,
        })
        .into_response(),
        Err(err) => {
            let status = err.status_code();
            let body = CalculationResponse {
                success: false,
                commission: None,
                error: Some(err.to_string()),
            };
            (status, Json(body)).into_response()
        }
    }
}

/// Build the API router around the given state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/commission/rules", get(rules_handler))
        // Calculations answer with the success envelope
        .route("/api/commission/calculate", post(calculate_handler))
        .route("/api/commission/simulate", post(simulate_handler))
        .route("/api/commission/existing", post(existing_handler))
        // Read-only views over the ledger
        .route("/api/commission/agents/:agent_id", get(agent_commissions_handler))
        .route("/api/commission/agents/:agent_id/summary", get(agent_summary_handler))
        .route("/api/commission/leaderboard", get(leaderboard_handler))
        .with_state(state)
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn rules_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.rules().clone())
}

/// Handler for POST /api/commission/calculate
async fn calculate_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CalculateRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => return rejected(rejection),
    };
    envelope(
        state
            .engine
            .calculate_order_commission(&req.order, &req.agent_id)
            .await,
    )
}

/// Handler for POST /api/commission/simulate.  Nothing is recorded.
async fn simulate_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SimulateRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => return rejected(rejection),
    };
    // Never persisted; a caller-supplied monthly total replaces the ledger lookup
    let options = CalculationOptions {
        monthly_total_override: req.monthly_total,
        ..CalculationOptions::simulation()
    };
    envelope(state.engine.calculate_with(&req.order, &req.agent_id, options).await)
}

async fn existing_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CalculateRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => return rejected(rejection),
    };
    envelope(
        state
            .engine
            .calculate_for_existing_order(&req.order, &req.agent_id)
            .await,
    )
}

async fn agent_commissions_handler(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<Commission>>, CommissionError> {
    Ok(Json(state.engine.agent_commissions(&agent_id, query.range()).await?))
}

async fn agent_summary_handler(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
    Query(query): Query<RangeQuery>,
) -> Result<impl IntoResponse, CommissionError> {
    Ok(Json(state.engine.agent_summary(&agent_id, query.range()).await?))
}

async fn leaderboard_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<impl IntoResponse, CommissionError> {
    Ok(Json(state.engine.leaderboard(query.range()).await?))
}

/// Launch the API server on `addr` and run until Ctrl-C.
pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "server listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutting down");
        })
        .await?;
    Ok(())
}
