//! Simulator dashboard API
//!
//! HTTP endpoints for what-if simulation, model explanation and the recent
//! index history, served from a shared [`Session`].

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{RecentWindow, RetrainSummary, Session, SimulationReply};
use crate::data::Indicator;
use crate::error::CrisisError;
use crate::ml::{EvaluationReport, SimulationInput};

/// Error body returned by every endpoint
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Wraps a pipeline error with its HTTP status
#[derive(Debug)]
pub struct ApiError(CrisisError);

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            CrisisError::ModelNotFitted => StatusCode::SERVICE_UNAVAILABLE,
            CrisisError::Data(_)
            | CrisisError::InsufficientHistory { .. }
            | CrisisError::DegenerateTrainingSet { .. }
            | CrisisError::MissingIndicator(_) => StatusCode::UNPROCESSABLE_ENTITY,
            e if e.is_input_error() => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CrisisError> for ApiError {
    fn from(e: CrisisError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!("Dashboard request failed: {}", self.0);
        }
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Slider values; defaults match a calm market
#[derive(Debug, Clone, Deserialize)]
pub struct SimulateQuery {
    #[serde(default = "default_vix")]
    pub vix: f64,
    #[serde(default = "default_oil")]
    pub oil: f64,
    #[serde(default = "default_spread")]
    pub t10y2y: f64,
    /// Only accepted by models trained with gold
    pub gold: Option<f64>,
}

fn default_vix() -> f64 {
    15.0
}

fn default_oil() -> f64 {
    75.0
}

fn default_spread() -> f64 {
    0.7
}

impl SimulateQuery {
    fn to_input(&self) -> SimulationInput {
        let mut values = vec![
            (Indicator::Vix, self.vix),
            (Indicator::Oil, self.oil),
            (Indicator::YieldSpread, self.t10y2y),
        ];
        if let Some(gold) = self.gold {
            values.push((Indicator::Gold, gold));
        }
        SimulationInput::from_indicators(&values)
    }
}

async fn health_check() -> &'static str {
    "OK"
}

async fn simulate(
    State(session): State<Arc<Session>>,
    Query(query): Query<SimulateQuery>,
) -> ApiResult<SimulationReply> {
    Ok(Json(session.simulate(query.to_input()).await?))
}

/// Prediction for the most recent observed indicator values
async fn simulate_latest(State(session): State<Arc<Session>>) -> ApiResult<SimulationReply> {
    let input = session.latest_input().await?;
    Ok(Json(session.simulate(input).await?))
}

#[derive(Debug, Serialize)]
struct ImportanceEntry {
    feature: String,
    importance: f64,
}

async fn get_importance(State(session): State<Arc<Session>>) -> ApiResult<Vec<ImportanceEntry>> {
    let importance = session.importance().await?;
    Ok(Json(
        importance
            .ranked()
            .into_iter()
            .map(|(feature, importance)| ImportanceEntry {
                feature,
                importance,
            })
            .collect(),
    ))
}

async fn get_report(State(session): State<Arc<Session>>) -> ApiResult<Option<EvaluationReport>> {
    Ok(Json(session.report().await?))
}

async fn get_recent(State(session): State<Arc<Session>>) -> ApiResult<RecentWindow> {
    Ok(Json(session.recent().await?))
}

async fn retrain(State(session): State<Arc<Session>>) -> ApiResult<RetrainSummary> {
    Ok(Json(session.retrain().await?))
}

/// Create dashboard router
pub fn create_router(session: Arc<Session>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/simulate", get(simulate))
        .route("/api/simulate/latest", get(simulate_latest))
        .route("/api/importance", get(get_importance))
        .route("/api/report", get(get_report))
        .route("/api/recent", get(get_recent))
        .route("/api/retrain", post(retrain))
        .with_state(session)
}

/// Start dashboard server
pub async fn start_dashboard(session: Arc<Session>) -> crate::error::Result<()> {
    let dashboard = &session.config().dashboard;
    let addr = format!("{}:{}", dashboard.host, dashboard.port);
    let app = create_router(session.clone());

    tracing::info!("Dashboard server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
