//! Pulse HTTP REST API
//!
//! Axum-based HTTP server exposing the record collections and every derived
//! analytics view over HTTP, plus the streaming chat proxy.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to a
//! pure inner function. The inner functions are directly testable without
//! axum dispatch machinery.
//!
//! Endpoints:
//! - GET  /health                  — store status
//! - GET  /version                 — server version info
//! - GET  /responses               — all persona response records
//! - GET  /outcomes                — all survey outcome records
//! - GET  /personas                — persona profiles
//! - GET  /personas/:id            — one persona profile
//! - GET  /analytics/summary       — headline counts + quick insights
//! - GET  /analytics/personas      — per-persona attitude and vaccination
//! - GET  /analytics/trends        — daily attitude/recommendation trends
//! - GET  /analytics/trajectory    — conversion trajectory ranking
//! - GET  /analytics/shifts        — reaction shift points
//! - GET  /analytics/sentiment     — initial sentiment distribution
//! - GET  /analytics/news-impact   — real vs fake news comparison
//! - GET  /analytics/reactions     — reaction counts by iteration
//! - POST /chat                    — SSE completion stream

use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use pulse_core::models::PersonaProfile;
use pulse_core::{metrics, ChatClient, PulseConfig, ResponseStore};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

/// Shared state for all HTTP handlers
pub struct HttpState {
    pub store: Box<dyn ResponseStore>,
    pub personas: Vec<PersonaProfile>,
    pub config: PulseConfig,
    /// Absent when no API key is configured; POST /chat then returns 503.
    pub chat: Option<ChatClient>,
}

/// Standard HTTP error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            status: "error".to_string(),
        }
    }
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/responses", get(responses_handler))
        .route("/outcomes", get(outcomes_handler))
        .route("/personas", get(personas_handler))
        .route("/personas/:id", get(persona_detail_handler))
        .route("/analytics/summary", get(summary_handler))
        .route("/analytics/personas", get(persona_analytics_handler))
        .route("/analytics/trends", get(trends_handler))
        .route("/analytics/trajectory", get(trajectory_handler))
        .route("/analytics/shifts", get(shifts_handler))
        .route("/analytics/sentiment", get(sentiment_handler))
        .route("/analytics/news-impact", get(news_impact_handler))
        .route("/analytics/reactions", get(reactions_handler))
        .route("/chat", post(crate::chat::chat_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: Arc<HttpState>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);
    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Pulse HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

fn fetch_error(e: impl std::fmt::Display) -> (StatusCode, serde_json::Value) {
    tracing::error!("Data fetch failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        serde_json::json!({
            "error": e.to_string(),
            "status": "error",
        }),
    )
}

/// Inner health check — probes the store and returns (status_code, body).
pub async fn health_inner(store: &dyn ResponseStore) -> (StatusCode, serde_json::Value) {
    match store.status().await {
        Ok(detail) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "store": store.name(),
                "detail": detail,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "unhealthy",
                "error": e.to_string(),
            }),
        ),
    }
}

/// Inner version — returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "pulse/1",
    })
}

pub async fn responses_inner(store: &dyn ResponseStore) -> (StatusCode, serde_json::Value) {
    match store.responses().await {
        Ok(records) => (
            StatusCode::OK,
            serde_json::json!({
                "count": records.len(),
                "records": records,
            }),
        ),
        Err(e) => fetch_error(e),
    }
}

pub async fn outcomes_inner(store: &dyn ResponseStore) -> (StatusCode, serde_json::Value) {
    match store.outcomes().await {
        Ok(records) => (
            StatusCode::OK,
            serde_json::json!({
                "count": records.len(),
                "records": records,
            }),
        ),
        Err(e) => fetch_error(e),
    }
}

pub fn personas_inner(personas: &[PersonaProfile]) -> serde_json::Value {
    serde_json::json!({
        "count": personas.len(),
        "personas": personas,
    })
}

pub fn persona_detail_inner(
    personas: &[PersonaProfile],
    id: i32,
) -> (StatusCode, serde_json::Value) {
    match personas.iter().find(|p| p.persona_id == id) {
        Some(persona) => (
            StatusCode::OK,
            serde_json::to_value(persona).unwrap_or_default(),
        ),
        None => (
            StatusCode::NOT_FOUND,
            serde_json::json!({
                "error": format!("persona {} not found", id),
                "status": "error",
            }),
        ),
    }
}

/// Inner summary — headline outcome counts plus trajectory quick insights.
pub async fn summary_inner(
    store: &dyn ResponseStore,
    conversion_threshold: f64,
) -> (StatusCode, serde_json::Value) {
    let outcomes = match store.outcomes().await {
        Ok(o) => o,
        Err(e) => return fetch_error(e),
    };
    let responses = match store.responses().await {
        Ok(r) => r,
        Err(e) => return fetch_error(e),
    };

    let summary = metrics::outcome_summary(&outcomes);
    let insights = metrics::quick_insights(&responses, conversion_threshold);
    let recent = metrics::recent_outcomes(&outcomes, 3);
    (
        StatusCode::OK,
        serde_json::json!({
            "summary": summary,
            "insights": insights,
            "recent": recent,
        }),
    )
}

pub async fn persona_analytics_inner(
    store: &dyn ResponseStore,
) -> (StatusCode, serde_json::Value) {
    match store.outcomes().await {
        Ok(outcomes) => (
            StatusCode::OK,
            serde_json::json!({
                "attitude": metrics::attitude_by_persona(&outcomes),
                "vaccination": metrics::vaccination_probability_by_persona(&outcomes),
                "reality_fact": metrics::reality_fact_breakdown(&outcomes),
                "vaccination_split": metrics::vaccination_split(&outcomes),
            }),
        ),
        Err(e) => fetch_error(e),
    }
}

pub async fn trends_inner(store: &dyn ResponseStore) -> (StatusCode, serde_json::Value) {
    match store.outcomes().await {
        Ok(outcomes) => (
            StatusCode::OK,
            serde_json::json!({ "trends": metrics::daily_trends(&outcomes) }),
        ),
        Err(e) => fetch_error(e),
    }
}

/// Inner trajectory view. `decision_threshold` is on the 1-4 scale and is
/// emitted normalized, as the chart's reference line.
pub async fn trajectory_inner(
    store: &dyn ResponseStore,
    decision_threshold: f64,
) -> (StatusCode, serde_json::Value) {
    match store.responses().await {
        Ok(responses) => (
            StatusCode::OK,
            serde_json::json!({
                "trajectory": metrics::conversion_trajectory(&responses),
                "matrix": metrics::trajectory_matrix(&responses),
                "decision_threshold": metrics::normalize_rating(decision_threshold),
            }),
        ),
        Err(e) => fetch_error(e),
    }
}

pub async fn shifts_inner(store: &dyn ResponseStore) -> (StatusCode, serde_json::Value) {
    match store.responses().await {
        Ok(responses) => (
            StatusCode::OK,
            serde_json::json!({ "shifts": metrics::reaction_shifts(&responses) }),
        ),
        Err(e) => fetch_error(e),
    }
}

pub async fn sentiment_inner(store: &dyn ResponseStore) -> (StatusCode, serde_json::Value) {
    match store.responses().await {
        Ok(responses) => (
            StatusCode::OK,
            serde_json::json!({
                "distribution": metrics::sentiment_distribution(&responses)
            }),
        ),
        Err(e) => fetch_error(e),
    }
}

pub async fn news_impact_inner(
    store: &dyn ResponseStore,
    decision_threshold: f64,
) -> (StatusCode, serde_json::Value) {
    match store.responses().await {
        Ok(responses) => {
            let mut body =
                serde_json::to_value(metrics::news_impact(&responses)).unwrap_or_default();
            if let Some(map) = body.as_object_mut() {
                map.insert(
                    "decision_threshold".to_string(),
                    metrics::normalize_rating(decision_threshold).into(),
                );
            }
            (StatusCode::OK, body)
        }
        Err(e) => fetch_error(e),
    }
}

pub async fn reactions_inner(store: &dyn ResponseStore) -> (StatusCode, serde_json::Value) {
    match store.responses().await {
        Ok(responses) => (
            StatusCode::OK,
            serde_json::json!({
                "reactions": metrics::reaction_counts_by_iteration(&responses)
            }),
        ),
        Err(e) => fetch_error(e),
    }
}

// ============================================================================
// Axum handler wrappers (thin — delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(state.store.as_ref()).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn responses_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = responses_inner(state.store.as_ref()).await;
    (status, Json(body))
}

pub async fn outcomes_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = outcomes_inner(state.store.as_ref()).await;
    (status, Json(body))
}

pub async fn personas_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(personas_inner(&state.personas)))
}

pub async fn persona_detail_handler(
    State(state): State<Arc<HttpState>>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    let (status, body) = persona_detail_inner(&state.personas, id);
    (status, Json(body))
}

pub async fn summary_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = summary_inner(
        state.store.as_ref(),
        state.config.insights.conversion_threshold,
    )
    .await;
    (status, Json(body))
}

pub async fn persona_analytics_handler(
    State(state): State<Arc<HttpState>>,
) -> impl IntoResponse {
    let (status, body) = persona_analytics_inner(state.store.as_ref()).await;
    (status, Json(body))
}

pub async fn trends_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = trends_inner(state.store.as_ref()).await;
    (status, Json(body))
}

pub async fn trajectory_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = trajectory_inner(
        state.store.as_ref(),
        state.config.insights.decision_threshold,
    )
    .await;
    (status, Json(body))
}

pub async fn shifts_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = shifts_inner(state.store.as_ref()).await;
    (status, Json(body))
}

pub async fn sentiment_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = sentiment_inner(state.store.as_ref()).await;
    (status, Json(body))
}

pub async fn news_impact_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = news_impact_inner(
        state.store.as_ref(),
        state.config.insights.decision_threshold,
    )
    .await;
    (status, Json(body))
}

pub async fn reactions_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = reactions_inner(state.store.as_ref()).await;
    (status, Json(body))
}

// ============================================================================
// Unit Tests — call inner functions directly
// ============================================================================
