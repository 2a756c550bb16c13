//! HTTP surface for the analysis pipeline.
//!
//! `POST /api/analyze` takes `{"text": "..."}` and answers with the
//! [`AnalysisResult`] as JSON. Pipeline failures (unfetchable URL, LLM errors)
//! are still HTTP 200 with `success: false`; only a bad request body (400, or
//! 413 when oversized) or a crashed analysis task (500) changes the status.
//! `GET /health` is a liveness probe.
#![forbid(unsafe_code)]

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use trustcheck_common::{AnalysisResult, CheckError};
use trustcheck_core::Analyzer;

pub enum AppError {
    BadRequest(String),
    PayloadTooLarge(String),
    Internal(anyhow::Error),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let msg = rejection.body_text();
        tracing::debug!(status = %rejection.status(), error = %msg, "http.analyze.rejected");
        // Syntax, content-type and shape problems are all reported as 400.
        match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge(msg),
            _ => AppError::BadRequest(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            AppError::BadRequest(s) => (StatusCode::BAD_REQUEST, s),
            AppError::PayloadTooLarge(s) => (StatusCode::PAYLOAD_TOO_LARGE, s),
            AppError::Internal(e) => {
                tracing::error!(error = ?e, "http.internal_error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (
            status,
            Json(serde_json::json!({ "success": false, "error": msg })),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
}

async fn analyze_handler(
    State(analyzer): State<Analyzer>,
    payload: std::result::Result<Json<AnalyzeRequest>, JsonRejection>,
) -> std::result::Result<Json<AnalysisResult>, AppError> {
    let Json(req) = payload?;

    let text = req.text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::BadRequest(CheckError::EmptyInput.to_string()));
    }

    // A panicking collaborator must not take the connection down with it.
    let result = tokio::spawn(async move { analyzer.analyze(&text).await })
        .await
        .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("analysis task failed")))?;

    Ok(Json(result))
}

async fn health_handler() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the application router around a shared [`Analyzer`].
pub fn router(analyzer: Analyzer, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/api/analyze", post(analyze_handler))
        .route("/health", get(health_handler))
        .with_state(analyzer)
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(body_limit_bytes))
}

/// Bind `addr` and serve `app` until `shutdown` is cancelled.
pub async fn serve(addr: SocketAddr, app: Router, shutdown: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let local = listener.local_addr().unwrap_or(addr);
    tracing::info!(addr = %local, "server.listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            tracing::info!("server.shutdown");
        })
        .await
        .context("server error")
}
