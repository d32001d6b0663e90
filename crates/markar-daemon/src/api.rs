//! REST API handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use markar_session::{SessionError, StatusReport};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::state::AppState;

/// API error response
#[derive(Serialize)]
struct ApiError {
    error: String,
}

impl ApiError {
    fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

/// Session status as reported to operators
#[derive(Debug, Serialize)]
pub struct StatusView {
    pub label: &'static str,
    #[serde(flatten)]
    pub report: StatusReport,
    pub frames_rendered: u64,
}

impl StatusView {
    pub fn new(report: StatusReport, frames_rendered: u64) -> Self {
        Self {
            label: report.label(),
            report,
            frames_rendered,
        }
    }

    pub fn current(state: &AppState) -> Self {
        Self::new(state.controller.report(), state.frame_loop.frames_rendered())
    }
}

/// One configured asset and what became of it
#[derive(Serialize)]
pub struct AssetView {
    pub path: String,
    pub anchor: usize,
    pub scale: [f32; 3],
    pub spin: f32,
    pub bound: bool,
    pub failed: bool,
}

fn session_error(e: SessionError) -> axum::response::Response {
    let status = match &e {
        SessionError::InvalidTransition { .. } | SessionError::Aborted => StatusCode::CONFLICT,
        SessionError::Acquire(_) | SessionError::Start(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(ApiError::new(e.to_string()))).into_response()
}

fn task_failed(e: tokio::task::JoinError) -> axum::response::Response {
    error!(error = %e, "Session task failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::new(format!("Session task failed: {}", e))),
    )
        .into_response()
}

/// Get the current session status
pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(StatusView::current(&state))
}

/// Start the AR session
///
/// The start runs on its own task so a client that disconnects mid-request
/// cannot cancel it halfway.
pub async fn start_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    info!("Session start requested");
    let controller = state.controller.clone();
    match tokio::spawn(async move { controller.start().await }).await {
        Ok(Ok(report)) => Json(report).into_response(),
        Ok(Err(e)) => session_error(e),
        Err(e) => task_failed(e),
    }
}

/// Stop the AR session
pub async fn stop_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    info!("Session stop requested");
    let controller = state.controller.clone();
    match tokio::spawn(async move { controller.stop().await }).await {
        Ok(Ok(report)) => Json(report).into_response(),
        Ok(Err(e)) => session_error(e),
        Err(e) => task_failed(e),
    }
}

/// List configured assets with their bind state
pub async fn list_assets(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.controller.report();
    let assets: Vec<AssetView> = state
        .controller
        .experience()
        .assets
        .iter()
        .map(|spec| AssetView {
            path: spec.source_path.clone(),
            anchor: spec.anchor_index,
            scale: spec.scale,
            spin: spec.spin_rate,
            bound: report.bound_anchors.contains(&spec.anchor_index),
            failed: report.failed_assets.contains(&spec.source_path),
        })
        .collect();

    Json(serde_json::json!({
        "origin": state.asset_origin,
        "assets": assets,
    }))
}
