//! HTTP API routes
//!
//! JSON envelopes (`{ success, ... }`) match what the patient and hospital
//! apps already consume. The serve action is the one externally-triggered
//! lifecycle transition; everything else is a read or a push-token write.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::db::DispatchDb;
use crate::models::now_localized;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DispatchDb>,
    pub tz: FixedOffset,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/alerts/:user_id", get(alerts_for_user))
        .route("/hospital/serve", post(serve))
        .route("/hospital/live-alerts/:hospital_id", get(live_alerts))
        .route("/hospital/served-alerts/:hospital_id", get(served_alerts))
        .route("/hospital/push-token", post(hospital_push_token))
        .route("/user/push-token", post(user_push_token))
        .with_state(state)
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    "OK"
}

#[derive(Serialize)]
struct ListResponse<T> {
    success: bool,
    data: Vec<T>,
}

#[derive(Serialize)]
struct ActionResponse {
    success: bool,
    message: String,
}

fn db_error(e: crate::types::DispatchError) -> Response {
    error!(error = %e, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ActionResponse {
            success: false,
            message: "database error".to_string(),
        }),
    )
        .into_response()
}

/// GET /alerts/:user_id - ledger rows with derived status, newest first
async fn alerts_for_user(State(state): State<AppState>, Path(user_id): Path<i64>) -> Response {
    match state.db.alerts_for_user(user_id) {
        Ok(data) => Json(ListResponse { success: true, data }).into_response(),
        Err(e) => db_error(e),
    }
}

#[derive(Deserialize)]
pub struct ServeRequest {
    pub assignment_id: i64,
    pub hospital_id: i64,
}

/// POST /hospital/serve - Assigned -> Served, 404 when no live assignment
async fn serve(State(state): State<AppState>, Json(req): Json<ServeRequest>) -> Response {
    let served_at = now_localized(&state.tz);

    match state
        .db
        .serve_assignment(req.assignment_id, req.hospital_id, &served_at)
    {
        Ok(Some(outcome)) => {
            info!(
                assignment_id = req.assignment_id,
                alert_id = outcome.alert_id,
                hospital_id = outcome.hospital_id,
                "assignment served"
            );
            Json(ActionResponse {
                success: true,
                message: format!("Alert {} served", outcome.alert_id),
            })
            .into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ActionResponse {
                success: false,
                message: "Assignment not found".to_string(),
            }),
        )
            .into_response(),
        Err(e) => db_error(e),
    }
}

/// GET /hospital/live-alerts/:hospital_id
async fn live_alerts(State(state): State<AppState>, Path(hospital_id): Path<i64>) -> Response {
    match state.db.live_assignments(hospital_id) {
        Ok(data) => Json(ListResponse { success: true, data }).into_response(),
        Err(e) => db_error(e),
    }
}

/// GET /hospital/served-alerts/:hospital_id
async fn served_alerts(State(state): State<AppState>, Path(hospital_id): Path<i64>) -> Response {
    match state.db.served_alerts(hospital_id) {
        Ok(data) => Json(ListResponse { success: true, data }).into_response(),
        Err(e) => db_error(e),
    }
}

#[derive(Deserialize)]
pub struct PushTokenRequest {
    pub id: i64,
    pub token: String,
}

fn push_token_response(updated: bool, kind: &str) -> Response {
    if updated {
        Json(ActionResponse {
            success: true,
            message: "Token updated".to_string(),
        })
        .into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(ActionResponse {
                success: false,
                message: format!("{} not found", kind),
            }),
        )
            .into_response()
    }
}

/// POST /user/push-token - notification-address write, last write wins
async fn user_push_token(
    State(state): State<AppState>,
    Json(req): Json<PushTokenRequest>,
) -> Response {
    match state.db.set_user_push_token(req.id, &req.token) {
        Ok(updated) => push_token_response(updated, "User"),
        Err(e) => db_error(e),
    }
}

/// POST /hospital/push-token
async fn hospital_push_token(
    State(state): State<AppState>,
    Json(req): Json<PushTokenRequest>,
) -> Response {
    match state.db.set_hospital_push_token(req.id, &req.token) {
        Ok(updated) => push_token_response(updated, "Hospital"),
        Err(e) => db_error(e),
    }
}
