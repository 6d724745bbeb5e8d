// HTTP API routes for driving the pet and reading its state.

pub mod ws;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{Json, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::engine::creature::FoodKind;
use crate::engine::error::PetError;
use crate::engine::pet::UiMode;
use crate::engine::server::{Command, PetServer};
use crate::metrics;

// ── Request types ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct FoodRequest {
    pub food: FoodKind,
}

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub pet_server: Arc<PetServer>,
}

// ── Error helper ──────────────────────────────────────────────────────

fn json_error(status: StatusCode, msg: &str) -> impl IntoResponse {
    (status, Json(json!({ "error": msg })))
}

/// Rejections that conflict with the pet's current state are 409; requests
/// that can never succeed as asked are 422.
fn pet_error_status(e: &PetError) -> StatusCode {
    match e {
        PetError::Dead
        | PetError::AnimationLocked(_)
        | PetError::AlreadyAsleep
        | PetError::AlreadyAwake
        | PetError::Asleep
        | PetError::NothingToCancel => StatusCode::CONFLICT,
        PetError::AlreadyFull | PetError::AlreadyHappy | PetError::TooTired => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(pet_server: Arc<PetServer>) -> Router {
    let state = AppState { pet_server };

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(get_metrics))
        // Pet state
        .route("/api/pet", get(get_pet))
        // Care
        .route("/api/pet/feed", post(feed))
        .route("/api/pet/play", post(play))
        .route("/api/pet/flush", post(flush))
        // Sleep
        .route("/api/pet/nap", post(nap))
        .route("/api/pet/sleep", post(full_sleep))
        .route("/api/pet/wake", post(wake))
        // Feeding animation
        .route("/api/pet/feeding", post(start_feeding))
        .route("/api/pet/feeding/cancel", post(cancel_feeding))
        // Host
        .route("/api/pet/ui-mode", put(set_ui_mode))
        .route("/api/pet/reset", post(reset))
        // WebSocket
        .route("/ws/pet", get(ws::ws_pet))
        .layer(middleware::from_fn(track_requests))
        .with_state(state)
}

/// Count and time every request.
async fn track_requests(req: Request<Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let endpoint = metrics::normalize_path(req.uri().path());
    let start = Instant::now();
    let response = next.run(req).await;
    metrics::API_REQUESTS_TOTAL
        .with_label_values(&[&method, &endpoint, response.status().as_str()])
        .inc();
    metrics::API_REQUEST_DURATION_SECONDS
        .with_label_values(&[&endpoint])
        .observe(start.elapsed().as_secs_f64());
    response
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "dragon-pet",
            "running": state.pet_server.is_running(),
            "tick": state.pet_server.current_tick(),
        })),
    )
        .into_response()
}

async fn get_metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
        .into_response()
}

/// Send a command and turn the reply into a response.
async fn dispatch(state: &AppState, command: Command) -> Response {
    let reply = match state.pet_server.send(command).await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Pet command failed: {e}");
            return json_error(StatusCode::SERVICE_UNAVAILABLE, &e).into_response();
        }
    };
    match reply.result {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({ "outcome": outcome, "pet": reply.snapshot })),
        )
            .into_response(),
        Err(e) => (
            pet_error_status(&e),
            Json(json!({
                "error": e.to_string(),
                "code": e.code(),
                "pet": reply.snapshot,
            })),
        )
            .into_response(),
    }
}

async fn get_pet(State(state): State<AppState>) -> impl IntoResponse {
    match state.pet_server.send(Command::Snapshot).await {
        Ok(reply) => (StatusCode::OK, Json(json!(reply.snapshot))).into_response(),
        Err(e) => json_error(StatusCode::SERVICE_UNAVAILABLE, &e).into_response(),
    }
}

async fn feed(State(state): State<AppState>, Json(req): Json<FoodRequest>) -> impl IntoResponse {
    dispatch(&state, Command::Feed(req.food)).await
}

async fn play(State(state): State<AppState>) -> impl IntoResponse {
    dispatch(&state, Command::Play).await
}

async fn flush(State(state): State<AppState>) -> impl IntoResponse {
    dispatch(&state, Command::FlushPoop).await
}

async fn nap(State(state): State<AppState>) -> impl IntoResponse {
    dispatch(&state, Command::Nap).await
}

async fn full_sleep(State(state): State<AppState>) -> impl IntoResponse {
    dispatch(&state, Command::FullSleep).await
}

async fn wake(State(state): State<AppState>) -> impl IntoResponse {
    dispatch(&state, Command::Wake).await
}

async fn start_feeding(
    State(state): State<AppState>,
    Json(req): Json<FoodRequest>,
) -> impl IntoResponse {
    dispatch(&state, Command::StartFeeding(req.food)).await
}

async fn cancel_feeding(State(state): State<AppState>) -> impl IntoResponse {
    dispatch(&state, Command::CancelFeeding).await
}

async fn set_ui_mode(State(state): State<AppState>, Json(mode): Json<UiMode>) -> impl IntoResponse {
    dispatch(&state, Command::SetUiMode(mode)).await
}

async fn reset(State(state): State<AppState>) -> impl IntoResponse {
    dispatch(&state, Command::Reset).await
}
