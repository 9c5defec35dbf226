use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::models::{Cdp, QueryRequest};
use crate::orchestrator::{Dispatch, Orchestrator, Rejection, UiState};

#[derive(Clone)]
struct AppState {
    orchestrator: Orchestrator,
}

/// HTTP surface the UI talks to: state snapshots plus the two user actions.
pub fn router(orchestrator: Orchestrator) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/state", get(state))
        .route("/initialize/:cdp", post(initialize))
        .route("/query", post(query))
        .route("/dismiss", post(dismiss))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { orchestrator })
}

async fn health() -> &'static str {
    "OK"
}

async fn state(State(state): State<AppState>) -> Json<UiState> {
    Json(state.orchestrator.snapshot().await)
}

async fn initialize(
    State(state): State<AppState>,
    Path(cdp): Path<Cdp>,
) -> Result<Json<UiState>, (StatusCode, &'static str)> {
    let dispatch = state.orchestrator.initialize(cdp).await;
    respond(&state, dispatch).await
}

async fn query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<UiState>, (StatusCode, &'static str)> {
    let dispatch = state.orchestrator.query(req.cdp, &req.query).await;
    respond(&state, dispatch).await
}

async fn dismiss(State(state): State<AppState>) -> Json<UiState> {
    state.orchestrator.dismiss().await;
    Json(state.orchestrator.snapshot().await)
}

async fn respond(
    state: &AppState,
    dispatch: Dispatch,
) -> Result<Json<UiState>, (StatusCode, &'static str)> {
    match dispatch {
        Dispatch::Rejected(Rejection::Busy) => {
            Err((StatusCode::CONFLICT, "another request is in progress"))
        }
        Dispatch::Rejected(Rejection::EmptyQuery) => {
            Err((StatusCode::UNPROCESSABLE_ENTITY, "query must not be empty"))
        }
        Dispatch::Applied | Dispatch::Stale => Ok(Json(state.orchestrator.snapshot().await)),
    }
}
