use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Json, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use super::{SimulatePayload, params_from_payload};
use crate::core::{BatchError, BatchOutcome, SessionRegistry, run_batch};

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router() -> Router {
    Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .fallback(not_found_handler)
        .with_state(Arc::new(SessionRegistry::new()))
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "simulation API listening");

    axum::serve(listener, router()).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(
    State(sessions): State<Arc<SessionRegistry>>,
    Query(payload): Query<SimulatePayload>,
) -> Response {
    simulate_handler_impl(&sessions, payload).await
}

async fn simulate_post_handler(
    State(sessions): State<Arc<SessionRegistry>>,
    Json(payload): Json<SimulatePayload>,
) -> Response {
    simulate_handler_impl(&sessions, payload).await
}

async fn simulate_handler_impl(sessions: &SessionRegistry, mut payload: SimulatePayload) -> Response {
    let session_id = payload.take_session_id();
    let params = match params_from_payload(payload) {
        Ok(params) => params,
        Err(e) => {
            warn!(error = %e, "rejected simulation payload");
            return error_response(StatusCode::BAD_REQUEST, &e.to_string());
        }
    };

    let outcome = match session_id {
        Some(id) => sessions.scheduler_for(&id).submit(params).await,
        None => run_batch(params).await.map(BatchOutcome::Completed),
    };

    outcome_response(outcome)
}

fn outcome_response(outcome: Result<BatchOutcome, BatchError>) -> Response {
    match outcome {
        Ok(BatchOutcome::Completed(result)) => json_response(StatusCode::OK, result),
        Ok(BatchOutcome::Superseded) => error_response(
            StatusCode::CONFLICT,
            "Superseded by a newer simulation request",
        ),
        Err(BatchError::Invalid(e)) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
        Err(e) => {
            error!(error = %e, "simulation batch failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
