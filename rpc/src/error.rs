//! RPC error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("challenge not found: {0}")]
    ChallengeNotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The requested operation is not legal in the challenge's current
    /// state, or lost its optimistic-concurrency race.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("settlement error: {0}")]
    Settlement(String),

    #[error("server error: {0}")]
    Server(String),
}

impl RpcError {
    fn status(&self) -> StatusCode {
        match self {
            RpcError::ChallengeNotFound(_) => StatusCode::NOT_FOUND,
            RpcError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RpcError::Conflict(_) => StatusCode::CONFLICT,
            RpcError::Settlement(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RpcError::Store(_) | RpcError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

impl From<arena_store::StoreError> for RpcError {
    fn from(e: arena_store::StoreError) -> Self {
        match e {
            arena_store::StoreError::NotFound(key) => RpcError::ChallengeNotFound(key),
            arena_store::StoreError::VersionConflict { key, .. } => RpcError::Conflict(key),
            other => RpcError::Store(other.to_string()),
        }
    }
}

impl From<arena_coordinator::CoordinatorError> for RpcError {
    fn from(e: arena_coordinator::CoordinatorError) -> Self {
        use arena_coordinator::CoordinatorError;
        match e {
            CoordinatorError::Store(store) => store.into(),
            CoordinatorError::Lifecycle(lifecycle) => RpcError::Conflict(lifecycle.to_string()),
            CoordinatorError::StaleState(id) => RpcError::Conflict(format!("stale state: {id}")),
            CoordinatorError::InvalidRequest(msg) => RpcError::InvalidRequest(msg),
            CoordinatorError::Settlement(settlement) => {
                RpcError::Settlement(settlement.to_string())
            }
            other => RpcError::Server(other.to_string()),
        }
    }
}
