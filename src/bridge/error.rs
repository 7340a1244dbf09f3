//! Error types mapped onto HTTP responses at the adapter boundary.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::chat::error::SessionNotFound;
use crate::grpc::RpcError;

/// Every failure an adapter can report to an HTTP caller.
///
/// Chat backend failures are deliberately absent: the send has already been
/// acknowledged by the time they happen, so they reach viewers as a
/// synthetic chat message instead.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A backend call failed; surfaced as a 500 with the error message.
    #[error("{0}")]
    Rpc(#[from] RpcError),

    /// A server stream failed or outlived the collection deadline. The
    /// partial buffer is discarded, so the message stays generic.
    #[error("error streaming greetings")]
    Streaming,

    /// Malformed request input.
    #[error("{0}")]
    Validation(String),

    /// SSE attach for a client id with no live session.
    #[error("no chat session found")]
    SessionNotFound(#[from] SessionNotFound),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Rpc(_) | ApiError::Streaming => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
