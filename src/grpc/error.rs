//! Error types for backend RPC calls.

use thiserror::Error;

/// Errors surfaced by calls against the backend service.
///
/// Nothing is retried at this layer; every failure reaches the caller
/// unmodified.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The channel to the backend could not be established or broke down.
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// The backend answered a call with a non-success gRPC status.
    #[error("rpc failed: {0}")]
    Status(#[from] tonic::Status),
}
