//! Error types for chat session management.

use super::ClientId;

/// Indicates that a viewer tried to attach to a client id with no live
/// session. Only a send can create a session.
#[derive(Debug, thiserror::Error)]
#[error("no chat session for client {client_id}")]
pub struct SessionNotFound {
    pub client_id: ClientId,
}
