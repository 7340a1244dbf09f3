//! The HTTP surface: three pass-through adapters plus the chat send/stream
//! pair backed by the session registry.

pub mod config;
pub mod error;
pub mod handlers;

pub use config::BridgeConfig;
pub use error::ApiError;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;

use crate::chat::ChatRegistry;
use crate::grpc::RpcClient;

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub rpc: RpcClient,
    pub chat: ChatRegistry,
    pub config: BridgeConfig,
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/sayHello", post(handlers::say_hello))
        .route("/api/stream-greetings", get(handlers::stream_greetings))
        .route("/api/add-numbers", post(handlers::add_numbers))
        .route("/api/chat/send", post(handlers::chat_send))
        .route("/api/chat/stream", get(handlers::chat_stream))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
