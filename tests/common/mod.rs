//! Common test utilities.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio_stream::wrappers::TcpListenerStream;

use rpc_bridge_prototype::bridge::{self, AppState, BridgeConfig};
use rpc_bridge_prototype::chat::ChatRegistry;
use rpc_bridge_prototype::grpc::{self, BackendConfig, RpcClient};

/// Serve the demo backend on an ephemeral port, returning its URL.
pub async fn spawn_backend(config: BackendConfig) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(grpc::service(config))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    format!("http://{addr}")
}

/// A bridge app wired against a fresh in-process backend.
pub async fn test_app() -> Router {
    test_app_with(BackendConfig::builder().build()).await
}

pub async fn test_app_with(backend: BackendConfig) -> Router {
    let url = spawn_backend(backend).await;
    let rpc = RpcClient::connect(url.as_str()).await.unwrap();

    let config = BridgeConfig::builder()
        .collect_timeout(Duration::from_secs(5))
        .build();
    let chat = ChatRegistry::new(Arc::new(rpc.clone()), config.event_capacity);

    bridge::build_app(AppState { rpc, chat, config })
}
