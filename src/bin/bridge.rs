use std::sync::Arc;

use anyhow::Result;
use rpc_bridge_prototype::bridge::{self, AppState, BridgeConfig};
use rpc_bridge_prototype::chat::ChatRegistry;
use rpc_bridge_prototype::grpc::RpcClient;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let backend_url =
        std::env::var("BACKEND_URL").unwrap_or_else(|_| "http://[::1]:50051".to_string());
    let http_addr = std::env::var("HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());

    // Lazy channel so the bridge comes up whether or not the backend is
    // there yet.
    let rpc = RpcClient::connect_lazy(backend_url.clone())?;

    let config = BridgeConfig::builder().build();
    let chat = ChatRegistry::new(Arc::new(rpc.clone()), config.event_capacity);
    let app = bridge::build_app(AppState { rpc, chat, config });

    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    info!(address = %http_addr, backend = %backend_url, "REST bridge listening");
    axum::serve(listener, app).await?;

    Ok(())
}
