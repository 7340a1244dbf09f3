use std::time::Duration;

use anyhow::Result;
use rpc_bridge_prototype::grpc::{self, BackendConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let addr = std::env::var("GRPC_ADDR")
        .unwrap_or_else(|_| "[::1]:50051".to_string())
        .parse()?;

    // One greeting per second, like a stream slow enough to watch.
    let config = BackendConfig::builder()
        .greeting_interval(Duration::from_secs(1))
        .build();

    grpc::start_server(addr, config).await
}
