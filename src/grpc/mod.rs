pub mod client;
pub mod error;
pub mod server;

pub use client::RpcClient;
pub use error::RpcError;
pub use server::{BackendConfig, DemoServiceImpl, service, start_server};
