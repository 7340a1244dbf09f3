use std::net::SocketAddr;
use std::pin::Pin;
use std::time::Duration;

use bon::Builder;
use futures::StreamExt;
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, info, warn};

use crate::demo_proto::demo_service_server::{DemoService, DemoServiceServer};
use crate::demo_proto::{
    ChatMessage, Greeting, GreetingRequest, HelloReply, HelloRequest, NumberRequest, SumReply,
};

/// Configuration for the demo backend.
#[derive(Debug, Clone, Builder)]
pub struct BackendConfig {
    /// How many greetings a StreamGreetings call emits.
    #[builder(default = 5)]
    pub greeting_count: u32,

    /// Pause before each greeting. Zero emits them back-to-back.
    #[builder(default = Duration::ZERO)]
    pub greeting_interval: Duration,
}

/// Build the tonic service, ready to be added to a server.
pub fn service(config: BackendConfig) -> DemoServiceServer<DemoServiceImpl> {
    DemoServiceServer::new(DemoServiceImpl::new(config))
}

/// Serve the demo backend on `addr` until the process exits.
pub async fn start_server(addr: SocketAddr, config: BackendConfig) -> anyhow::Result<()> {
    info!(address = %addr, "gRPC server starting");

    tonic::transport::Server::builder()
        .add_service(service(config))
        .serve(addr)
        .await?;

    Ok(())
}

pub struct DemoServiceImpl {
    config: BackendConfig,
}

impl DemoServiceImpl {
    pub fn new(config: BackendConfig) -> Self {
        Self { config }
    }
}

#[tonic::async_trait]
impl DemoService for DemoServiceImpl {
    async fn say_hello(
        &self,
        request: Request<HelloRequest>,
    ) -> Result<Response<HelloReply>, Status> {
        let name = request.into_inner().name;
        if name.is_empty() {
            return Err(Status::invalid_argument("name is required"));
        }

        debug!(name = %name, "SayHello");
        Ok(Response::new(HelloReply {
            message: format!("Hello, {name}!"),
        }))
    }

    type StreamGreetingsStream =
        Pin<Box<dyn futures::Stream<Item = Result<Greeting, Status>> + Send>>;

    async fn stream_greetings(
        &self,
        request: Request<GreetingRequest>,
    ) -> Result<Response<Self::StreamGreetingsStream>, Status> {
        let name = request.into_inner().name;
        let count = self.config.greeting_count;
        let interval = self.config.greeting_interval;

        info!(name = %name, count, "StreamGreetings started");

        let outbound = async_stream::stream! {
            for i in 1..=count {
                if !interval.is_zero() {
                    tokio::time::sleep(interval).await;
                }
                yield Ok(Greeting {
                    message: format!("Greeting #{i} to {name}"),
                });
            }
        };

        Ok(Response::new(Box::pin(outbound)))
    }

    async fn add_numbers(
        &self,
        request: Request<Streaming<NumberRequest>>,
    ) -> Result<Response<SumReply>, Status> {
        let mut inbound = request.into_inner();
        let mut sum = 0i64;

        while let Some(item) = inbound.message().await? {
            sum += item.number;
            debug!(number = item.number, sum, "AddNumbers received");
        }

        Ok(Response::new(SumReply { sum }))
    }

    type ChatStream = Pin<Box<dyn futures::Stream<Item = Result<ChatMessage, Status>> + Send>>;

    async fn chat(
        &self,
        request: Request<Streaming<ChatMessage>>,
    ) -> Result<Response<Self::ChatStream>, Status> {
        let mut inbound = request.into_inner();

        info!("chat stream opened");

        let outbound = async_stream::stream! {
            loop {
                match inbound.next().await {
                    Some(Ok(msg)) => {
                        debug!(sender = %msg.sender, text = %msg.text, "chat message");
                        yield Ok(ChatMessage {
                            sender: "Server".to_string(),
                            text: format!("Server received: \"{}\"", msg.text),
                        });
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "chat stream error");
                        break;
                    }
                    None => {
                        info!("client ended chat stream");
                        break;
                    }
                }
            }
        };

        Ok(Response::new(Box::pin(outbound)))
    }
}
