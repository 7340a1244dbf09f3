use futures::Stream;
use tonic::Streaming;
use tonic::transport::Endpoint;

use crate::chat::{ChatInbound, ChatOutbound, ChatTransport};
use crate::demo_proto::demo_service_client::DemoServiceClient;
use crate::demo_proto::{
    ChatMessage, Greeting, GreetingRequest, HelloReply, HelloRequest, NumberRequest, SumReply,
};
use crate::grpc::error::RpcError;

/// A facade over the generated [`DemoServiceClient`], one method per gRPC
/// interaction shape.
///
/// All calls multiplex over one channel, so the facade is cheap to clone
/// and share between adapters.
#[derive(Debug, Clone)]
pub struct RpcClient {
    inner: DemoServiceClient<tonic::transport::Channel>,
}

impl RpcClient {
    /// Connect to the backend, failing if the endpoint is unreachable.
    pub async fn connect(url: impl Into<String>) -> Result<Self, RpcError> {
        let channel = Endpoint::from_shared(url.into())?.connect().await?;
        Ok(Self {
            inner: DemoServiceClient::new(channel),
        })
    }

    /// Build a client whose channel connects on first use.
    pub fn connect_lazy(url: impl Into<String>) -> Result<Self, RpcError> {
        let channel = Endpoint::from_shared(url.into())?.connect_lazy();
        Ok(Self {
            inner: DemoServiceClient::new(channel),
        })
    }

    /// Unary round trip.
    pub async fn say_hello(&self, name: impl Into<String>) -> Result<HelloReply, RpcError> {
        let request = HelloRequest { name: name.into() };
        let response = self.inner.clone().say_hello(request).await?;
        Ok(response.into_inner())
    }

    /// Open a server stream of greetings. The stream is lazy and finite,
    /// terminated by end-of-stream or a status error.
    pub async fn stream_greetings(
        &self,
        name: impl Into<String>,
    ) -> Result<Streaming<Greeting>, RpcError> {
        let request = GreetingRequest { name: name.into() };
        let response = self.inner.clone().stream_greetings(request).await?;
        Ok(response.into_inner())
    }

    /// Stream numbers to the backend and await the single summed reply.
    ///
    /// The reply future resolves exactly once, after `numbers` ends.
    pub async fn add_numbers(
        &self,
        numbers: impl Stream<Item = NumberRequest> + Send + 'static,
    ) -> Result<SumReply, RpcError> {
        let response = self.inner.clone().add_numbers(numbers).await?;
        Ok(response.into_inner())
    }

    /// Open the bidirectional chat stream. Writes go through `outbound`;
    /// the returned stream yields the peer's messages in emission order,
    /// independent of the write side.
    pub async fn chat(
        &self,
        outbound: impl Stream<Item = ChatMessage> + Send + 'static,
    ) -> Result<Streaming<ChatMessage>, RpcError> {
        let response = self.inner.clone().chat(outbound).await?;
        Ok(response.into_inner())
    }
}

#[tonic::async_trait]
impl ChatTransport for RpcClient {
    async fn open_chat(&self, outbound: ChatOutbound) -> Result<ChatInbound, RpcError> {
        let inbound = self.chat(outbound).await?;
        Ok(Box::pin(inbound))
    }
}
