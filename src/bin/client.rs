//! Demo client walking through all four call shapes in sequence.

use anyhow::Result;
use futures::stream;
use rpc_bridge_prototype::demo_proto::{ChatMessage, NumberRequest};
use rpc_bridge_prototype::grpc::RpcClient;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let url = std::env::var("BACKEND_URL").unwrap_or_else(|_| "http://[::1]:50051".to_string());

    let client = RpcClient::connect(url).await?;

    // Unary
    let reply = client.say_hello("Rust Client").await?;
    info!(message = %reply.message, "SayHello reply");

    // Server streaming
    let mut greetings = client.stream_greetings("Streaming Fan").await?;
    while let Some(greeting) = greetings.message().await? {
        info!(message = %greeting.message, "greeting received");
    }

    // Client streaming
    let numbers = stream::iter((1..=5).map(|number| NumberRequest { number }));
    let reply = client.add_numbers(numbers).await?;
    info!(sum = reply.sum, "AddNumbers reply");

    // Bidirectional streaming
    let messages = ["Hi Server!", "How are you?", "gRPC is cool!"];
    let outbound = stream::iter(messages.map(|text| ChatMessage {
        sender: "RustClient".to_string(),
        text: text.to_string(),
    }));

    let mut chat = client.chat(outbound).await?;
    while let Some(msg) = chat.message().await? {
        info!(sender = %msg.sender, text = %msg.text, "chat reply");
    }

    Ok(())
}
