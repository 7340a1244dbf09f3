use axum::Json;
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{error, warn};

use crate::bridge::AppState;
use crate::bridge::error::ApiError;
use crate::chat::ClientId;
use crate::demo_proto::{ChatMessage, NumberRequest};
use crate::grpc::RpcError;

#[derive(Deserialize)]
pub struct SayHelloRequest {
    name: String,
}

#[derive(Serialize)]
pub struct SayHelloResponse {
    message: String,
}

/// POST /sayHello
pub async fn say_hello(
    State(state): State<AppState>,
    Json(req): Json<SayHelloRequest>,
) -> Result<Json<SayHelloResponse>, ApiError> {
    let reply = state.rpc.say_hello(req.name).await?;
    Ok(Json(SayHelloResponse {
        message: reply.message,
    }))
}

#[derive(Deserialize)]
pub struct StreamGreetingsQuery {
    name: String,
}

#[derive(Serialize)]
pub struct StreamGreetingsResponse {
    greetings: Vec<String>,
}

/// GET /api/stream-greetings
///
/// Buffers the whole backend stream, then answers once. A partial buffer is
/// never returned; on error or deadline the caller gets a generic 500.
pub async fn stream_greetings(
    State(state): State<AppState>,
    Query(query): Query<StreamGreetingsQuery>,
) -> Result<Json<StreamGreetingsResponse>, ApiError> {
    let collect = async {
        let mut stream = state.rpc.stream_greetings(query.name).await?;
        let mut greetings = Vec::new();
        while let Some(greeting) = stream.message().await? {
            greetings.push(greeting.message);
        }
        Ok::<_, RpcError>(greetings)
    };

    match timeout(state.config.collect_timeout, collect).await {
        Ok(Ok(greetings)) => Ok(Json(StreamGreetingsResponse { greetings })),
        Ok(Err(e)) => {
            error!(error = %e, "greeting stream failed");
            Err(ApiError::Streaming)
        }
        Err(_) => {
            error!(deadline = ?state.config.collect_timeout, "greeting stream missed the collection deadline");
            Err(ApiError::Streaming)
        }
    }
}

#[derive(Serialize)]
pub struct AddNumbersResponse {
    sum: i64,
}

/// POST /api/add-numbers
///
/// Writes are fire-and-forget against the request stream; only the single
/// summed reply is awaited.
pub async fn add_numbers(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<AddNumbersResponse>, ApiError> {
    let Some(numbers) = body.get("numbers").and_then(Value::as_array) else {
        return Err(ApiError::Validation("numbers must be an array".to_string()));
    };
    let numbers = numbers
        .iter()
        .map(|v| {
            v.as_i64().ok_or_else(|| {
                ApiError::Validation("numbers must contain only integers".to_string())
            })
        })
        .collect::<Result<Vec<i64>, _>>()?;

    let (tx, rx) = mpsc::unbounded_channel();
    for number in numbers {
        let _ = tx.send(NumberRequest { number });
    }
    drop(tx);

    let reply = state
        .rpc
        .add_numbers(UnboundedReceiverStream::new(rx))
        .await?;
    Ok(Json(AddNumbersResponse { sum: reply.sum }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSendRequest {
    client_id: Option<String>,
    #[serde(default)]
    sender: String,
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
pub struct ChatSendResponse {
    status: &'static str,
}

/// POST /api/chat/send
///
/// Acknowledges as soon as the message is queued; replies arrive on the SSE
/// stream, not here.
pub async fn chat_send(
    State(state): State<AppState>,
    Json(req): Json<ChatSendRequest>,
) -> Result<Json<ChatSendResponse>, ApiError> {
    let Some(client_id) = req.client_id.filter(|id| !id.is_empty()) else {
        return Err(ApiError::Validation("clientId is required".to_string()));
    };

    state.chat.send(
        &ClientId::from(client_id),
        ChatMessage {
            sender: req.sender,
            text: req.message,
        },
    );

    Ok(Json(ChatSendResponse { status: "sent" }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatStreamQuery {
    client_id: Option<String>,
}

#[derive(Serialize)]
struct ChatEvent {
    sender: String,
    text: String,
}

/// GET /api/chat/stream
///
/// Attaches the connection to the session's fan-out channel and pushes one
/// event per backend-delivered message until the viewer disconnects.
pub async fn chat_stream(
    State(state): State<AppState>,
    Query(query): Query<ChatStreamQuery>,
) -> Result<Response, ApiError> {
    let Some(client_id) = query.client_id.filter(|id| !id.is_empty()) else {
        return Err(ApiError::Validation("clientId is required".to_string()));
    };

    let mut events = state.chat.subscribe(&ClientId::from(client_id))?;

    let stream = async_stream::stream! {
        loop {
            match events.recv().await {
                Ok(msg) => {
                    yield Event::default().json_data(ChatEvent {
                        sender: msg.sender,
                        text: msg.text,
                    });
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "viewer fell behind, dropping events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Ok(Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(state.config.sse_keep_alive)
                .text("keep-alive"),
        )
        .into_response())
}
