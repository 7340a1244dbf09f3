//! Chat session registry: one backend bidirectional stream per client id,
//! fanned out to any number of SSE viewers.

pub mod error;

use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::{DashMap, Entry};
use futures::{Stream, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tonic::Status;
use tracing::{debug, info, warn};
use uuid::Uuid;

use self::error::SessionNotFound;
use crate::demo_proto::ChatMessage;
use crate::grpc::RpcError;

/// An externally supplied identifier correlating stateless HTTP calls with
/// one chat session. Any string; the bridge never generates these.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClientId(Arc<str>);

impl ClientId {
    /// Create a new [`ClientId`] from any type that can be converted into an `Arc<str>`.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ClientId {
    fn from(s: String) -> Self {
        Self(s.into())
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

/// Identifies one opened backend stream. A client id can be reused across
/// sessions over time; a session id never is.
#[derive(Clone, Hash, PartialEq, Eq)]
pub struct ChatSessionId(Arc<Uuid>);

impl ChatSessionId {
    pub fn generate() -> Self {
        Self(Arc::new(Uuid::new_v4()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Debug for ChatSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChatSessionId({})", self.0)
    }
}

impl fmt::Display for ChatSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The outbound half of a session: the registry writes into the paired
/// sender, the backend call consumes this stream.
pub type ChatOutbound = UnboundedReceiverStream<ChatMessage>;

/// The backend's reply stream, boxed so transports can differ.
pub type ChatInbound = Pin<Box<dyn Stream<Item = Result<ChatMessage, Status>> + Send>>;

/// The seam between the registry and the backend chat call.
#[tonic::async_trait]
pub trait ChatTransport: Send + Sync + 'static {
    /// Open one bidirectional chat stream. `outbound` yields the messages
    /// written for this session, in send order.
    async fn open_chat(&self, outbound: ChatOutbound) -> Result<ChatInbound, RpcError>;
}

/// Text of the synthetic notice published to viewers when a session's
/// backend stream fails.
pub const STREAM_ERROR_NOTICE: &str = "Error occurred.";

struct ChatSession {
    session_id: ChatSessionId,
    outbound: mpsc::UnboundedSender<ChatMessage>,
    events: broadcast::Sender<ChatMessage>,
}

/// Registry of live chat sessions, the single owner of every backend chat
/// stream.
///
/// Create-or-get runs under the map's entry guard, so two near-simultaneous
/// first sends for one unseen id open exactly one backend stream.
#[derive(Clone)]
pub struct ChatRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    transport: Arc<dyn ChatTransport>,
    sessions: DashMap<ClientId, ChatSession, ahash::RandomState>,
    created: AtomicU64,
    event_capacity: usize,
}

impl ChatRegistry {
    /// Create an empty registry. `event_capacity` bounds each session's
    /// fan-out channel; a viewer that falls further behind loses the
    /// overwritten events.
    pub fn new(transport: Arc<dyn ChatTransport>, event_capacity: usize) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                transport,
                sessions: DashMap::default(),
                created: AtomicU64::new(0),
                event_capacity,
            }),
        }
    }

    /// Queue `message` for the session of `client_id`, creating the session
    /// and its backend stream on first use.
    ///
    /// Returns as soon as the message is queued; replies arrive on the
    /// fan-out channel, never here. If the entry's backend stream already
    /// ended, the stale entry is dropped and a fresh session takes its
    /// place.
    pub fn send(&self, client_id: &ClientId, message: ChatMessage) -> ChatSessionId {
        loop {
            let (session_id, queued) = match self.inner.sessions.entry(client_id.clone()) {
                Entry::Occupied(entry) => {
                    let session = entry.get();
                    (
                        session.session_id.clone(),
                        session.outbound.send(message.clone()).is_ok(),
                    )
                }
                Entry::Vacant(slot) => {
                    let session_id = ChatSessionId::generate();
                    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
                    let (events_tx, _) = broadcast::channel(self.inner.event_capacity);

                    self.inner.created.fetch_add(1, Ordering::Relaxed);
                    info!(client_id = %client_id, session_id = %session_id, "chat session opened");

                    // The receiver is alive here, so queueing cannot fail.
                    let queued = outbound_tx.send(message.clone()).is_ok();
                    slot.insert(ChatSession {
                        session_id: session_id.clone(),
                        outbound: outbound_tx,
                        events: events_tx.clone(),
                    });

                    // Spawn only after the entry is registered so the
                    // relay's teardown always finds it.
                    tokio::spawn(run_relay(
                        Arc::downgrade(&self.inner),
                        client_id.clone(),
                        session_id.clone(),
                        Arc::clone(&self.inner.transport),
                        UnboundedReceiverStream::new(outbound_rx),
                        events_tx,
                    ));

                    (session_id, queued)
                }
            };

            if queued {
                return session_id;
            }

            // The relay for that session is gone but has not removed its
            // entry yet; drop it ourselves and retry.
            debug!(client_id = %client_id, session_id = %session_id, "dropping stale session entry");
            self.inner
                .sessions
                .remove_if(client_id, |_, session| session.session_id == session_id);
        }
    }

    /// Subscribe a viewer to the fan-out channel of `client_id`.
    ///
    /// Dropping the receiver is the unsubscribe; the session itself is
    /// unaffected by viewers coming and going.
    pub fn subscribe(
        &self,
        client_id: &ClientId,
    ) -> Result<broadcast::Receiver<ChatMessage>, SessionNotFound> {
        self.inner
            .sessions
            .get(client_id)
            .map(|session| session.events.subscribe())
            .ok_or_else(|| SessionNotFound {
                client_id: client_id.clone(),
            })
    }

    pub fn has_active_session(&self, client_id: &ClientId) -> bool {
        self.inner.sessions.contains_key(client_id)
    }

    pub fn active_session_count(&self) -> usize {
        self.inner.sessions.len()
    }

    /// Total sessions ever opened, across all client ids.
    pub fn sessions_created(&self) -> u64 {
        self.inner.created.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for ChatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatRegistry")
            .field("active_sessions", &self.inner.sessions.len())
            .field("sessions_created", &self.inner.created.load(Ordering::Relaxed))
            .finish()
    }
}

/// Forward the backend's replies for one session onto its fan-out channel,
/// then remove the registry entry.
///
/// The at-most-one-stream invariant rests on this task being the only place
/// a backend chat stream is opened or read. The registry reference is weak;
/// removal matches on the session id so a stale task can never tear down a
/// successor session under the same client id.
async fn run_relay(
    registry: Weak<RegistryInner>,
    client_id: ClientId,
    session_id: ChatSessionId,
    transport: Arc<dyn ChatTransport>,
    outbound: ChatOutbound,
    events: broadcast::Sender<ChatMessage>,
) {
    match transport.open_chat(outbound).await {
        Ok(mut inbound) => {
            while let Some(item) = inbound.next().await {
                match item {
                    Ok(msg) => {
                        // send fails only when no viewer is attached
                        let _ = events.send(msg);
                    }
                    Err(status) => {
                        warn!(client_id = %client_id, error = %status, "chat stream error");
                        let _ = events.send(error_notice());
                        break;
                    }
                }
            }
            info!(client_id = %client_id, session_id = %session_id, "chat stream closed");
        }
        Err(e) => {
            warn!(client_id = %client_id, error = %e, "failed to open chat stream");
            let _ = events.send(error_notice());
        }
    }

    if let Some(inner) = registry.upgrade() {
        inner
            .sessions
            .remove_if(&client_id, |_, session| session.session_id == session_id);
    }
}

fn error_notice() -> ChatMessage {
    ChatMessage {
        sender: "Server".to_string(),
        text: STREAM_ERROR_NOTICE.to_string(),
    }
}
