use std::time::Duration;

use bon::Builder;

/// Configuration for the HTTP bridge.
#[derive(Debug, Clone, Builder)]
pub struct BridgeConfig {
    /// Deadline for draining a server stream into one buffered response.
    /// A stream that outlives it is reported like a stream error.
    #[builder(default = Duration::from_secs(30))]
    pub collect_timeout: Duration,

    /// Interval between SSE keep-alive comment frames.
    #[builder(default = Duration::from_secs(15))]
    pub sse_keep_alive: Duration,

    /// Capacity of each chat session's fan-out channel. A viewer that falls
    /// further behind loses the overwritten events.
    #[builder(default = 256)]
    pub event_capacity: usize,
}
