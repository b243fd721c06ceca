use std::time::Duration;
use crate::error::{RtmResult, RtmError};

// ============================================================================
// Configuration options
// ============================================================================

/// Configuration options for the RTM client.
#[derive(Debug, Clone)]
pub struct RtmOptions {
    pub(crate) send_interval: Duration,
    pub(crate) spin_wait_duration: Duration,
    pub(crate) nodelay: Option<bool>,
    pub(crate) ttl: Option<u32>,
}

impl Default for RtmOptions {
    fn default() -> Self {
        RtmOptions {
            send_interval: Duration::from_secs(1),
            spin_wait_duration: Duration::from_millis(10),
            nodelay: None,
            ttl: None,
        }
    }
}

impl RtmOptions {
    /// Creates a new `RtmOptions` builder with the defaults: a one second
    /// send interval and a 10ms receive spin wait.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the longest time the send loop waits for an outbound message
    /// before checking again. An enqueue wakes the loop early, so this bounds
    /// worst-case latency, not throughput.
    /// Must be greater than zero.
    pub fn send_interval(mut self, interval: Duration) -> RtmResult<Self> {
        if interval.is_zero() {
            return Err(RtmError::InvalidConfiguration("Send interval cannot be zero".to_string()));
        }
        self.send_interval = interval;
        Ok(self)
    }

    /// Sets the duration the receive loop sleeps after an idle socket read.
    /// Must be greater than zero.
    /// This prevents the receive loop from consuming 100% CPU.
    pub fn spin_wait_duration(mut self, duration: Duration) -> RtmResult<Self> {
        if duration.is_zero() {
            return Err(RtmError::InvalidConfiguration("Spin wait duration cannot be zero".to_string()));
        }
        self.spin_wait_duration = duration;
        Ok(self)
    }

    /// Enables or disables the `TCP_NODELAY` option for frames to be sent.
    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = Some(nodelay);
        self
    }

    /// Sets the TTL (Time To Live, # of hops) for the socket.
    /// None for the system default
    pub fn ttl(mut self, ttl: Option<u32>) -> Self {
        self.ttl = ttl;
        self
    }
}
