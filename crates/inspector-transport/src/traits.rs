use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{mpsc, Mutex};

use crate::error::TransportResult;

/// One of the two things a transport can hand back once it is open: a
/// complete inbound frame, or notice that the channel closed (either
/// cleanly, at the caller's request, or because of an error).
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Frame(Bytes),
    Closed { reason: Option<String> },
}

/// The live handle returned by [`Transport::open`]. Frames go out through
/// `send`; frames and the eventual close notice come back through
/// `recv_event`. Dropping the handle closes the underlying transport.
pub struct TransportHandle {
    outbound: mpsc::UnboundedSender<Bytes>,
    events: Mutex<mpsc::UnboundedReceiver<TransportEvent>>,
}

impl TransportHandle {
    pub(crate) fn new(
        outbound: mpsc::UnboundedSender<Bytes>,
        events: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> Self {
        Self {
            outbound,
            events: Mutex::new(events),
        }
    }

    /// Queue a frame for the background I/O task to write. Returns
    /// immediately; write failures surface as a subsequent `Closed` event.
    pub fn send(&self, frame: Bytes) -> TransportResult<()> {
        self.outbound
            .send(frame)
            .map_err(|_| crate::error::TransportError::NotOpen)
    }

    /// Await the next frame or close notice. Returns `None` only after the
    /// event channel itself has been dropped by the background task, which
    /// always happens after emitting a final `Closed` event.
    pub async fn recv_event(&self) -> Option<TransportEvent> {
        self.events.lock().await.recv().await
    }
}

/// A pluggable MCP carrier. Three operations, as described in the transport
/// design: `open`, `send` (via the returned handle), and `close`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&mut self) -> TransportResult<TransportHandle>;

    async fn close(&mut self) -> TransportResult<()>;
}

/// Reconnect policy shared by the two HTTP-backed transports.
#[derive(Clone, Debug)]
pub enum RetryPolicy {
    Fixed {
        interval: Duration,
        max_attempts: Option<u32>,
    },
    Exponential {
        base: Duration,
        max_delay: Duration,
        max_attempts: Option<u32>,
    },
    Never,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            max_attempts: Some(6),
        }
    }
}

impl RetryPolicy {
    /// The delay before the given (zero-based) retry attempt, or `None` if
    /// the policy says to give up.
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        match self {
            Self::Fixed {
                interval,
                max_attempts,
            } => {
                if max_attempts.is_some_and(|max| attempt >= max) {
                    return None;
                }
                Some(*interval)
            }
            Self::Exponential {
                base,
                max_delay,
                max_attempts,
            } => {
                if max_attempts.is_some_and(|max| attempt >= max) {
                    return None;
                }
                let doubled = base.as_millis() as u64 * 2u64.saturating_pow(attempt);
                Some(Duration::from_millis(doubled.min(max_delay.as_millis() as u64)))
            }
            Self::Never => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_backoff_caps_at_max_delay() {
        let policy = RetryPolicy::Exponential {
            base: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            max_attempts: Some(6),
        };
        assert_eq!(policy.delay(0), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay(1), Some(Duration::from_millis(200)));
        assert_eq!(policy.delay(4), Some(Duration::from_millis(1600)));
        assert_eq!(policy.delay(10), Some(Duration::from_secs(10)));
        assert_eq!(policy.delay(6), None);
    }

    #[test]
    fn never_policy_always_gives_up() {
        assert_eq!(RetryPolicy::Never.delay(0), None);
    }
}
