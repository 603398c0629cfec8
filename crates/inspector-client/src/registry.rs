//! The outbound request registry (§4.3, §5).
//!
//! One entry per in-flight request the actor sent. Most entries carry an
//! `External` target — a caller on the other end of a `oneshot` waiting on
//! [`crate::client::InspectorClient::call`] — but the actor also sends
//! requests on its own behalf (task polling, list-change resync) and tags
//! those with the matching internal target instead. Timeouts and
//! host-initiated cancellation are both resolved by the actor's periodic
//! tick rather than a timer per request, since it already runs one for task
//! polling.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use inspector_types::{InspectorError, MessageId};

pub(crate) enum ReplyTarget {
    External(oneshot::Sender<Result<Value, InspectorError>>),
    Initialize(oneshot::Sender<Result<(), InspectorError>>),
    TaskPoll(String),
    TaskResult(String),
    ResyncTools,
    ResyncResources,
    ResyncResourceTemplates,
    ResyncPrompts,
}

pub(crate) struct PendingRequest {
    pub(crate) target: ReplyTarget,
    pub(crate) method: String,
    pub(crate) started_at_ms: u64,
    pub(crate) timeout_ms: u64,
    pub(crate) cancel: Option<CancellationToken>,
}

#[derive(Default)]
pub(crate) struct RequestRegistry {
    entries: HashMap<MessageId, PendingRequest>,
}

impl RequestRegistry {
    pub(crate) fn insert(&mut self, id: MessageId, entry: PendingRequest) {
        self.entries.insert(id, entry);
    }

    pub(crate) fn remove(&mut self, id: &MessageId) -> Option<PendingRequest> {
        self.entries.remove(id)
    }

    /// Ids whose timeout has elapsed or whose cancellation token fired, as
    /// of `now_ms`.
    pub(crate) fn expired(&self, now_ms: u64) -> Vec<MessageId> {
        self.entries
            .iter()
            .filter(|(_, entry)| {
                let timed_out = now_ms.saturating_sub(entry.started_at_ms) >= entry.timeout_ms;
                let cancelled = entry
                    .cancel
                    .as_ref()
                    .is_some_and(CancellationToken::is_cancelled);
                timed_out || cancelled
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Drains every entry, for the disconnect path (§5d): each is rejected
    /// with `ConnectionClosed` by the caller.
    pub(crate) fn drain_all(&mut self) -> Vec<(MessageId, PendingRequest)> {
        self.entries.drain().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(target: ReplyTarget, started_at_ms: u64, timeout_ms: u64) -> PendingRequest {
        PendingRequest {
            target,
            method: "tools/call".to_string(),
            started_at_ms,
            timeout_ms,
            cancel: None,
        }
    }

    #[test]
    fn expired_finds_only_requests_past_their_timeout() {
        let mut registry = RequestRegistry::default();
        registry.insert(MessageId::Number(1), entry(ReplyTarget::ResyncTools, 0, 100));
        registry.insert(MessageId::Number(2), entry(ReplyTarget::ResyncTools, 0, 10_000));

        let expired = registry.expired(150);
        assert_eq!(expired, vec![MessageId::Number(1)]);
    }

    #[test]
    fn cancellation_token_expires_a_request_regardless_of_timeout() {
        let mut registry = RequestRegistry::default();
        let token = CancellationToken::new();
        let mut pending = entry(ReplyTarget::ResyncTools, 0, 10_000);
        pending.cancel = Some(token.clone());
        registry.insert(MessageId::Number(1), pending);
        token.cancel();

        assert_eq!(registry.expired(1), vec![MessageId::Number(1)]);
    }

    #[test]
    fn drain_all_empties_the_registry() {
        let mut registry = RequestRegistry::default();
        registry.insert(MessageId::Number(1), entry(ReplyTarget::ResyncTools, 0, 100));
        let drained = registry.drain_all();
        assert_eq!(drained.len(), 1);
        assert!(registry.drain_all().is_empty());
    }
}
