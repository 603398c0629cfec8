//! Reverse-capability bookkeeping: pending sampling and elicitation
//! records, and the synchronous roots provider (§4.5).
//!
//! The session core never resolves these itself — it hands the host a
//! record through an [`crate::InspectorEvent`] and waits for `respond()` or
//! `cancel()`. Exactly one of those may succeed per record; the `resolved`
//! flag enforces that at the call site in [`crate::InspectorClient`].

use inspector_protocol::types::{CreateMessageRequest, ElicitRequestParams, Root};
use inspector_types::MessageId;

/// A `sampling/createMessage` request awaiting a host decision.
#[derive(Debug, Clone)]
pub struct PendingSample {
    pub id: u64,
    pub request: CreateMessageRequest,
    pub(crate) wire_id: MessageId,
    pub related_task_id: Option<String>,
    pub(crate) resolved: bool,
}

/// An `elicitation/create` request awaiting a host decision. `params`
/// distinguishes form vs. url mode (§4.5).
#[derive(Debug, Clone)]
pub struct PendingElicitation {
    pub id: u64,
    pub params: ElicitRequestParams,
    pub(crate) wire_id: MessageId,
    pub related_task_id: Option<String>,
    pub(crate) resolved: bool,
}

/// The host-supplied synchronous `roots/list` answer. Kept as a plain
/// (non-async) trait since the session core treats `roots/list` as
/// immediate-latency (§4.3 table), unlike sampling and elicitation.
pub trait RootsProvider: Send + Sync {
    fn list(&self) -> Vec<Root>;
}

/// A [`RootsProvider`] backed by a list the host can replace with
/// `set_roots`, for hosts with no dynamic root source of their own.
pub struct StaticRootsProvider {
    roots: parking_lot::RwLock<Vec<Root>>,
}

impl StaticRootsProvider {
    pub fn new(roots: Vec<Root>) -> Self {
        Self {
            roots: parking_lot::RwLock::new(roots),
        }
    }

    pub fn set(&self, roots: Vec<Root>) {
        *self.roots.write() = roots;
    }
}

impl RootsProvider for StaticRootsProvider {
    fn list(&self) -> Vec<Root> {
        self.roots.read().clone()
    }
}
