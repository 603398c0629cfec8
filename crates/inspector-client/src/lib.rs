//! Session core, server model, and task controller for the inspector client.
//!
//! [`InspectorClient`] is the one public entry point: build it from a
//! [`SessionBuilder`] around any [`inspector_transport::Transport`], await
//! `connect`, then drive the session through its typed operations and
//! [`InspectorClient::subscribe`] for push events. Everything else in this
//! crate is plumbing the actor task and the shared snapshot need to talk to
//! each other; hosts only ever touch `client`, `config`, `event`, and
//! `reverse`.

mod actor;
mod client;
mod config;
mod event;
mod history;
mod registry;
mod reverse;
mod shared;
mod tasks;

pub use client::InspectorClient;
pub use config::{SessionBuilder, SessionConfig};
pub use event::{
    FetchEntry, InspectorEvent, MessageDirection, MessageEntry, ProgressUpdate, StderrEntry,
};
pub use reverse::{PendingElicitation, PendingSample, RootsProvider, StaticRootsProvider};
pub use shared::{TimestampedResource, ToolCacheEntry};
pub use tasks::TaskUpdateMode;
