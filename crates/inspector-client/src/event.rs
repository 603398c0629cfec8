//! The closed set of events a session broadcasts to host observers (§6).
//!
//! Every state transition produces at most one event. Observers subscribe
//! with [`crate::InspectorClient::subscribe`]; each receiver gets its own
//! copy over `tokio::sync::broadcast`, so a UI and a logger can both watch
//! the same session without coordinating.

use inspector_protocol::types::{CallToolResult, LogLevel, TaskStatus};
use inspector_types::MessageId;

/// A progress update, decoupled from the wire shape so it carries the
/// task linkage the controller resolves (§4.6).
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub progress: Option<f64>,
    pub total: Option<u64>,
    pub message: Option<String>,
    pub related_task_id: Option<String>,
}

#[derive(Debug, Clone)]
pub enum InspectorEvent {
    /// A notification carrying progress, optionally linked to a task.
    Progress(ProgressUpdate),
    /// A subscribed resource changed on the server.
    ResourceUpdated { uri: String },
    ToolsChanged,
    ResourcesChanged,
    PromptsChanged,
    /// Any inbound notification not covered by a dedicated variant.
    ServerNotification { method: String, params: Option<serde_json::Value> },
    NewPendingSample { id: u64 },
    NewPendingElicitation { id: u64 },
    TaskCreated { task_id: String },
    TaskStatusChanged { task_id: String, status: TaskStatus },
    TaskCompleted { task_id: String, result: Box<CallToolResult> },
    MessagesChanged,
    StderrLogsChanged,
    FetchRequestsChanged,
    ResourceContentChanged { uri: String },
    ResourceSubscriptionsChanged,
    /// Logging-level forwarded log line from the server.
    LogMessage { level: LogLevel, data: serde_json::Value, logger: Option<String> },
    Disconnected,
}

/// A recorded outbound or inbound frame kept in the message history buffer
/// (§4.3). `direction` and `summary` are enough for a UI transcript; the raw
/// payload is kept too for a "view JSON" affordance.
#[derive(Debug, Clone)]
pub struct MessageEntry {
    pub direction: MessageDirection,
    pub method: Option<String>,
    pub id: Option<MessageId>,
    pub payload: serde_json::Value,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDirection {
    Outbound,
    Inbound,
}

#[derive(Debug, Clone)]
pub struct StderrEntry {
    pub line: String,
    pub timestamp_ms: u64,
}

/// One completed round trip, recorded for the fetch history buffer
/// regardless of success so a UI can show failures too.
#[derive(Debug, Clone)]
pub struct FetchEntry {
    pub method: String,
    pub duration_ms: u64,
    pub ok: bool,
    pub timestamp_ms: u64,
}
