//! Server log forwarding and progress notification types (§4.4 supplemental, §4.6).

use serde::{Deserialize, Serialize};

use super::core::ProgressToken;
use super::tasks::RelatedTaskMetadata;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetLevelRequest {
    pub level: LogLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingMessageNotification {
    pub level: LogLevel,
    pub data: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
}

/// A progress update, optionally linked back to a task by `_meta.relatedTask`
/// when the originating operation is task-augmented (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressNotification {
    #[serde(rename = "progressToken")]
    pub progress_token: ProgressToken,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<ProgressMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressMeta {
    #[serde(rename = "relatedTask", skip_serializing_if = "Option::is_none")]
    pub related_task: Option<RelatedTaskMetadata>,
}
