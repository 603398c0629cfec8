//! Shared scalar aliases and small cross-cutting structures.

use serde::{Deserialize, Serialize};

/// An MCP resource or template URI. Not validated at this layer; transports
/// and the server model treat it as an opaque stable key (§3).
pub type Uri = String;

/// A MIME type string.
pub type MimeType = String;

/// Opaque pagination cursor (§3, §4.4): callers must not parse it.
pub type Cursor = String;

/// Negotiated MCP protocol version string, e.g. `"2025-06-18"`.
pub type ProtocolVersion = String;

/// Caller-chosen correlation token for `notifications/progress` (§4.1, §4.6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum ProgressToken {
    Number(i64),
    String(String),
}

/// Message role in a sampling conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Client or server identity exchanged during `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Implementation {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Display/priority hints a server may attach to content or catalog entries.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Annotations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<Vec<Role>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<f64>,
}
