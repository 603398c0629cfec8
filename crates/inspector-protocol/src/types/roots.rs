//! Filesystem-boundary discovery types (§4.5).

use serde::{Deserialize, Serialize};

use super::core::Uri;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Root {
    pub uri: Uri,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// No parameters: roots have no pagination (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ListRootsRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRootsResult {
    pub roots: Vec<Root>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootsListChangedNotification {}
