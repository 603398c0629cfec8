//! Server-initiated user input requests (§4.5).
//!
//! Two modes: form mode collects structured data in-band through MCP; URL
//! mode sends the user out-of-band to a URL for data (credentials, OAuth)
//! that must never transit the MCP channel itself.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ElicitationAction {
    Accept,
    Decline,
    Cancel,
}

/// A single field in a form-mode schema. Kept to the primitive subset a
/// host needs to render a form; nested objects are out of scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PrimitiveSchemaDefinition {
    #[serde(rename = "string")]
    String {
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
        enum_values: Option<Vec<String>>,
    },
    #[serde(rename = "number")]
    Number {
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    #[serde(rename = "boolean")]
    Boolean {
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElicitationSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: HashMap<String, PrimitiveSchemaDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl ElicitationSchema {
    pub fn new() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: HashMap::new(),
            required: None,
        }
    }
}

impl Default for ElicitationSchema {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ElicitMode {
    Form,
    Url,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormElicitRequestParams {
    pub message: String,
    #[serde(rename = "requestedSchema")]
    pub schema: ElicitationSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlElicitRequestParams {
    pub mode: ElicitMode,
    #[serde(rename = "elicitationId")]
    pub elicitation_id: String,
    pub message: String,
    pub url: String,
}

/// The two elicitation shapes are distinguished by the presence of
/// `requestedSchema` (form) versus `elicitationId`/`url` (url), so this
/// union is untagged rather than carrying its own discriminant (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElicitRequestParams {
    Form(FormElicitRequestParams),
    Url(UrlElicitRequestParams),
}

impl ElicitRequestParams {
    pub fn message(&self) -> &str {
        match self {
            Self::Form(f) => &f.message,
            Self::Url(u) => &u.message,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElicitRequest {
    #[serde(flatten)]
    pub params: ElicitRequestParams,
}

/// User's response to an elicitation. `content` is only populated for an
/// accepted form-mode request; url mode never carries data back through
/// MCP (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElicitResult {
    pub action: ElicitationAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<HashMap<String, serde_json::Value>>,
}

/// Sent by the server once an out-of-band url-mode elicitation completes,
/// so the client knows it is safe to retry the original request (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElicitationCompleteNotification {
    #[serde(rename = "elicitationId")]
    pub elicitation_id: String,
}
