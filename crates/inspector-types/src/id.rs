use std::fmt;

use serde::{Deserialize, Serialize};

/// A JSON-RPC request/response identifier.
///
/// MCP allows both numeric and string ids on the wire; the core always
/// allocates numeric ids for outbound requests (§4.1) but must be able to
/// echo back whatever shape a peer's inbound request used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    /// Numeric id, as allocated by this core's outbound registry.
    Number(i64),
    /// String id, as used by some peers for inbound requests.
    String(String),
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for MessageId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let a = MessageId::Number(7);
        let b = MessageId::String("abc".into());
        assert_eq!(a, serde_json::from_value(serde_json::to_value(&a).unwrap()).unwrap());
        assert_eq!(b, serde_json::from_value(serde_json::to_value(&b).unwrap()).unwrap());
    }

    #[test]
    fn displays_without_quotes() {
        assert_eq!(MessageId::Number(3).to_string(), "3");
        assert_eq!(MessageId::from("id-1").to_string(), "id-1");
    }
}
