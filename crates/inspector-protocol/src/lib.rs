//! The MCP wire codec and type catalog.
//!
//! This crate has no transport or session knowledge: it only knows how to
//! turn typed requests/responses/notifications into JSON-RPC 2.0 frames and
//! back, against the MCP method catalog.

pub mod jsonrpc;
pub mod types;

pub use jsonrpc::{JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

/// The MCP protocol version this core negotiates during `initialize`.
pub const PROTOCOL_VERSION: &str = "2025-06-18";
