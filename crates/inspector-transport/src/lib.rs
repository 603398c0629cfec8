//! Pluggable MCP transports behind one [`Transport`] trait: stdio, SSE, and
//! streamable HTTP.
//!
//! This crate owns bytes on the wire and connection lifecycle; it knows
//! nothing about JSON-RPC semantics beyond treating each transport message as
//! an opaque frame of bytes to hand to `inspector-protocol` for decoding.

mod error;
mod http;
mod sse;
mod stdio;
mod traits;

pub use error::{TransportError, TransportResult};
pub use http::{StreamableHttpConfig, StreamableHttpTransport};
pub use sse::{SseConfig, SseTransport};
pub use stdio::{StdioConfig, StdioTransport};
pub use traits::{RetryPolicy, Transport, TransportEvent, TransportHandle};
