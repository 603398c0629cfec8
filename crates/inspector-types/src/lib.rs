//! Shared primitives used across the Inspector Client Core workspace.
//!
//! This crate carries no protocol knowledge; it is the lean foundation layer
//! every other crate in the workspace depends on for ids, errors, and the
//! ring buffer used by the history logs.

mod error;
mod id;
mod ring_buffer;

pub use error::{ErrorKind, InspectorError, Result};
pub use id::MessageId;
pub use ring_buffer::RingBuffer;
