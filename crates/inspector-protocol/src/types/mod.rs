//! The MCP type catalog (§4.1 supplemental, §6).
//!
//! Organized the way the wire protocol groups its methods: one module per
//! feature area, re-exported flat here for convenient `inspector_protocol::types::X` use.

mod capabilities;
mod completion;
mod content;
mod core;
mod elicitation;
mod initialization;
mod logging;
mod prompts;
mod resources;
mod roots;
mod sampling;
mod tasks;
mod tools;

pub use capabilities::*;
pub use completion::*;
pub use content::*;
pub use core::*;
pub use elicitation::*;
pub use initialization::*;
pub use logging::*;
pub use prompts::*;
pub use resources::*;
pub use roots::*;
pub use sampling::*;
pub use tasks::*;
pub use tools::*;
