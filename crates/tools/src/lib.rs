//! Tools the model may call, and the registry that runs them.
//!
//! - [`registry`]: the [`Tool`] trait, [`ToolOutcome`] and the fault-isolating
//!   [`ToolRegistry`]
//! - [`email`]: the `send_email` tool
//! - [`notify`]: notification sinks `send_email` delivers through

pub mod email;
pub mod notify;
pub mod registry;

pub use email::{SendEmailTool, SEND_EMAIL, SENT_OK};
pub use notify::{HttpRelaySink, NotificationSink, OutboxEntry, OutboxSink};
pub use registry::{FailureKind, Tool, ToolOutcome, ToolRegistry};
