//! Shared types for the Tidings crates: the error enum, persisted turn
//! records, transcript entries, tool schemas, configuration and trace events.

pub mod config;
pub mod error;
pub mod record;
pub mod tool;
pub mod trace;
