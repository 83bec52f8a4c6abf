//! Tidings agent: conversation driver, trigger surfaces and CLI.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod runtime;
pub mod state;
