use std::sync::Arc;

use td_domain::config::Config;
use tokio_util::task::TaskTracker;

use crate::runtime::{Driver, RunLockMap, TriggerSource};

/// Shared application state passed to the HTTP handlers and CLI commands.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub driver: Arc<Driver>,
    pub trigger: Arc<TriggerSource>,
    pub run_locks: Arc<RunLockMap>,
    /// Runs started by the HTTP trigger; drained before the server exits.
    pub runs: TaskTracker,
}
