//! Core runtime: the conversation driver, its run lock, and trigger sources.
//!
//! Entry point: [`run_once`] takes the shared state, serializes against
//! other runs on the same store, and drives one trigger to a reply.

pub mod driver;
pub mod run_lock;
pub mod trigger;

pub use driver::{
    Clock, Conversation, Driver, DriverSettings, DriverState, RunOutcome, SystemClock,
    INTERRUPTED_RESULT,
};
pub use run_lock::{RunLockMap, RunPermit};
pub use trigger::TriggerSource;

use td_domain::error::Result;

use crate::state::AppState;

/// Execute exactly one run. `message` overrides the configured trigger.
pub async fn run_once(state: &AppState, message: Option<String>) -> Result<RunOutcome> {
    let _permit = state
        .run_locks
        .acquire(state.driver.history().identity())
        .await?;

    let trigger = message.unwrap_or_else(|| state.trigger.next_text());
    state.driver.run(&trigger).await
}

/// Stop accepting tracked runs and wait for those in flight to finish, so
/// no run is cut off between a tool call and its recorded result.
pub async fn drain_runs(state: &AppState) {
    state.runs.close();
    let pending = state.runs.len();
    if pending > 0 {
        tracing::info!(pending, "waiting for in-flight runs to finish");
    }
    state.runs.wait().await;
}
