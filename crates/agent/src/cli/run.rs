//! `tidings run`: one-shot execution, the command cron invokes.
//!
//! Executes exactly one run, prints the model's final reply to stdout and
//! exits non-zero if the run aborted.

use std::sync::Arc;

use td_domain::config::Config;

use crate::bootstrap;
use crate::cli::lock::acquire_history_lock;
use crate::runtime;

pub async fn run(
    config: Arc<Config>,
    message: Option<String>,
    model: Option<String>,
) -> anyhow::Result<()> {
    let _lock = acquire_history_lock(&config.history.lock_path())?;

    let state = bootstrap::build_app_state(config, model)?;

    let outcome = runtime::run_once(&state, message).await?;

    if outcome.tool_rounds > 0 {
        eprintln!("\x1b[2m[{} tool call(s)]\x1b[0m", outcome.tool_rounds);
    }
    println!("{}", outcome.reply);
    Ok(())
}
