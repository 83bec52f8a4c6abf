//! `tidings chat`: continuous REPL.
//!
//! Each line you type is a trigger. The history is loaded once and the
//! conversation keeps growing across lines; everything is persisted exactly
//! as in a scheduled run.

use std::sync::Arc;

use td_domain::config::Config;

use crate::bootstrap;
use crate::cli::lock::acquire_history_lock;
use crate::runtime::Conversation;
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public entry point
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn chat(config: Arc<Config>, model: Option<String>) -> anyhow::Result<()> {
    // 1. Hold the history lock for the whole session.
    let _lock = acquire_history_lock(&config.history.lock_path())?;

    // 2. Boot the runtime and load the conversation.
    let state = bootstrap::build_app_state(config, model)?;
    let _permit = state
        .run_locks
        .acquire(state.driver.history().identity())
        .await?;
    let mut conv = state.driver.open().await?;

    // 3. Initialize rustyline editor with persistent history.
    let history_path = dirs::home_dir()
        .unwrap_or_default()
        .join(".tidings")
        .join("chat_history.txt");
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let mut rl = rustyline::DefaultEditor::new()?;
    let _ = rl.load_history(&history_path);

    // 4. Welcome message goes to stderr (keep stdout clean for replies).
    eprintln!("Tidings interactive chat");
    eprintln!(
        "History: {} ({} turns)  |  Type /help for commands, Ctrl+D to exit",
        state.driver.history().identity(),
        conv.len()
    );
    eprintln!();

    // 5. REPL loop.
    loop {
        match rl.readline("you> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                rl.add_history_entry(&line).ok();

                if trimmed.starts_with('/') {
                    if handle_slash_command(trimmed, &state) {
                        break;
                    }
                    continue;
                }

                if let Err(e) = send_trigger(&state, &mut conv, trimmed).await {
                    eprintln!("\x1B[31merror: {e}\x1B[0m");
                    // The store may have diverged from memory; reload it.
                    match state.driver.open().await {
                        Ok(fresh) => conv = fresh,
                        Err(e) => {
                            eprintln!("\x1B[31mcannot reload history: {e}\x1B[0m");
                            break;
                        }
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                eprintln!("(Use Ctrl+D or /exit to quit)");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("\x1B[31mreadline error: {e}\x1B[0m");
                break;
            }
        }
    }

    // 6. Save history.
    rl.save_history(&history_path).ok();

    eprintln!("Goodbye!");
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Slash command handling
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Process a slash command.  Returns `true` if the REPL should exit.
fn handle_slash_command(input: &str, state: &AppState) -> bool {
    let cmd = input.split_whitespace().next().unwrap_or(input);

    match cmd {
        "/exit" | "/quit" => return true,

        "/trigger" => {
            eprintln!("Scheduled trigger right now: {}", state.trigger.next_text());
        }

        "/clear" => {
            eprint!("\x1B[2J\x1B[1;1H");
        }

        "/help" => {
            eprintln!("Commands:");
            eprintln!("  /trigger     Show the text a scheduled run would send now");
            eprintln!("  /clear       Clear the screen");
            eprintln!("  /exit, /quit Exit the chat");
            eprintln!("  /help        Show this help");
        }

        other => {
            eprintln!("Unknown command: {other}  (type /help for a list)");
        }
    }

    false
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trigger sending
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn send_trigger(state: &AppState, conv: &mut Conversation, text: &str) -> anyhow::Result<()> {
    let outcome = state.driver.respond(conv, text).await?;
    if outcome.tool_rounds > 0 {
        eprintln!("\x1b[2m[{} tool call(s)]\x1b[0m", outcome.tool_rounds);
    }
    println!("{}", outcome.reply);
    Ok(())
}
