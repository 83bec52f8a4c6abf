//! `tidings history`: print the tail of the history store.

use td_domain::config::Config;
use td_domain::record::TurnRecord;
use td_history::{HistoryStore, JsonlHistoryStore};

pub async fn show(config: &Config, limit: usize) -> anyhow::Result<()> {
    let store = JsonlHistoryStore::new(&config.history.path);
    let records = store.load().await?;

    if records.is_empty() {
        eprintln!("No history at {}", store.identity());
        return Ok(());
    }

    for line in format_tail(&records, limit) {
        println!("{line}");
    }
    Ok(())
}

/// `time kind summary` lines for the last `limit` records.
pub fn format_tail(records: &[TurnRecord], limit: usize) -> Vec<String> {
    let start = records.len().saturating_sub(limit);
    records[start..]
        .iter()
        .map(|r| {
            format!(
                "{}  {:<17}  {}",
                r.time.format("%Y-%m-%d %H:%M:%S"),
                r.kind(),
                r.turn.summary()
            )
        })
        .collect()
}
