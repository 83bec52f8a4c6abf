//! `tidings import-legacy`: seed the history from a legacy export.

use std::path::Path;

use td_domain::config::Config;
use td_history::legacy::parse_legacy_jsonl;
use td_history::{HistoryStore, JsonlHistoryStore};

use crate::cli::lock::acquire_history_lock;

pub async fn import_legacy(config: &Config, file: &Path) -> anyhow::Result<()> {
    let _lock = acquire_history_lock(&config.history.lock_path())?;

    let raw = std::fs::read_to_string(file)
        .map_err(|e| anyhow::anyhow!("reading {}: {e}", file.display()))?;
    let records = parse_legacy_jsonl(&raw)
        .map_err(|e| anyhow::anyhow!("{}: {e}", file.display()))?;

    let store = JsonlHistoryStore::new(&config.history.path);
    seed_empty_store(&store, records).await?;
    Ok(())
}

/// Append `records` to an empty store. Returns the number appended.
pub async fn seed_empty_store(
    store: &dyn HistoryStore,
    records: Vec<td_domain::record::TurnRecord>,
) -> anyhow::Result<usize> {
    let existing = store.load().await?;
    if !existing.is_empty() {
        anyhow::bail!(
            "{} already holds {} record(s); import-legacy only seeds an empty history",
            store.identity(),
            existing.len()
        );
    }

    for rec in &records {
        store.append(rec).await?;
    }
    eprintln!("Imported {} record(s) into {}", records.len(), store.identity());
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use td_domain::record::TurnRecord;
    use td_history::MemoryHistoryStore;

    #[tokio::test]
    async fn refuses_non_empty_store() {
        let t = Utc.with_ymd_and_hms(2026, 10, 19, 7, 0, 0).unwrap();
        let store = MemoryHistoryStore::seeded("mem", vec![TurnRecord::user("x", t)]);
        let err = seed_empty_store(&store, vec![TurnRecord::model("y", t)])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("only seeds an empty history"));
    }

    #[tokio::test]
    async fn appends_in_order() {
        let raw = concat!(
            r#"{"model": "hello", "time": "2026-10-19T07:00:01Z"}"#, "\n",
            r#"{"user": "SEND_MORNING", "time": "2026-10-19T07:00:00Z"}"#, "\n",
        );
        let store = MemoryHistoryStore::new("mem");
        let n = seed_empty_store(&store, parse_legacy_jsonl(raw).unwrap()).await.unwrap();
        assert_eq!(n, 2);
        let kinds: Vec<&str> = store.records().iter().map(|r| r.kind()).collect();
        assert_eq!(kinds, vec!["user", "model"]);
    }
}
