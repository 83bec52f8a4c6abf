//! Append-only history stores.
//!
//! [`JsonlHistoryStore`] keeps one JSON line per record in a single file and
//! makes every append durable (`sync_data`) before returning. Reads happen on
//! a blocking thread so the tokio runtime is never stalled by file I/O.
//! [`MemoryHistoryStore`] backs tests and dry runs.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use td_domain::error::{Error, Result};
use td_domain::record::TurnRecord;
use td_domain::trace::TraceEvent;

use crate::codec;

/// Persistence boundary for turn records. There is no update or delete.
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    /// Stable identity of the underlying store, used to key the run lock.
    fn identity(&self) -> &str;

    /// Every record, ascending by `time`. Records with equal timestamps keep
    /// their append order.
    async fn load(&self) -> Result<Vec<TurnRecord>>;

    /// Durably append one record.
    async fn append(&self, record: &TurnRecord) -> Result<()>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// JSONL file store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct JsonlHistoryStore {
    path: PathBuf,
    identity: String,
}

impl JsonlHistoryStore {
    /// The file and its parent directories are created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let identity = path.display().to_string();
        Self { path, identity }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl HistoryStore for JsonlHistoryStore {
    fn identity(&self) -> &str {
        &self.identity
    }

    async fn load(&self) -> Result<Vec<TurnRecord>> {
        let path = self.path.clone();
        let mut records = tokio::task::spawn_blocking(move || read_jsonl_file(&path))
            .await
            .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))??;

        records.sort_by_key(|r| r.time);
        Ok(records)
    }

    async fn append(&self, record: &TurnRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || append_line(&path, &line))
            .await
            .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))??;

        TraceEvent::RecordAppended {
            store: self.identity.clone(),
            kind: record.kind().to_owned(),
        }
        .emit();

        Ok(())
    }
}

fn read_jsonl_file(path: &Path) -> Result<Vec<TurnRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path).map_err(Error::Io)?;
    codec::parse_jsonl(&raw)
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(Error::Io)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::Store(format!("opening {}: {e}", path.display())))?;
    file.write_all(line.as_bytes())
        .map_err(|e| Error::Store(format!("writing {}: {e}", path.display())))?;
    file.sync_data()
        .map_err(|e| Error::Store(format!("syncing {}: {e}", path.display())))?;
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// In-memory store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Volatile store. Can be seeded with existing records and told to start
/// failing appends after a number of successes.
pub struct MemoryHistoryStore {
    name: String,
    records: Mutex<Vec<TurnRecord>>,
    /// Remaining successful appends before failures start. `None` = never fail.
    appends_left: Mutex<Option<usize>>,
}

impl MemoryHistoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self::seeded(name, Vec::new())
    }

    pub fn seeded(name: impl Into<String>, records: Vec<TurnRecord>) -> Self {
        Self {
            name: name.into(),
            records: Mutex::new(records),
            appends_left: Mutex::new(None),
        }
    }

    /// Let `n` more appends succeed, then fail every subsequent one.
    pub fn fail_after(&self, n: usize) {
        *self.appends_left.lock() = Some(n);
    }

    /// Snapshot of the records in append order.
    pub fn records(&self) -> Vec<TurnRecord> {
        self.records.lock().clone()
    }
}

#[async_trait::async_trait]
impl HistoryStore for MemoryHistoryStore {
    fn identity(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> Result<Vec<TurnRecord>> {
        let mut records = self.records.lock().clone();
        records.sort_by_key(|r| r.time);
        Ok(records)
    }

    async fn append(&self, record: &TurnRecord) -> Result<()> {
        {
            let mut left = self.appends_left.lock();
            match left.as_mut() {
                Some(0) => {
                    return Err(Error::Store(format!(
                        "{}: injected append failure",
                        self.name
                    )))
                }
                Some(n) => *n -= 1,
                None => {}
            }
        }
        self.records.lock().push(record.clone());
        Ok(())
    }
}
