//! Notification sinks: where `send_email` hands its message off.
//!
//! - [`HttpRelaySink`] POSTs the message to a mail relay endpoint.
//! - [`OutboxSink`] appends it to a local JSONL outbox, for development and
//!   dry runs.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use td_domain::error::{Error, Result};

const RELAY_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<()>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// HTTP relay
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

pub struct HttpRelaySink {
    client: reqwest::Client,
    endpoint: String,
    sender: String,
    recipient: String,
    bearer: Option<String>,
}

impl HttpRelaySink {
    pub fn new(
        endpoint: impl Into<String>,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        bearer: Option<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(RELAY_TIMEOUT)
            .build()
            .map_err(|e| Error::Notify(format!("building relay client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            sender: sender.into(),
            recipient: recipient.into(),
            bearer,
        })
    }
}

#[async_trait::async_trait]
impl NotificationSink for HttpRelaySink {
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let msg = RelayMessage {
            from: &self.sender,
            to: &self.recipient,
            subject,
            body,
        };

        let mut req = self.client.post(&self.endpoint).json(&msg);
        if let Some(ref key) = self.bearer {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Error::Notify(format!("relay unreachable: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::Notify(format!(
                "relay returned HTTP {}: {}",
                status.as_u16(),
                text.trim()
            )));
        }

        tracing::info!(to = %self.recipient, subject = %subject, "message handed to relay");
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Local outbox
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One line of the outbox file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub struct OutboxSink {
    path: PathBuf,
    recipient: String,
    write_lock: Arc<Mutex<()>>,
}

impl OutboxSink {
    pub fn new(path: impl Into<PathBuf>, recipient: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            recipient: recipient.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every message in the outbox.
    pub fn read_all(&self) -> Result<Vec<OutboxEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        raw.lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(Error::from))
            .collect()
    }
}

#[async_trait::async_trait]
impl NotificationSink for OutboxSink {
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let entry = OutboxEntry {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            to: self.recipient.clone(),
            subject: subject.to_owned(),
            body: body.to_owned(),
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let path = self.path.clone();
        let lock = Arc::clone(&self.write_lock);
        tokio::task::spawn_blocking(move || {
            use std::io::Write;
            let _guard = lock.lock();
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            file.write_all(line.as_bytes())?;
            Ok::<(), std::io::Error>(())
        })
        .await
        .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))?
        .map_err(|e| Error::Notify(format!("writing outbox {}: {e}", self.path.display())))?;

        tracing::info!(id = %entry.id, subject = %subject, "message written to outbox");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn outbox_appends_one_line_per_message() {
        let dir = tempfile::tempdir().unwrap();
        let sink = OutboxSink::new(dir.path().join("out").join("outbox.jsonl"), "me@example.com");

        sink.send("Morning", "Have a good day").await.unwrap();
        sink.send("Evening", "Sleep well").await.unwrap();

        let entries = sink.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].subject, "Morning");
        assert_eq!(entries[1].body, "Sleep well");
        assert_eq!(entries[1].to, "me@example.com");
        assert_ne!(entries[0].id, entries[1].id);
    }
}
