//! Gemini API key rotation.
//!
//! Free-tier Gemini keys are rate limited per key, so several can be
//! configured (`llm.auth.keys`). [`AuthRotator`] hands them out in turn and
//! benches a key for a while after the service rejects it.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use td_domain::config::AuthConfig;
use td_domain::error::{Error, Result};

/// How long a rejected key sits out.
const BENCH_PERIOD: Duration = Duration::from_secs(60);

/// A key handed out by [`AuthRotator::next_key`]. Pass `index` back to
/// [`AuthRotator::mark_failed`] if the service rejects it.
#[derive(Debug, Clone)]
pub struct KeyEntry {
    pub index: usize,
    pub key: String,
}

pub struct AuthRotator {
    keys: Vec<String>,
    bench: Duration,
    state: Mutex<Rotation>,
}

struct Rotation {
    cursor: usize,
    /// Per key: the instant it may be used again.
    benched_until: Vec<Option<Instant>>,
}

impl AuthRotator {
    fn with_bench(keys: Vec<String>, bench: Duration) -> Result<Self> {
        if keys.is_empty() {
            return Err(Error::Auth("no API key resolved for the inference service".into()));
        }
        let benched_until = vec![None; keys.len()];
        Ok(Self {
            keys,
            bench,
            state: Mutex::new(Rotation { cursor: 0, benched_until }),
        })
    }

    /// Resolve every configured key up front.
    ///
    /// `auth.keys` names one environment variable per key; when it is empty
    /// the single key comes from [`crate::util::resolve_api_key`].
    pub fn from_auth_config(auth: &AuthConfig) -> Result<Self> {
        let keys = if auth.keys.is_empty() {
            vec![crate::util::resolve_api_key(auth)?]
        } else {
            let mut keys = Vec::with_capacity(auth.keys.len());
            for var in &auth.keys {
                match std::env::var(var) {
                    Ok(v) if !v.trim().is_empty() => keys.push(v),
                    _ => {
                        return Err(Error::Auth(format!(
                            "llm.auth.keys: environment variable '{var}' is unset or empty"
                        )))
                    }
                }
            }
            keys
        };
        Self::with_bench(keys, BENCH_PERIOD)
    }

    /// Next usable key in round-robin order.
    ///
    /// When every key is benched the one returning soonest is used anyway;
    /// the caller gets an error answer rather than no request at all.
    pub fn next_key(&self) -> KeyEntry {
        let mut st = self.state.lock();
        let n = self.keys.len();
        let start = st.cursor % n;
        st.cursor = st.cursor.wrapping_add(1);

        let now = Instant::now();
        let usable = |i: &usize| st.benched_until[*i].map_or(true, |until| until <= now);
        let index = (start..start + n)
            .map(|i| i % n)
            .find(usable)
            .or_else(|| {
                (0..n).min_by_key(|&i| st.benched_until[i].unwrap_or(now))
            })
            .unwrap_or(0);

        KeyEntry { index, key: self.keys[index].clone() }
    }

    /// Bench the key at `index`.
    pub fn mark_failed(&self, index: usize) {
        let mut st = self.state.lock();
        if let Some(slot) = st.benched_until.get_mut(index) {
            *slot = Some(Instant::now() + self.bench);
            tracing::warn!(
                key_index = index,
                bench_secs = self.bench.as_secs(),
                "API key rejected, benching it"
            );
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl std::fmt::Debug for AuthRotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of logs.
        f.debug_struct("AuthRotator")
            .field("keys", &self.keys.len())
            .field("bench", &self.bench)
            .finish()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
