//! Conversation history for Tidings.
//!
//! Turn records live in an append-only store ([`HistoryStore`]) and are
//! materialized into the transcript the inference service consumes by the
//! [`codec`]. [`legacy`] converts exports of the older key-shaped documents.

pub mod codec;
pub mod legacy;
pub mod store;

pub use codec::{classify, decode, encode, parse_jsonl};
pub use store::{HistoryStore, JsonlHistoryStore, MemoryHistoryStore};
