pub mod auth;
pub mod google;
pub mod traits;
pub(crate) mod util;

// Re-exports for convenience.
pub use google::GoogleProvider;
pub use traits::{ChatRequest, ChatResponse, LlmProvider, Usage};
pub use util::{resolve_api_key, store_in_keychain};
