pub mod client;
pub mod offline_cache;
pub mod request;
pub mod stream;

pub use client::ChatClient;
pub use offline_cache::OfflineCache;
pub use request::{ChatRequest, conversation_context, recent_history};
