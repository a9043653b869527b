use crate::common::{ChatMessage, Settings};

/// Everything written to local storage between sessions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedState {
    pub messages: Vec<ChatMessage>,
    /// `None` when nothing was saved yet, so callers can apply their own
    /// first-run defaults.
    pub settings: Option<Settings>,
    pub conversation_context: String,
    pub has_started_chat: bool,
}

/// One entry of the offline asset cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedAsset {
    pub url: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub cached_at: i64,
}
