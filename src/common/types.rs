use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Label used inside the free-text conversation context and transcripts.
    pub fn display_name(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// UI / response language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ar,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ar => "ar",
        }
    }

    pub fn direction(self) -> TextDirection {
        match self {
            Language::En => TextDirection::Ltr,
            Language::Ar => TextDirection::Rtl,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDirection {
    Ltr,
    Rtl,
}

impl TextDirection {
    pub fn is_rtl(self) -> bool {
        self == TextDirection::Rtl
    }
}

/// Domain model for one chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub role: Role,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_streaming: bool,
}

impl ChatMessage {
    pub fn user(content: String) -> Self {
        Self::new(content, Role::User, false)
    }

    /// Empty assistant message that the stream will fill in.
    pub fn assistant_placeholder() -> Self {
        Self::new(String::new(), Role::Assistant, true)
    }

    fn new(content: String, role: Role, is_streaming: bool) -> Self {
        Self {
            // v7 ids sort by creation time
            id: Uuid::now_v7().to_string(),
            content,
            role,
            timestamp: Utc::now(),
            is_streaming,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// One `{role, content}` pair of the history sent with each request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

/// User-adjustable settings persisted alongside the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub language: Language,
    pub dark_mode: bool,
    pub pre_instructions: String,
    pub user_has_manually_set_theme: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: Language::default(),
            dark_mode: false,
            pre_instructions: String::new(),
            user_has_manually_set_theme: false,
        }
    }
}
