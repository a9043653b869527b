use rusqlite::{OptionalExtension, Result as SqlResult, params};
use std::path::Path;

use crate::common::{ChatMessage, Settings};
use crate::error::ChatResult;

use super::database::Database;
use super::models::PersistedState;

pub const MESSAGES_KEY: &str = "zaki-messages";
pub const SETTINGS_KEY: &str = "zaki-settings";
pub const CONTEXT_KEY: &str = "zaki-conversation-context";
pub const STARTED_KEY: &str = "zaki-has-started-chat";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
);";

/// Key-value store holding the conversation and settings between sessions.
pub struct StateDatabase {
    db: Database,
}

impl StateDatabase {
    pub fn with_path<P: AsRef<Path>>(path: P) -> SqlResult<Self> {
        Ok(Self {
            db: Database::open(path, SCHEMA)?,
        })
    }

    pub fn in_memory() -> SqlResult<Self> {
        Ok(Self {
            db: Database::open_in_memory(SCHEMA)?,
        })
    }

    fn put(&self, key: &str, value: &str) -> SqlResult<()> {
        self.db.connection().execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at)
             VALUES (?1, ?2, strftime('%s', 'now'))",
            params![key, value],
        )?;
        Ok(())
    }

    fn get(&self, key: &str) -> SqlResult<Option<String>> {
        self.db
            .connection()
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
    }

    fn remove(&self, key: &str) -> SqlResult<()> {
        self.db
            .connection()
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Write every key in one transaction.
    pub fn save_snapshot(&self, state: &PersistedState) -> ChatResult<()> {
        let messages = serde_json::to_string(&state.messages)?;
        let settings = state
            .settings
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let started = serde_json::to_string(&state.has_started_chat)?;

        let tx = self.db.connection().unchecked_transaction()?;
        self.put(MESSAGES_KEY, &messages)?;
        if let Some(settings) = settings {
            self.put(SETTINGS_KEY, &settings)?;
        }
        self.put(CONTEXT_KEY, &state.conversation_context)?;
        self.put(STARTED_KEY, &started)?;
        tx.commit()?;
        Ok(())
    }

    /// Read the saved state. Any read or parse failure is logged and that
    /// piece is treated as never saved.
    pub fn load_snapshot(&self) -> PersistedState {
        let mut messages: Vec<ChatMessage> = self.load_json(MESSAGES_KEY).unwrap_or_default();
        // A session that quit mid-stream never cleared the flag.
        for message in &mut messages {
            message.is_streaming = false;
        }

        let settings: Option<Settings> = self.load_json(SETTINGS_KEY);
        let conversation_context = self.load_raw(CONTEXT_KEY).unwrap_or_default();
        let has_started_chat = self.load_json(STARTED_KEY).unwrap_or(false);

        PersistedState {
            messages,
            settings,
            conversation_context,
            has_started_chat,
        }
    }

    /// Forget the conversation but keep settings.
    pub fn clear_conversation(&self) -> SqlResult<()> {
        for key in [MESSAGES_KEY, CONTEXT_KEY, STARTED_KEY] {
            self.remove(key)?;
        }
        Ok(())
    }

    fn load_raw(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Ok(value) => value,
            Err(err) => {
                log::error!("Failed to read `{key}` from local storage: {err}");
                None
            }
        }
    }

    fn load_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.load_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("Ignoring unreadable `{key}` in local storage: {err}");
                None
            }
        }
    }
}
