use std::time::{Duration, Instant};

use crate::common::{ChatMessage, Language, NetworkCommand, Settings};
use crate::language::{detect_language, t};
use crate::network::{ChatRequest, conversation_context, recent_history};
use crate::security::{RateLimiter, ValidationError, sanitize_input, validate_message};
use crate::storage::PersistedState;

/// Sent when the input box is empty.
const DEFAULT_PROMPT: &str = "Hello";
const NOTICE_TTL: Duration = Duration::from_secs(4);

/// Short-lived toast shown at the bottom of the window.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub text: String,
    pub is_error: bool,
    pub expires_at: Instant,
}

/// The single store for chat state. Every mutation goes through a method
/// that bumps `revision`, which is what triggers persistence.
pub struct AppState {
    pub messages: Vec<ChatMessage>,
    pub settings: Settings,
    pub conversation_context: String,
    pub has_started_chat: bool,
    pub input_text: String,
    pub notices: Vec<Notice>,
    revision: u64,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            messages: Vec::new(),
            settings,
            conversation_context: String::new(),
            has_started_chat: false,
            input_text: String::new(),
            notices: Vec::new(),
            revision: 0,
        }
    }

    /// Rebuild state from storage. Saved settings win, except that the theme
    /// follows the system until the user picks one.
    pub fn restore(
        saved: PersistedState,
        system_language: Language,
        system_dark: Option<bool>,
    ) -> Self {
        let settings = match saved.settings {
            Some(mut settings) => {
                if !settings.user_has_manually_set_theme {
                    settings.dark_mode = system_dark.unwrap_or(settings.dark_mode);
                }
                settings
            }
            None => Settings {
                language: system_language,
                dark_mode: system_dark.unwrap_or(false),
                ..Settings::default()
            },
        };

        let mut state = Self::new(settings);
        if !saved.messages.is_empty() {
            state.messages = saved.messages;
            state.has_started_chat = saved.has_started_chat;
            state.conversation_context = saved.conversation_context;
        }
        state
    }

    pub fn snapshot(&self) -> PersistedState {
        PersistedState {
            messages: self.messages.clone(),
            settings: Some(self.settings.clone()),
            conversation_context: self.conversation_context.clone(),
            has_started_chat: self.has_started_chat,
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    /// True while an assistant reply is still arriving.
    pub fn is_loading(&self) -> bool {
        self.messages.iter().any(|message| message.is_streaming)
    }

    pub fn language(&self) -> Language {
        self.settings.language
    }

    /// Turn the input box into a completion request.
    ///
    /// Returns `None` when the send is refused (rate limit, too long, reply
    /// still streaming); the reason is shown as a notice.
    pub fn send_message(
        &mut self,
        limiter: &mut RateLimiter,
        history_limit: usize,
        now: Instant,
    ) -> Option<NetworkCommand> {
        if self.is_loading() {
            return None;
        }

        if !limiter.try_acquire_at(now) {
            let text = t("rateLimited", self.language()).to_string();
            self.push_notice(text, true, now);
            return None;
        }

        let content = match validate_message(&self.input_text) {
            Ok(()) => sanitize_input(&self.input_text),
            Err(ValidationError::Empty) => DEFAULT_PROMPT.to_string(),
            Err(err @ ValidationError::TooLong) => {
                self.push_notice(err.to_string(), true, now);
                return None;
            }
        };

        let detected = detect_language(&content);
        if detected != self.settings.language {
            log::info!(
                "Auto-switched language from {} to {} based on user input",
                self.settings.language.code(),
                detected.code()
            );
            self.settings.language = detected;
        }

        let history = recent_history(&self.messages, history_limit);
        self.conversation_context = conversation_context(&history);

        let request = ChatRequest::new(
            &content,
            detected,
            &self.settings.pre_instructions,
            history,
            self.conversation_context.clone(),
        );

        self.push_user_message(content);
        let message_id = self.begin_assistant_message();
        self.input_text.clear();

        Some(NetworkCommand::RequestCompletion {
            message_id,
            request,
        })
    }

    pub fn push_user_message(&mut self, content: String) {
        self.messages.push(ChatMessage::user(content));
        self.has_started_chat = true;
        self.touch();
    }

    /// Append an empty streaming reply and return its id.
    pub fn begin_assistant_message(&mut self) -> String {
        let reply = ChatMessage::assistant_placeholder();
        let message_id = reply.id.clone();
        self.messages.push(reply);
        self.touch();
        message_id
    }

    fn streaming_message_mut(&mut self, message_id: &str) -> Option<&mut ChatMessage> {
        self.messages
            .iter_mut()
            .find(|message| message.id == message_id && message.is_streaming)
    }

    /// Replace the content of a streaming message with the latest
    /// accumulated text. Ignored once the message has finished or is gone.
    pub fn apply_content(&mut self, message_id: &str, content: String) -> bool {
        let Some(message) = self.streaming_message_mut(message_id) else {
            return false;
        };
        message.content = content;
        self.touch();
        true
    }

    /// Write a safe failure notice into the reply and end its stream.
    pub fn fail_stream(&mut self, message_id: &str, notice: &str, now: Instant) -> bool {
        let Some(message) = self.streaming_message_mut(message_id) else {
            return false;
        };
        message.content = notice.to_string();
        message.is_streaming = false;
        self.touch();

        let title = t("error", self.language());
        let text = format!("{title}: {notice}");
        self.push_notice(text, true, now);
        true
    }

    /// Clear the streaming flag. Only the first call for a message has any
    /// effect.
    pub fn finish_stream(&mut self, message_id: &str) -> bool {
        let Some(message) = self.streaming_message_mut(message_id) else {
            return false;
        };
        message.is_streaming = false;
        self.touch();
        true
    }

    pub fn clear_conversation(&mut self, now: Instant) {
        self.messages.clear();
        self.conversation_context.clear();
        self.has_started_chat = false;
        self.touch();
        let text = t("deleted", self.language()).to_string();
        self.push_notice(text, false, now);
    }

    pub fn set_language(&mut self, language: Language) {
        if self.settings.language != language {
            self.settings.language = language;
            self.touch();
        }
    }

    pub fn toggle_dark_mode(&mut self) {
        self.settings.dark_mode = !self.settings.dark_mode;
        self.settings.user_has_manually_set_theme = true;
        self.touch();
    }

    /// Follow the system theme unless the user picked one.
    pub fn follow_system_theme(&mut self, system_dark: bool) {
        if !self.settings.user_has_manually_set_theme && self.settings.dark_mode != system_dark {
            self.settings.dark_mode = system_dark;
            self.touch();
        }
    }

    pub fn set_pre_instructions(&mut self, instructions: String) {
        if self.settings.pre_instructions != instructions {
            self.settings.pre_instructions = instructions;
            self.touch();
        }
    }

    pub fn start_chat(&mut self) {
        if !self.has_started_chat {
            self.has_started_chat = true;
            self.touch();
        }
    }

    pub fn go_home(&mut self) {
        if self.has_started_chat {
            self.has_started_chat = false;
            self.touch();
        }
    }

    pub fn push_notice(&mut self, text: String, is_error: bool, now: Instant) {
        self.notices.push(Notice {
            text,
            is_error,
            expires_at: now + NOTICE_TTL,
        });
    }

    pub fn prune_notices(&mut self, now: Instant) {
        self.notices.retain(|notice| notice.expires_at > now);
    }

    /// Plain-text copy of the conversation for the clipboard.
    pub fn transcript(&self) -> Option<String> {
        if self.messages.is_empty() {
            return None;
        }
        Some(
            self.messages
                .iter()
                .map(|message| {
                    let author = if message.is_user() { "User" } else { "Zaki" };
                    format!("{author}: {}", message.content)
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
        )
    }
}
