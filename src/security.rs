use std::collections::VecDeque;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;

use crate::error::ChatError;

pub const MAX_MESSAGE_CHARS: usize = 4000;

static SCRIPT_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid regex"));
static STYLE_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("valid regex"));
static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static UNCLOSED_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(?:script|style)\b.*\z").expect("valid regex"));
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[A-Za-z!/][^<>]*>").expect("valid regex"));
static TRAILING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[A-Za-z!/][^<>]*\z").expect("valid regex"));

/// Remove markup: script/style elements with their bodies, comments and every
/// remaining tag. A script or style element that is never closed swallows the
/// rest of the input, as does a tag cut off at the end. Surrounding whitespace
/// is kept.
pub fn strip_markup(input: &str) -> String {
    if !input.contains('<') {
        return input.to_string();
    }
    let text = SCRIPT_ELEMENT.replace_all(input, "");
    let text = STYLE_ELEMENT.replace_all(&text, "");
    let text = COMMENT.replace_all(&text, "");
    let text = UNCLOSED_ELEMENT.replace(&text, "");
    let text = TAG.replace_all(&text, "");
    TRAILING_TAG.replace(&text, "").into_owned()
}

/// Sanitize user-supplied text before it is stored, displayed or echoed back
/// into a request.
pub fn sanitize_input(input: &str) -> String {
    strip_markup(input).trim().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Message cannot be empty")]
    Empty,
    #[error("Message too long")]
    TooLong,
}

pub fn validate_message(message: &str) -> Result<(), ValidationError> {
    let sanitized = sanitize_input(message);
    if sanitized.is_empty() {
        return Err(ValidationError::Empty);
    }
    if sanitized.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ValidationError::TooLong);
    }
    Ok(())
}

/// Rolling-window rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    requests: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            requests: VecDeque::with_capacity(max_requests),
        }
    }

    /// Record a request at `now` if the window still has room.
    pub fn try_acquire_at(&mut self, now: Instant) -> bool {
        while let Some(&oldest) = self.requests.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                self.requests.pop_front();
            } else {
                break;
            }
        }

        if self.requests.len() >= self.max_requests {
            return false;
        }

        self.requests.push_back(now);
        true
    }
}

/// Map an internal error to a notice that is safe to show the user.
pub fn sanitize_error_message(error: &ChatError) -> &'static str {
    match error {
        ChatError::Http(_) | ChatError::Stream(_) => {
            "Connection error. Please check your internet connection."
        }
        ChatError::Status(_) => "Service temporarily unavailable. Please try again later.",
        _ => "An unexpected error occurred. Please try again.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_elements_with_body() {
        assert_eq!(sanitize_input("<script>alert(1)</script>hello"), "hello");
        assert_eq!(
            sanitize_input("<SCRIPT type=\"x\">\nbad()\n</SCRIPT> ok"),
            "ok"
        );
    }

    #[test]
    fn unterminated_script_drops_the_rest() {
        assert_eq!(sanitize_input("<script>alert(1)"), "");
        assert_eq!(sanitize_input("safe <style>body{}"), "safe");
        assert_eq!(strip_markup("keep <scr"), "keep ");
        assert_eq!(strip_markup("a <b class=\"x\""), "a ");
    }

    #[test]
    fn strips_tags_and_attributes_but_keeps_text() {
        assert_eq!(
            sanitize_input("  <b onclick=\"x()\">bold</b> and <i>it</i>  "),
            "bold and it"
        );
        assert_eq!(sanitize_input("<!-- hidden -->visible"), "visible");
    }

    #[test]
    fn leaves_comparisons_alone() {
        assert_eq!(sanitize_input("1 < 2 and 3 > 2"), "1 < 2 and 3 > 2");
    }

    #[test]
    fn strip_markup_keeps_surrounding_spaces() {
        assert_eq!(strip_markup(" world"), " world");
        assert_eq!(strip_markup("<em> next</em> "), " next ");
    }

    #[test]
    fn validates_length_and_emptiness() {
        assert_eq!(validate_message("<p></p>"), Err(ValidationError::Empty));
        assert_eq!(
            validate_message(&"a".repeat(MAX_MESSAGE_CHARS + 1)),
            Err(ValidationError::TooLong)
        );
        assert!(validate_message("hello").is_ok());
    }

    #[test]
    fn rate_limiter_allows_exactly_n_per_window() {
        let window = Duration::from_secs(60);
        let mut limiter = RateLimiter::new(3, window);
        let start = Instant::now();

        assert!(limiter.try_acquire_at(start));
        assert!(limiter.try_acquire_at(start + Duration::from_secs(1)));
        assert!(limiter.try_acquire_at(start + Duration::from_secs(2)));
        assert!(!limiter.try_acquire_at(start + Duration::from_secs(3)));
        assert!(!limiter.try_acquire_at(start + Duration::from_secs(59)));

        // The first call ages out, making room for exactly one more.
        assert!(limiter.try_acquire_at(start + window));
        assert!(!limiter.try_acquire_at(start + window));
    }

    #[test]
    fn rejected_calls_do_not_consume_capacity() {
        let window = Duration::from_secs(10);
        let mut limiter = RateLimiter::new(1, window);
        let start = Instant::now();

        assert!(limiter.try_acquire_at(start));
        for offset in 1..5 {
            assert!(!limiter.try_acquire_at(start + Duration::from_secs(offset)));
        }
        assert!(limiter.try_acquire_at(start + window));
    }

    #[test]
    fn error_notices_never_leak_details() {
        let notice = sanitize_error_message(&ChatError::Stream("socket 10.0.0.1 reset".into()));
        assert!(!notice.contains("10.0.0.1"));
        assert_eq!(
            sanitize_error_message(&ChatError::Status(502)),
            "Service temporarily unavailable. Please try again later."
        );
    }
}
