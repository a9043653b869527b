use std::collections::VecDeque;
use std::fmt::Display;

use futures::{Stream, StreamExt};
use serde_json::Value;

use crate::error::{ChatError, ChatResult};
use crate::security::strip_markup;

pub const FRAME_PREFIX: &str = "data: ";

/// Incremental UTF-8 decoder. Multi-byte characters split across chunks are
/// held back until the rest of their bytes arrive.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();
        let mut rest: &[u8] = &self.pending;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match err.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[bad..];
                        }
                        // Incomplete sequence at the end: wait for more bytes.
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        self.pending = rest.to_vec();
        out
    }

    /// Flush whatever is left at end of stream.
    pub fn finish(&mut self) -> String {
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }
}

/// Extract the text delta from one line of an event stream.
///
/// Only `data: ` lines count. Anything that is not JSON with a
/// `choices[0].delta.content` string yields `None`, including `[DONE]`.
pub fn parse_frame(line: &str) -> Option<String> {
    let payload = line.strip_prefix(FRAME_PREFIX)?;
    let frame: Value = serde_json::from_str(payload).ok()?;
    let delta = frame
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()?;
    if delta.is_empty() {
        return None;
    }
    Some(delta.to_string())
}

/// Content of a non-streamed response: `choices[0].message.content`, or a
/// top-level `response` string.
pub fn parse_full_response(body: &Value) -> Option<String> {
    body.get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .or_else(|| body.get("response").and_then(Value::as_str))
        .map(str::to_string)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsumerState {
    Reading,
    Finished,
}

/// Turns a chunked byte stream into successive values of the accumulated
/// assistant text.
///
/// `next_update` yields `Ok(Some(content))` each time a frame adds text,
/// `Ok(None)` once the stream is over, and `Err` when reading fails. After
/// either terminal result the consumer stays finished.
pub struct StreamConsumer<S> {
    stream: S,
    decoder: Utf8Decoder,
    partial_line: String,
    lines: VecDeque<String>,
    raw: String,
    accumulated: String,
    state: ConsumerState,
    skipped_frames: usize,
}

impl<S, B, E> StreamConsumer<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            decoder: Utf8Decoder::default(),
            partial_line: String::new(),
            lines: VecDeque::new(),
            raw: String::new(),
            accumulated: String::new(),
            state: ConsumerState::Reading,
            skipped_frames: 0,
        }
    }

    #[cfg(test)]
    pub fn is_finished(&self) -> bool {
        self.state == ConsumerState::Finished && self.lines.is_empty()
    }

    #[cfg(test)]
    pub fn content(&self) -> &str {
        &self.accumulated
    }

    /// `data: ` lines that carried no usable delta.
    pub fn skipped_frames(&self) -> usize {
        self.skipped_frames
    }

    pub async fn next_update(&mut self) -> ChatResult<Option<String>> {
        loop {
            while let Some(line) = self.lines.pop_front() {
                let line = line.trim_end_matches('\r');
                match parse_frame(line) {
                    Some(delta) => {
                        // Markup can span deltas, so the whole text is cleaned.
                        self.raw.push_str(&delta);
                        self.accumulated = strip_markup(&self.raw);
                        return Ok(Some(self.accumulated.clone()));
                    }
                    None if line.starts_with(FRAME_PREFIX) => self.skipped_frames += 1,
                    None => {}
                }
            }

            if self.state == ConsumerState::Finished {
                return Ok(None);
            }

            match self.stream.next().await {
                Some(Ok(chunk)) => {
                    let text = self.decoder.decode(chunk.as_ref());
                    self.push_text(&text);
                }
                Some(Err(err)) => {
                    self.state = ConsumerState::Finished;
                    self.lines.clear();
                    return Err(ChatError::Stream(err.to_string()));
                }
                None => {
                    let tail = self.decoder.finish();
                    self.push_text(&tail);
                    if !self.partial_line.is_empty() {
                        self.lines.push_back(std::mem::take(&mut self.partial_line));
                    }
                    self.state = ConsumerState::Finished;
                }
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        self.partial_line.push_str(text);
        while let Some(newline) = self.partial_line.find('\n') {
            let line = self.partial_line[..newline].to_string();
            self.partial_line.drain(..=newline);
            self.lines.push_back(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn frame(delta: &str) -> String {
        format!(
            "data: {}\n",
            serde_json::json!({ "choices": [{ "delta": { "content": delta } }] })
        )
    }

    fn chunks(parts: Vec<Vec<u8>>) -> impl Stream<Item = Result<Vec<u8>, String>> + Unpin {
        stream::iter(parts.into_iter().map(Ok))
    }

    async fn collect_updates<S, B, E>(consumer: &mut StreamConsumer<S>) -> Vec<String>
    where
        S: Stream<Item = Result<B, E>> + Unpin,
        B: AsRef<[u8]>,
        E: Display,
    {
        let mut updates = Vec::new();
        while let Some(update) = consumer.next_update().await.unwrap() {
            updates.push(update);
        }
        updates
    }

    #[test]
    fn parse_frame_reads_nested_delta() {
        assert_eq!(parse_frame(frame("hi").trim_end()), Some("hi".to_string()));
        assert_eq!(parse_frame("data: [DONE]"), None);
        assert_eq!(parse_frame("event: ping"), None);
        assert_eq!(parse_frame(r#"data: {"choices":[{"delta":{}}]}"#), None);
    }

    #[test]
    fn full_response_fields() {
        let openai = serde_json::json!({ "choices": [{ "message": { "content": "a" } }] });
        let simple = serde_json::json!({ "response": "b" });
        assert_eq!(parse_full_response(&openai), Some("a".to_string()));
        assert_eq!(parse_full_response(&simple), Some("b".to_string()));
        assert_eq!(parse_full_response(&serde_json::json!({})), None);
    }

    #[test]
    fn decoder_joins_split_characters() {
        let bytes = "سلام".as_bytes();
        let mut decoder = Utf8Decoder::default();
        let mut out = decoder.decode(&bytes[..3]);
        out.push_str(&decoder.decode(&bytes[3..]));
        out.push_str(&decoder.finish());
        assert_eq!(out, "سلام");
    }

    #[test]
    fn decoder_replaces_invalid_bytes() {
        let mut decoder = Utf8Decoder::default();
        assert_eq!(decoder.decode(&[b'a', 0xFF, b'b']), "a\u{FFFD}b");
    }

    #[tokio::test]
    async fn accumulates_deltas_in_order() {
        let body = format!("{}{}{}", frame("Hel"), frame("lo"), frame(" world"));
        let mut consumer = StreamConsumer::new(chunks(vec![body.into_bytes()]));

        let updates = collect_updates(&mut consumer).await;
        assert_eq!(updates, vec!["Hel", "Hello", "Hello world"]);
        assert!(consumer.is_finished());
        assert_eq!(consumer.next_update().await.unwrap(), None);
    }

    #[tokio::test]
    async fn frames_split_across_chunks_are_reassembled() {
        let body = format!("{}{}", frame("مرحبا"), frame(" بك"));
        let bytes = body.into_bytes();
        let parts: Vec<Vec<u8>> = bytes.chunks(5).map(<[u8]>::to_vec).collect();
        let mut consumer = StreamConsumer::new(chunks(parts));

        let updates = collect_updates(&mut consumer).await;
        assert_eq!(updates, vec!["مرحبا", "مرحبا بك"]);
    }

    #[tokio::test]
    async fn malformed_frames_are_skipped() {
        let body = format!(
            "{}data: {{not json\n: keep-alive\n{}data: [DONE]\n",
            frame("a"),
            frame("b")
        );
        let mut consumer = StreamConsumer::new(chunks(vec![body.into_bytes()]));

        let updates = collect_updates(&mut consumer).await;
        assert_eq!(updates, vec!["a", "ab"]);
        assert_eq!(consumer.skipped_frames(), 2);
    }

    #[tokio::test]
    async fn final_line_without_newline_is_used() {
        let body = frame("tail");
        let body = body.trim_end().to_string();
        let mut consumer = StreamConsumer::new(chunks(vec![body.into_bytes()]));
        assert_eq!(collect_updates(&mut consumer).await, vec!["tail"]);
    }

    #[tokio::test]
    async fn crlf_line_endings_are_accepted() {
        let body = frame("x").replace('\n', "\r\n");
        let mut consumer = StreamConsumer::new(chunks(vec![body.into_bytes()]));
        assert_eq!(collect_updates(&mut consumer).await, vec!["x"]);
    }

    #[tokio::test]
    async fn markup_in_deltas_is_stripped() {
        let body = format!("{}{}", frame("<b>hi</b>"), frame(" there"));
        let mut consumer = StreamConsumer::new(chunks(vec![body.into_bytes()]));
        assert_eq!(collect_updates(&mut consumer).await, vec!["hi", "hi there"]);
    }

    #[tokio::test]
    async fn tags_split_across_deltas_are_stripped() {
        let body = format!(
            "{}{}{}{}",
            frame("ok <scr"),
            frame("ipt>alert(1)"),
            frame("</script>"),
            frame(" done")
        );
        let mut consumer = StreamConsumer::new(chunks(vec![body.into_bytes()]));

        let updates = collect_updates(&mut consumer).await;
        assert_eq!(updates, vec!["ok ", "ok ", "ok ", "ok  done"]);
        assert!(updates.iter().all(|update| !update.contains("alert")));
    }

    #[tokio::test]
    async fn read_error_is_terminal() {
        let items: Vec<Result<Vec<u8>, String>> = vec![
            Ok(frame("partial").into_bytes()),
            Err("connection reset".to_string()),
            Ok(frame("never").into_bytes()),
        ];
        let mut consumer = StreamConsumer::new(stream::iter(items));

        assert_eq!(
            consumer.next_update().await.unwrap(),
            Some("partial".to_string())
        );
        assert!(matches!(
            consumer.next_update().await,
            Err(ChatError::Stream(message)) if message == "connection reset"
        ));
        assert_eq!(consumer.next_update().await.unwrap(), None);
        assert_eq!(consumer.content(), "partial");
    }
}
