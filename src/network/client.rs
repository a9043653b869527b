use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tokio::sync::mpsc;

use crate::common::{NetworkCommand, NetworkEvent};
use crate::error::{ChatError, ChatResult};
use crate::security::{sanitize_error_message, sanitize_input};

use super::request::ChatRequest;
use super::stream::{StreamConsumer, parse_full_response};

/// Shown when a non-streamed reply carries no recognizable content.
const EMPTY_REPLY: &str = "An error occurred. Please try again.";

/// Background task that talks to the completion endpoint.
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
    event_sender: mpsc::Sender<NetworkEvent>,
    command_receiver: mpsc::Receiver<NetworkCommand>,
}

impl ChatClient {
    pub fn new(
        http: reqwest::Client,
        endpoint: String,
        event_sender: mpsc::Sender<NetworkEvent>,
        command_receiver: mpsc::Receiver<NetworkCommand>,
    ) -> Self {
        Self {
            http,
            endpoint,
            event_sender,
            command_receiver,
        }
    }

    pub async fn run(mut self) {
        log::info!("Network task started, endpoint {}", self.endpoint);

        while let Some(command) = self.command_receiver.recv().await {
            self.handle_command(command).await;
        }

        log::info!("Command channel closed; network task stopping");
    }

    async fn handle_command(&mut self, command: NetworkCommand) {
        match command {
            NetworkCommand::RequestCompletion {
                message_id,
                request,
            } => {
                log::info!(
                    "Requesting completion for {message_id} (history {}, language {})",
                    request.conversation_history.len(),
                    request.language.code()
                );

                let outcome = self.request_completion(&message_id, &request).await;
                if let Err(err) = &outcome {
                    log::error!("Completion for {message_id} failed: {err}");
                    self.emit(NetworkEvent::RequestFailed {
                        message_id: message_id.clone(),
                        notice: sanitize_error_message(err).to_string(),
                    })
                    .await;
                }

                // Always sent, whatever happened above.
                self.emit(NetworkEvent::StreamFinished { message_id }).await;
            }
        }
    }

    async fn request_completion(&self, message_id: &str, request: &ChatRequest) -> ChatResult<()> {
        let response = self
            .http
            .post(&self.endpoint)
            .header(ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if content_type.contains("text/event-stream")
            || content_type.contains("application/x-ndjson")
        {
            let mut consumer = StreamConsumer::new(response.bytes_stream().boxed());
            while let Some(content) = consumer.next_update().await? {
                self.emit(NetworkEvent::ContentUpdated {
                    message_id: message_id.to_string(),
                    content,
                })
                .await;
            }
            if consumer.skipped_frames() > 0 {
                log::debug!(
                    "Skipped {} unusable frames for {message_id}",
                    consumer.skipped_frames()
                );
            }
        } else {
            let body: serde_json::Value = response.json().await?;
            let content = parse_full_response(&body)
                .map(|content| sanitize_input(&content))
                .unwrap_or_else(|| EMPTY_REPLY.to_string());
            self.emit(NetworkEvent::ContentUpdated {
                message_id: message_id.to_string(),
                content,
            })
            .await;
        }

        Ok(())
    }

    async fn emit(&self, event: NetworkEvent) {
        if let Err(err) = self.event_sender.send(event).await {
            log::warn!("Failed to notify UI: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Language;
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_request() -> ChatRequest {
        ChatRequest::new("hi", Language::En, "", Vec::new(), String::new())
    }

    async fn run_one(server: &MockServer) -> Vec<NetworkEvent> {
        let (cmd_tx, cmd_rx) = mpsc::channel(4);
        let (event_tx, mut event_rx) = mpsc::channel(64);
        let client = ChatClient::new(reqwest::Client::new(), server.uri(), event_tx, cmd_rx);
        let task = tokio::spawn(client.run());

        cmd_tx
            .send(NetworkCommand::RequestCompletion {
                message_id: "bot-1".to_string(),
                request: sample_request(),
            })
            .await
            .unwrap();
        drop(cmd_tx);
        task.await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = event_rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn updated(content: &str) -> NetworkEvent {
        NetworkEvent::ContentUpdated {
            message_id: "bot-1".to_string(),
            content: content.to_string(),
        }
    }

    fn finished() -> NetworkEvent {
        NetworkEvent::StreamFinished {
            message_id: "bot-1".to_string(),
        }
    }

    #[tokio::test]
    async fn streams_event_stream_responses() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n",
            "data: oops\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n",
            "data: [DONE]\n",
        );
        Mock::given(method("POST"))
            .and(header("accept", "text/event-stream"))
            .and(body_partial_json(serde_json::json!({ "stream": true, "strict_language": true })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let events = run_one(&server).await;
        assert_eq!(events, vec![updated("Hel"), updated("Hello"), finished()]);
    }

    #[tokio::test]
    async fn plain_json_responses_are_used_whole() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "response": "<i>Hi</i> there " })),
            )
            .mount(&server)
            .await;

        let events = run_one(&server).await;
        assert_eq!(events, vec![updated("Hi there"), finished()]);
    }

    #[tokio::test]
    async fn json_without_content_gets_generic_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let events = run_one(&server).await;
        assert_eq!(events, vec![updated(EMPTY_REPLY), finished()]);
    }

    #[tokio::test]
    async fn http_errors_report_a_safe_notice_and_still_finish() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("stack trace at db.rs:42"))
            .mount(&server)
            .await;

        let events = run_one(&server).await;
        assert_eq!(
            events,
            vec![
                NetworkEvent::RequestFailed {
                    message_id: "bot-1".to_string(),
                    notice: "Service temporarily unavailable. Please try again later.".to_string(),
                },
                finished(),
            ]
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_still_finishes() {
        let (cmd_tx, cmd_rx) = mpsc::channel(4);
        let (event_tx, mut event_rx) = mpsc::channel(8);
        let client = ChatClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1".to_string(),
            event_tx,
            cmd_rx,
        );
        let task = tokio::spawn(client.run());
        cmd_tx
            .send(NetworkCommand::RequestCompletion {
                message_id: "bot-1".to_string(),
                request: sample_request(),
            })
            .await
            .unwrap();
        drop(cmd_tx);
        task.await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = event_rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], NetworkEvent::RequestFailed { .. }));
        assert_eq!(events[1], finished());
    }
}
