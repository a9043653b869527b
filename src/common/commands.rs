use crate::network::ChatRequest;

/// Commands sent from the UI to the network task.
#[derive(Debug, Clone)]
pub enum NetworkCommand {
    /// POST `request` and stream the answer into the assistant message
    /// `message_id`.
    RequestCompletion {
        message_id: String,
        request: ChatRequest,
    },
}
