use crate::storage::models::CachedAsset;

/// Events sent from the network task up to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    /// Full accumulated content received so far for `message_id`.
    ContentUpdated { message_id: String, content: String },
    /// The request failed; `notice` is already safe to show.
    RequestFailed { message_id: String, notice: String },
    /// Sent exactly once per request, after success or failure.
    StreamFinished { message_id: String },
    /// An asset served through the offline cache.
    AssetLoaded(CachedAsset),
    /// Warm-up is over; `cached` assets are stored for offline use.
    OfflineCacheReady { cached: usize },
}
