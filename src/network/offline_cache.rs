use std::sync::Mutex;

use reqwest::header::CONTENT_TYPE;
use tokio::sync::mpsc;

use crate::common::NetworkEvent;
use crate::error::{ChatError, ChatResult};
use crate::storage::AssetStore;
use crate::storage::models::CachedAsset;

/// Cache-first asset fetcher: serves a stored copy when there is one and
/// falls back to the network otherwise.
pub struct OfflineCache {
    http: reqwest::Client,
    base_url: String,
    store: Mutex<AssetStore>,
}

impl OfflineCache {
    pub fn new(http: reqwest::Client, base_url: &str, store: AssetStore) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            store: Mutex::new(store),
        }
    }

    fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }

    fn with_store<T>(&self, f: impl FnOnce(&AssetStore) -> rusqlite::Result<T>) -> ChatResult<T> {
        let store = self
            .store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(f(&store)?)
    }

    /// Pre-cache `urls` and drop entries from older cache versions. Returns
    /// how many assets were stored; individual failures are logged.
    pub async fn install(&self, urls: &[String]) -> usize {
        match self.with_store(AssetStore::purge_stale_caches) {
            Ok(0) => {}
            Ok(purged) => log::info!("Purged {purged} assets from old caches"),
            Err(err) => log::warn!("Failed to purge old caches: {err}"),
        }

        let mut stored = 0;
        for url in urls {
            match self.download(url).await {
                Ok((content_type, body)) => {
                    match self.with_store(|store| store.put(url, content_type.as_deref(), &body)) {
                        Ok(()) => stored += 1,
                        Err(err) => log::warn!("Failed to cache {url}: {err}"),
                    }
                }
                Err(err) => log::warn!("Failed to pre-cache {url}: {err}"),
            }
        }
        log::info!("Offline cache ready: {stored}/{} assets", urls.len());
        stored
    }

    /// Install the cache, then serve `assets` through it to the UI. Ends with
    /// `OfflineCacheReady` whatever happened to the individual assets.
    pub async fn warm_up(
        &self,
        precache_urls: &[String],
        assets: &[String],
        events: &mpsc::Sender<NetworkEvent>,
    ) {
        self.install(precache_urls).await;

        for url in assets {
            match self.fetch(url).await {
                Ok(asset) => {
                    if events.send(NetworkEvent::AssetLoaded(asset)).await.is_err() {
                        return;
                    }
                }
                Err(err) => log::warn!("Failed to load asset {url}: {err}"),
            }
        }

        let cached = self.cached_count();
        if let Err(err) = events.send(NetworkEvent::OfflineCacheReady { cached }).await {
            log::warn!("Failed to notify UI: {err}");
        }
    }

    /// Cached copy of `url`, or a fresh network fetch when there is none.
    pub async fn fetch(&self, url: &str) -> ChatResult<CachedAsset> {
        match self.with_store(|store| store.get(url)) {
            Ok(Some(asset)) => return Ok(asset),
            Ok(None) => {}
            Err(err) => log::warn!("Offline cache lookup failed for {url}: {err}"),
        }

        let (content_type, body) = self.download(url).await?;
        Ok(CachedAsset {
            url: url.to_string(),
            content_type,
            body,
            cached_at: chrono::Utc::now().timestamp(),
        })
    }

    pub fn cached_count(&self) -> usize {
        self.with_store(AssetStore::count).unwrap_or_else(|err| {
            log::warn!("Failed to count cached assets: {err}");
            0
        })
    }

    async fn download(&self, url: &str) -> ChatResult<(Option<String>, Vec<u8>)> {
        let response = self.http.get(self.resolve(url)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Status(status.as_u16()));
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();
        Ok((content_type, body))
    }
}
