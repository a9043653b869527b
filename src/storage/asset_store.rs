use rusqlite::{OptionalExtension, Result as SqlResult, params};
use std::path::Path;

use super::database::Database;
use super::models::CachedAsset;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS asset_cache (
    cache_name TEXT NOT NULL,
    url TEXT NOT NULL,
    content_type TEXT,
    body BLOB NOT NULL,
    cached_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
    PRIMARY KEY (cache_name, url)
);";

/// Offline copies of fetched assets, grouped by cache name so a new cache
/// version can replace an old one wholesale.
pub struct AssetStore {
    db: Database,
    cache_name: String,
}

impl AssetStore {
    pub fn with_path<P: AsRef<Path>>(path: P, cache_name: &str) -> SqlResult<Self> {
        Ok(Self::new(Database::open(path, SCHEMA)?, cache_name))
    }

    pub fn in_memory(cache_name: &str) -> SqlResult<Self> {
        Ok(Self::new(Database::open_in_memory(SCHEMA)?, cache_name))
    }

    fn new(db: Database, cache_name: &str) -> Self {
        Self {
            db,
            cache_name: cache_name.to_string(),
        }
    }

    pub fn put(&self, url: &str, content_type: Option<&str>, body: &[u8]) -> SqlResult<()> {
        self.db.connection().execute(
            "INSERT OR REPLACE INTO asset_cache (cache_name, url, content_type, body, cached_at)
             VALUES (?1, ?2, ?3, ?4, strftime('%s', 'now'))",
            params![self.cache_name, url, content_type, body],
        )?;
        Ok(())
    }

    pub fn get(&self, url: &str) -> SqlResult<Option<CachedAsset>> {
        self.db
            .connection()
            .query_row(
                "SELECT url, content_type, body, cached_at
                 FROM asset_cache
                 WHERE cache_name = ?1 AND url = ?2",
                params![self.cache_name, url],
                |row| {
                    Ok(CachedAsset {
                        url: row.get(0)?,
                        content_type: row.get(1)?,
                        body: row.get(2)?,
                        cached_at: row.get(3)?,
                    })
                },
            )
            .optional()
    }

    pub fn count(&self) -> SqlResult<usize> {
        let count: i64 = self.db.connection().query_row(
            "SELECT COUNT(*) FROM asset_cache WHERE cache_name = ?1",
            params![self.cache_name],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Drop entries written under any other cache name.
    pub fn purge_stale_caches(&self) -> SqlResult<usize> {
        self.db.connection().execute(
            "DELETE FROM asset_cache WHERE cache_name != ?1",
            params![self.cache_name],
        )
    }
}
