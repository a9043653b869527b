use rusqlite::{Connection, Result as SqlResult};
use std::path::Path;
use std::time::Duration;

/// The state and asset stores keep separate connections to the same file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite connection with a store's schema already applied.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P, schema: &str) -> SqlResult<Self> {
        Self::prepare(Connection::open(path)?, schema)
    }

    pub fn open_in_memory(schema: &str) -> SqlResult<Self> {
        Self::prepare(Connection::open_in_memory()?, schema)
    }

    fn prepare(conn: Connection, schema: &str) -> SqlResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(schema)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
