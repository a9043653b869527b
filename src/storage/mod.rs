pub mod asset_store;
pub mod database;
pub mod debounce;
pub mod export;
pub mod models;
pub mod state_db;

pub use asset_store::AssetStore;
pub use debounce::Debouncer;
pub use models::PersistedState;
pub use state_db::StateDatabase;

use std::fs;
use std::path::Path;

/// Ensure the directory holding `db_path` exists.
pub fn ensure_data_dir(db_path: &str) -> std::io::Result<()> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
