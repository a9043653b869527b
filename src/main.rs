mod animate;
mod common;
mod config;
mod error;
mod format;
mod language;
mod network;
mod security;
mod storage;
mod ui;

use std::env;

use clap::Parser;
use dotenvy::dotenv;
use network::{ChatClient, OfflineCache};
use storage::{AssetStore, StateDatabase};
use tokio::sync::mpsc;
use ui::ChatApp;

#[derive(Parser)]
#[command(
    name = "zaki_chat",
    version,
    about = "Bilingual streaming chat client"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    /// Completion endpoint; overrides the config file and ZAKI_ENDPOINT
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), eframe::Error> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let app_config = config::load_config(&cli.config)
        .with_overrides(env::var(config::ENDPOINT_ENV).ok(), cli.endpoint);

    if let Err(err) = storage::ensure_data_dir(&app_config.database_path) {
        log::error!(
            "Failed to create data directory for {}: {err}",
            app_config.database_path
        );
    }
    let http = reqwest::Client::new();
    let state_db = open_state_db(&app_config.database_path);
    let offline_cache = open_offline_cache(&app_config, http.clone());

    // UI -> Network
    let (cmd_tx, cmd_rx) = mpsc::channel(100);
    // Network -> UI
    let (event_tx, event_rx) = mpsc::channel(100);

    let asset_events = event_tx.clone();
    let endpoint = app_config.endpoint.clone();
    tokio::spawn(async move {
        ChatClient::new(http, endpoint, event_tx, cmd_rx)
            .run()
            .await;
    });

    let precache_urls = app_config.precache_urls.clone();
    let assets = vec![app_config.logo_url.clone()];
    tokio::spawn(async move {
        offline_cache
            .warm_up(&precache_urls, &assets, &asset_events)
            .await;
    });

    let options = eframe::NativeOptions::default();
    let mut startup = Some((state_db, event_rx));

    eframe::run_native(
        "Zaki.One",
        options,
        Box::new(move |cc| {
            let (state_db, event_receiver) = startup
                .take()
                .expect("ChatApp should only be initialized once");

            ui::fonts::install(&cc.egui_ctx);
            log::info!("Client started, endpoint {}", app_config.endpoint);

            Ok(Box::new(ChatApp::new(
                cc,
                &app_config,
                state_db,
                cmd_tx.clone(),
                event_receiver,
            )))
        }),
    )
}

/// Open the on-disk state database, falling back to memory so the app still
/// runs without saved state.
fn open_state_db(path: &str) -> StateDatabase {
    match StateDatabase::with_path(path) {
        Ok(db) => db,
        Err(err) => {
            log::error!("Failed to open state database {path}: {err}; state will not be saved");
            in_memory_fallback(StateDatabase::in_memory())
        }
    }
}

fn open_offline_cache(config: &config::AppConfig, http: reqwest::Client) -> OfflineCache {
    let store = match AssetStore::with_path(&config.database_path, &config.cache_name) {
        Ok(store) => store,
        Err(err) => {
            log::warn!("Failed to open offline cache: {err}; caching in memory");
            in_memory_fallback(AssetStore::in_memory(&config.cache_name))
        }
    };
    OfflineCache::new(http, &config.asset_base_url, store)
}

fn in_memory_fallback<T>(result: rusqlite::Result<T>) -> T {
    result.expect("in-memory SQLite database should always open")
}
