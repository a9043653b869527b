use std::collections::HashMap;
use std::time::{Duration, Instant};

use eframe::egui;
use tokio::sync::mpsc;

use crate::animate::{RevealAnimator, RevealSchedule};
use crate::common::{NetworkCommand, NetworkEvent};
use crate::config::AppConfig;
use crate::error::ChatError;
use crate::language::{detect_system_language, t};
use crate::security::{RateLimiter, sanitize_error_message};
use crate::storage::models::CachedAsset;
use crate::storage::{Debouncer, StateDatabase, export};

use super::components::sidebar::{SidebarActions, SidebarState};
use super::components::message_view::SaveCode;
use super::components::{chat_area, input_bar, sidebar, welcome};
use super::state::AppState;

const ASSET_POLL: Duration = Duration::from_millis(250);

pub struct ChatApp {
    state: AppState,
    command_sender: mpsc::Sender<NetworkCommand>,
    event_receiver: mpsc::Receiver<NetworkEvent>,
    state_db: StateDatabase,
    debouncer: Debouncer,
    seen_revision: u64,
    rate_limiter: RateLimiter,
    history_limit: usize,
    reveal: RevealSchedule,
    animators: HashMap<String, RevealAnimator>,
    sidebar: SidebarState,
    logo_url: String,
    logo: Option<egui::TextureHandle>,
    cached_assets: usize,
    assets_ready: bool,
    download_dir: Option<String>,
}

impl ChatApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: &AppConfig,
        state_db: StateDatabase,
        command_sender: mpsc::Sender<NetworkCommand>,
        event_receiver: mpsc::Receiver<NetworkEvent>,
    ) -> Self {
        let system_dark = cc
            .egui_ctx
            .system_theme()
            .map(|theme| theme == egui::Theme::Dark);
        let state = AppState::restore(
            state_db.load_snapshot(),
            detect_system_language(),
            system_dark,
        );
        log::info!(
            "Restored {} messages (language {})",
            state.messages.len(),
            state.language().code()
        );

        Self {
            seen_revision: state.revision(),
            state,
            command_sender,
            event_receiver,
            state_db,
            debouncer: Debouncer::new(config.persist_debounce()),
            rate_limiter: RateLimiter::new(
                config.rate_limit.max_requests,
                config.rate_limit.window(),
            ),
            history_limit: config.history_limit,
            reveal: config.reveal,
            animators: HashMap::new(),
            sidebar: SidebarState::default(),
            logo_url: config.logo_url.clone(),
            logo: None,
            cached_assets: 0,
            assets_ready: false,
            download_dir: config.download_dir.clone(),
        }
    }

    fn handle_network_events(&mut self, ctx: &egui::Context, now: Instant) {
        while let Ok(event) = self.event_receiver.try_recv() {
            let applied = match &event {
                NetworkEvent::AssetLoaded(asset) => {
                    self.load_asset(ctx, asset);
                    continue;
                }
                NetworkEvent::OfflineCacheReady { cached } => {
                    self.cached_assets = *cached;
                    self.assets_ready = true;
                    continue;
                }
                NetworkEvent::ContentUpdated {
                    message_id,
                    content,
                } => self.state.apply_content(message_id, content.clone()),
                NetworkEvent::RequestFailed { message_id, notice } => {
                    self.state.fail_stream(message_id, notice, now)
                }
                NetworkEvent::StreamFinished { message_id } => {
                    self.state.finish_stream(message_id)
                }
            };
            if !applied {
                log::debug!("Ignoring event for a finished or cleared message: {event:?}");
            }
        }
    }

    fn load_asset(&mut self, ctx: &egui::Context, asset: &CachedAsset) {
        if asset.url != self.logo_url {
            log::debug!("No consumer for asset {}", asset.url);
            return;
        }
        match welcome::decode_logo(&asset.body) {
            Ok(image) => {
                let texture = ctx.load_texture("welcome-logo", image, egui::TextureOptions::LINEAR);
                self.logo = Some(texture);
            }
            Err(err) => log::warn!("Failed to decode logo {}: {err}", asset.url),
        }
    }

    fn save_code(&mut self, request: &SaveCode, now: Instant) {
        let lang = self.state.language();
        let dir = export::download_dir(self.download_dir.as_deref());
        let timestamp_ms = chrono::Utc::now().timestamp_millis();
        match export::save_code(&dir, &request.language, &request.code, timestamp_ms) {
            Ok(path) => self.state.push_notice(
                format!("{}: {}", t("downloaded", lang), path.display()),
                false,
                now,
            ),
            Err(err) => {
                log::error!("Failed to save code block: {err}");
                self.state
                    .push_notice(t("downloadFailed", lang).to_string(), true, now);
            }
        }
    }

    fn send_message(&mut self, now: Instant) {
        let Some(command) =
            self.state
                .send_message(&mut self.rate_limiter, self.history_limit, now)
        else {
            return;
        };

        let NetworkCommand::RequestCompletion { message_id, .. } = &command;
        let message_id = message_id.clone();
        if let Err(err) = self.command_sender.try_send(command) {
            log::warn!("Failed to send command to network: {err}");
            let notice = sanitize_error_message(&ChatError::Stream(err.to_string()));
            self.state.fail_stream(&message_id, notice, now);
        }
    }

    fn apply_sidebar(&mut self, ctx: &egui::Context, actions: SidebarActions, now: Instant) {
        if actions.go_home {
            self.state.go_home();
        }
        if let Some(language) = actions.language {
            self.state.set_language(language);
        }
        if actions.toggle_dark_mode {
            self.state.toggle_dark_mode();
        }
        if let Some(instructions) = actions.pre_instructions {
            self.state.set_pre_instructions(instructions);
        }
        if actions.copy_transcript {
            let lang = self.state.language();
            match self.state.transcript() {
                Some(text) => {
                    ctx.copy_text(text);
                    self.state.push_notice(t("copied", lang).to_string(), false, now);
                }
                None => self
                    .state
                    .push_notice(t("noMessages", lang).to_string(), true, now),
            }
        }
        if actions.clear_chat {
            self.clear_conversation(now);
        }
    }

    fn clear_conversation(&mut self, now: Instant) {
        for animator in self.animators.values_mut() {
            animator.cancel();
        }
        self.animators.clear();
        self.state.clear_conversation(now);
        if let Err(err) = self.state_db.clear_conversation() {
            log::error!("Failed to clear saved conversation: {err}");
        }
    }

    /// Debounced write of the store whenever its revision moves.
    fn persist(&mut self, now: Instant) {
        if self.state.revision() != self.seen_revision {
            self.seen_revision = self.state.revision();
            self.debouncer.mark_dirty(now);
        }
        if self.debouncer.take_due(now) {
            self.save();
        }
    }

    fn save(&self) {
        if let Err(err) = self.state_db.save_snapshot(&self.state.snapshot()) {
            log::error!("Failed to save chat state: {err}");
        }
    }

    fn render_notices(&self, ctx: &egui::Context) {
        if self.state.notices.is_empty() {
            return;
        }
        egui::Area::new(egui::Id::new("notices"))
            .anchor(egui::Align2::CENTER_BOTTOM, [0.0, -64.0])
            .show(ctx, |ui| {
                for notice in &self.state.notices {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        let text = egui::RichText::new(&notice.text);
                        if notice.is_error {
                            ui.label(text.color(ui.visuals().error_fg_color));
                        } else {
                            ui.label(text);
                        }
                    });
                }
            });
    }

    fn schedule_repaint(&self, ctx: &egui::Context, reveal_wait: Option<Duration>, now: Instant) {
        if self.state.is_loading() {
            // Network events are polled from the frame loop.
            ctx.request_repaint_after(reveal_wait.unwrap_or(Duration::from_millis(16)));
            return;
        }

        let notice_wait = self
            .state
            .notices
            .iter()
            .map(|notice| notice.expires_at.saturating_duration_since(now))
            .min();
        // The logo and cache count arrive over the event channel.
        let asset_wait = (!self.assets_ready).then_some(ASSET_POLL);
        let wait = [reveal_wait, self.debouncer.remaining(now), notice_wait, asset_wait]
            .into_iter()
            .flatten()
            .min();
        if let Some(wait) = wait {
            ctx.request_repaint_after(wait);
        }
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.handle_network_events(ctx, now);
        self.state.prune_notices(now);

        if !self.state.settings.user_has_manually_set_theme {
            if let Some(theme) = ctx.system_theme() {
                self.state.follow_system_theme(theme == egui::Theme::Dark);
            }
        }
        ctx.set_visuals(if self.state.settings.dark_mode {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        });

        let cached_assets = self.cached_assets;
        let actions = egui::SidePanel::left("settings_sidebar")
            .resizable(false)
            .default_width(220.0)
            .show(ctx, |ui| {
                sidebar::render(ui, &self.state, &mut self.sidebar, cached_assets)
            })
            .inner;
        self.apply_sidebar(ctx, actions, now);

        let language = self.state.language();
        let mut reveal_wait = None;

        if self.state.has_started_chat {
            let loading = self.state.is_loading();
            let send = egui::TopBottomPanel::bottom("input_bar")
                .show(ctx, |ui| {
                    ui.add_space(6.0);
                    let send = input_bar::render(ui, &mut self.state.input_text, !loading, language);
                    ui.add_space(6.0);
                    send
                })
                .inner;

            let response = egui::CentralPanel::default()
                .show(ctx, |ui| {
                    chat_area::render(
                        ui,
                        &self.state.messages,
                        language,
                        &mut self.animators,
                        self.reveal,
                        now,
                    )
                })
                .inner;
            reveal_wait = response.repaint_after;
            if response.copied {
                self.state
                    .push_notice(t("copied", language).to_string(), false, now);
            }
            if let Some(request) = &response.save_code {
                self.save_code(request, now);
            }

            if send {
                self.send_message(now);
            }
        } else {
            let start = egui::CentralPanel::default()
                .show(ctx, |ui| welcome::render(ui, language, self.logo.as_ref()))
                .inner;
            if start {
                self.state.start_chat();
            }
        }

        self.render_notices(ctx);
        self.persist(now);
        self.schedule_repaint(ctx, reveal_wait, now);
    }
}

impl Drop for ChatApp {
    fn drop(&mut self) {
        if self.debouncer.flush() || self.state.revision() != self.seen_revision {
            log::info!("Flushing chat state before exit");
            self.save();
        }
    }
}
