use eframe::egui::{self, RichText};

use crate::common::Language;
use crate::language::t;
use crate::ui::state::AppState;

/// What the user asked for this frame. Applied by the app so every change
/// goes through the store.
#[derive(Default)]
pub struct SidebarActions {
    pub language: Option<Language>,
    pub toggle_dark_mode: bool,
    pub pre_instructions: Option<String>,
    pub clear_chat: bool,
    pub copy_transcript: bool,
    pub go_home: bool,
}

/// Sidebar-local UI state.
#[derive(Default)]
pub struct SidebarState {
    confirm_clear: bool,
    draft_instructions: Option<String>,
}

pub fn render(
    ui: &mut egui::Ui,
    state: &AppState,
    local: &mut SidebarState,
    cached_assets: usize,
) -> SidebarActions {
    let mut actions = SidebarActions::default();
    let lang = state.language();

    ui.heading(t("settings", lang));
    ui.separator();

    if ui.button(t("home", lang)).clicked() {
        actions.go_home = true;
    }
    ui.add_space(8.0);

    ui.label(RichText::new(t("language", lang)).strong());
    ui.horizontal(|ui| {
        for (language, label) in [(Language::En, "English"), (Language::Ar, "العربية")] {
            if ui.selectable_label(lang == language, label).clicked() {
                actions.language = Some(language);
            }
        }
    });
    ui.add_space(8.0);

    let mut dark = state.settings.dark_mode;
    if ui.checkbox(&mut dark, t("darkMode", lang)).changed() {
        actions.toggle_dark_mode = true;
    }
    ui.add_space(8.0);

    ui.label(RichText::new(t("preInstructions", lang)).strong());
    let draft = local
        .draft_instructions
        .get_or_insert_with(|| state.settings.pre_instructions.clone());
    let response = ui.add(egui::TextEdit::multiline(draft).desired_rows(3));
    if response.lost_focus() {
        actions.pre_instructions = local.draft_instructions.take();
    }
    ui.separator();

    if ui.button(t("copyChat", lang)).clicked() {
        actions.copy_transcript = true;
    }

    if local.confirm_clear {
        ui.horizontal(|ui| {
            if ui
                .button(RichText::new(t("confirmClear", lang)).color(ui.visuals().error_fg_color))
                .clicked()
            {
                actions.clear_chat = true;
                local.confirm_clear = false;
            }
            if ui.button(t("cancel", lang)).clicked() {
                local.confirm_clear = false;
            }
        });
    } else if ui.button(t("clearChat", lang)).clicked() {
        local.confirm_clear = true;
    }

    ui.with_layout(egui::Layout::bottom_up(egui::Align::Min), |ui| {
        ui.label(
            RichText::new(format!("{}: {cached_assets}", t("offlineAssets", lang)))
                .small()
                .weak(),
        );
    });

    actions
}
