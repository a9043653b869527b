use eframe::egui;

use crate::common::Language;
use crate::language::{detect_direction, t};

/// Returns true when the user asked to send. The caller reads the text from
/// `input_text`; nothing is sent while `enabled` is false.
pub fn render(ui: &mut egui::Ui, input_text: &mut String, enabled: bool, language: Language) -> bool {
    let mut send = false;

    ui.add_enabled_ui(enabled, |ui| {
        ui.horizontal(|ui| {
            let button_width = 80.0;
            let align = if detect_direction(input_text).is_rtl() {
                egui::Align::RIGHT
            } else {
                egui::Align::LEFT
            };

            let response = ui.add(
                egui::TextEdit::singleline(input_text)
                    .hint_text(t("placeholder", language))
                    .horizontal_align(align)
                    .desired_width(ui.available_width() - button_width),
            );

            if ui.button(t("send", language)).clicked() {
                send = true;
            }

            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                send = true;
                response.request_focus();
            }
        });
    });

    send && enabled
}
