use std::sync::Arc;

use eframe::egui::{self, FontData, FontDefinitions, FontFamily};

const ARABIC_FONT: &str = "DejaVuSans";
static ARABIC_FONT_DATA: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

/// egui's bundled fonts have no Arabic glyphs. DejaVu Sans is appended to
/// every family as a fallback, so Latin text keeps the default faces.
pub fn font_definitions() -> FontDefinitions {
    let mut fonts = FontDefinitions::default();
    fonts.font_data.insert(
        ARABIC_FONT.to_owned(),
        Arc::new(FontData::from_static(ARABIC_FONT_DATA)),
    );
    for family in [FontFamily::Proportional, FontFamily::Monospace] {
        fonts
            .families
            .entry(family)
            .or_default()
            .push(ARABIC_FONT.to_owned());
    }
    fonts
}

pub fn install(ctx: &egui::Context) {
    ctx.set_fonts(font_definitions());
}
