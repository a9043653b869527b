use eframe::egui::{self, ColorImage, RichText, TextureHandle};

use crate::common::Language;
use crate::error::ChatResult;
use crate::language::t;

const LOGO_HEIGHT: f32 = 96.0;

/// Decode the cached logo into pixels egui can upload.
pub fn decode_logo(bytes: &[u8]) -> ChatResult<ColorImage> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}

/// Landing screen shown before the first message. Returns true when the user
/// clicks through to the chat.
pub fn render(ui: &mut egui::Ui, language: Language, logo: Option<&TextureHandle>) -> bool {
    let mut start = false;
    ui.vertical_centered(|ui| {
        ui.add_space(ui.available_height() * 0.2);
        if let Some(logo) = logo {
            ui.add(egui::Image::new(logo).max_height(LOGO_HEIGHT));
            ui.add_space(12.0);
        }
        ui.label(RichText::new(t("welcome", language)).size(32.0).strong());
        ui.add_space(8.0);
        ui.label(RichText::new(t("subtitle", language)).size(16.0).weak());
        ui.add_space(24.0);
        if ui
            .button(RichText::new(t("startChat", language)).size(18.0))
            .clicked()
        {
            start = true;
        }
    });
    start
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn decodes_png_logo() {
        let mut png = Vec::new();
        image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]))
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let logo = decode_logo(&png).unwrap();
        assert_eq!(logo.size, [3, 2]);
    }

    #[test]
    fn rejects_non_image_bytes() {
        assert!(decode_logo(b"<html>offline</html>").is_err());
    }
}
