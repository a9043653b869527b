use eframe::egui::{self, Align, FontId, Layout, RichText, TextFormat, text::LayoutJob};

use crate::format::{Block, FormattedMessage, Span};

const HEADING_SCALE: f32 = 1.35;
const SUBHEADING_SCALE: f32 = 1.15;

/// A code block the user asked to save to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveCode {
    pub language: String,
    pub code: String,
}

/// Draw a formatted message. RTL messages hug the right edge and put list
/// markers on the right.
pub fn render(ui: &mut egui::Ui, message: &FormattedMessage) -> Option<SaveCode> {
    let align = if message.direction.is_rtl() {
        Align::Max
    } else {
        Align::Min
    };

    let mut save = None;
    ui.with_layout(Layout::top_down(align), |ui| {
        for block in &message.blocks {
            if let Some(request) = render_block(ui, block, message.marker_on_right()) {
                save = Some(request);
            }
        }
    });
    save
}

fn render_block(ui: &mut egui::Ui, block: &Block, marker_on_right: bool) -> Option<SaveCode> {
    let body_size = egui::TextStyle::Body.resolve(ui.style()).size;

    match block {
        Block::Heading(spans) => {
            ui.add_space(4.0);
            ui.label(spans_job(ui, spans, body_size * HEADING_SCALE, true));
        }
        Block::Subheading(spans) => {
            ui.label(spans_job(ui, spans, body_size * SUBHEADING_SCALE, true));
        }
        Block::ListItem(spans) => {
            marked_line(ui, "•", spans, body_size, marker_on_right);
        }
        Block::NumberedItem { number, spans } => {
            let marker = format!("{number}.");
            marked_line(ui, &marker, spans, body_size, marker_on_right);
        }
        Block::Paragraph(spans) => {
            ui.label(spans_job(ui, spans, body_size, false));
        }
        Block::CodeBlock { language, code } => return code_block(ui, language, code),
        Block::LineBreak => ui.add_space(body_size * 0.5),
    }
    None
}

fn marked_line(
    ui: &mut egui::Ui,
    marker: &str,
    spans: &[Span],
    size: f32,
    marker_on_right: bool,
) {
    let layout = if marker_on_right {
        Layout::right_to_left(Align::TOP)
    } else {
        Layout::left_to_right(Align::TOP)
    };

    let job = spans_job(ui, spans, size, false);
    ui.with_layout(layout, |ui| {
        ui.label(RichText::new(marker).strong());
        ui.add(egui::Label::new(job).wrap());
    });
}

fn code_block(ui: &mut egui::Ui, language: &str, code: &str) -> Option<SaveCode> {
    let mut save = None;
    // Code always reads left to right.
    egui::Frame::group(ui.style())
        .fill(ui.visuals().code_bg_color)
        .show(ui, |ui| {
            ui.with_layout(Layout::top_down(Align::Min), |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new(language).small().weak());
                    if ui.small_button("🗐").on_hover_text("Copy code").clicked() {
                        ui.ctx().copy_text(code.to_string());
                    }
                    if ui.small_button("💾").on_hover_text("Download code").clicked() {
                        save = Some(SaveCode {
                            language: language.to_string(),
                            code: code.to_string(),
                        });
                    }
                });
                ui.label(RichText::new(code).monospace());
            });
        });
    save
}

fn spans_job(ui: &egui::Ui, spans: &[Span], size: f32, strong: bool) -> LayoutJob {
    let visuals = ui.visuals();
    let plain = if strong {
        visuals.strong_text_color()
    } else {
        visuals.text_color()
    };

    let mut job = LayoutJob::default();
    for span in spans {
        let (text, format) = match span {
            Span::Text(text) => (
                text,
                TextFormat {
                    font_id: FontId::proportional(size),
                    color: plain,
                    ..Default::default()
                },
            ),
            Span::Bold(text) => (
                text,
                TextFormat {
                    font_id: FontId::proportional(size),
                    color: visuals.strong_text_color(),
                    ..Default::default()
                },
            ),
            Span::Code(text) => (
                text,
                TextFormat {
                    font_id: FontId::monospace(size * 0.9),
                    color: plain,
                    background: visuals.code_bg_color,
                    ..Default::default()
                },
            ),
        };
        job.append(text, 0.0, format);
    }
    job
}
