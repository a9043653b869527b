use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, Utc};
use eframe::egui::{self, Align, Layout, RichText};

use crate::animate::{RevealAnimator, RevealSchedule};
use crate::common::{ChatMessage, Language};
use crate::format::format_message;
use crate::language::{detect_direction, detect_language, t};

use super::message_view::{self, SaveCode};

#[derive(Default)]
pub struct ChatAreaResponse {
    /// Earliest moment a reveal animation needs another frame.
    pub repaint_after: Option<Duration>,
    pub copied: bool,
    pub save_code: Option<SaveCode>,
}

pub fn render(
    ui: &mut egui::Ui,
    messages: &[ChatMessage],
    language: Language,
    animators: &mut HashMap<String, RevealAnimator>,
    schedule: RevealSchedule,
    now: Instant,
) -> ChatAreaResponse {
    let mut response = ChatAreaResponse::default();

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .stick_to_bottom(true)
        .show(ui, |ui| {
            for message in messages {
                let shown = visible_text(message, animators, schedule, now, &mut response);
                ui.push_id(&message.id, |ui| {
                    render_message(ui, message, shown, language, &mut response);
                });
                ui.add_space(8.0);
            }
        });

    // Finished replies no longer need their animator.
    animators.retain(|id, _| {
        messages
            .iter()
            .any(|message| &message.id == id && message.is_streaming)
    });

    response
}

fn visible_text<'a>(
    message: &'a ChatMessage,
    animators: &mut HashMap<String, RevealAnimator>,
    schedule: RevealSchedule,
    now: Instant,
    response: &mut ChatAreaResponse,
) -> &'a str {
    if message.is_user() {
        return &message.content;
    }

    let animator = if message.is_streaming {
        animators
            .entry(message.id.clone())
            .or_insert_with(|| RevealAnimator::new(schedule))
    } else {
        match animators.get_mut(&message.id) {
            Some(animator) => animator,
            None => return &message.content,
        }
    };

    if let Some(wait) = animator.update(&message.content, message.is_streaming, now) {
        response.repaint_after = Some(match response.repaint_after {
            Some(current) => current.min(wait),
            None => wait,
        });
    }
    animator.displayed(&message.content)
}

fn render_message(
    ui: &mut egui::Ui,
    message: &ChatMessage,
    shown: &str,
    language: Language,
    response: &mut ChatAreaResponse,
) {
    let visuals = ui.visuals().clone();
    let (fill, author) = if message.is_user() {
        (visuals.faint_bg_color, message.role.display_name())
    } else {
        (visuals.extreme_bg_color, "Zaki")
    };
    let bubble_align = if message.is_user() {
        Align::Max
    } else {
        Align::Min
    };

    ui.with_layout(Layout::top_down(bubble_align), |ui| {
        egui::Frame::group(ui.style()).fill(fill).show(ui, |ui| {
            ui.set_max_width(ui.available_width() * 0.85);

            ui.horizontal(|ui| {
                ui.label(RichText::new(author).strong());
                ui.label(RichText::new(clock_time(&message.timestamp)).small().weak());
            });

            if message.is_streaming && shown.is_empty() {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(RichText::new(t("thinking", language)).italics());
                });
                return;
            }

            if message.is_user() {
                let align = if detect_direction(shown).is_rtl() {
                    Align::Max
                } else {
                    Align::Min
                };
                ui.with_layout(Layout::top_down(align), |ui| {
                    ui.label(shown);
                });
            } else {
                let formatted = format_message(shown, detect_language(&message.content));
                if let Some(save) = message_view::render(ui, &formatted) {
                    response.save_code = Some(save);
                }
            }

            if !message.is_streaming
                && !message.content.is_empty()
                && ui.small_button(t("copy", language)).clicked()
            {
                ui.ctx().copy_text(message.content.clone());
                response.copied = true;
            }
        });
    });
}

/// Hours and minutes on the user's local clock.
fn clock_time(timestamp: &DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn timestamps_use_the_local_clock() {
        let utc = Utc.with_ymd_and_hms(2024, 3, 9, 21, 5, 0).unwrap();
        let local = utc.with_timezone(&Local);
        assert_eq!(
            clock_time(&utc),
            format!("{:02}:{:02}", local.hour(), local.minute())
        );
    }
}
