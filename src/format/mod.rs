//! Converts raw message text into render blocks.
//!
//! Fenced code is cut out first and never parsed further; every other line is
//! classified on its own by [`classify_line`] and then split into inline
//! spans by [`parse_inline`].

pub mod classify;
pub mod inline;

use std::sync::LazyLock;

use regex::Regex;

use crate::common::{Language, TextDirection};

pub use classify::{LineKind, classify_line};
pub use inline::{Span, parse_inline};

pub const DEFAULT_CODE_LANGUAGE: &str = "code";

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```([A-Za-z0-9_]*)\n?(.*?)```").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(Vec<Span>),
    Subheading(Vec<Span>),
    ListItem(Vec<Span>),
    NumberedItem { number: String, spans: Vec<Span> },
    Paragraph(Vec<Span>),
    CodeBlock { language: String, code: String },
    LineBreak,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedMessage {
    pub direction: TextDirection,
    pub blocks: Vec<Block>,
}

impl FormattedMessage {
    /// List markers sit on the leading edge of the reading direction, which is
    /// the right-hand side for RTL text.
    pub fn marker_on_right(&self) -> bool {
        self.direction.is_rtl()
    }
}

/// Format `text` for display in `language`. Pure and deterministic.
pub fn format_message(text: &str, language: Language) -> FormattedMessage {
    let mut blocks = Vec::new();
    let mut last_end = 0;

    for caps in CODE_FENCE.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };

        let before = &text[last_end..whole.start()];
        if !before.trim().is_empty() {
            format_lines(before, &mut blocks);
        }

        let tag = caps.get(1).map_or("", |m| m.as_str());
        let body = caps.get(2).map_or("", |m| m.as_str());
        blocks.push(Block::CodeBlock {
            language: if tag.is_empty() {
                DEFAULT_CODE_LANGUAGE.to_string()
            } else {
                tag.to_string()
            },
            code: body.trim().to_string(),
        });

        last_end = whole.end();
    }

    let rest = &text[last_end..];
    // With no fences and nothing else found, the whole input is formatted.
    if !rest.trim().is_empty() || blocks.is_empty() {
        format_lines(rest, &mut blocks);
    }

    FormattedMessage {
        direction: language.direction(),
        blocks,
    }
}

fn format_lines(text: &str, blocks: &mut Vec<Block>) {
    for line in text.split('\n') {
        let block = match classify_line(line) {
            LineKind::Blank => Block::LineBreak,
            LineKind::Heading => Block::Heading(parse_inline(line)),
            LineKind::Subheading => Block::Subheading(parse_inline(line)),
            LineKind::Bullet { body } => Block::ListItem(parse_inline(body)),
            LineKind::Numbered { number, body } => Block::NumberedItem {
                number: number.to_string(),
                spans: parse_inline(body),
            },
            LineKind::CodeBearing | LineKind::Paragraph => Block::Paragraph(parse_inline(line)),
        };
        blocks.push(block);
    }
}
