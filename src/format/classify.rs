use std::sync::LazyLock;

use regex::Regex;

/// Lines ending in `:` that open with one of these read as headings.
const HEADING_OPENERS: &[&str] = &[
    "بالطبع",
    "هل ترغب",
    "كيف يمكن",
    "ما هي",
    "How to",
    "What is",
    "Where to",
    "When to",
    "Why",
];

/// A `:`-terminated line longer than this is a heading on length alone.
const HEADING_MIN_CHARS: usize = 25;
const SUBHEADING_WORDS: std::ops::RangeInclusive<usize> = 2..=8;

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*+]\s").expect("valid regex"));
static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\.\s").expect("valid regex"));

/// What a single non-code line should render as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    Blank,
    Heading,
    Subheading,
    /// Bullet marker stripped off.
    Bullet { body: &'a str },
    Numbered { number: &'a str, body: &'a str },
    /// Paragraph that carries at least one backtick.
    CodeBearing,
    Paragraph,
}

fn is_heading(trimmed: &str) -> bool {
    if trimmed.ends_with('?') || trimmed.ends_with('؟') {
        return true;
    }
    trimmed.ends_with(':')
        && (HEADING_OPENERS
            .iter()
            .any(|opener| trimmed.starts_with(opener))
            || trimmed.chars().count() > HEADING_MIN_CHARS)
}

/// Classify one line of a message. Rules are tried in priority order:
/// heading, subheading, bullet, numbered item, inline-code line, paragraph.
pub fn classify_line(line: &str) -> LineKind<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }

    if is_heading(trimmed) {
        return LineKind::Heading;
    }

    let words = trimmed.split(' ').count();
    if trimmed.ends_with(':') && SUBHEADING_WORDS.contains(&words) {
        return LineKind::Subheading;
    }

    if let Some(marker) = BULLET.find(line) {
        return LineKind::Bullet {
            body: &line[marker.end()..],
        };
    }

    if let Some(caps) = NUMBERED.captures(line) {
        if let (Some(whole), Some(number)) = (caps.get(0), caps.get(1)) {
            return LineKind::Numbered {
                number: number.as_str(),
                body: &line[whole.end()..],
            };
        }
    }

    if line.contains('`') && !line.starts_with("```") {
        return LineKind::CodeBearing;
    }

    LineKind::Paragraph
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn questions_are_headings() {
        assert_eq!(classify_line("What next?"), LineKind::Heading);
        assert_eq!(classify_line("  ما الجديد؟ "), LineKind::Heading);
    }

    #[test]
    fn colon_lines_with_opener_or_length_are_headings() {
        assert_eq!(classify_line("Why:"), LineKind::Heading);
        assert_eq!(classify_line("بالطبع إليك الخطوات:"), LineKind::Heading);
        assert_eq!(
            classify_line("Here is a rather long introduction line:"),
            LineKind::Heading
        );
    }

    #[test]
    fn short_colon_lines_are_subheadings() {
        assert_eq!(classify_line("Key points:"), LineKind::Subheading);
        assert_eq!(classify_line("Note:"), LineKind::Paragraph);
    }

    #[test]
    fn bullets_strip_their_marker() {
        assert_eq!(
            classify_line("  - first item"),
            LineKind::Bullet { body: "first item" }
        );
        assert_eq!(classify_line("* star"), LineKind::Bullet { body: "star" });
        assert_eq!(classify_line("+ plus"), LineKind::Bullet { body: "plus" });
        assert_eq!(classify_line("-no space"), LineKind::Paragraph);
    }

    #[test]
    fn numbered_items_keep_their_number() {
        assert_eq!(
            classify_line("12. twelfth"),
            LineKind::Numbered {
                number: "12",
                body: "twelfth"
            }
        );
        assert_eq!(classify_line("3.14 is pi"), LineKind::Paragraph);
    }

    #[test]
    fn backtick_lines_and_plain_lines() {
        assert_eq!(classify_line("use `cargo`"), LineKind::CodeBearing);
        assert_eq!(classify_line("hello world"), LineKind::Paragraph);
        assert_eq!(classify_line("   "), LineKind::Blank);
    }

    #[test]
    fn heading_rules_win_over_list_rules() {
        assert_eq!(classify_line("- is this a question?"), LineKind::Heading);
        assert_eq!(classify_line("1. Setup steps:"), LineKind::Subheading);
    }
}
