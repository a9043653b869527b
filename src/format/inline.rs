use std::sync::LazyLock;

use regex::Regex;

/// One inline run of a formatted line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Text(String),
    Bold(String),
    Code(String),
}

static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("valid regex"));
// Lazy `.*?` stops at the first closing pair, so the body never contains it.
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*|__(.*?)__").expect("valid regex"));

struct InlineMatch {
    start: usize,
    end: usize,
    span: Span,
}

/// Split a line into text, bold and inline-code spans.
///
/// Code and bold are scanned independently. A bold match that starts inside a
/// code match is dropped, then the survivors are emitted in source order with
/// the text between them passed through unchanged.
pub fn parse_inline(text: &str) -> Vec<Span> {
    let code_matches: Vec<InlineMatch> = INLINE_CODE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(InlineMatch {
                start: whole.start(),
                end: whole.end(),
                span: Span::Code(caps[1].to_string()),
            })
        })
        .collect();

    let mut matches: Vec<InlineMatch> = BOLD
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let inside_code = code_matches
                .iter()
                .any(|code| whole.start() >= code.start && whole.start() < code.end);
            if inside_code {
                return None;
            }
            let body = caps.get(1).or_else(|| caps.get(2))?.as_str();
            Some(InlineMatch {
                start: whole.start(),
                end: whole.end(),
                span: Span::Bold(body.to_string()),
            })
        })
        .collect();

    matches.extend(code_matches);
    matches.sort_by_key(|found| found.start);

    let mut spans = Vec::new();
    let mut cursor = 0;
    for found in matches {
        // A bold run that straddles the end of a code span would overlap the
        // span already emitted.
        if found.start < cursor {
            continue;
        }
        if found.start > cursor {
            spans.push(Span::Text(text[cursor..found.start].to_string()));
        }
        spans.push(found.span);
        cursor = found.end;
    }

    if cursor < text.len() {
        spans.push(Span::Text(text[cursor..].to_string()));
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Span {
        Span::Text(value.to_string())
    }

    fn bold(value: &str) -> Span {
        Span::Bold(value.to_string())
    }

    fn code(value: &str) -> Span {
        Span::Code(value.to_string())
    }

    #[test]
    fn plain_text_is_a_single_span() {
        assert_eq!(parse_inline("just words"), vec![text("just words")]);
    }

    #[test]
    fn bold_then_code_in_source_order() {
        assert_eq!(
            parse_inline("**a** `b`"),
            vec![bold("a"), text(" "), code("b")]
        );
    }

    #[test]
    fn underscore_bold_is_supported() {
        assert_eq!(
            parse_inline("say __loud__ now"),
            vec![text("say "), bold("loud"), text(" now")]
        );
    }

    #[test]
    fn bold_markers_inside_code_are_literal() {
        assert_eq!(
            parse_inline("run `a ** b ** c` please"),
            vec![text("run "), code("a ** b ** c"), text(" please")]
        );
    }

    #[test]
    fn bold_is_non_greedy() {
        assert_eq!(
            parse_inline("**one** and **two**"),
            vec![bold("one"), text(" and "), bold("two")]
        );
    }

    #[test]
    fn loose_backtick_stays_text() {
        assert_eq!(parse_inline("it`s fine"), vec![text("it`s fine")]);
    }

    #[test]
    fn spans_never_overlap() {
        // Bold starts before the code span and would run into it.
        let spans = parse_inline("**x `y** z`");
        let rebuilt: usize = spans
            .iter()
            .map(|span| match span {
                Span::Text(value) => value.len(),
                Span::Bold(value) => value.len() + 4,
                Span::Code(value) => value.len() + 2,
            })
            .sum();
        assert!(rebuilt <= "**x `y** z`".len());
        assert_eq!(spans[0], bold("x `y"));
    }
}
