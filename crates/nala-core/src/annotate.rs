//! Glossary term annotation
//!
//! Every term is matched against the original reply text. Longer terms run
//! first and claim their spans; a later match overlapping a claimed span is
//! dropped. The output is then assembled in a single pass, so inserted
//! markup is never scanned again.

use askama::Html as HtmlEscaper;
use askama::MarkupDisplay;

use crate::glossary::Glossary;

/// A glossary term found in a piece of text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermMatch<'a> {
    /// Byte offset of the match in the original text
    pub start: usize,
    pub end: usize,
    /// Normalised glossary term that matched
    pub term: &'a str,
    pub definition: &'a str,
}

/// Text split into plain runs and matched terms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Plain(&'a str),
    Term {
        /// Matched text with its original casing
        text: &'a str,
        term: &'a str,
        definition: &'a str,
    },
}

/// Heuristic Markdown table check.
///
/// A line that starts and ends with `|` once trimmed, or any line containing
/// `---`, counts as a table. Annotating inside table cells breaks rendering,
/// so such text is left alone.
pub fn contains_markdown_table(text: &str) -> bool {
    text.split('\n').any(|line| {
        let trimmed = line.trim();
        let piped = trimmed.len() >= 2 && trimmed.starts_with('|') && trimmed.ends_with('|');
        piped || line.contains("---")
    })
}

/// Claimed term spans, ordered by position. Empty if the text has a table.
pub fn find_terms<'a>(text: &str, glossary: &'a Glossary) -> Vec<TermMatch<'a>> {
    if glossary.is_empty() || contains_markdown_table(text) {
        return Vec::new();
    }

    let mut claimed: Vec<TermMatch<'a>> = Vec::new();

    // Glossary is already ordered longest term first
    for entry in glossary.compiled() {
        let mut from = 0;
        while let Some(found) = entry.pattern.find_at(text, from) {
            let overlaps = claimed
                .iter()
                .any(|c| found.start() < c.end && c.start < found.end());
            if overlaps {
                // Retry one char further on; a later occurrence may start inside this match
                from = found.start() + text[found.start()..].chars().next().map_or(1, char::len_utf8);
                continue;
            }
            claimed.push(TermMatch {
                start: found.start(),
                end: found.end(),
                term: &entry.term,
                definition: &entry.definition,
            });
            from = found.end();
        }
    }

    claimed.sort_by_key(|m| m.start);
    claimed
}

/// Split `text` into plain and term segments
pub fn segments<'a>(text: &'a str, glossary: &'a Glossary) -> Vec<Segment<'a>> {
    let matches = find_terms(text, glossary);
    let mut out = Vec::with_capacity(matches.len() * 2 + 1);
    let mut cursor = 0;

    for m in matches {
        if m.start > cursor {
            out.push(Segment::Plain(&text[cursor..m.start]));
        }
        out.push(Segment::Term {
            text: &text[m.start..m.end],
            term: m.term,
            definition: m.definition,
        });
        cursor = m.end;
    }

    if cursor < text.len() {
        out.push(Segment::Plain(&text[cursor..]));
    }
    out
}

/// Wrap every glossary term in `text` with hover tooltip markup.
///
/// Returns `text` unchanged when it contains a Markdown table, the glossary
/// is empty, or no term occurs.
pub fn annotate(text: &str, glossary: &Glossary) -> String {
    let matches = find_terms(text, glossary);
    if matches.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len() + matches.len() * 96);
    let mut cursor = 0;
    for m in &matches {
        out.push_str(&text[cursor..m.start]);
        push_tooltip(&mut out, &text[m.start..m.end], m.definition);
        cursor = m.end;
    }
    out.push_str(&text[cursor..]);
    out
}

fn push_tooltip(out: &mut String, visible: &str, definition: &str) {
    out.push_str(r#"<span class="tooltip-term">"#);
    out.push_str(visible);
    out.push_str(r#"<span class="tooltip-text">"#);
    out.push_str(&escape_html(definition));
    out.push_str("</span></span>");
}

pub(crate) fn escape_html(s: &str) -> String {
    MarkupDisplay::new_unsafe(s, HtmlEscaper).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tip(visible: &str, definition: &str) -> String {
        format!(
            r#"<span class="tooltip-term">{}<span class="tooltip-text">{}</span></span>"#,
            visible, definition
        )
    }

    fn stock_glossary() -> Glossary {
        Glossary::from_pairs(
            &[
                ("stock", "A small piece of a company you can buy."),
                ("stock market", "Where people buy and sell stocks."),
            ],
            true,
        )
    }

    #[test]
    fn test_longer_term_wraps_as_unit() {
        let out = annotate("The stock market is risky.", &stock_glossary());
        assert_eq!(
            out,
            format!(
                "The {} is risky.",
                tip("stock market", "Where people buy and sell stocks.")
            )
        );
        assert_eq!(out.matches("tooltip-term").count(), 1);
    }

    #[test]
    fn test_occurrence_starting_inside_a_rejected_match_is_found() {
        let glossary = Glossary::from_pairs(&[("index fund", "IF"), ("fund fund", "FF")], false);
        let found: Vec<(&str, usize, usize)> = find_terms("an index fund fund fund", &glossary)
            .iter()
            .map(|m| (m.term, m.start, m.end))
            .collect();
        assert_eq!(found, vec![("index fund", 3, 13), ("fund fund", 14, 23)]);
    }

    #[test]
    fn test_shorter_terms_still_match_outside_longer_ones() {
        let glossary = Glossary::from_pairs(
            &[("capital gain", "CG"), ("gain", "G"), ("capital", "C")],
            true,
        );
        let text = "A capital gain is a gain on capital.";
        let found: Vec<(&str, usize, usize)> = find_terms(text, &glossary)
            .iter()
            .map(|m| (m.term, m.start, m.end))
            .collect();
        assert_eq!(
            found,
            vec![("capital gain", 2, 14), ("gain", 20, 24), ("capital", 28, 35)]
        );
        assert_eq!(
            annotate(text, &glossary),
            format!(
                "A {} is a {} on {}.",
                tip("capital gain", "CG"),
                tip("gain", "G"),
                tip("capital", "C")
            )
        );
    }

    #[test]
    fn test_every_occurrence_wrapped_with_original_casing() {
        let out = annotate("Stocks, STOCK and stock.", &stock_glossary());
        let def = "A small piece of a company you can buy.";
        assert_eq!(
            out,
            format!(
                "{}, {} and {}.",
                tip("Stocks", def),
                tip("STOCK", def),
                tip("stock", def)
            )
        );
    }

    #[test]
    fn test_whole_words_only() {
        let glossary = Glossary::from_pairs(&[("tax", "Money you pay to the government.")], true);
        let text = "Take a taxi to the syntax class.";
        assert_eq!(annotate(text, &glossary), text);
    }

    #[test]
    fn test_plural_is_a_literal_trailing_s() {
        let glossary = Glossary::from_pairs(&[("tax", "T")], true);
        assert_eq!(annotate("taxs", &glossary), tip("taxs", "T"));
        // "es" plurals are not recognised
        assert_eq!(annotate("taxes", &glossary), "taxes");
    }

    #[test]
    fn test_plural_matching_can_be_disabled() {
        let glossary = Glossary::from_pairs(&[("bond", "B")], false);
        assert_eq!(annotate("bonds", &glossary), "bonds");
        assert_eq!(annotate("a bond", &glossary), format!("a {}", tip("bond", "B")));
    }

    #[test]
    fn test_definitions_are_never_rescanned() {
        let glossary = Glossary::from_pairs(
            &[
                ("bond", "A loan to a company or government."),
                ("loan", "Money you borrow that you must pay back."),
                ("company", "A business."),
            ],
            true,
        );
        let out = annotate("Buy a bond.", &glossary);
        assert_eq!(out, format!("Buy a {}.", tip("bond", "A loan to a company or government.")));
        assert_eq!(out.matches("tooltip-term").count(), 1);
    }

    #[test]
    fn test_markup_terms_in_glossary_do_not_match_inserted_markup() {
        let glossary = Glossary::from_pairs(&[("stock", "S"), ("span", "X"), ("class", "Y")], true);
        let out = annotate("stock", &glossary);
        assert_eq!(out, tip("stock", "S"));
    }

    #[test]
    fn test_table_text_is_untouched() {
        let text = "| A | B |\n|---|---|\n| 1 | 2 |";
        let glossary = Glossary::from_pairs(&[("a", "letter"), ("b", "letter")], true);
        assert_eq!(annotate(text, &glossary), text);
        assert!(find_terms(text, &glossary).is_empty());
    }

    #[test]
    fn test_any_pipe_line_disables_annotation() {
        let text = "Your stock options:\n  | stock | bond |  \nThat is all.";
        assert_eq!(annotate(text, &stock_glossary()), text);
    }

    #[test]
    fn test_triple_dash_disables_annotation() {
        let text = "A stock is a share.\n---\nThe end.";
        assert_eq!(annotate(text, &stock_glossary()), text);
    }

    #[test]
    fn test_table_detection_rules() {
        assert!(contains_markdown_table("| a | b |"));
        assert!(contains_markdown_table("intro\n   |x|   \noutro"));
        assert!(contains_markdown_table("||"));
        assert!(contains_markdown_table("a --- b"));
        assert!(!contains_markdown_table("plain text"));
        assert!(!contains_markdown_table("|"));
        assert!(!contains_markdown_table("a | b | c"));
        assert!(!contains_markdown_table("| leading pipe only"));
        assert!(!contains_markdown_table("em -- dash"));
        assert!(!contains_markdown_table(""));
    }

    #[test]
    fn test_empty_glossary_is_noop() {
        let empty = Glossary::new(Vec::new(), true);
        for text in ["", "stock market", "Anything at all."] {
            assert_eq!(annotate(text, &empty), text);
        }
    }

    #[test]
    fn test_text_without_terms_is_unchanged() {
        let text = "Let's talk about **money** today.";
        assert_eq!(annotate(text, &Glossary::builtin(true)), text);
    }

    #[test]
    fn test_markdown_formatting_survives() {
        let glossary = Glossary::from_pairs(&[("budget", "A plan.")], true);
        let out = annotate("> **Budget** tip", &glossary);
        assert_eq!(out, format!("> **{}** tip", tip("Budget", "A plan.")));
    }

    #[test]
    fn test_definition_is_html_escaped() {
        let glossary = Glossary::from_pairs(&[("fee", "Costs <$5 & more")], true);
        assert_eq!(annotate("fee", &glossary), tip("fee", "Costs &lt;$5 &amp; more"));
    }

    #[test]
    fn test_non_ascii_text() {
        let glossary = Glossary::from_pairs(&[("risk", "R")], true);
        assert_eq!(
            annotate("Ça dépend du risk.", &glossary),
            format!("Ça dépend du {}.", tip("risk", "R"))
        );
    }

    #[test]
    fn test_segments_cover_whole_text() {
        let glossary = Glossary::builtin(true);
        let text = "Open a savings account before payday.";
        let segs = segments(text, &glossary);
        assert_eq!(
            segs,
            vec![
                Segment::Plain("Open a "),
                Segment::Term {
                    text: "savings account",
                    term: "savings account",
                    definition: "A bank account for saving money and earning interest.",
                },
                Segment::Plain(" before "),
                Segment::Term {
                    text: "payday",
                    term: "payday",
                    definition: "The day you get your paycheck.",
                },
                Segment::Plain("."),
            ]
        );

        let rebuilt: String = segs
            .iter()
            .map(|s| match s {
                Segment::Plain(t) => *t,
                Segment::Term { text, .. } => *text,
            })
            .collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_segments_for_table_is_single_plain_run() {
        let text = "| a | b |";
        assert_eq!(segments(text, &Glossary::builtin(true)), vec![Segment::Plain(text)]);
    }
}
