//! Tolerant extraction of `SCORE` / `CATEGORY` / `REASON` from free text.
//!
//! The model is asked for a three-line template but is free to ignore it.
//! Each field is located independently and has its own fallback, so a reply
//! with only a usable reason still produces a full [`Judgment`].

use regex::Regex;
use std::sync::OnceLock;
use trustcheck_common::{truncate_chars, Judgment};

pub const DEFAULT_SCORE: u8 = 50;
pub const DEFAULT_CATEGORY: &str = "Unknown";
pub const DEFAULT_REASON: &str = "Analysis complete";
pub const MAX_REASON_CHARS: usize = 300;

fn score_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)SCORE:\s*(\d{1,3})").expect("score pattern compiles")
    })
}

// Words are letter runs, optionally hyphenated ("AI-generated"), joined by
// single spaces. Matching stops at the end of the line.
fn category_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)CATEGORY:[ \t]*(\p{L}+(?:-\p{L}+)*(?: \p{L}+(?:-\p{L}+)*)*)")
            .expect("category pattern compiles")
    })
}

fn reason_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)REASON:[ \t]*([^\r\n]*)").expect("reason pattern compiles")
    })
}

/// Parse all three fields; never fails.
///
/// ```
/// use trustcheck_llm::parser::parse_judgment;
///
/// let j = parse_judgment("SCORE: 73\nCATEGORY: biased\nREASON: Uses loaded language.");
/// assert_eq!(j.score, 73);
/// assert_eq!(j.category, "biased");
/// assert_eq!(j.reason, "Uses loaded language.");
/// ```
pub fn parse_judgment(raw: &str) -> Judgment {
    Judgment {
        score: extract_score(raw),
        category: extract_category(raw),
        reason: extract_reason(raw),
    }
}

/// First `SCORE:` followed by 1-3 digits; out-of-range values fall back to
/// [`DEFAULT_SCORE`] rather than being clamped.
pub fn extract_score(raw: &str) -> u8 {
    score_re()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u16>().ok())
        .filter(|score| *score <= 100)
        .map(|score| score as u8)
        .unwrap_or(DEFAULT_SCORE)
}

pub fn extract_category(raw: &str) -> String {
    category_re()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
}

/// Rest of the `REASON:` line, trimmed and capped at [`MAX_REASON_CHARS`].
pub fn extract_reason(raw: &str) -> String {
    reason_re()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|r| !r.is_empty())
        .map(|r| truncate_chars(r, MAX_REASON_CHARS).trim_end().to_string())
        .unwrap_or_else(|| DEFAULT_REASON.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_reply() {
        let j = parse_judgment("SCORE: 73\nCATEGORY: biased\nREASON: Uses loaded language.");
        assert_eq!(j, Judgment::new(73, "biased", "Uses loaded language."));
    }

    #[test]
    fn missing_markers_use_defaults() {
        let j = parse_judgment("I think this is probably fine.");
        assert_eq!(j, Judgment::new(50, "Unknown", "Analysis complete"));
    }

    #[test]
    fn out_of_range_score_falls_back() {
        assert_eq!(extract_score("SCORE: 150"), 50);
        assert_eq!(extract_score("SCORE: 100"), 100);
        assert_eq!(extract_score("SCORE: 0"), 0);
    }

    #[test]
    fn score_is_case_insensitive_and_tolerates_noise() {
        assert_eq!(extract_score("score:   88 out of 100"), 88);
        assert_eq!(extract_score("Score: [42]"), 50);
        assert_eq!(extract_score("SCORE: high"), 50);
    }

    #[test]
    fn only_first_three_digits_are_considered() {
        // "1000" yields "100" which is in range.
        assert_eq!(extract_score("SCORE: 1000"), 100);
        assert_eq!(extract_score("SCORE: 4567"), 50);
    }

    #[test]
    fn category_keeps_multi_word_and_hyphenated_values() {
        assert_eq!(extract_category("CATEGORY: fake news\nREASON: x"), "fake news");
        assert_eq!(extract_category("Category: AI-generated"), "AI-generated");
        assert_eq!(extract_category("CATEGORY:   clickbait  \n"), "clickbait");
    }

    #[test]
    fn category_stops_at_punctuation_and_line_end() {
        assert_eq!(extract_category("CATEGORY: legitimate.\nother"), "legitimate");
        assert_eq!(extract_category("CATEGORY: [biased]"), "Unknown");
        assert_eq!(extract_category("CATEGORY:\nlegitimate"), "Unknown");
    }

    #[test]
    fn reason_takes_rest_of_line_only() {
        let raw = "REASON:  Cites named sources.  \nSCORE: 10";
        assert_eq!(extract_reason(raw), "Cites named sources.");
    }

    #[test]
    fn reason_is_capped() {
        let raw = format!("REASON: {}", "x".repeat(500));
        assert_eq!(extract_reason(&raw).chars().count(), MAX_REASON_CHARS);
    }

    #[test]
    fn empty_reason_line_falls_back() {
        assert_eq!(extract_reason("REASON:\nSomething else"), DEFAULT_REASON);
    }

    #[test]
    fn fields_parse_independently_in_any_order() {
        let raw = "REASON: Sensational tone.\nsome chatter\nscore: 12";
        let j = parse_judgment(raw);
        assert_eq!(j.score, 12);
        assert_eq!(j.category, DEFAULT_CATEGORY);
        assert_eq!(j.reason, "Sensational tone.");
    }
}
