//! Text normalisation for indexing.
//!
//! Source entries carry inline formatting: `*bold*`, `_underline_`,
//! `~strike~`, `$special$`, zero-width joiners and footnote pointers such
//! as `{1}` or `{ab}`. Markers are removed without inserting anything in
//! their place, so text on either side of a marker fuses.

use regex::Regex;
use std::sync::OnceLock;

/// Formatting markers, or a footnote pointer with up to two
/// non-whitespace label characters.
const MARKER_PATTERN: &str = r"[*_~$\x{200d}]|\{[^\s\x{feff}]{0,2}\}";

/// Punctuation, digits, quotes and whitespace separate words.
const WORD_BREAK_PATTERN: &str = r#"[.:\[\](){}\-–,0-9'"‘’“”?\s\x{feff}]+"#;

fn markers() -> &'static Regex {
    static MARKERS: OnceLock<Regex> = OnceLock::new();
    MARKERS.get_or_init(|| Regex::new(MARKER_PATTERN).expect("marker pattern compiles"))
}

fn word_breaks() -> &'static Regex {
    static WORD_BREAKS: OnceLock<Regex> = OnceLock::new();
    WORD_BREAKS.get_or_init(|| Regex::new(WORD_BREAK_PATTERN).expect("word break pattern compiles"))
}

/// Clean raw entry text for the token index.
///
/// Removes formatting markers and footnote pointers, turns newlines into
/// spaces and trims the result. Removing one marker can expose a new
/// footnote pointer (`{ab*}`), so stripping repeats until nothing changes;
/// cleaning clean text is therefore a no-op.
pub fn clean_for_indexing(raw: &str) -> String {
    let mut current = raw.to_string();
    while markers().is_match(&current) {
        current = markers().replace_all(&current, "").into_owned();
    }

    current.replace('\n', " ").trim_matches(is_js_whitespace).to_string()
}

/// Whitespace as understood by the source data's tooling, which also
/// counts the byte-order mark.
fn is_js_whitespace(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

/// Split text into words for the suggestion table.
pub fn extract_words(text: &str) -> Vec<&str> {
    word_breaks()
        .split(text)
        .filter(|word| !word.is_empty())
        .collect()
}
