//! Snippet extraction and highlighting.
//!
//! Given a field's text and the terms that matched it, [`build_snippet`]
//! locates the best span (exact case-insensitive substring first, then the
//! left-most window within one edit of a term), widens it to whole words,
//! cuts a context window around it, escapes the window as HTML, and wraps
//! every occurrence of the located token or any active term in `<mark>`.

use regex::{Regex, RegexBuilder};

use crate::highlight::distance::{bounded_levenshtein, DistanceBuffers};
use crate::util::{escape_html, truncate_chars};

/// Maximum length of an unhighlighted fallback snippet.
pub const SNIPPET_CEILING: usize = 200;

/// Characters of context kept on each side of the located span.
pub const CONTEXT_RADIUS: usize = 60;

/// How far into the text the fuzzy fallback looks.
pub const SCAN_LIMIT: usize = crate::core::CONTENT_CEILING;

/// Edit budget for the fuzzy fallback.
pub const FUZZY_MAX_DISTANCE: usize = 1;

/// Opening highlight marker.
pub const MARK_OPEN: &str = "<mark>";

/// Closing highlight marker.
pub const MARK_CLOSE: &str = "</mark>";

/// A located span, in character offsets into the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MatchSpan {
    start: usize,
    len: usize,
    token: String,
}

/// Build a highlighted excerpt of `text`.
///
/// `matched_terms` are the terms the index reported for this field; when
/// there are none, the trimmed `fallback_term` (the raw query) is used as the
/// single active term.
///
/// Returns:
/// - `None` when `text` is empty or whitespace,
/// - the first [`SNIPPET_CEILING`] characters of `text`, untouched, when
///   there are no active terms or nothing matched,
/// - otherwise an HTML fragment: escaped text with `<mark>` highlights.
pub fn build_snippet<T: AsRef<str>>(
    text: &str,
    matched_terms: &[T],
    fallback_term: &str,
) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }

    let terms = active_terms(matched_terms, fallback_term);
    if terms.is_empty() {
        return Some(truncate_chars(text, SNIPPET_CEILING).to_string());
    }

    let chars: Vec<char> = text.chars().collect();
    let folded: Vec<char> = chars.iter().map(|&c| fold_char(c)).collect();

    let span = find_exact(&chars, &folded, &terms).or_else(|| find_fuzzy(&chars, &folded, &terms));
    let Some(span) = span else {
        return Some(truncate_chars(text, SNIPPET_CEILING).to_string());
    };

    let start = span.start.saturating_sub(CONTEXT_RADIUS);
    let end = (span.start + span.len + CONTEXT_RADIUS).min(chars.len());
    let window: String = chars[start..end].iter().collect();
    let escaped = escape_html(&window);

    Some(highlight(&escaped, &span.token, &terms))
}

/// Resolve the terms that drive snippet location.
///
/// Blank terms are dropped; duplicates keep their first position.
fn active_terms<T: AsRef<str>>(matched_terms: &[T], fallback_term: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for term in matched_terms {
        let term = term.as_ref().trim();
        if !term.is_empty() && !terms.iter().any(|t| t == term) {
            terms.push(term.to_string());
        }
    }
    if terms.is_empty() {
        let fallback = fallback_term.trim();
        if !fallback.is_empty() {
            terms.push(fallback.to_string());
        }
    }
    terms
}

/// Lowercase a single character without changing the character count.
///
/// Characters whose lowercase form expands to several characters are kept
/// as-is so that offsets in the folded text line up with the original.
fn fold_char(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

fn fold_term(term: &str) -> Vec<char> {
    term.chars().map(fold_char).collect()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Widen `[start, end)` to the enclosing word boundaries.
fn expand_to_word(chars: &[char], start: usize, end: usize) -> MatchSpan {
    let mut left = start;
    while left > 0 && is_word_char(chars[left - 1]) {
        left -= 1;
    }
    let mut right = end;
    while right < chars.len() && is_word_char(chars[right]) {
        right += 1;
    }
    MatchSpan {
        start: left,
        len: right - left,
        token: chars[left..right].iter().collect(),
    }
}

/// First term (in order) that occurs verbatim, ignoring case.
fn find_exact(chars: &[char], folded: &[char], terms: &[String]) -> Option<MatchSpan> {
    for term in terms {
        let needle = fold_term(term);
        if needle.is_empty() || needle.len() > folded.len() {
            continue;
        }
        if let Some(pos) = folded.windows(needle.len()).position(|w| w == needle.as_slice()) {
            return Some(expand_to_word(chars, pos, pos + needle.len()));
        }
    }
    None
}

/// First term (in order) with a window within [`FUZZY_MAX_DISTANCE`] edits.
///
/// Only the first [`SCAN_LIMIT`] characters are scanned. For each start
/// position, left to right, windows one shorter, equal to, and one longer
/// than the term are tried; only windows whose first character equals the
/// term's first character are evaluated at all.
fn find_fuzzy(chars: &[char], folded: &[char], terms: &[String]) -> Option<MatchSpan> {
    let region = &folded[..folded.len().min(SCAN_LIMIT)];
    let mut buffers = DistanceBuffers::new();

    for term in terms {
        let needle = fold_term(term);
        let Some(&first) = needle.first() else {
            continue;
        };
        let lengths = [needle.len() - 1, needle.len(), needle.len() + 1];

        for start in 0..region.len() {
            if region[start] != first {
                continue;
            }
            for &len in &lengths {
                if len == 0 || start + len > region.len() {
                    continue;
                }
                let window = &region[start..start + len];
                let distance =
                    bounded_levenshtein(window, &needle, FUZZY_MAX_DISTANCE, &mut buffers);
                if distance <= FUZZY_MAX_DISTANCE {
                    return Some(expand_to_word(chars, start, start + len));
                }
            }
        }
    }
    None
}

/// Wrap every occurrence of `token` or any term in highlight markers.
///
/// `escaped` is already HTML-escaped; terms are escaped the same way before
/// being turned into a pattern so that e.g. a term `a&b` matches `a&amp;b`.
/// Matches that would cut through an entity such as `&amp;` are skipped.
fn highlight(escaped: &str, token: &str, terms: &[String]) -> String {
    let Some(pattern) = highlight_pattern(token, terms) else {
        return escaped.to_string();
    };

    let entities = entity_spans(escaped);
    let splits_entity = |pos: usize| entities.iter().any(|&(s, e)| s < pos && pos < e);

    let mut out = String::with_capacity(escaped.len() + 32);
    let mut last = 0;
    for m in pattern.find_iter(escaped) {
        if splits_entity(m.start()) || splits_entity(m.end()) {
            continue;
        }
        out.push_str(&escaped[last..m.start()]);
        out.push_str(MARK_OPEN);
        out.push_str(m.as_str());
        out.push_str(MARK_CLOSE);
        last = m.end();
    }
    out.push_str(&escaped[last..]);
    out
}

/// Case-insensitive alternation over the token and all terms.
///
/// Longer alternatives come first so that a whole word wins over a term it
/// contains. Returns `None` when there is nothing to match.
fn highlight_pattern(token: &str, terms: &[String]) -> Option<Regex> {
    let mut alternatives: Vec<String> = Vec::new();
    for candidate in std::iter::once(token).chain(terms.iter().map(String::as_str)) {
        if candidate.is_empty() {
            continue;
        }
        let escaped = escape_html(candidate);
        if !alternatives
            .iter()
            .any(|a| a.to_lowercase() == escaped.to_lowercase())
        {
            alternatives.push(escaped);
        }
    }
    if alternatives.is_empty() {
        return None;
    }
    alternatives.sort_by_key(|a| std::cmp::Reverse(a.chars().count()));

    let pattern = alternatives
        .iter()
        .map(|a| regex::escape(a))
        .collect::<Vec<_>>()
        .join("|");

    match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(error = %e, "failed to build highlight pattern, returning plain excerpt");
            None
        }
    }
}

/// Byte ranges of the entities produced by [`escape_html`].
fn entity_spans(escaped: &str) -> Vec<(usize, usize)> {
    const ENTITIES: [&str; 5] = ["&amp;", "&lt;", "&gt;", "&quot;", "&#39;"];
    let mut spans = Vec::new();
    for (pos, _) in escaped.match_indices('&') {
        if let Some(entity) = ENTITIES.iter().find(|e| escaped[pos..].starts_with(*e)) {
            spans.push((pos, pos + entity.len()));
        }
    }
    spans
}
