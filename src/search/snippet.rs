//! Result snippets

use std::collections::HashSet;

const ELLIPSIS: &str = "...";

/// Build a display snippet of at most `width` characters (plus ellipses).
///
/// The window is centered on the first whole-token occurrence of any of
/// `terms` (already lowercased) in `body`. Without an occurrence the snippet
/// is the leading `width` characters. Whitespace runs collapse to one space.
pub fn make_snippet(body: &str, terms: &[String], width: usize) -> String {
    let text: Vec<char> = body.split_whitespace().collect::<Vec<_>>().join(" ").chars().collect();
    if text.is_empty() || width == 0 {
        return String::new();
    }
    if text.len() <= width {
        return text.into_iter().collect();
    }

    let start = match first_occurrence(&text, terms) {
        Some((position, len)) => {
            let center = position + len / 2;
            center.saturating_sub(width / 2).min(text.len() - width)
        }
        None => 0,
    };
    let end = start + width;

    let mut snippet = String::with_capacity(width + 2 * ELLIPSIS.len());
    if start > 0 {
        snippet.push_str(ELLIPSIS);
    }
    snippet.extend(&text[start..end]);
    if end < text.len() {
        snippet.push_str(ELLIPSIS);
    }
    snippet
}

/// Char offset and length of the first token that equals one of `terms`.
fn first_occurrence(text: &[char], terms: &[String]) -> Option<(usize, usize)> {
    let wanted: HashSet<&str> = terms.iter().map(String::as_str).collect();
    if wanted.is_empty() {
        return None;
    }

    let mut i = 0;
    while i < text.len() {
        if !text[i].is_alphanumeric() {
            i += 1;
            continue;
        }
        let start = i;
        while i < text.len() && text[i].is_alphanumeric() {
            i += 1;
        }
        let token: String = text[start..i].iter().flat_map(|c| c.to_lowercase()).collect();
        if wanted.contains(token.as_str()) {
            return Some((start, i - start));
        }
    }
    None
}
