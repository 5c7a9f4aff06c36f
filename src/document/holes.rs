// src/document/holes.rs

//! Hole markers: `,A` .. `,Z` in the definition text.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

/// Letters that may follow the hole escape prefix. Each is one logic variable.
pub const HOLE_LETTERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Escape plus exactly one capital letter; `,Abc` is a symbol, not a hole.
///
/// The pattern is a literal, so compiling it cannot fail at runtime; the
/// unit tests below compile it on first use.
static HOLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",([A-Z])\b").expect("hole marker pattern is a valid literal"));

/// Distinct hole letters appearing in `text`.
pub fn hole_markers(text: &str) -> BTreeSet<char> {
    HOLE_RE
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .filter_map(|m| m.as_str().chars().next())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hole_pattern_compiles() {
        assert_eq!(LazyLock::force(&HOLE_RE).as_str(), r",([A-Z])\b");
    }

    #[test]
    fn repeated_markers_count_once() {
        let holes = hole_markers("(define ,A (lambda ,B (,A ,C ,A)))");
        assert_eq!(holes.into_iter().collect::<String>(), "ABC");
    }

    #[test]
    fn longer_symbols_are_not_holes() {
        assert!(hole_markers("(list ,Abc ,x)").is_empty());
        assert_eq!(hole_markers("(,A,B)").into_iter().collect::<String>(), "AB");
        assert_eq!(hole_markers(",Z").into_iter().collect::<String>(), "Z");
    }
}
