//! Duplicate-detection keys.
//!
//! A key is the case-folded, whitespace-collapsed front and back joined by
//! [`DEDUP_SEPARATOR`]. The separator is not escaped, so a front containing it
//! can collide with a different front/back split. Stored keys depend on this
//! exact format; changing it would orphan existing rows.

use serde::{Deserialize, Serialize};

pub const DEDUP_SEPARATOR: char = ':';

/// Normalized identity of a card within a deck.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn new(front: &str, back: &str) -> Self {
        Self(format!(
            "{}{}{}",
            normalize_side(front),
            DEDUP_SEPARATOR,
            normalize_side(back)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DedupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lower-case, trim, and collapse every whitespace run to one space.
pub fn normalize_side(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        assert_eq!(DedupKey::new("  Hello   World ", "Xin\tchào").as_str(), "hello world:xin chào");
    }

    #[test]
    fn test_case_and_whitespace_collide() {
        assert_eq!(DedupKey::new("The  Cat", "con mèo"), DedupKey::new("the cat", " CON\nMÈO "));
    }

    #[test]
    fn test_separator_collision_is_preserved() {
        // "a:b" / "c" and "a" / "b:c" share a key.
        assert_eq!(DedupKey::new("a:b", "c"), DedupKey::new("a", "b:c"));
    }
}
