//! Property tests for dedup-key normalization.
//!
//! Two cards whose sides differ only in letter case or whitespace runs must
//! always produce the same key.

use carden_types::{normalize_side, DedupKey};
use proptest::prelude::*;

fn words() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-zA-Zàáâãèéêìíòóôõùúýăđơư]{1,8}", 1..6)
}

fn separators(n: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[ \t\n]{1,4}", n)
}

/// Re-render words with arbitrary case flips and whitespace runs.
fn reformat(words: &[String], flips: &[bool], seps: &[String], pad: bool) -> String {
    let mut out = String::new();
    if pad {
        out.push_str("  \t");
    }
    for (i, word) in words.iter().enumerate() {
        if i > 0 {
            out.push_str(&seps[i % seps.len()]);
        }
        if flips[i % flips.len()] {
            out.push_str(&word.to_uppercase());
        } else {
            out.push_str(word);
        }
    }
    if pad {
        out.push_str("\n ");
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn prop_case_and_whitespace_variants_collide(
        front in words(),
        back in words(),
        flips in prop::collection::vec(any::<bool>(), 1..6),
        seps in separators(6),
        pad in any::<bool>(),
    ) {
        let plain = DedupKey::new(&front.join(" "), &back.join(" "));
        let noisy = DedupKey::new(
            &reformat(&front, &flips, &seps, pad),
            &reformat(&back, &flips, &seps, !pad),
        );
        prop_assert_eq!(plain, noisy);
    }

    #[test]
    fn prop_normalized_side_has_no_whitespace_runs(text in "[a-zA-Z \t\n]{0,40}") {
        let normalized = normalize_side(&text);
        prop_assert!(!normalized.contains("  "));
        prop_assert!(!normalized.contains('\t'));
        prop_assert!(!normalized.contains('\n'));
        prop_assert_eq!(normalized.trim(), normalized.as_str());
        prop_assert_eq!(normalized.to_lowercase(), normalized.clone());
    }

    #[test]
    fn prop_key_is_deterministic(front in ".{0,30}", back in ".{0,30}") {
        prop_assert_eq!(DedupKey::new(&front, &back), DedupKey::new(&front, &back));
    }
}

#[test]
fn test_distinct_words_do_not_collide() {
    assert_ne!(DedupKey::new("cat", "con mèo"), DedupKey::new("dog", "con chó"));
    assert_ne!(DedupKey::new("cat", "con mèo"), DedupKey::new("cat", "mèo"));
}
