//! Word hypotheses and the small text-hygiene helpers shared by the
//! stabilizer and the controller (spec.md §3 "Word hypothesis", §4.1
//! "Fuzzy match" and "Garbage filter").

/// A single ASR word hypothesis, end-timestamped relative to the start of
/// the current PCM buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct WordHyp {
    pub text: String,
    pub end_s: f32,
}

impl WordHyp {
    pub fn new(text: impl Into<String>, end_s: f32) -> Self {
        WordHyp {
            text: text.into(),
            end_s,
        }
    }
}

const LEADING_GARBAGE: &[char] = &['-', '.', ',', ';', ':', '!', '?'];

/// Fuzzy-equal per spec.md §4.1: case-insensitive, trimmed, symmetric.
pub fn fuzzy_match(a: &str, b: &str, fuzzy_min_len: usize) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a == b {
        return true;
    }
    if a.len() < fuzzy_min_len || b.len() < fuzzy_min_len {
        return false;
    }

    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let shorter = a_chars.len().min(b_chars.len());
    if a_chars[..shorter] == b_chars[..shorter] {
        return true;
    }

    let len_diff = a_chars.len().abs_diff(b_chars.len());
    if len_diff <= 1 && a_chars.len() >= fuzzy_min_len + 1 && b_chars.len() >= fuzzy_min_len + 1 {
        let aligned = shorter;
        let mismatches = (0..aligned).filter(|&i| a_chars[i] != b_chars[i]).count();
        return mismatches <= 1;
    }

    false
}

/// True if `word` should be dropped by the garbage filter (spec.md §4.1).
/// `prev` is the previous surviving word in the list, for consecutive-
/// duplicate suppression (case-insensitive).
fn is_garbage(word: &str, min_word_length: usize) -> bool {
    let lower = word.to_lowercase();
    if !word.chars().any(|c| c.is_alphabetic()) {
        return true;
    }
    if lower.chars().count() < min_word_length && lower != "i" && lower != "a" {
        return true;
    }
    if word
        .chars()
        .next()
        .map(|c| LEADING_GARBAGE.contains(&c))
        .unwrap_or(false)
    {
        return true;
    }
    false
}

/// Apply the garbage filter and consecutive-duplicate suppression to a list
/// of word strings, preserving order.
pub fn filter_garbage(words: &[String], min_word_length: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(words.len());
    for w in words {
        if is_garbage(w, min_word_length) {
            continue;
        }
        if let Some(last) = out.last() {
            if last.to_lowercase() == w.to_lowercase() {
                continue;
            }
        }
        out.push(w.clone());
    }
    out
}

/// Whitespace-trim and discard empties, per spec.md §3's "Word hypothesis"
/// and "Text window" invariants.
pub fn clean_trim(text: &str) -> Option<String> {
    let t = text.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        assert!(fuzzy_match("Hello", "hello", 3));
    }

    #[test]
    fn too_short_never_matches() {
        assert!(!fuzzy_match("go", "go", 3));
        assert!(!fuzzy_match("a", "b", 3));
    }

    #[test]
    fn prefix_match_go_going() {
        assert!(fuzzy_match("go", "going", 2));
    }

    #[test]
    fn prefix_match_want_wanna() {
        assert!(fuzzy_match("want", "wanna", 3));
    }

    #[test]
    fn symmetry() {
        let pairs = [("going", "go"), ("cats", "cars"), ("hello", "world"), ("a", "i")];
        for (a, b) in pairs {
            assert_eq!(
                fuzzy_match(a, b, 3),
                fuzzy_match(b, a, 3),
                "asymmetric for {a:?}/{b:?}"
            );
        }
    }

    #[test]
    fn hamming_one_diff_of_four_char_words() {
        // "cats" vs "cars": len 4 each, >= fuzzy_min_len+1 (4), 1 mismatch -> true
        assert!(fuzzy_match("cats", "cars", 3));
    }

    #[test]
    fn hamming_two_diffs_rejected() {
        // "cats" vs "cops": mismatches at index 1 and 2 -> 2 diffs -> false
        assert!(!fuzzy_match("cats", "cops", 3));
    }

    #[test]
    fn garbage_filter_drops_too_short_and_punct_leading() {
        let words = vec![
            "hi".to_string(),
            "42".to_string(),
            "-ok".to_string(),
            "a".to_string(),
            "i".to_string(),
            "the".to_string(),
        ];
        let out = filter_garbage(&words, 3);
        assert_eq!(out, vec!["a", "i", "the"]);
    }

    #[test]
    fn garbage_filter_drops_consecutive_duplicates_case_insensitive() {
        let words = vec!["the".to_string(), "The".to_string(), "cat".to_string()];
        let out = filter_garbage(&words, 2);
        assert_eq!(out, vec!["the", "cat"]);
    }
}
