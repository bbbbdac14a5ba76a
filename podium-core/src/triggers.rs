//! Anchored trigger-phrase detection (spec.md §4.2).
//!
//! The teacher's own keyword spotting
//! (`plentysound-transcriber/src/audio.rs::check_keywords_matched`) scans
//! for unanchored substring hits against a fixed grammar; this is a
//! different contract (anchored, ordered, polite-prefix tolerant) so it is
//! written fresh rather than adapted, but keeps the teacher's habit of
//! small pure functions over the raw text.

#[derive(Debug, Clone, PartialEq)]
pub enum TriggerAction {
    Next,
    Prev,
    Goto,
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerResult {
    pub action: TriggerAction,
    pub target: Option<usize>,
}

const POLITE_PREFIXES: &[&str] = &[
    "can you",
    "could you",
    "would you",
    "let's",
    "we should",
    "i want to",
];

/// Strip an optional "please" then an optional polite prefix phrase from
/// the start of `s`, returning the remainder.
fn strip_polite_prefix(s: &str) -> &str {
    let mut rest = strip_any_word(s, &["please"]).unwrap_or(s);
    if let Some(r) = strip_any_word(rest, POLITE_PREFIXES) {
        rest = r;
    }
    rest
}

/// Consume one of `words` (in order) from the start of `s`, returning the
/// remainder if any matched, else `None`.
fn strip_any_word<'a>(s: &'a str, words: &[&str]) -> Option<&'a str> {
    for w in words {
        if let Some(r) = s.strip_prefix(w) {
            if r.is_empty() || r.starts_with(' ') {
                return Some(r.trim_start());
            }
        }
    }
    None
}

fn strip_optional_word<'a>(s: &'a str, word: &str) -> &'a str {
    strip_any_word(s, &[word]).unwrap_or(s)
}

/// `go|move|advance|switch [to] [the] next slide|one` -> Next
///
/// The leading verb is itself optional: "next slide" alone (no "go"/"move")
/// is an accepted trigger too.
fn match_next(s: &str) -> Option<TriggerResult> {
    let rest = strip_any_word(s, &["go", "move", "advance", "switch"]).unwrap_or(s);
    let rest = strip_optional_word(rest, "to");
    let rest = strip_optional_word(rest, "the");
    let _ = strip_any_word(rest, &["next slide", "next one", "next"])?;
    Some(TriggerResult {
        action: TriggerAction::Next,
        target: None,
    })
}

/// `go|move|switch back [a] slide|one` -> Prev
fn match_prev_back(s: &str) -> Option<TriggerResult> {
    let rest = strip_any_word(s, &["go", "move", "switch"])?;
    let rest = strip_any_word(rest, &["back"])?;
    let rest = strip_optional_word(rest, "a");
    let _ = strip_any_word(rest, &["slide", "one"])?;
    Some(TriggerResult {
        action: TriggerAction::Prev,
        target: None,
    })
}

/// `previous|prior slide` -> Prev
fn match_previous_slide(s: &str) -> Option<TriggerResult> {
    let rest = strip_any_word(s, &["previous", "prior"])?;
    let _ = strip_any_word(rest, &["slide"])?;
    Some(TriggerResult {
        action: TriggerAction::Prev,
        target: None,
    })
}

/// `last slide` -> Last
fn match_last(s: &str) -> Option<TriggerResult> {
    let rest = s.strip_prefix("last")?;
    if !(rest.is_empty() || rest.starts_with(' ')) {
        return None;
    }
    let rest = rest.trim_start();
    let _ = strip_any_word(rest, &["slide"])?;
    Some(TriggerResult {
        action: TriggerAction::Last,
        target: None,
    })
}

/// `first slide` -> First
fn match_first(s: &str) -> Option<TriggerResult> {
    let rest = s.strip_prefix("first")?;
    if !(rest.is_empty() || rest.starts_with(' ')) {
        return None;
    }
    let rest = rest.trim_start();
    let _ = strip_any_word(rest, &["slide"])?;
    Some(TriggerResult {
        action: TriggerAction::First,
        target: None,
    })
}

fn leading_digits(s: &str) -> Option<(usize, &str)> {
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        let n: usize = digits.parse().ok()?;
        Some((n, &s[digits.len()..]))
    }
}

/// `go|jump|skip [to] [slide] <digits>` -> Goto
fn match_goto_verb(s: &str) -> Option<TriggerResult> {
    let rest = strip_any_word(s, &["go", "jump", "skip"])?;
    let rest = strip_optional_word(rest, "to");
    let rest = strip_optional_word(rest, "slide");
    let (n, _) = leading_digits(rest)?;
    if n == 0 {
        return None;
    }
    Some(TriggerResult {
        action: TriggerAction::Goto,
        target: Some(n - 1),
    })
}

/// `slide <digits>` -> Goto
fn match_slide_digits(s: &str) -> Option<TriggerResult> {
    let rest = s.strip_prefix("slide")?;
    if !(rest.is_empty() || rest.starts_with(' ')) {
        return None;
    }
    let rest = rest.trim_start();
    let (n, _) = leading_digits(rest)?;
    if n == 0 {
        return None;
    }
    Some(TriggerResult {
        action: TriggerAction::Goto,
        target: Some(n - 1),
    })
}

/// Detect a trigger at the start of `s` (spec.md §4.2). Patterns are tried
/// in the documented order; Goto candidates with no captured digits are
/// skipped rather than treated as a match.
pub fn detect_trigger(s: &str) -> Option<TriggerResult> {
    let trimmed = s.trim().to_lowercase();
    if trimmed.len() < 3 {
        return None;
    }
    if !trimmed.chars().any(|c| c.is_alphabetic()) {
        return None;
    }

    let body = strip_polite_prefix(&trimmed);

    match_next(body)
        .or_else(|| match_prev_back(body))
        .or_else(|| match_previous_slide(body))
        .or_else(|| match_last(body))
        .or_else(|| match_first(body))
        .or_else(|| match_goto_verb(body))
        .or_else(|| match_slide_digits(body))
}
