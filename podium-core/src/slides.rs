//! Slide model and index (spec.md §4.3).
//!
//! Grounded on the teacher's normalize-then-match shape in
//! `plentysound-transcriber/src/audio.rs` (it lowercases and strips before
//! running `fuzzy_match`/keyword checks); generalized here into a full
//! per-slide normalization, sentence split, and token-set build performed
//! once at load time.

use crate::embed::Embedder;
use crate::error::{CoreError, EngineError};

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "of", "to", "in", "on", "at", "for", "with", "is",
    "are", "was", "were", "be", "been", "being", "it", "its", "this", "that", "these", "those",
    "we", "you", "they", "i", "he", "she", "as", "by", "from", "about", "into", "than", "then",
    "so", "if", "not", "do", "does", "did", "will", "would", "can", "could", "should",
];

/// An immutable slide, fully embedded at construction time.
#[derive(Debug, Clone)]
pub struct Slide {
    pub index: usize,
    pub title: String,
    pub content: String,
    pub embedding: Vec<f32>,
    pub sentence_embeddings: Vec<Vec<f32>>,
    pub tokens: std::collections::HashSet<String>,
    pub title_tokens: std::collections::HashSet<String>,
}

/// Replace NUL with nothing, CR with LF, collapse runs of spaces/tabs
/// within a line, and replace non-printable characters with space — but
/// keep line breaks intact, since `split_sentences`'s bullet/numbered-line
/// logic (spec.md §4.3 step 1) needs real line boundaries to detect.
fn normalize_text(s: &str) -> String {
    let mut cleaned = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '\0' {
            continue;
        }
        let c = if c == '\r' { '\n' } else { c };
        if c == '\n' || c == '\t' || c == ' ' || !c.is_control() {
            cleaned.push(c);
        } else {
            cleaned.push(' ');
        }
    }
    cleaned
        .split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn compose_normalized(index: usize, title: &str, content: &str) -> String {
    if title.trim().is_empty() && content.trim().is_empty() {
        return format!("Slide {index}");
    }
    normalize_text(&format!("{title}. {content}"))
}

fn is_bullet_or_numbered_start(line: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.starts_with('•') || trimmed.starts_with('-') || trimmed.starts_with('*') {
        return true;
    }
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return false;
    }
    trimmed[digits.len()..].starts_with('.') || trimmed[digits.len()..].starts_with(')')
}

/// Split normalized slide text into candidate sentences per spec.md §4.3.
fn split_sentences(normalized: &str) -> Vec<String> {
    // Step 1: regroup raw lines into bullet-delimited logical lines.
    let mut logical_lines: Vec<String> = Vec::new();
    for raw_line in normalized.split('\n') {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if is_bullet_or_numbered_start(line) || logical_lines.is_empty() {
            let stripped = line
                .trim_start_matches(['•', '-', '*', ' '])
                .trim_start_matches(|c: char| c.is_ascii_digit())
                .trim_start_matches(['.', ')'])
                .trim();
            logical_lines.push(stripped.to_string());
        } else if let Some(last) = logical_lines.last_mut() {
            last.push(' ');
            last.push_str(line);
        }
    }

    // Step 2: split each logical line on sentence-ending punctuation followed by whitespace.
    let mut sentences: Vec<String> = Vec::new();
    for line in &logical_lines {
        let mut current = String::new();
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            current.push(c);
            if matches!(c, '.' | '!' | '?') {
                if chars.peek().map(|n| n.is_whitespace()).unwrap_or(true) {
                    let s = current.trim().to_string();
                    if !s.is_empty() {
                        sentences.push(s);
                    }
                    current.clear();
                }
            }
        }
        let rest = current.trim().to_string();
        if !rest.is_empty() {
            sentences.push(rest);
        }
    }
    sentences
}

fn keep_and_dedup_sentences(
    sentences: Vec<String>,
    min_chars: usize,
    min_words: usize,
    max_per_slide: usize,
) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for s in sentences {
        if s.len() < min_chars {
            continue;
        }
        if s.split_whitespace().count() < min_words {
            continue;
        }
        let key = s.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.insert(key);
        out.push(s);
        if out.len() >= max_per_slide {
            break;
        }
    }
    out
}

/// Lowercase, extract `[a-z0-9']+` runs, drop short tokens and stopwords.
pub fn tokenize(text: &str) -> std::collections::HashSet<String> {
    let lower = text.to_lowercase();
    let mut tokens = std::collections::HashSet::new();
    let mut current = String::new();
    let mut chars = lower.chars().peekable();
    let flush = |current: &mut String, tokens: &mut std::collections::HashSet<String>| {
        if current.len() > 2 && !STOPWORDS.contains(&current.as_str()) {
            tokens.insert(std::mem::take(current));
        } else {
            current.clear();
        }
    };
    while let Some(c) = chars.next() {
        if c.is_ascii_alphanumeric() || c == '\'' {
            current.push(c);
        } else {
            flush(&mut current, &mut tokens);
        }
    }
    flush(&mut current, &mut tokens);
    tokens
}

pub struct SlideBuildParams {
    pub sentence_min_chars: usize,
    pub sentence_min_words: usize,
    pub sentence_max_per_slide: usize,
}

/// The immutable set of slides plus parallel lookup structures for a
/// session (spec.md §3 "Slide index").
pub struct SlideIndex {
    pub slides: Vec<Slide>,
}

impl SlideIndex {
    /// Build the full index eagerly, encoding every slide's whole-text and
    /// sentence embeddings via `embedder` (spec.md §4.3).
    pub fn build(
        raw: &[(String, String)],
        embedder: &dyn Embedder,
        params: &SlideBuildParams,
    ) -> Result<Self, CoreError> {
        if raw.is_empty() {
            return Err(CoreError::EmptySlideDeck);
        }

        let mut normalized_texts = Vec::with_capacity(raw.len());
        let mut per_slide_sentences = Vec::with_capacity(raw.len());
        for (i, (title, content)) in raw.iter().enumerate() {
            let normalized = compose_normalized(i, title, content);
            let sentences = keep_and_dedup_sentences(
                split_sentences(&normalized),
                params.sentence_min_chars,
                params.sentence_min_words,
                params.sentence_max_per_slide,
            );
            normalized_texts.push(normalized);
            per_slide_sentences.push(sentences);
        }

        let whole_refs: Vec<&str> = normalized_texts.iter().map(|s| s.as_str()).collect();
        let whole_embeddings = embedder
            .encode(&whole_refs)
            .map_err(|EngineError(msg)| CoreError::MatcherEncoding(msg))?;

        let mut slides = Vec::with_capacity(raw.len());
        for (i, (title, content)) in raw.iter().enumerate() {
            let sentence_refs: Vec<&str> =
                per_slide_sentences[i].iter().map(|s| s.as_str()).collect();
            let mut sentence_embeddings = if sentence_refs.is_empty() {
                Vec::new()
            } else {
                embedder
                    .encode(&sentence_refs)
                    .map_err(|EngineError(msg)| CoreError::MatcherEncoding(msg))?
            };
            for v in sentence_embeddings.iter_mut() {
                crate::embed::l2_normalize(v);
            }

            slides.push(Slide {
                index: i,
                title: title.clone(),
                content: content.clone(),
                embedding: whole_embeddings[i].clone(),
                sentence_embeddings,
                tokens: tokenize(&normalized_texts[i]),
                title_tokens: tokenize(title),
            });
        }

        Ok(SlideIndex { slides })
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// Deterministic top-N hotwords: title tokens weighted double, then
    /// content tokens, ranked by frequency across the deck then lexically
    /// (spec.md §4.3 "Hotword extraction" — exact ranking left open by
    /// spec.md §9, this is one deterministic choice).
    pub fn hotwords(&self, limit: usize) -> Vec<String> {
        let mut freq: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
        for slide in &self.slides {
            for t in &slide.title_tokens {
                *freq.entry(t.clone()).or_insert(0) += 2;
            }
            for t in &slide.tokens {
                freq.entry(t.clone()).or_insert(0);
                *freq.get_mut(t).unwrap() += 1;
            }
        }
        let mut ranked: Vec<(String, usize)> = freq.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.into_iter().take(limit).map(|(w, _)| w).collect()
    }
}
