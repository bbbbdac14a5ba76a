//! Semantic slide matcher (spec.md §4.4, §4.5).

use crate::embed::{cosine_similarity, Embedder};
use crate::lru::LruCache;
use crate::protocol::{MatchEvalPayload, MatchOption};
use crate::slides::{tokenize, SlideIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Forward,
    Backward,
    Jump,
    Stay,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Forward => "forward",
            Intent::Backward => "backward",
            Intent::Jump => "jump",
            Intent::Stay => "stay",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from_slide: usize,
    pub to_slide: usize,
    pub confidence: f32,
    pub slide_title: String,
    pub intent: Intent,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatcherResult {
    pub eval: Option<MatchEvalPayload>,
    pub transition: Option<Transition>,
}

/// `{ current, words_since_transition, qa_mode }` (spec.md §3 "Matcher
/// state").
pub struct MatcherState {
    pub current: usize,
    pub words_since_transition: usize,
    pub qa_mode: bool,
}

impl MatcherState {
    pub fn new() -> Self {
        MatcherState {
            current: 0,
            words_since_transition: 0,
            qa_mode: false,
        }
    }
}

impl Default for MatcherState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MatcherConfig {
    pub match_threshold: f32,
    pub match_diff: f32,
    pub match_cooldown_words: usize,
    pub stay_bias: f32,
    pub forward_bias_margin: f32,
    pub back_bias_margin: f32,
    pub allow_non_adjacent: bool,
    pub non_adjacent_threshold: f32,
    pub non_adjacent_boost: f32,
    pub keyword_boost: f32,
    pub keyword_min_tokens: usize,
    pub title_boost: f32,
    pub title_min_tokens: usize,
    pub sentence_match_enabled: bool,
}

pub struct SlideMatcher<'a> {
    index: &'a SlideIndex,
    embedder: &'a dyn Embedder,
    cache: LruCache<Vec<f32>>,
}

impl<'a> SlideMatcher<'a> {
    pub fn new(index: &'a SlideIndex, embedder: &'a dyn Embedder) -> Self {
        SlideMatcher {
            index,
            embedder,
            cache: LruCache::new(64),
        }
    }

    pub fn reset_cache(&mut self) {
        self.cache.clear();
    }

    fn encode_cached(&mut self, text: &str) -> Option<Vec<f32>> {
        if let Some(v) = self.cache.get(text) {
            return Some(v);
        }
        let v = self.embedder.encode_one(text).ok()?;
        self.cache.put(text.to_string(), v.clone());
        Some(v)
    }

    /// Run the full §4.4 decision algorithm for one text window.
    pub fn check(
        &mut self,
        text: &str,
        ignore_cooldown: bool,
        state: &mut MatcherState,
        cfg: &MatcherConfig,
    ) -> MatcherResult {
        if text.trim().is_empty() {
            return MatcherResult::default();
        }

        let n = self.index.len();
        let cooldown_blocked =
            !ignore_cooldown && state.words_since_transition < cfg.match_cooldown_words;

        let speech_embedding = match self.encode_cached(text) {
            Some(v) => v,
            None => return MatcherResult::default(),
        };

        let mut sims: Vec<f32> = self
            .index
            .slides
            .iter()
            .map(|s| cosine_similarity(&speech_embedding, &s.embedding))
            .collect();

        let speech_tokens = tokenize(text);

        let boost_indices: Vec<usize> = if state.qa_mode {
            (0..n).collect()
        } else {
            let mut idxs = vec![state.current];
            if state.current + 1 < n {
                idxs.push(state.current + 1);
            }
            if state.current > 0 {
                idxs.push(state.current - 1);
            }
            if cfg.allow_non_adjacent {
                if let Some(best) = argmax(&sims) {
                    idxs.push(best);
                }
            }
            idxs.sort_unstable();
            idxs.dedup();
            idxs
        };

        if cfg.keyword_boost > 0.0 && speech_tokens.len() >= cfg.keyword_min_tokens {
            for &i in &boost_indices {
                let overlap = token_overlap(&speech_tokens, &self.index.slides[i].tokens);
                sims[i] += cfg.keyword_boost * overlap;
            }
        }
        if cfg.title_boost > 0.0 && speech_tokens.len() >= cfg.title_min_tokens {
            for &i in &boost_indices {
                let overlap = token_overlap(&speech_tokens, &self.index.slides[i].title_tokens);
                sims[i] += cfg.title_boost * overlap;
            }
        }

        if cfg.sentence_match_enabled {
            let candidates: Vec<usize> = if state.qa_mode {
                (0..n).collect()
            } else {
                let mut c = vec![state.current];
                if state.current + 1 < n {
                    c.push(state.current + 1);
                }
                if state.current > 0 {
                    c.push(state.current - 1);
                }
                c
            };
            for &i in &candidates {
                let slide = &self.index.slides[i];
                if slide.sentence_embeddings.is_empty() {
                    continue;
                }
                let best_sentence_sim = slide
                    .sentence_embeddings
                    .iter()
                    .map(|sv| cosine_similarity(&speech_embedding, sv))
                    .fold(f32::MIN, f32::max);
                if best_sentence_sim > sims[i] {
                    sims[i] = best_sentence_sim;
                }
            }
        }

        let global_best = argmax(&sims).unwrap_or(state.current);

        let prev_idx = state.current.saturating_sub(1);
        let next_idx = (state.current + 1).min(n - 1);

        let (target, intent, non_adjacent) = if state.qa_mode {
            (global_best, intent_for(state.current, global_best), false)
        } else {
            // tie-break toward current, then forward, then backward.
            let local_best = pick_local_best(&sims, state.current, prev_idx, next_idx);

            let mut chosen = local_best;
            let mut forward_applied = false;
            if next_idx != state.current && sims[next_idx] >= sims[local_best] - cfg.forward_bias_margin {
                chosen = next_idx;
                forward_applied = true;
            }
            if !forward_applied
                && prev_idx != state.current
                && sims[prev_idx] >= sims[local_best] - cfg.back_bias_margin
            {
                chosen = prev_idx;
            }

            let mut non_adjacent = false;
            if cfg.allow_non_adjacent
                && global_best != prev_idx
                && global_best != state.current
                && global_best != next_idx
                && sims[global_best]
                    >= (sims[local_best] + cfg.non_adjacent_boost).max(cfg.non_adjacent_threshold)
            {
                chosen = global_best;
                non_adjacent = true;
            }

            (chosen, intent_for(state.current, chosen), non_adjacent)
        };

        let required_diff = if state.qa_mode {
            cfg.match_diff
        } else {
            cfg.match_diff.max(cfg.stay_bias)
        };
        let diff = sims[target] - sims[state.current];
        let would_transition =
            target != state.current && sims[target] >= cfg.match_threshold && diff >= required_diff;
        let fires = would_transition && !cooldown_blocked;

        let (keywords, contrast_phrase) =
            explain(text, &speech_tokens, target, state.current, self.index);

        let options = if state.qa_mode {
            let mut ranked: Vec<usize> = (0..n).collect();
            ranked.sort_by(|&a, &b| sims[b].partial_cmp(&sims[a]).unwrap_or(std::cmp::Ordering::Equal));
            ranked
                .into_iter()
                .take(3)
                .map(|i| MatchOption {
                    label: format!("slide_{i}"),
                    slide_index: i,
                    similarity: sims[i],
                })
                .collect()
        } else {
            vec![
                MatchOption {
                    label: "prev".to_string(),
                    slide_index: prev_idx,
                    similarity: sims[prev_idx],
                },
                MatchOption {
                    label: "current".to_string(),
                    slide_index: state.current,
                    similarity: sims[state.current],
                },
                MatchOption {
                    label: "next".to_string(),
                    slide_index: next_idx,
                    similarity: sims[next_idx],
                },
            ]
        };

        let eval = MatchEvalPayload {
            sim_prev: if !state.qa_mode { Some(sims[prev_idx]) } else { None },
            sim_current: sims[state.current],
            sim_next: if !state.qa_mode { Some(sims[next_idx]) } else { None },
            sim_target: sims[target],
            sim_global_best: sims[global_best],
            threshold: cfg.match_threshold,
            required_diff,
            diff,
            intent: intent.as_str().to_string(),
            would_transition,
            qa_mode: state.qa_mode,
            allow_non_adjacent: cfg.allow_non_adjacent,
            non_adjacent,
            cooldown_blocked,
            cooldown_words: cfg.match_cooldown_words,
            words_since: state.words_since_transition,
            options,
            keywords,
            contrast_phrase,
        };

        let transition = if fires {
            let from = state.current;
            state.current = target;
            state.words_since_transition = 0;
            Some(Transition {
                from_slide: from,
                to_slide: target,
                confidence: sims[target],
                slide_title: self.index.slides[target].title.clone(),
                intent,
            })
        } else {
            None
        };

        MatcherResult {
            eval: Some(eval),
            transition,
        }
    }

    pub fn goto(&mut self, index: usize, state: &mut MatcherState) -> bool {
        if index >= self.index.len() {
            return false;
        }
        state.current = index;
        state.words_since_transition = 0;
        true
    }
}

fn argmax(sims: &[f32]) -> Option<usize> {
    if sims.is_empty() {
        return None;
    }
    let mut best = 0;
    for i in 1..sims.len() {
        if sims[i] > sims[best] {
            best = i;
        }
    }
    Some(best)
}

/// Ties resolve toward current, then forward, then backward.
fn pick_local_best(sims: &[f32], current: usize, prev: usize, next: usize) -> usize {
    let candidates = [current, next, prev];
    let mut best = candidates[0];
    for &c in &candidates[1..] {
        if sims[c] > sims[best] {
            best = c;
        }
    }
    best
}

fn intent_for(from: usize, to: usize) -> Intent {
    if to == from {
        Intent::Stay
    } else if to == from + 1 {
        Intent::Forward
    } else if from > 0 && to == from - 1 {
        Intent::Backward
    } else {
        Intent::Jump
    }
}

fn token_overlap(speech: &std::collections::HashSet<String>, slide: &std::collections::HashSet<String>) -> f32 {
    if speech.is_empty() {
        return 0.0;
    }
    let overlap = speech.intersection(slide).count();
    (overlap as f32 / speech.len() as f32).min(1.0)
}

/// spec.md §4.5: keywords and contrast phrase.
fn explain(
    text: &str,
    speech_tokens: &std::collections::HashSet<String>,
    target: usize,
    current: usize,
    index: &SlideIndex,
) -> (Vec<String>, Option<String>) {
    let target_slide = &index.slides[target];
    let current_slide = &index.slides[current];

    let mut keyword_set: std::collections::HashSet<String> =
        speech_tokens.intersection(&target_slide.tokens).cloned().collect();
    if !keyword_set.is_empty() {
        let contrasted: std::collections::HashSet<String> = keyword_set
            .difference(&current_slide.tokens)
            .cloned()
            .collect();
        if !contrasted.is_empty() {
            keyword_set = contrasted;
        }
    }

    let mut keywords: Vec<String> = keyword_set.into_iter().collect();
    keywords.sort_by(|a, b| {
        let a_title = target_slide.title_tokens.contains(a);
        let b_title = target_slide.title_tokens.contains(b);
        b_title
            .cmp(&a_title)
            .then(b.len().cmp(&a.len()))
            .then(a.cmp(b))
    });
    keywords.truncate(8);

    let words: Vec<&str> = text.split_whitespace().take(60).collect();
    let mut best_span: Option<(String, i64)> = None;
    for span_len in [2usize, 3usize] {
        if words.len() < span_len {
            continue;
        }
        for w in words.windows(span_len) {
            let span = w.join(" ");
            let span_tokens = tokenize(&span);
            let target_overlap = span_tokens.intersection(&target_slide.tokens).count() as i64;
            let current_overlap = span_tokens.intersection(&current_slide.tokens).count() as i64;
            let score = target_overlap - current_overlap;
            let better = match &best_span {
                None => true,
                Some((_, best_score)) => score > *best_score,
            };
            if better {
                best_span = Some((span, score));
            }
        }
    }

    (keywords, best_span.map(|(s, _)| s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::slides::SlideBuildParams;

    /// Deterministic bag-of-words embedder: dimension = token hash buckets,
    /// so slides about different topics separate cleanly in cosine space.
    struct BowEmbedder {
        dims: usize,
    }

    impl BowEmbedder {
        fn vec_for(&self, text: &str) -> Vec<f32> {
            let mut v = vec![0.0f32; self.dims];
            for tok in tokenize(text) {
                let mut h: u64 = 1469598103934665603;
                for b in tok.bytes() {
                    h ^= b as u64;
                    h = h.wrapping_mul(1099511628211);
                }
                v[(h as usize) % self.dims] += 1.0;
            }
            let mut v = v;
            crate::embed::l2_normalize(&mut v);
            v
        }
    }

    impl Embedder for BowEmbedder {
        fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EngineError> {
            Ok(texts.iter().map(|t| self.vec_for(t)).collect())
        }
    }

    fn build_deck() -> (SlideIndex, BowEmbedder) {
        let embedder = BowEmbedder { dims: 64 };
        let raw = vec![
            ("Intro".to_string(), "welcome to our talk about caches".to_string()),
            ("Eviction".to_string(), "LRU and LFU policies".to_string()),
            (
                "Consistency".to_string(),
                "read after write and linearizability".to_string(),
            ),
        ];
        let index = SlideIndex::build(
            &raw,
            &embedder,
            &SlideBuildParams {
                sentence_min_chars: 5,
                sentence_min_words: 1,
                sentence_max_per_slide: 12,
            },
        )
        .unwrap();
        (index, embedder)
    }

    fn default_cfg() -> MatcherConfig {
        MatcherConfig {
            match_threshold: 0.1,
            match_diff: 0.02,
            match_cooldown_words: 0,
            stay_bias: 0.0,
            forward_bias_margin: 0.05,
            back_bias_margin: 0.03,
            allow_non_adjacent: false,
            non_adjacent_threshold: 0.75,
            non_adjacent_boost: 0.15,
            keyword_boost: 0.08,
            keyword_min_tokens: 2,
            title_boost: 0.08,
            title_min_tokens: 1,
            sentence_match_enabled: true,
        }
    }

    #[test]
    fn forward_transition_on_clearly_relevant_speech() {
        let (index, embedder) = build_deck();
        let mut matcher = SlideMatcher::new(&index, &embedder);
        let mut state = MatcherState::new();
        let cfg = default_cfg();
        let result = matcher.check("LRU and LFU policies in caches", false, &mut state, &cfg);
        let transition = result.transition.expect("expected a transition to fire");
        assert_eq!(transition.to_slide, 1);
        assert_eq!(transition.intent, Intent::Forward);
        assert_eq!(state.current, 1);
        assert_eq!(state.words_since_transition, 0);
    }

    #[test]
    fn backward_transition_satisfies_back_bias() {
        let (index, embedder) = build_deck();
        let mut matcher = SlideMatcher::new(&index, &embedder);
        let mut state = MatcherState {
            current: 1,
            words_since_transition: 100,
            qa_mode: false,
        };
        let cfg = default_cfg();
        let result = matcher.check("welcome to the talk about caches", false, &mut state, &cfg);
        let transition = result.transition.expect("expected a backward transition");
        assert_eq!(transition.to_slide, 0);
        assert_eq!(transition.intent, Intent::Backward);
    }

    #[test]
    fn cooldown_blocks_transition_but_still_produces_eval() {
        let (index, embedder) = build_deck();
        let mut matcher = SlideMatcher::new(&index, &embedder);
        let mut state = MatcherState::new();
        let mut cfg = default_cfg();
        cfg.match_cooldown_words = 100;
        let result = matcher.check("LRU and LFU policies in caches", false, &mut state, &cfg);
        assert!(result.transition.is_none());
        let eval = result.eval.unwrap();
        assert!(eval.cooldown_blocked);
        assert!(eval.would_transition);
    }

    #[test]
    fn ignore_cooldown_allows_partial_path_transition() {
        let (index, embedder) = build_deck();
        let mut matcher = SlideMatcher::new(&index, &embedder);
        let mut state = MatcherState::new();
        let mut cfg = default_cfg();
        cfg.match_cooldown_words = 100;
        let result = matcher.check("LRU and LFU policies in caches", true, &mut state, &cfg);
        assert!(result.transition.is_some());
    }

    #[test]
    fn empty_text_returns_no_evaluation() {
        let (index, embedder) = build_deck();
        let mut matcher = SlideMatcher::new(&index, &embedder);
        let mut state = MatcherState::new();
        let cfg = default_cfg();
        let result = matcher.check("   ", false, &mut state, &cfg);
        assert!(result.eval.is_none());
        assert!(result.transition.is_none());
    }

    #[test]
    fn goto_rejects_out_of_range_index() {
        let (index, embedder) = build_deck();
        let mut matcher = SlideMatcher::new(&index, &embedder);
        let mut state = MatcherState::new();
        assert!(!matcher.goto(99, &mut state));
        assert_eq!(state.current, 0);
        assert!(matcher.goto(2, &mut state));
        assert_eq!(state.current, 2);
        assert_eq!(state.words_since_transition, 0);
    }

    #[test]
    fn non_adjacent_jump_requires_both_thresholds() {
        let (index, embedder) = build_deck();
        let mut matcher = SlideMatcher::new(&index, &embedder);
        let mut state = MatcherState::new();
        let mut cfg = default_cfg();
        cfg.allow_non_adjacent = true;
        cfg.non_adjacent_threshold = 0.75;
        cfg.non_adjacent_boost = 0.5;
        let result = matcher.check("linearizability and read after write", false, &mut state, &cfg);
        // Either no transition, or a transition only to an adjacent slide,
        // since the BOW embedder rarely clears both non-adjacent gates.
        if let Some(t) = result.transition {
            assert!(t.to_slide <= 1, "jump should not happen without clearing both gates");
        }
    }

    #[test]
    fn repeated_check_without_new_words_does_not_flap() {
        let (index, embedder) = build_deck();
        let mut matcher = SlideMatcher::new(&index, &embedder);
        let mut state = MatcherState::new();
        let cfg = default_cfg();
        let first = matcher.check("LRU and LFU policies in caches", false, &mut state, &cfg);
        assert!(first.transition.is_some());
        let second = matcher.check("LRU and LFU policies in caches", false, &mut state, &cfg);
        assert!(second.transition.is_none(), "already on target slide, diff should be ~0");
    }
}
