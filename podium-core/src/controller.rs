//! Session controller (spec.md §4.6): owns the text window, cooldowns,
//! silence-based partial finalization, QA toggle, and command dispatch.
//!
//! Grounded on the teacher's `plentysound/src/app.rs::DaemonApp` (a single
//! struct owning all session state, with one method per incoming command)
//! generalized from the teacher's playback/mixer commands to audio/slide
//! commands.

use crate::asr::AsrEngine;
use crate::audio::Stabilizer;
use crate::config::Config;
use crate::embed::Embedder;
use crate::error::CoreError;
use crate::matcher::{MatcherConfig, MatcherState, SlideMatcher};
use crate::protocol::{Event, SlideInput};
use crate::slides::{SlideBuildParams, SlideIndex};
use crate::triggers::{self, TriggerAction};

/// `{ last_partial_text, last_partial_ts, last_word_ts, last_partial_match_ts }`
/// (spec.md §3 "Speech-stream state"). Times are monotonic seconds, passed
/// in by the caller so the core stays free of a wall-clock dependency.
#[derive(Debug, Clone, Default)]
pub struct SpeechState {
    pub last_partial_text: Option<String>,
    pub last_partial_ts: Option<f64>,
    pub last_word_ts: Option<f64>,
    pub last_partial_match_ts: Option<f64>,
}

#[derive(Debug, Clone, Default)]
struct CommandDebounceState {
    last_command_ts: Option<f64>,
}

/// Owns everything the controller needs except the slide index and the
/// embedder, which are set once by `load_slides` (spec.md §5 "Shared
/// resources").
pub struct SessionController {
    config: Config,
    stabilizer: Stabilizer,
    matcher_state: MatcherState,
    text_window: Vec<String>,
    speech: SpeechState,
    debounce: CommandDebounceState,
    slide_index: Option<SlideIndex>,
}

impl SessionController {
    pub fn new(config: Config) -> Self {
        let stabilizer = Stabilizer::new(
            config.sample_rate,
            config.effective_buffer_seconds(),
            config.fuzzy_min_len,
            config.min_word_length,
        );
        SessionController {
            config,
            stabilizer,
            matcher_state: MatcherState::new(),
            text_window: Vec::new(),
            speech: SpeechState::default(),
            debounce: CommandDebounceState::default(),
            slide_index: None,
        }
    }

    fn matcher_config(&self) -> MatcherConfig {
        MatcherConfig {
            match_threshold: self.config.effective_match_threshold(),
            match_diff: self.config.effective_match_diff(),
            match_cooldown_words: self.config.match_cooldown_words,
            stay_bias: self.config.stay_bias,
            forward_bias_margin: self.config.forward_bias_margin,
            back_bias_margin: self.config.back_bias_margin,
            allow_non_adjacent: self.config.allow_non_adjacent,
            non_adjacent_threshold: self.config.non_adjacent_threshold,
            non_adjacent_boost: self.config.non_adjacent_boost,
            keyword_boost: self.config.keyword_boost,
            keyword_min_tokens: self.config.keyword_min_tokens,
            title_boost: self.config.title_boost,
            title_min_tokens: self.config.title_min_tokens,
            sentence_match_enabled: self.config.sentence_match_enabled,
        }
    }

    pub fn load_slides(
        &mut self,
        slides: &[SlideInput],
        embedder: &dyn Embedder,
    ) -> Result<Vec<Event>, CoreError> {
        let raw: Vec<(String, String)> = slides
            .iter()
            .map(|s| (s.title.clone(), s.content.clone()))
            .collect();
        let index = SlideIndex::build(
            &raw,
            embedder,
            &SlideBuildParams {
                sentence_min_chars: self.config.sentence_min_chars,
                sentence_min_words: self.config.sentence_min_words,
                sentence_max_per_slide: self.config.sentence_max_per_slide,
            },
        )?;
        let count = index.len();
        self.slide_index = Some(index);
        self.reset();
        Ok(vec![Event::SlidesReady { count }])
    }

    pub fn reset(&mut self) {
        self.stabilizer.reset();
        self.matcher_state = MatcherState::new();
        self.text_window.clear();
        self.speech = SpeechState::default();
    }

    pub fn handle_reset(&mut self) -> Vec<Event> {
        self.reset();
        vec![Event::ResetDone { current_slide: 0 }]
    }

    pub fn handle_goto(&mut self, index: usize, embedder: &dyn Embedder) -> Result<Vec<Event>, CoreError> {
        let Some(slide_index) = &self.slide_index else {
            return Err(CoreError::InvalidGoto { index, len: 0 });
        };
        if index >= slide_index.len() {
            return Err(CoreError::InvalidGoto {
                index,
                len: slide_index.len(),
            });
        }
        let mut matcher = SlideMatcher::new(slide_index, embedder);
        matcher.goto(index, &mut self.matcher_state);
        self.text_window.clear();
        Ok(vec![Event::SlideSet { current_slide: index }])
    }

    pub fn set_qa_mode(&mut self, qa_mode: bool) -> Vec<Event> {
        self.config.qa_mode = qa_mode;
        self.matcher_state.qa_mode = qa_mode;
        self.stabilizer.set_buffer_seconds(self.config.effective_buffer_seconds());
        self.text_window.clear();
        self.speech.last_partial_text = None;
        self.speech.last_partial_ts = None;
        self.speech.last_partial_match_ts = None;
        Vec::new()
    }

    fn trigger_allowed(&mut self, now: f64, action: &TriggerAction) -> bool {
        if let Some(last) = self.debounce.last_command_ts {
            if (now - last) * 1000.0 < self.config.trigger_cooldown_ms as f64 {
                return false;
            }
        }
        if matches!(action, TriggerAction::Next | TriggerAction::Prev)
            && self.matcher_state.words_since_transition < self.config.trigger_min_words_between
        {
            return false;
        }
        true
    }

    fn apply_trigger(
        &mut self,
        action: TriggerAction,
        target: Option<usize>,
        now: f64,
        voice_label: &str,
        embedder: &dyn Embedder,
    ) -> Option<Event> {
        let slide_index = self.slide_index.as_ref()?;
        let n = slide_index.len();
        if n == 0 {
            return None;
        }
        let from = self.matcher_state.current;
        let to = match action {
            TriggerAction::Next => (from + 1).min(n - 1),
            TriggerAction::Prev => from.saturating_sub(1),
            TriggerAction::First => 0,
            TriggerAction::Last => n - 1,
            TriggerAction::Goto => target?.min(n - 1),
        };

        self.debounce.last_command_ts = Some(now);
        let mut matcher = SlideMatcher::new(slide_index, embedder);
        matcher.goto(to, &mut self.matcher_state);
        self.text_window.clear();

        Some(Event::SlideTransition {
            from_slide: from,
            to_slide: to,
            confidence: 1.0,
            slide_title: slide_index.slides[to].title.clone(),
            intent: format!("Voice: {voice_label}"),
        })
    }

    fn recency_weighted_text(&self) -> String {
        let mut parts: Vec<String> = self.text_window.clone();
        let tail_start = self.text_window.len().saturating_sub(self.config.recent_words_count);
        let recent = &self.text_window[tail_start..];
        for _ in 1..self.config.recent_words_multiplier {
            parts.extend(recent.iter().cloned());
        }
        parts.join(" ")
    }

    /// spec.md §4.6 `_process_words`: append to window, try triggers, else
    /// run the matcher.
    fn process_words(&mut self, words: &[String], now: f64, embedder: &dyn Embedder) -> Vec<Event> {
        let mut events = Vec::new();
        if words.is_empty() {
            return events;
        }

        self.text_window.extend(words.iter().cloned());
        let window_words = self.config.window_words;
        if self.text_window.len() > window_words {
            let excess = self.text_window.len() - window_words;
            self.text_window.drain(0..excess);
        }
        self.matcher_state.words_since_transition += words.len();

        let tail_start = self
            .text_window
            .len()
            .saturating_sub(self.config.trigger_tail_words);
        let tail = self.text_window[tail_start..].join(" ");

        if let Some(trigger) = triggers::detect_trigger(&tail) {
            if self.trigger_allowed(now, &trigger.action) {
                let label = voice_label(&trigger.action, trigger.target);
                if let Some(ev) = self.apply_trigger(trigger.action, trigger.target, now, &label, embedder) {
                    events.push(ev);
                    return events;
                }
            }
        }

        if let Some(slide_index) = &self.slide_index {
            let text = self.recency_weighted_text();
            let mut matcher = SlideMatcher::new(slide_index, embedder);
            let cfg = self.matcher_config();
            let result = matcher.check(&text, false, &mut self.matcher_state, &cfg);
            if let Some(eval) = result.eval {
                events.push(Event::MatchEval(eval));
            }
            if let Some(t) = result.transition {
                self.text_window.clear();
                events.push(Event::SlideTransition {
                    from_slide: t.from_slide,
                    to_slide: t.to_slide,
                    confidence: t.confidence,
                    slide_title: t.slide_title,
                    intent: t.intent.as_str().to_string(),
                });
            }
        }

        events
    }

    /// Partial-path fast trigger check: only `Goto`/`First`/`Last` allowed
    /// (spec.md §4.6 point 3).
    fn try_partial_trigger(
        &mut self,
        tail: &str,
        now: f64,
        embedder: &dyn Embedder,
    ) -> Option<Event> {
        let trigger = triggers::detect_trigger(tail)?;
        if matches!(trigger.action, TriggerAction::Next | TriggerAction::Prev) {
            return None;
        }
        if !self.trigger_allowed(now, &trigger.action) {
            return None;
        }
        let label = voice_label(&trigger.action, trigger.target);
        self.apply_trigger(trigger.action, trigger.target, now, &label, embedder)
    }

    /// Handle an `audio` command (spec.md §4.6 "Audio handling").
    pub fn handle_audio(
        &mut self,
        pcm_bytes: &[u8],
        silent: bool,
        now: f64,
        asr: &mut dyn AsrEngine,
        embedder: &dyn Embedder,
    ) -> Result<Vec<Event>, CoreError> {
        let mut events = Vec::new();

        if silent {
            self.finalize_stale_partial(now, embedder, &mut events);
            return Ok(events);
        }

        self.stabilizer.add_audio(pcm_bytes);
        let result = self.stabilizer.process(asr)?;

        if !result.confirmed.is_empty() {
            let joined = result.confirmed.join(" ");
            events.push(Event::Final { text: joined });
            self.speech.last_partial_text = None;
            self.speech.last_partial_ts = None;
            self.speech.last_word_ts = Some(now);
            events.extend(self.process_words(&result.confirmed, now, embedder));
        }

        if !result.partial.is_empty() {
            let joined = result.partial.join(" ");
            events.push(Event::Partial { text: joined.clone() });

            let stable_for_ms = self.track_partial_stability(&joined, now);

            let tail_start = result
                .partial
                .len()
                .saturating_sub(self.config.trigger_tail_words);
            let tail = result.partial[tail_start..].join(" ");
            if let Some(ev) = self.try_partial_trigger(&tail, now, embedder) {
                events.push(ev);
            } else if self.config.partial_match_enabled {
                let cooldown_ok = self
                    .speech
                    .last_partial_match_ts
                    .map(|ts| (now - ts) * 1000.0 >= self.config.partial_match_cooldown_ms as f64)
                    .unwrap_or(true);
                if stable_for_ms >= self.config.partial_match_stable_ms as f64 && cooldown_ok {
                    if let Some(slide_index) = &self.slide_index {
                        let mut matcher = SlideMatcher::new(slide_index, embedder);
                        let cfg = self.matcher_config();
                        let result = matcher.check(&joined, true, &mut self.matcher_state, &cfg);
                        self.speech.last_partial_match_ts = Some(now);
                        if let Some(eval) = result.eval {
                            events.push(Event::MatchEval(eval));
                        }
                        if let Some(t) = result.transition {
                            self.text_window.clear();
                            events.push(Event::SlideTransition {
                                from_slide: t.from_slide,
                                to_slide: t.to_slide,
                                confidence: t.confidence,
                                slide_title: t.slide_title,
                                intent: t.intent.as_str().to_string(),
                            });
                        }
                    }
                }
            }
        }

        if result.confirmed.is_empty() {
            self.finalize_stale_partial(now, embedder, &mut events);
        }

        Ok(events)
    }

    /// Record a newly observed partial text and report how long (ms) the
    /// *same* text has been stable (spec.md §4.6 point 3). The stability
    /// clock only restarts when the partial text actually changes; a
    /// repeated `audio` message with the same partial text keeps counting
    /// up from the first time that text was seen.
    fn track_partial_stability(&mut self, joined: &str, now: f64) -> f64 {
        let text_unchanged = self.speech.last_partial_text.as_deref() == Some(joined);
        let stable_for_ms = if text_unchanged {
            self.speech
                .last_partial_ts
                .map(|ts| (now - ts) * 1000.0)
                .unwrap_or(0.0)
        } else {
            self.speech.last_partial_ts = Some(now);
            0.0
        };
        self.speech.last_partial_text = Some(joined.to_string());
        stable_for_ms
    }

    fn finalize_stale_partial(&mut self, now: f64, embedder: &dyn Embedder, events: &mut Vec<Event>) {
        let (Some(text), Some(ts)) = (self.speech.last_partial_text.clone(), self.speech.last_partial_ts) else {
            return;
        };
        if (now - ts) * 1000.0 < self.config.partial_finalize_ms as f64 {
            return;
        }
        events.push(Event::Final { text: text.clone() });
        self.speech.last_partial_text = None;
        self.speech.last_partial_ts = None;
        self.speech.last_word_ts = Some(now);
        let words: Vec<String> = text.split_whitespace().map(|s| s.to_string()).collect();
        events.extend(self.process_words(&words, now, embedder));
    }

    pub fn current_slide(&self) -> usize {
        self.matcher_state.current
    }
}

fn voice_label(action: &TriggerAction, target: Option<usize>) -> String {
    match action {
        TriggerAction::Next => "Next slide".to_string(),
        TriggerAction::Prev => "Previous slide".to_string(),
        TriggerAction::First => "First slide".to_string(),
        TriggerAction::Last => "Last slide".to_string(),
        TriggerAction::Goto => format!("Go to {}", target.map(|t| t + 1).unwrap_or(0)),
    }
}
