//! PCM buffer and LocalAgreement stabilizer (spec.md §4.1).
//!
//! Grounded on the teacher's streaming loop
//! (`plentysound-transcriber/src/detector.rs`'s chunked accumulate-and-feed
//! buffer) and its int16 decode convention
//! (`plentysound-transcriber/src/audio.rs`), generalized from a fixed
//! keyword grammar to full LocalAgreement word stabilization.

use crate::asr::AsrEngine;
use crate::error::EngineError;
use crate::word::{self, WordHyp};

/// A front-trimmable float32 PCM ring, hard-capped at `buffer_seconds *
/// sample_rate` samples (spec.md §3 "PCM buffer").
#[derive(Debug, Clone)]
pub struct PcmBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    cap_samples: usize,
}

impl PcmBuffer {
    pub fn new(sample_rate: u32, buffer_seconds: u32) -> Self {
        PcmBuffer {
            samples: Vec::new(),
            sample_rate,
            cap_samples: sample_rate as usize * buffer_seconds as usize,
        }
    }

    pub fn set_capacity_seconds(&mut self, buffer_seconds: u32) {
        self.cap_samples = self.sample_rate as usize * buffer_seconds as usize;
        self.enforce_cap();
    }

    /// Decode little-endian int16 PCM bytes and append.
    pub fn add_audio(&mut self, bytes: &[u8]) {
        let decoded = bytes
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]) as f32 / 32_768.0);
        self.samples.extend(decoded);
        self.enforce_cap();
    }

    fn enforce_cap(&mut self) {
        if self.samples.len() > self.cap_samples {
            let excess = self.samples.len() - self.cap_samples;
            self.samples.drain(0..excess);
        }
    }

    /// Drop `n` samples from the front, but only if the result is non-empty
    /// (spec.md §4.1 step 3).
    pub fn trim_front(&mut self, n: usize) {
        if n > 0 && n < self.samples.len() {
            self.samples.drain(0..n);
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Result of one `Stabilizer::process` pass (spec.md §4.1).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioProcessResult {
    pub confirmed: Vec<String>,
    pub partial: Vec<String>,
}

/// Streaming LocalAgreement stabilizer over a [`PcmBuffer`].
pub struct Stabilizer {
    buffer: PcmBuffer,
    prev: Option<Vec<WordHyp>>,
    fuzzy_min_len: usize,
    min_word_length: usize,
}

impl Stabilizer {
    pub fn new(sample_rate: u32, buffer_seconds: u32, fuzzy_min_len: usize, min_word_length: usize) -> Self {
        Stabilizer {
            buffer: PcmBuffer::new(sample_rate, buffer_seconds),
            prev: None,
            fuzzy_min_len,
            min_word_length,
        }
    }

    pub fn add_audio(&mut self, bytes: &[u8]) {
        self.buffer.add_audio(bytes);
    }

    pub fn set_buffer_seconds(&mut self, buffer_seconds: u32) {
        self.buffer.set_capacity_seconds(buffer_seconds);
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Forward at most 50 hotwords to the engine (spec.md §4.1 "Hotwords").
    /// Changing hotwords never invalidates the buffer or `prev`.
    pub fn set_hotwords(&self, asr: &mut dyn AsrEngine, hotwords: &[String]) {
        let capped: Vec<String> = hotwords.iter().take(50).cloned().collect();
        asr.set_hotwords(&capped);
    }

    /// Run the ASR over the full current buffer (if it holds at least one
    /// second of audio) and advance the LocalAgreement state.
    pub fn process(&mut self, asr: &mut dyn AsrEngine) -> Result<AudioProcessResult, EngineError> {
        if self.buffer.len() < self.buffer.sample_rate() as usize {
            return Ok(AudioProcessResult::default());
        }

        let curr = asr.transcribe(self.buffer.as_slice())?;

        let mut confirmed_count = 0usize;
        if let Some(prev) = &self.prev {
            for (p, c) in prev.iter().zip(curr.iter()) {
                if word::fuzzy_match(&p.text, &c.text, self.fuzzy_min_len) {
                    confirmed_count += 1;
                } else {
                    break;
                }
            }
        }

        if confirmed_count > 0 {
            let last_end = curr[confirmed_count - 1].end_s;
            if last_end > 0.0 {
                let trim = (last_end * self.buffer.sample_rate() as f32).floor() as usize;
                self.buffer.trim_front(trim);
            }
        }

        let confirmed_raw: Vec<String> = curr[..confirmed_count]
            .iter()
            .filter_map(|w| word::clean_trim(&w.text))
            .collect();
        let partial_raw: Vec<String> = curr[confirmed_count..]
            .iter()
            .filter_map(|w| word::clean_trim(&w.text))
            .collect();

        self.prev = Some(curr);

        Ok(AudioProcessResult {
            confirmed: word::filter_garbage(&confirmed_raw, self.min_word_length),
            partial: word::filter_garbage(&partial_raw, self.min_word_length),
        })
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.prev = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Returns a scripted sequence of word hypotheses, one list per call,
    /// for exercising LocalAgreement deterministically.
    struct ScriptedAsr {
        script: VecDeque<Vec<WordHyp>>,
        hotwords: Vec<String>,
    }

    impl ScriptedAsr {
        fn new(script: Vec<Vec<WordHyp>>) -> Self {
            ScriptedAsr {
                script: script.into(),
                hotwords: Vec::new(),
            }
        }
    }

    impl AsrEngine for ScriptedAsr {
        fn transcribe(&mut self, _pcm: &[f32]) -> Result<Vec<WordHyp>, EngineError> {
            Ok(self.script.pop_front().unwrap_or_default())
        }
        fn set_hotwords(&mut self, hotwords: &[String]) {
            self.hotwords = hotwords.to_vec();
        }
    }

    fn one_second_of_silence(sample_rate: u32) -> Vec<u8> {
        vec![0u8; sample_rate as usize * 2]
    }

    #[test]
    fn buffer_shorter_than_one_second_skips_asr() {
        let mut stab = Stabilizer::new(16_000, 15, 3, 2);
        stab.add_audio(&[0u8; 100]);
        let mut asr = ScriptedAsr::new(vec![vec![WordHyp::new("should-not-appear", 0.1)]]);
        let result = stab.process(&mut asr).unwrap();
        assert!(result.confirmed.is_empty());
        assert!(result.partial.is_empty());
        assert_eq!(asr.script.len(), 1, "ASR must not have been invoked");
    }

    #[test]
    fn confirms_matching_prefix_across_passes() {
        let mut stab = Stabilizer::new(16_000, 15, 3, 2);
        stab.add_audio(&one_second_of_silence(16_000));

        let mut asr = ScriptedAsr::new(vec![
            vec![WordHyp::new("hello", 0.3), WordHyp::new("wor", 0.6)],
            vec![
                WordHyp::new("hello", 0.3),
                WordHyp::new("world", 0.6),
                WordHyp::new("today", 0.9),
            ],
        ]);

        let first = stab.process(&mut asr).unwrap();
        assert!(first.confirmed.is_empty(), "nothing to agree with yet");
        assert_eq!(first.partial, vec!["hello", "wor"]);

        let second = stab.process(&mut asr).unwrap();
        // "hello" matches exactly; "wor" vs "world" fuzzy-matches (prefix); "today" is new tail.
        assert_eq!(second.confirmed, vec!["hello", "world"]);
        assert_eq!(second.partial, vec!["today"]);
    }

    #[test]
    fn mismatch_stops_confirmation_at_first_disagreement() {
        let mut stab = Stabilizer::new(16_000, 15, 3, 2);
        stab.add_audio(&one_second_of_silence(16_000));

        let mut asr = ScriptedAsr::new(vec![
            vec![WordHyp::new("caches", 0.3)],
            vec![WordHyp::new("lru", 0.3), WordHyp::new("caches", 0.6)],
        ]);
        let _ = stab.process(&mut asr).unwrap();
        let second = stab.process(&mut asr).unwrap();
        assert!(second.confirmed.is_empty());
        assert_eq!(second.partial, vec!["lru", "caches"]);
    }

    #[test]
    fn confirmed_prefix_is_monotone_never_retracted() {
        let mut stab = Stabilizer::new(16_000, 15, 3, 2);
        stab.add_audio(&one_second_of_silence(16_000));

        let mut asr = ScriptedAsr::new(vec![
            vec![WordHyp::new("one", 0.2), WordHyp::new("two", 0.4)],
            vec![
                WordHyp::new("one", 0.2),
                WordHyp::new("two", 0.4),
                WordHyp::new("three", 0.6),
            ],
            vec![
                WordHyp::new("one", 0.2),
                WordHyp::new("two", 0.4),
                WordHyp::new("three", 0.6),
                WordHyp::new("four", 0.8),
            ],
        ]);

        let mut all_confirmed: Vec<String> = Vec::new();
        for _ in 0..3 {
            let r = stab.process(&mut asr).unwrap();
            all_confirmed.extend(r.confirmed);
        }
        assert_eq!(all_confirmed, vec!["one", "two", "three"]);
    }

    #[test]
    fn trims_buffer_by_confirmed_end_time() {
        let mut stab = Stabilizer::new(16_000, 15, 3, 2);
        stab.add_audio(&one_second_of_silence(16_000));
        let before = stab.buffer_len();

        let mut asr = ScriptedAsr::new(vec![
            vec![WordHyp::new("hello", 0.25)],
            vec![WordHyp::new("hello", 0.25), WordHyp::new("there", 0.5)],
        ]);
        let _ = stab.process(&mut asr).unwrap();
        let _ = stab.process(&mut asr).unwrap();

        let expected_trim = (0.25 * 16_000.0).floor() as usize;
        assert_eq!(stab.buffer_len(), before - expected_trim);
    }

    #[test]
    fn hotwords_capped_at_fifty_and_do_not_reset_state() {
        let mut stab = Stabilizer::new(16_000, 15, 3, 2);
        let mut asr = ScriptedAsr::new(vec![]);
        let many: Vec<String> = (0..80).map(|i| format!("kw{i}")).collect();
        stab.set_hotwords(&mut asr, &many);
        assert_eq!(asr.hotwords.len(), 50);
    }

    #[test]
    fn reset_clears_buffer_and_prev() {
        let mut stab = Stabilizer::new(16_000, 15, 3, 2);
        stab.add_audio(&one_second_of_silence(16_000));
        let mut asr = ScriptedAsr::new(vec![vec![WordHyp::new("hi", 0.1)]]);
        let _ = stab.process(&mut asr).unwrap();
        stab.reset();
        assert_eq!(stab.buffer_len(), 0);
    }
}
