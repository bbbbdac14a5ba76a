//! `whisper-rs`-backed [`AsrEngine`] (SPEC_FULL.md §4.7).
//!
//! Grounded on the realtime transcriber in the retrieved pack
//! (`jordan-clayton-ribble-whisper`'s `RealtimeTranscriber::process_audio`):
//! same habit of building the whisper context once and reusing
//! `WhisperState` across calls rather than rebuilding it per chunk. Unlike
//! that transcriber (which runs its own VAD/diff loop over a ring buffer),
//! this adapter is a thin `transcribe(pcm) -> Vec<WordHyp>` shim — the
//! stabilizer in `podium-core` owns the sliding buffer and LocalAgreement
//! logic, per spec.md §4.1.

use podium_core::error::EngineError;
use podium_core::word::WordHyp;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperState};

pub struct WhisperAsr {
    state: WhisperState,
    hotword_prompt: Option<String>,
}

impl WhisperAsr {
    pub fn new(model_path: &str) -> Result<Self, EngineError> {
        let ctx = WhisperContext::new_with_params(model_path, WhisperContextParameters::default())
            .map_err(|e| EngineError::new(format!("failed to load whisper model: {e}")))?;
        let state = ctx
            .create_state()
            .map_err(|e| EngineError::new(format!("failed to create whisper state: {e}")))?;
        Ok(WhisperAsr {
            state,
            hotword_prompt: None,
        })
    }

    fn full_params(&self) -> FullParams<'_, '_> {
        // beam size 1 (streaming) per spec.md §4.1.
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some("en"));
        params.set_print_progress(false);
        params.set_print_special(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        // Each pass is independent: the model must not condition on
        // previous text (spec.md §4.1 step 1).
        params.set_no_context(true);
        if let Some(prompt) = &self.hotword_prompt {
            params.set_initial_prompt(prompt);
        }
        params
    }
}

impl podium_core::asr::AsrEngine for WhisperAsr {
    fn transcribe(&mut self, pcm: &[f32]) -> Result<Vec<WordHyp>, EngineError> {
        let params = self.full_params();
        self.state
            .full(params, pcm)
            .map_err(|e| EngineError::new(format!("whisper inference failed: {e}")))?;

        if self.state.full_n_segments() == 0 {
            return Ok(Vec::new());
        }

        let mut words = Vec::new();
        // whisper-rs yields segments, not words; each segment's start/end
        // timestamp is in centiseconds. Per-word timestamps require
        // whisper.cpp's token-level DTW output, which this crate doesn't
        // expose through `as_iter()`, so each word within a segment gets an
        // end time linearly interpolated across the segment's span.
        for segment in self.state.as_iter() {
            let Ok(text) = segment.to_str_lossy() else {
                continue;
            };
            let start_s = segment.start_timestamp() as f32 / 100.0;
            let end_s = segment.end_timestamp() as f32 / 100.0;
            let span = (end_s - start_s).max(0.0);

            let tokens: Vec<&str> = text.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }
            for (j, tok) in tokens.iter().enumerate() {
                let frac = (j + 1) as f32 / tokens.len() as f32;
                let word_end = start_s + span * frac;
                words.push(WordHyp::new(*tok, word_end));
            }
        }
        Ok(words)
    }

    fn set_hotwords(&mut self, hotwords: &[String]) {
        self.hotword_prompt = if hotwords.is_empty() {
            None
        } else {
            Some(hotwords.join(", "))
        };
    }
}
