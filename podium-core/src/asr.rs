//! The ASR collaborator boundary (spec.md §1 "out of scope: the ASR model
//! itself", §9 "injected collaborators with init(config) → handle").
//!
//! `podium-core` never constructs a concrete engine; the binary crate picks
//! and wires one. This mirrors how the teacher's `detector::run_detector`
//! takes a `Model`/`Recognizer` it was handed rather than loading one itself
//! from a hardcoded path.

use crate::error::EngineError;
use crate::word::WordHyp;

/// Capability required of any speech recognizer: given a float32 PCM
/// buffer at the configured sample rate, return word hypotheses with
/// end-time seconds relative to the start of the buffer (spec.md §4.1).
pub trait AsrEngine {
    fn transcribe(&mut self, pcm: &[f32]) -> Result<Vec<WordHyp>, EngineError>;

    /// Forward at most 50 comma-joined hotwords as a hint string
    /// (spec.md §4.1 "Hotwords"). Default is a no-op for engines that don't
    /// support hinting.
    fn set_hotwords(&mut self, _hotwords: &[String]) {}
}

/// A deterministic stub engine useful for tests and for running the
/// session controller without any model: it "transcribes" nothing, which
/// is a legitimate (if uninteresting) implementation of the trait contract.
pub struct NullAsr;

impl AsrEngine for NullAsr {
    fn transcribe(&mut self, _pcm: &[f32]) -> Result<Vec<WordHyp>, EngineError> {
        Ok(Vec::new())
    }
}
