use thiserror::Error;

/// Failure from an injected ASR or embedder collaborator.
///
/// Kept separate from [`CoreError`] because it crosses a trait boundary
/// (`AsrEngine`/`Embedder` implementations construct it) while `CoreError`
/// is the taxonomy the session controller reports to the event channel.
#[derive(Debug, Error, Clone)]
#[error("{0}")]
pub struct EngineError(pub String);

impl EngineError {
    pub fn new(msg: impl Into<String>) -> Self {
        EngineError(msg.into())
    }
}

/// Per-message error taxonomy the controller can surface as an `error` event.
///
/// All of these are transient per spec.md §7: the controller logs them and
/// keeps running. `EmptySlideDeck` is the one "session-invalid" case that
/// also aborts the `load_slides` handler without emitting `slides_ready`.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("transcription failed: {0}")]
    AsrError(#[from] EngineError),

    #[error("slide matcher encoding failed: {0}")]
    MatcherEncoding(String),

    #[error("goto target {index} out of range (deck has {len} slides)")]
    InvalidGoto { index: usize, len: usize },

    #[error("load_slides requires at least one slide")]
    EmptySlideDeck,
}
