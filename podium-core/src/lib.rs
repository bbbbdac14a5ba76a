//! Pure-logic library for a real-time presentation voice co-pilot: a
//! streaming ASR stabilizer, a semantic slide matcher, a trigger-phrase
//! detector, and the session controller tying them together behind a
//! line-delimited JSON protocol.
//!
//! This crate never touches a concrete ASR or embedding model; those are
//! injected as [`asr::AsrEngine`] / [`embed::Embedder`] implementations by
//! the binary crate.

pub mod asr;
pub mod audio;
pub mod config;
pub mod controller;
pub mod embed;
pub mod error;
pub mod log;
pub mod lru;
pub mod matcher;
pub mod protocol;
pub mod slides;
pub mod triggers;
pub mod word;

pub use config::Config;
pub use controller::SessionController;
pub use error::{CoreError, EngineError};
