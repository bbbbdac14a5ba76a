//! Tiny tagged stderr logger, in the shape of the teacher's `log.rs` but
//! writing `[tag] message` straight to stderr instead of a log file — the
//! protocol (spec.md §6) requires stdout to carry nothing but JSON events.

use std::io::Write;

pub fn log_info(tag: &str, msg: &str) {
    let mut stderr = std::io::stderr();
    let _ = writeln!(stderr, "[{tag}] {msg}");
}

pub fn log_warn(tag: &str, msg: &str) {
    let mut stderr = std::io::stderr();
    let _ = writeln!(stderr, "[{tag}] warn: {msg}");
}

pub fn log_error(tag: &str, msg: &str) {
    let mut stderr = std::io::stderr();
    let _ = writeln!(stderr, "[{tag}] error: {msg}");
}
