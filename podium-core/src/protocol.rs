//! Line-delimited JSON command/event protocol (spec.md §6).
//!
//! Framing follows the teacher's `plentysound/src/protocol.rs` in spirit
//! (typed serde enums plus small free functions for read/write) but swaps
//! the teacher's length-prefixed binary framing for newline-delimited JSON,
//! since that's the wire format spec.md §6 specifies.

use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    Audio {
        data: String,
        #[serde(default)]
        silent: bool,
    },
    LoadSlides {
        slides: Vec<SlideInput>,
    },
    GotoSlide {
        index: usize,
    },
    Reset {},
    SetQaMode {
        qa_mode: bool,
    },
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SlideInput {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Ready,
    Final {
        text: String,
    },
    Partial {
        text: String,
    },
    SlideTransition {
        from_slide: usize,
        to_slide: usize,
        confidence: f32,
        slide_title: String,
        intent: String,
    },
    MatchEval(MatchEvalPayload),
    SlidesReady {
        count: usize,
    },
    SlideSet {
        current_slide: usize,
    },
    ResetDone {
        current_slide: usize,
    },
    Error {
        message: String,
    },
}

/// The §4.4 step 10 evaluation payload, always attached to a `match_eval`
/// event.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct MatchEvalPayload {
    pub sim_prev: Option<f32>,
    pub sim_current: f32,
    pub sim_next: Option<f32>,
    pub sim_target: f32,
    pub sim_global_best: f32,
    pub threshold: f32,
    pub required_diff: f32,
    pub diff: f32,
    pub intent: String,
    pub would_transition: bool,
    pub qa_mode: bool,
    pub allow_non_adjacent: bool,
    pub non_adjacent: bool,
    pub cooldown_blocked: bool,
    pub cooldown_words: usize,
    pub words_since: usize,
    pub options: Vec<MatchOption>,
    pub keywords: Vec<String>,
    pub contrast_phrase: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MatchOption {
    pub label: String,
    pub slide_index: usize,
    pub similarity: f32,
}

/// Read one line-delimited JSON command, or `None` on clean EOF.
///
/// Malformed lines propagate as `serde_json::Error`; the controller is
/// responsible for logging and continuing (spec.md §7 "Transient,
/// per-message").
pub fn read_command(reader: &mut impl BufRead) -> std::io::Result<Option<Result<Command, serde_json::Error>>> {
    let mut line = String::new();
    let n = reader.read_line(&mut line)?;
    if n == 0 {
        return Ok(None);
    }
    let trimmed = line.trim();
    Ok(Some(serde_json::from_str(trimmed)))
}

/// Serialize and write one event as a line-delimited JSON object.
pub fn write_event(writer: &mut impl Write, event: &Event) -> std::io::Result<()> {
    let json = serde_json::to_string(event)?;
    writer.write_all(json.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_audio_command() {
        let line = r#"{"type":"audio","data":"AAA=","silent":false}"#;
        let cmd: Command = serde_json::from_str(line).unwrap();
        assert_eq!(
            cmd,
            Command::Audio {
                data: "AAA=".to_string(),
                silent: false
            }
        );
    }

    #[test]
    fn parses_load_slides_command() {
        let line = r#"{"type":"load_slides","slides":[{"title":"Intro","content":"hi"}]}"#;
        let cmd: Command = serde_json::from_str(line).unwrap();
        match cmd {
            Command::LoadSlides { slides } => {
                assert_eq!(slides.len(), 1);
                assert_eq!(slides[0].title, "Intro");
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn parses_goto_reset_and_qa_mode() {
        let goto: Command = serde_json::from_str(r#"{"type":"goto_slide","index":2}"#).unwrap();
        assert_eq!(goto, Command::GotoSlide { index: 2 });

        let reset: Command = serde_json::from_str(r#"{"type":"reset"}"#).unwrap();
        assert_eq!(reset, Command::Reset {});

        let qa: Command = serde_json::from_str(r#"{"type":"set_qa_mode","qa_mode":true}"#).unwrap();
        assert_eq!(qa, Command::SetQaMode { qa_mode: true });
    }

    #[test]
    fn unknown_type_errors_without_panicking() {
        let err = serde_json::from_str::<Command>(r#"{"type":"not_a_real_command"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn read_command_returns_none_on_eof() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        let result = read_command(&mut cursor).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn read_command_reads_one_line_at_a_time() {
        let data = "{\"type\":\"reset\"}\n{\"type\":\"goto_slide\",\"index\":1}\n";
        let mut cursor = Cursor::new(data.as_bytes().to_vec());
        let first = read_command(&mut cursor).unwrap().unwrap().unwrap();
        assert_eq!(first, Command::Reset {});
        let second = read_command(&mut cursor).unwrap().unwrap().unwrap();
        assert_eq!(second, Command::GotoSlide { index: 1 });
    }

    #[test]
    fn write_event_emits_one_json_line() {
        let mut buf = Vec::new();
        write_event(&mut buf, &Event::SlidesReady { count: 3 }).unwrap();
        let s = String::from_utf8(buf).unwrap();
        assert_eq!(s, "{\"type\":\"slides_ready\",\"count\":3}\n");
    }

    #[test]
    fn serializes_final_and_partial_events() {
        let mut buf = Vec::new();
        write_event(
            &mut buf,
            &Event::Final {
                text: "hello world".to_string(),
            },
        )
        .unwrap();
        let s = String::from_utf8(buf).unwrap();
        assert_eq!(s, "{\"type\":\"final\",\"text\":\"hello world\"}\n");
    }
}
