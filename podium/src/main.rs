//! `podium` binary: reads config, wires an ASR engine and an embedder,
//! and runs the session controller's stdin/stdout command loop
//! (spec.md §6, §7, §9).
//!
//! CLI parsing follows the teacher's `plentysound/src/main.rs` — plain
//! `std::env::args()` matching, no argument-parsing crate.

mod hash_embedder;
#[cfg(feature = "embed")]
mod ort_embedder;
#[cfg(feature = "whisper")]
mod whisper_asr;

use anyhow::{Context, Result};
use podium_core::asr::{AsrEngine, NullAsr};
use podium_core::embed::Embedder;
use podium_core::log::{log_error, log_warn};
use podium_core::protocol::{read_command, write_event, Command, Event};
use podium_core::{Config, SessionController};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::time::Instant;

const TAG: &str = "podium";

struct Args {
    config_path: Option<PathBuf>,
    qa_mode: bool,
}

fn parse_args() -> Args {
    let argv: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut qa_mode = false;
    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "--config" => {
                if let Some(path) = argv.get(i + 1) {
                    config_path = Some(PathBuf::from(path));
                    i += 1;
                }
            }
            "--qa-mode" => qa_mode = true,
            _ => {}
        }
        i += 1;
    }
    Args { config_path, qa_mode }
}

fn dirs_fallback_config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(dir)
    } else if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".config")
    } else {
        PathBuf::from(".config")
    }
}

fn default_config_path() -> PathBuf {
    let mut p = dirs_fallback_config_dir();
    p.push("podium");
    p.push("config.yaml");
    p
}

fn load_config(path: &PathBuf) -> Config {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| serde_yaml::from_str(&s).ok())
        .unwrap_or_default()
}

fn build_asr() -> Result<Box<dyn AsrEngine>> {
    #[cfg(feature = "whisper")]
    {
        if let Ok(model_path) = std::env::var("PODIUM_WHISPER_MODEL") {
            let engine = whisper_asr::WhisperAsr::new(&model_path)
                .context("failed to initialize whisper ASR engine")?;
            return Ok(Box::new(engine));
        }
    }
    log_warn(TAG, "no ASR engine configured, falling back to NullAsr (no transcription)");
    Ok(Box::new(NullAsr))
}

fn build_embedder() -> Result<Box<dyn Embedder>> {
    #[cfg(feature = "embed")]
    {
        if let (Ok(model_path), Ok(tokenizer_path)) = (
            std::env::var("PODIUM_EMBED_MODEL"),
            std::env::var("PODIUM_EMBED_TOKENIZER"),
        ) {
            let embedder = ort_embedder::OrtEmbedder::new(&model_path, &tokenizer_path)
                .context("failed to initialize onnx embedder")?;
            return Ok(Box::new(embedder));
        }
    }
    log_warn(TAG, "no embedding model configured, falling back to HashEmbedder");
    Ok(Box::new(hash_embedder::HashEmbedder::new()))
}

fn main() -> Result<()> {
    let args = parse_args();
    let config_path = args.config_path.unwrap_or_else(default_config_path);
    let mut config = load_config(&config_path);
    if args.qa_mode {
        config.qa_mode = true;
    }

    let mut asr = build_asr()?;
    let embedder = build_embedder()?;
    let mut controller = SessionController::new(config);

    let stdin = std::io::stdin();
    let mut reader = BufReader::new(stdin.lock());
    let stdout = std::io::stdout();
    let mut writer = stdout.lock();

    write_event(&mut writer, &Event::Ready)?;

    let start = Instant::now();
    run_loop(&mut reader, &mut writer, &mut controller, asr.as_mut(), embedder.as_ref(), &start)
}

fn run_loop(
    reader: &mut impl BufRead,
    writer: &mut impl Write,
    controller: &mut SessionController,
    asr: &mut dyn AsrEngine,
    embedder: &dyn Embedder,
    start: &Instant,
) -> Result<()> {
    loop {
        let line = match read_command(reader)? {
            None => return Ok(()),
            Some(parsed) => parsed,
        };
        let now = start.elapsed().as_secs_f64();

        let command = match line {
            Ok(cmd) => cmd,
            Err(e) => {
                log_warn(TAG, &format!("malformed command line: {e}"));
                write_event(
                    writer,
                    &Event::Error {
                        message: format!("malformed command: {e}"),
                    },
                )?;
                continue;
            }
        };

        let events = match dispatch(command, controller, asr, embedder, now) {
            Ok(events) => events,
            Err(e) => {
                log_error(TAG, &format!("command failed: {e}"));
                vec![Event::Error { message: e.to_string() }]
            }
        };
        for event in events {
            write_event(writer, &event)?;
        }
    }
}

fn dispatch(
    command: Command,
    controller: &mut SessionController,
    asr: &mut dyn AsrEngine,
    embedder: &dyn Embedder,
    now: f64,
) -> Result<Vec<Event>> {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    match command {
        Command::Audio { data, silent } => {
            let pcm_bytes = if silent {
                Vec::new()
            } else {
                STANDARD
                    .decode(data.as_bytes())
                    .context("audio data is not valid base64")?
            };
            Ok(controller.handle_audio(&pcm_bytes, silent, now, asr, embedder)?)
        }
        Command::LoadSlides { slides } => Ok(controller.load_slides(&slides, embedder)?),
        Command::GotoSlide { index } => Ok(controller.handle_goto(index, embedder)?),
        Command::Reset {} => Ok(controller.handle_reset()),
        Command::SetQaMode { qa_mode } => Ok(controller.set_qa_mode(qa_mode)),
    }
}
