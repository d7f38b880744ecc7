//! Phoenix TTS entry point
//!
//! A line-oriented front end: each line typed is spoken, lines starting
//! with `/` change the voice selection. The speech model loads in the
//! background, so the prompt is usable immediately.

use anyhow::Context;
use log::{error, info, warn};
use phoenix_tts::audio::RodioOutput;
use phoenix_tts::speech::backends::KokoroBridge;
use phoenix_tts::speech::{ModelSlot, ModelStatus, SpeechModel};
use phoenix_tts::state::AppConfig;
use phoenix_tts::{Controller, PhoenixError};
use std::io::{self, BufRead, Write};
use std::process;
use std::sync::Arc;

const HELP: &str = "\
Type text and press Enter to speak it.
  /voices          list available voices
  /voice1 NAME     select the first voice
  /voice2 NAME     select the second voice
  /blend N         weight of voice 1 in percent (0-100)
  /status          model and playback status
  /history         show recent history
  /quit            exit";

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let debug_mode = args.iter().any(|arg| arg == "--debug" || arg == "-d");

    if debug_mode {
        use std::fs::OpenOptions;
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open("phoenix-tts.log")
        {
            Ok(log_file) => {
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Debug)
                    .target(env_logger::Target::Pipe(Box::new(log_file)))
                    .init();
            }
            Err(e) => {
                eprintln!("Warning: Failed to open phoenix-tts.log: {}", e);
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Warn)
                    .init();
            }
        }
        info!(
            "{} {} starting (debug mode)",
            phoenix_tts::APP_NAME,
            phoenix_tts::VERSION
        );
    } else {
        // Quiet by default so log lines don't interleave with the prompt
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .init();
    }

    if let Err(e) = run() {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env();

    let model = Arc::new(ModelSlot::new());
    let bridge = config.bridge();
    model
        .load_in_background(move || {
            KokoroBridge::spawn(&bridge).map(|m| Arc::new(m) as Arc<dyn SpeechModel>)
        })
        .context("failed to start model loader")?;

    let mut controller = Controller::new(&config, Arc::clone(&model), Box::new(RodioOutput::new()))
        .context("failed to start speech pipeline")?;

    println!("Phoenix TTS {}", phoenix_tts::VERSION);
    println!("{}", controller.history());
    println!("Type /help for commands. Loading voice model...");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;

        if !handle_line(&mut controller, line.trim()) {
            break;
        }
    }

    controller.shutdown();
    info!("Goodbye");
    Ok(())
}

/// Process one input line; `false` means quit
fn handle_line(controller: &mut Controller, line: &str) -> bool {
    let (command, arg) = match line.split_once(char::is_whitespace) {
        Some((c, a)) => (c, a.trim()),
        None => (line, ""),
    };

    let result = match command {
        "/quit" | "/exit" => return false,
        "/help" => {
            println!("{}", HELP);
            Ok(())
        }
        "/voices" => {
            let prefs = controller.preferences();
            for voice in controller.catalog().voices() {
                let mark = if *voice == prefs.voice1 {
                    " (1)"
                } else if *voice == prefs.voice2 {
                    " (2)"
                } else {
                    ""
                };
                println!("  {}{}", voice, mark);
            }
            Ok(())
        }
        "/voice1" => controller.set_voice1(arg),
        "/voice2" => controller.set_voice2(arg),
        "/blend" => match arg.parse::<i64>() {
            Ok(percent) => controller
                .set_blend(percent)
                .map(|_| println!("Blend: {}%", controller.preferences().blend_percent)),
            Err(_) => {
                println!("Usage: /blend N (0-100)");
                Ok(())
            }
        },
        "/status" => {
            let status = controller.status();
            let model = match status.model {
                ModelStatus::Loading => "loading".to_string(),
                ModelStatus::Ready => "ready".to_string(),
                ModelStatus::Failed(reason) => format!("failed ({})", reason),
            };
            println!(
                "Model: {}, synthesizing: {}, played: {}, playback errors: {}",
                model, status.synthesizing, status.played, status.playback_failures
            );
            Ok(())
        }
        "/history" => {
            println!("{}", controller.history());
            Ok(())
        }
        _ => controller.submit(line).map(|entry| {
            if let Some(entry) = entry {
                println!("{}", entry);
            }
        }),
    };

    match result {
        Ok(()) => {}
        Err(e @ PhoenixError::ModelNotReady) | Err(e @ PhoenixError::Busy(_)) => {
            println!("{} - try again in a moment", e);
        }
        Err(e @ PhoenixError::UnknownVoice(_)) => println!("{}", e),
        Err(e) => {
            warn!("{}", e);
            println!("{}", e);
        }
    }
    true
}
