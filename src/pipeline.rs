use anyhow::Result;
use std::fmt;
use std::path::PathBuf;

use crate::compose::{compose_message, TextGenerator};
use crate::config::Config;
use crate::process::{Clock, CommandRunner};
use crate::speech::{synthesize_to_file, SpeechSynthesizer};
use crate::{bluetooth, player, sink};

pub const DEFAULT_TOPIC: &str = "Estudar";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connecting,
    Locating,
    RetryConnecting,
    RetryLocating,
    Found,
    Configuring,
    Composing,
    Synthesizing,
    Playing,
    Done,
    Aborted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Connecting => "connecting",
            Stage::Locating => "locating",
            Stage::RetryConnecting => "retry-connecting",
            Stage::RetryLocating => "retry-locating",
            Stage::Found => "found",
            Stage::Configuring => "configuring",
            Stage::Composing => "composing",
            Stage::Synthesizing => "synthesizing",
            Stage::Playing => "playing",
            Stage::Done => "done",
            Stage::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

pub struct Services<'a> {
    pub runner: &'a dyn CommandRunner,
    pub clock: &'a dyn Clock,
    pub text: &'a dyn TextGenerator,
    pub speech: &'a dyn SpeechSynthesizer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Played {
        sink: String,
        message: String,
        audio_path: PathBuf,
    },
    SinkNotFound,
}

fn enter(stage: Stage) {
    tracing::info!(%stage, "pipeline stage");
}

/// Reconnects exactly once when the first poll window comes up empty.
pub fn acquire_sink(config: &Config, services: &Services<'_>) -> Result<Option<String>> {
    let address = config.device_address()?;
    let cycles = [
        (Stage::Connecting, Stage::Locating),
        (Stage::RetryConnecting, Stage::RetryLocating),
    ];

    for (connecting, locating) in cycles {
        if connecting == Stage::RetryConnecting {
            println!("Bluetooth sink not found; reconnecting...");
        }
        enter(connecting);
        bluetooth::connect(services.runner, services.clock, address, &config.bluetooth);
        bluetooth::activate_profile(services.runner, services.clock, &config.bluetooth);

        enter(locating);
        if let Some(found) = sink::locate(services.runner, services.clock, &config.sink) {
            enter(Stage::Found);
            return Ok(Some(found));
        }
    }
    Ok(None)
}

pub fn run(config: &Config, services: &Services<'_>, topic: &str) -> Result<RunOutcome> {
    let Some(sink_name) = acquire_sink(config, services)? else {
        enter(Stage::Aborted);
        println!("Could not find the bluetooth audio device");
        return Ok(RunOutcome::SinkNotFound);
    };

    enter(Stage::Configuring);
    sink::configure(services.runner, &sink_name, &config.sink);

    enter(Stage::Composing);
    let message = compose_message(services.text, &config.gemini, topic)?;
    println!("Message: {message}");

    enter(Stage::Synthesizing);
    let audio_path = synthesize_to_file(
        services.speech,
        &config.elevenlabs,
        &message,
        &config.audio_path,
    )?;

    enter(Stage::Playing);
    player::play(services.runner, &config.player, &audio_path);

    enter(Stage::Done);
    Ok(RunOutcome::Played {
        sink: sink_name,
        message,
        audio_path,
    })
}
