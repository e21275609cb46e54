mod cli;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use focus_cue::compose::GeminiClient;
use focus_cue::config::{self, Config};
use focus_cue::pipeline::{self, RunOutcome, Services, DEFAULT_TOPIC};
use focus_cue::process::{SystemClock, SystemRunner};
use focus_cue::speech::ElevenLabsClient;
use focus_cue::{paths, prompt};
use std::path::Path;
use toml_edit::DocumentMut;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, ConfigCommand, ShellArg};

const LOG_ENV: &str = "FOCUS_CUE_LOG";
const RUNTIME_DIR_VAR: &str = "XDG_RUNTIME_DIR";

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(error) = run(cli) {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => paths::config_path()?,
    };

    match cli.command {
        None => run_pipeline(&config_path, cli.topic),
        Some(Commands::Doctor) => doctor(&config_path),
        Some(Commands::Completions { shell }) => print_completions(shell),
        Some(Commands::Config { command }) => config_command(&config_path, command),
    }
}

fn load_effective_config(config_path: &Path) -> Result<Config> {
    Ok(config::load(config_path)?.with_env_overrides(|name| std::env::var(name).ok()))
}

fn run_pipeline(config_path: &Path, topic: Option<String>) -> Result<()> {
    let config = load_effective_config(config_path)?;
    // pactl needs the session runtime dir when started from cron.
    std::env::set_var(RUNTIME_DIR_VAR, &config.runtime_dir);

    config.device_address()?;
    let text = GeminiClient::new(&config.gemini, &config.http)?;
    let speech = ElevenLabsClient::new(&config.elevenlabs, &config.http)?;
    let services = Services {
        runner: &SystemRunner,
        clock: &SystemClock,
        text: &text,
        speech: &speech,
    };

    let topic = topic.unwrap_or_else(|| DEFAULT_TOPIC.to_string());
    match pipeline::run(&config, &services, &topic)? {
        RunOutcome::Played { sink, .. } => {
            tracing::debug!(sink = %sink, "playback finished");
        }
        RunOutcome::SinkNotFound => {
            tracing::debug!("gave up after reconnecting once");
        }
    }
    Ok(())
}

fn doctor(config_path: &Path) -> Result<()> {
    let mut has_errors = false;

    let config = match load_effective_config(config_path) {
        Ok(config) => {
            println!("[ok] config: {}", config_path.display());
            config
        }
        Err(error) => {
            println!("[error] config: {error:#}");
            has_errors = true;
            Config::default()
        }
    };

    for tool in ["bluetoothctl", "pactl", config.player.program.as_str()] {
        match which::which(tool) {
            Ok(path) => println!("[ok] {tool}: found at {}", path.display()),
            Err(_) => {
                println!("[error] {tool}: not found in PATH");
                has_errors = true;
            }
        }
    }

    match config.device_address() {
        Ok(address) => println!("[ok] bluetooth: device {address}"),
        Err(_) => {
            println!("[error] bluetooth: bluetooth.address not configured");
            has_errors = true;
        }
    }

    let keys = [
        ("gemini", config.gemini.api_key.is_some(), config::GEMINI_API_KEY_VAR),
        (
            "elevenlabs",
            config.elevenlabs.api_key.is_some(),
            config::ELEVENLABS_API_KEY_VAR,
        ),
    ];
    for (service, present, var) in keys {
        if present {
            println!("[ok] {service}: API key configured");
        } else {
            println!("[error] {service}: no API key (set {var})");
            has_errors = true;
        }
    }

    if prompt::validate_template(&config.gemini.prompt_template).is_err() {
        println!("[info] gemini: prompt template is invalid; the built-in one will be used");
    }

    if has_errors {
        bail!("doctor found critical issues");
    }

    Ok(())
}

fn print_completions(shell: Option<ShellArg>) -> Result<()> {
    let shell = match shell {
        Some(ShellArg::Bash) => clap_complete::Shell::Bash,
        Some(ShellArg::Zsh) => clap_complete::Shell::Zsh,
        Some(ShellArg::Fish) => clap_complete::Shell::Fish,
        Some(ShellArg::Elvish) => clap_complete::Shell::Elvish,
        Some(ShellArg::Powershell) => clap_complete::Shell::PowerShell,
        None => clap_complete::Shell::from_env()
            .context("could not detect shell; pass --shell")?,
    };

    let mut command = Cli::command();
    clap_complete::generate(shell, &mut command, "focus-cue", &mut std::io::stdout());
    Ok(())
}

fn config_command(config_path: &Path, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Path => {
            println!("{}", config_path.display());
        }
        ConfigCommand::Show => {
            let config = load_effective_config(config_path)?;
            let rendered =
                toml::to_string_pretty(&config.redacted()).context("failed to render config")?;
            print!("{rendered}");
        }
        ConfigCommand::Get { key } => {
            let doc = config::load_document(config_path)?;
            if let Some(value) = config::get_value(&doc, &key)? {
                println!("{value}");
                return Ok(());
            }

            let defaults = toml::to_string(&Config::default())
                .context("failed to render defaults")?
                .parse::<DocumentMut>()
                .context("failed to parse defaults")?;
            match config::get_value(&defaults, &key)? {
                Some(value) => println!("{value} (default)"),
                None => println!("{key} is not set"),
            }
        }
        ConfigCommand::Set { key, value } => {
            let mut doc = config::load_document(config_path)?;
            config::set_value(&mut doc, &key, &value)?;
            let updated = config::validate_document(&doc)?;
            prompt::validate_template(&updated.gemini.prompt_template)?;
            config::write_document(config_path, &doc)?;
            println!("Set {key} in {}", config_path.display());
        }
        ConfigCommand::Reset { key } => {
            let mut doc = config::load_document(config_path)?;
            if config::reset_value(&mut doc, &key)? {
                config::write_document(config_path, &doc)?;
                println!("Reset {key} to its default");
            } else {
                println!("{key} was not set");
            }
        }
    }

    Ok(())
}
