use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "focus-cue",
    version,
    about = "Reconnects a Bluetooth speaker and plays a generated motivational phrase"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
    /// What the message should motivate you to focus on [default: Estudar]
    pub topic: Option<String>,
    /// Config file to use instead of ~/.config/focus-cue/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Doctor,
    Completions {
        #[arg(long, value_enum)]
        shell: Option<ShellArg>,
    },
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum ShellArg {
    Bash,
    Zsh,
    Fish,
    Elvish,
    Powershell,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    Path,
    Show,
    Get {
        key: String,
    },
    Set {
        key: String,
        value: String,
    },
    Reset {
        key: String,
    },
}
