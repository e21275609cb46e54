use std::path::Path;

use crate::config::PlayerConfig;
use crate::process::{run_detached, CommandRunner, CommandSpec};

pub fn play_command(config: &PlayerConfig, path: &Path) -> CommandSpec {
    CommandSpec::new(
        &config.program,
        [
            "-nodisp".to_string(),
            "-autoexit".to_string(),
            path.to_string_lossy().to_string(),
        ],
    )
}

pub fn play(runner: &dyn CommandRunner, config: &PlayerConfig, path: &Path) {
    println!("Playing audio...");
    run_detached(runner, &play_command(config, path));
}
