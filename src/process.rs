use anyhow::{Context, Result};
use std::fmt;
use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            stdin: None,
        }
    }

    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
}

pub trait CommandRunner {
    /// `Err` when the command cannot be started or fed; a non-zero exit is `success: false`.
    fn run(&self, command: &CommandSpec) -> Result<CommandOutput>;
}

pub trait Clock {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to execute {}", command.program))?;

        // The handle is dropped before waiting so line-driven tools see EOF.
        let fed = match (&command.stdin, child.stdin.take()) {
            (Some(input), Some(mut stdin)) => stdin.write_all(input.as_bytes()),
            _ => Ok(()),
        };

        let output = child
            .wait_with_output()
            .with_context(|| format!("failed to wait for {}", command.program))?;
        if let Err(error) = fed {
            return Err(error).with_context(|| {
                format!(
                    "failed to write stdin of {} (exited with {})",
                    command.program, output.status
                )
            });
        }
        if !output.stderr.is_empty() {
            tracing::debug!(
                command = %command,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "command wrote to stderr"
            );
        }

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

pub fn run_detached(runner: &dyn CommandRunner, command: &CommandSpec) -> bool {
    match runner.run(command) {
        Ok(output) if output.success => true,
        Ok(_) => {
            tracing::warn!(command = %command, "command exited unsuccessfully; continuing");
            false
        }
        Err(error) => {
            tracing::warn!(command = %command, "{error:#}; continuing");
            false
        }
    }
}

pub fn query_lossy(runner: &dyn CommandRunner, command: &CommandSpec) -> String {
    match runner.run(command) {
        Ok(output) => {
            if !output.success {
                tracing::warn!(command = %command, "query exited unsuccessfully");
            }
            output.stdout
        }
        Err(error) => {
            tracing::warn!(command = %command, "{error:#}");
            String::new()
        }
    }
}
