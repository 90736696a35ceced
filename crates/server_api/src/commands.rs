use std::time::Duration;

use shared::domain::CommandOutput;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

const MAX_COUNTDOWN: u32 = 1_000;
const OUTPUT_CHANNEL_CAPACITY: usize = 64;
const DEFAULT_COUNTDOWN: u32 = 5;

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("command must not be empty")]
    Empty,
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("invalid argument for {command}: {reason}")]
    InvalidArgument {
        command: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Countdown { interval: Duration, count: u32 },
}

/// Parses `countdown [-i SECONDS] [COUNT]`.
pub fn parse_command(line: &str, default_interval: Duration) -> Result<Command, CommandError> {
    let mut words = line.split_whitespace();
    let name = words.next().ok_or(CommandError::Empty)?;
    match name {
        "countdown" => {
            let invalid = |reason: String| CommandError::InvalidArgument {
                command: "countdown",
                reason,
            };
            let mut interval = default_interval;
            let mut count = None;
            while let Some(word) = words.next() {
                match word {
                    "-i" | "--interval" => {
                        let raw = words
                            .next()
                            .ok_or_else(|| invalid("missing value for -i".into()))?;
                        let secs: f64 = raw
                            .parse()
                            .map_err(|_| invalid(format!("'{raw}' is not a number")))?;
                        interval = Duration::try_from_secs_f64(secs)
                            .map_err(|_| invalid(format!("'{raw}' is not a valid interval")))?;
                    }
                    raw if count.is_none() => {
                        let parsed: u32 = raw
                            .parse()
                            .map_err(|_| invalid(format!("'{raw}' is not a count")))?;
                        if parsed > MAX_COUNTDOWN {
                            return Err(invalid(format!("count must be at most {MAX_COUNTDOWN}")));
                        }
                        count = Some(parsed);
                    }
                    raw => return Err(invalid(format!("unexpected argument '{raw}'"))),
                }
            }
            Ok(Command::Countdown {
                interval,
                count: count.unwrap_or(DEFAULT_COUNTDOWN),
            })
        }
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

#[derive(Debug, Clone)]
pub struct CommandRunner {
    default_interval: Duration,
}

impl CommandRunner {
    pub fn new(default_interval: Duration) -> Self {
        Self { default_interval }
    }

    /// Starts `line` in the background and returns its output stream.
    ///
    /// The stream always ends with a single `finished` event unless the
    /// receiver is dropped first, which stops the command.
    pub fn spawn(&self, line: &str) -> Result<mpsc::Receiver<CommandOutput>, CommandError> {
        let command = parse_command(line, self.default_interval)?;
        let (tx, rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        info!(command = line, "command: started");
        tokio::spawn(run(command, tx));
        Ok(rx)
    }
}

async fn run(command: Command, tx: mpsc::Sender<CommandOutput>) {
    match command {
        Command::Countdown { interval, count } => {
            for n in (1..=count).rev() {
                debug!(line = n, "command: output");
                if tx.send(CommandOutput::line(n.to_string())).await.is_err() {
                    info!("command: receiver dropped, stopping");
                    return;
                }
                if n > 1 {
                    tokio::time::sleep(interval).await;
                }
            }
        }
    }
    info!("command: finished");
    let _ = tx.send(CommandOutput::finished()).await;
}
