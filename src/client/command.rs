//! Command-line commands for the `progress` binary and the summary it prints.

use crate::shared::progress::{ProgressPatch, ProgressRecord, StageLayout};
use crate::shared::state_machine::{stage_status, StageStatus};
use chrono::{DateTime, Duration, Utc};
use std::fmt::Write as _;
use thiserror::Error;

pub const USAGE: &str = "\
Usage: progress <command>

Commands:
  status               Show the current progress
  begin <team>         Start (or resume) as <team>
  complete <stage>     Mark <stage> as completed
  set <json>           Apply a JSON patch, e.g. '{\"room2Answer\":\"LANTERN\"}'
  restart              Discard local progress";

/// A parsed command line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Status,
    Begin(String),
    Complete(u32),
    Set(ProgressPatch),
    Restart,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("missing command")]
    Empty,
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
    #[error("'{0}' is not a stage number")]
    InvalidStage(String),
    #[error("invalid patch: {0}")]
    InvalidPatch(String),
}

impl Command {
    /// Parse the arguments following the program name
    pub fn parse<I, S>(args: I) -> Result<Self, CommandError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_string()).collect();
        let Some((name, rest)) = args.split_first() else {
            return Err(CommandError::Empty);
        };

        match name.as_str() {
            "status" => Ok(Command::Status),
            "restart" => Ok(Command::Restart),
            "begin" => {
                let team = rest.join(" ");
                if team.trim().is_empty() {
                    return Err(CommandError::MissingArgument("begin"));
                }
                Ok(Command::Begin(team.trim().to_string()))
            }
            "complete" => {
                let stage = rest.first().ok_or(CommandError::MissingArgument("complete"))?;
                stage
                    .parse()
                    .map(Command::Complete)
                    .map_err(|_| CommandError::InvalidStage(stage.clone()))
            }
            "set" => {
                let json = rest.first().ok_or(CommandError::MissingArgument("set"))?;
                serde_json::from_str(json)
                    .map(Command::Set)
                    .map_err(|e| CommandError::InvalidPatch(e.to_string()))
            }
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Human-readable progress summary
pub fn render_summary(record: &ProgressRecord, layout: StageLayout, now: DateTime<Utc>) -> String {
    let mut out = String::new();

    let status = match stage_status(record, layout) {
        StageStatus::NotStarted => {
            let _ = writeln!(out, "No team yet. Run `progress begin <team>` to start.");
            return out;
        }
        StageStatus::AwaitingStage(stage) => {
            format!("awaiting stage {} of {}", stage, layout.stage_count())
        }
        StageStatus::Finished => "finished".to_string(),
    };

    let _ = writeln!(out, "Team:      {}", record.identity);
    let _ = writeln!(out, "Status:    {}", status);
    let completed = record
        .rooms_completed
        .iter()
        .map(|stage| stage.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(
        out,
        "Completed: {}",
        if completed.is_empty() { "-" } else { completed.as_str() }
    );
    let _ = writeln!(out, "Elapsed:   {}", format_duration(record.elapsed(now)));

    for stage in layout.stages() {
        let Some(entered) = record.stage_entry_time(stage) else {
            continue;
        };
        let label = if layout.is_terminal(stage) {
            "Exit".to_string()
        } else {
            format!("Stage {}", stage)
        };
        let _ = writeln!(
            out,
            "  {:<8} entered {}  {}",
            label,
            entered.format("%H:%M:%S"),
            format_duration(record.stage_duration(stage))
        );
    }

    out
}

fn format_duration(duration: Option<Duration>) -> String {
    match duration {
        Some(duration) => {
            let secs = duration.num_seconds().max(0);
            format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
        }
        None => "-".to_string(),
    }
}
