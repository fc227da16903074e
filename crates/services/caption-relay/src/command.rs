//! Input line parsing
//!
//! Lines starting with `/` are control commands; everything else is a segment.

use cadence_core::{PacingConfigUpdate, PacingMode, Segment};

use crate::config::InputFormat;

/// Control commands accepted on the input stream
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    /// `/flush`
    Flush,
    /// `/stop`
    Stop,
    /// `/clear`
    Clear,
    /// `/reset`
    Reset,
    /// `/status`
    Status,
    /// `/mode <m>`, `/wpm <n>`, `/delay <ms>`
    Configure(PacingConfigUpdate),
}

/// One parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum InputLine {
    Segment(Segment),
    Control(ControlCommand),
    Blank,
}

/// Input line errors; the offending line is skipped
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command '/{0}'")]
    UnknownCommand(String),

    #[error("Command '/{0}' requires an argument")]
    MissingArgument(&'static str),

    #[error("Invalid argument for '/{command}': {reason}")]
    InvalidArgument {
        command: &'static str,
        reason: String,
    },

    #[error("Invalid segment: {0}")]
    InvalidSegment(#[from] cadence_core::Error),
}

/// Parse one line of relay input
pub fn parse_line(line: &str, format: InputFormat) -> Result<InputLine, CommandError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(InputLine::Blank);
    }

    if let Some(command) = trimmed.strip_prefix('/') {
        return parse_command(command).map(InputLine::Control);
    }

    let segment = match format {
        InputFormat::Text => Segment::finalized(trimmed),
        InputFormat::Jsonl => Segment::from_json(trimmed)?,
    };
    Ok(InputLine::Segment(segment))
}

fn parse_command(command: &str) -> Result<ControlCommand, CommandError> {
    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default().to_ascii_lowercase();
    let argument = parts.next();

    let command = match name.as_str() {
        "flush" => ControlCommand::Flush,
        "stop" => ControlCommand::Stop,
        "clear" => ControlCommand::Clear,
        "reset" => ControlCommand::Reset,
        "status" => ControlCommand::Status,
        "mode" => {
            let value = argument.ok_or(CommandError::MissingArgument("mode"))?;
            let mode = value
                .parse::<PacingMode>()
                .map_err(|e| invalid("mode", e))?;
            ControlCommand::Configure(PacingConfigUpdate::mode(mode))
        }
        "wpm" => {
            let value = argument.ok_or(CommandError::MissingArgument("wpm"))?;
            let wpm: f64 = value.parse().map_err(|e| invalid("wpm", e))?;
            let update = PacingConfigUpdate::wpm(wpm);
            update.validate().map_err(|e| invalid("wpm", e))?;
            ControlCommand::Configure(update)
        }
        "delay" => {
            let value = argument.ok_or(CommandError::MissingArgument("delay"))?;
            let delay: u64 = value.parse().map_err(|e| invalid("delay", e))?;
            ControlCommand::Configure(PacingConfigUpdate::sentence_delay_ms(delay))
        }
        other => return Err(CommandError::UnknownCommand(other.to_string())),
    };
    Ok(command)
}

fn invalid(command: &'static str, reason: impl std::fmt::Display) -> CommandError {
    CommandError::InvalidArgument {
        command,
        reason: reason.to_string(),
    }
}
