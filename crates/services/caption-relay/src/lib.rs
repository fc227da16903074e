//! Cadence Caption Relay
//!
//! Reads finalized transcript lines (plain text or JSON segments) and control
//! commands from an input stream, records them into a transcript history and
//! paces them through a [`cadence_core::PacingEngine`].

pub mod command;
pub mod config;
pub mod relay;

pub use command::{parse_line, CommandError, ControlCommand, InputLine};
pub use config::{ConfigError, HistoryConfig, InputConfig, InputFormat, RelayConfig};
pub use relay::{spawn_line_reader, EndReason, Relay, RelayError, RelaySummary};
