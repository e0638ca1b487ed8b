//! Structured CLI errors with meaningful exit codes.
//!
//! Exit code scheme:
//! - 0:  success
//! - 2:  clap arg parse error (automatic, before our code runs)
//! - 10: render error (context, shader compile/link, readback, encode)
//! - 11: I/O error (missing fragment or include file, unreadable image)
//! - 12: input error (bad dimensions, thresholds, config file)
//! - 13: serialization error
//! - 14: comparison exceeded the allowed error ratio

use shader_fixture_core::FixtureError;
use std::fmt;

/// Errors produced by CLI operations, each mapped to a distinct exit code.
pub enum CliError {
    /// A pipeline failure while rendering or encoding.
    Render(FixtureError),
    /// A missing or unreadable input file.
    Io(String),
    /// A user input error (bad dimensions, thresholds, config).
    Input(String),
    /// A serialization error (JSON output failure).
    Serialization(String),
    /// A comparison whose error ratio exceeded the tolerance.
    Mismatch(String),
}

impl CliError {
    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Render(_) => 10,
            CliError::Io(_) => 11,
            CliError::Input(_) => 12,
            CliError::Serialization(_) => 13,
            CliError::Mismatch(_) => 14,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Render(e) => write!(f, "{e}"),
            CliError::Io(msg) => write!(f, "{msg}"),
            CliError::Input(msg) => write!(f, "{msg}"),
            CliError::Serialization(msg) => write!(f, "{msg}"),
            CliError::Mismatch(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<FixtureError> for CliError {
    fn from(e: FixtureError) -> Self {
        match e.root() {
            FixtureError::Io(_) | FixtureError::MissingIncludeFile { .. } => {
                CliError::Io(e.to_string())
            }
            FixtureError::InvalidDimensions
            | FixtureError::InvalidConfig(_)
            | FixtureError::DimensionMismatch { .. } => {
                CliError::Input(e.to_string())
            }
            _ => CliError::Render(e),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Serialization(e.to_string())
    }
}
