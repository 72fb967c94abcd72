use std::path::PathBuf;
use thiserror::Error;

/// The central error type for patternflow.
///
/// The sequencer itself never fails; these errors come from the layers
/// around it (configuration, scenario lookup, the CLI).
#[derive(Error, Debug)]
pub enum PatternflowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pattern error: {0}")]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PatternError {
    #[error("Unknown pattern '{id}'. Run `patternflow list` to see available patterns")]
    NotFound { id: String },

    #[error("Pattern '{id}' scripts a message from '{from}' to '{to}', but no such edge endpoint exists")]
    InvalidScript { id: String, from: String, to: String },
}

pub type Result<T> = std::result::Result<T, PatternflowError>;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_PATTERN_ERROR: u8 = 3;

/// Determine the appropriate process exit code for an error.
pub fn get_exit_code(e: &anyhow::Error) -> u8 {
    if let Some(err) = e.downcast_ref::<PatternflowError>() {
        return match err {
            PatternflowError::Config(_) => EXIT_CONFIG_ERROR,
            PatternflowError::Pattern(_) => EXIT_PATTERN_ERROR,
            PatternflowError::Other(_) => EXIT_ERROR,
        };
    }

    if e.downcast_ref::<ConfigError>().is_some() {
        return EXIT_CONFIG_ERROR;
    }
    if e.downcast_ref::<PatternError>().is_some() {
        return EXIT_PATTERN_ERROR;
    }

    EXIT_ERROR
}
