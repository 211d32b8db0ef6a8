use thiserror::Error;

use camscan_core::{ScreenError, SinkError, ValidationError};

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("command error: {0}")]
    Command(String),

    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<ScreenError> for CliError {
    fn from(error: ScreenError) -> Self {
        match error {
            ScreenError::SourceUnavailable { message } => Self::SourceUnavailable(message),
            ScreenError::Validation(error) => Self::Validation(error),
        }
    }
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Command(_) => 2,
            Self::SourceUnavailable(_) => 3,
            Self::Serialization(_) => 4,
            Self::Sink(_) => 10,
            Self::Io(_) => 10,
        }
    }
}
