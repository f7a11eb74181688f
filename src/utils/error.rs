use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Startup error: {0}")]
    StartupError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Block action error: {0}")]
    BlockActionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl AppError {
    /// Parse failures are logged and skipped; everything else ends the
    /// pipeline.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AppError::ParseError(_))
    }
}
