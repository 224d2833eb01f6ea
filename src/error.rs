//! Error types for the jeepney tracker

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid fleet record: {0}")]
    InvalidRecord(String),

    #[error("State error: {0}")]
    State(String),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
