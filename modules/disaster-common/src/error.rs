use thiserror::Error;

#[derive(Error, Debug)]
pub enum DisasterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown disaster type: {0}")]
    UnknownDisasterType(String),
}
