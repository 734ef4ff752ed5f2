use thiserror::Error;

pub type Result<T> = std::result::Result<T, P2pQuakeError>;

#[derive(Debug, Error)]
pub enum P2pQuakeError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for P2pQuakeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            P2pQuakeError::Parse(err.to_string())
        } else {
            P2pQuakeError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for P2pQuakeError {
    fn from(err: serde_json::Error) -> Self {
        P2pQuakeError::Parse(err.to_string())
    }
}
