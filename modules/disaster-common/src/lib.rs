pub mod types;
pub mod config;
pub mod error;
pub mod matching;

pub use types::*;
pub use config::{Config, IngestConfig};
pub use error::DisasterError;
pub use matching::MatchRules;
