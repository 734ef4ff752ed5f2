use std::time::Duration;

use thiserror::Error;

/// Why a single feed record could not be ingested. Never fatal to a pass.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Field parse error: {field}: {reason}")]
    FieldParse { field: &'static str, reason: String },

    #[error("Store unavailable during {operation}: {reason}")]
    StoreUnavailable {
        operation: &'static str,
        reason: String,
    },
}

impl IngestError {
    pub fn missing(field: &'static str) -> Self {
        IngestError::FieldParse {
            field,
            reason: "missing".to_string(),
        }
    }

    pub fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        IngestError::FieldParse {
            field,
            reason: reason.into(),
        }
    }

    pub fn store(operation: &'static str, err: anyhow::Error) -> Self {
        IngestError::StoreUnavailable {
            operation,
            reason: format!("{err:#}"),
        }
    }

    pub fn timed_out(operation: &'static str, after: Duration) -> Self {
        IngestError::StoreUnavailable {
            operation,
            reason: format!("timed out after {}ms", after.as_millis()),
        }
    }

    /// Short machine-friendly class name for reports.
    pub fn class(&self) -> &'static str {
        match self {
            IngestError::FieldParse { .. } => "field_parse",
            IngestError::StoreUnavailable { .. } => "store_unavailable",
        }
    }
}
