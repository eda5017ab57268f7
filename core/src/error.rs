use crate::refresh::RefreshPhase;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    #[error("Missing {entity} reference: {detail}")]
    MissingReference {
        entity: &'static str,
        detail: String,
    },

    #[error("Refresh failed during {phase}: {source}")]
    Phase {
        phase: RefreshPhase,
        #[source]
        source: Box<RefreshError>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RefreshError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn missing(entity: &'static str, detail: impl Into<String>) -> Self {
        Self::MissingReference {
            entity,
            detail: detail.into(),
        }
    }
}

pub type RefreshResult<T> = Result<T, RefreshError>;
