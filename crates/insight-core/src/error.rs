//! ============================================================================
//! Error Types - Failure taxonomy for bank storage and configuration
//! ============================================================================
//! Malformed lines inside bank or session files are never errors: they are
//! logged and skipped where they are read.
//! ============================================================================

use std::path::PathBuf;

/// Errors surfaced by the bank store and configuration loading
#[derive(Debug, thiserror::Error)]
pub enum InsightError {
    #[error("Memory bank not found: {0}")]
    BankNotFound(String),

    #[error("Entity '{entity}' not found in memory bank '{bank}'")]
    EntityNotFound { bank: String, entity: String },

    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl InsightError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        InsightError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for the NotFound family (unknown bank or unknown entity)
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            InsightError::BankNotFound(_) | InsightError::EntityNotFound { .. }
        )
    }
}

pub type InsightResult<T> = std::result::Result<T, InsightError>;
