//! Error types for the project migration
//!
//! Only run-level failures live here. A single legacy record that cannot
//! be migrated is reported as data (see `migration::report`), never as an
//! error that unwinds the run.

/// Main error type for migration operations
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Backup error: {0}")]
    Backup(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MigrationError {
    /// Whether this error aborts a migration run
    ///
    /// Decode errors are raised per document and are recoverable at the
    /// record boundary; everything else ends the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Decode(_))
    }
}

impl From<std::io::Error> for MigrationError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for MigrationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Backup(format!("JSON error: {}", err))
    }
}

impl From<mongodb::error::Error> for MigrationError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<bson::de::Error> for MigrationError {
    fn from(err: bson::de::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<bson::ser::Error> for MigrationError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Internal(format!("BSON encode error: {}", err))
    }
}

/// Result type alias for migration operations
pub type Result<T> = std::result::Result<T, MigrationError>;
