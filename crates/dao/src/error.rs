use thiserror::Error;

use dynadao_core::codec::SerializationError;
use dynadao_core::SchemaError;

use crate::backend::{BackendError, TableStatus};

/// Errors returned by DAO operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DaoError {
    /// A record or key value did not match the codec.
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Table '{table}' did not become active after {attempts} attempts")]
    TableActivationTimeout { table: String, attempts: u32 },

    #[error("Table '{table}' is unusable, status {status:?}")]
    TableUnusable { table: String, status: TableStatus },
}

impl DaoError {
    /// `true` when the stored data and the codec disagree, as opposed to a
    /// failure of the backend itself.
    pub fn is_codec_error(&self) -> bool {
        matches!(self, DaoError::Serialization(_))
    }
}

/// Result type for DAO operations.
pub type Result<T> = std::result::Result<T, DaoError>;
