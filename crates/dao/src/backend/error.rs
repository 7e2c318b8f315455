use thiserror::Error;

/// Errors reported by a storage backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("{operation} failed: {message}")]
    Service {
        operation: &'static str,
        message: String,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{count} item(s) were left unprocessed for table '{table}'")]
    Unprocessed { table: String, count: usize },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
}

impl BackendError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::ResourceNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_display() {
        let error = BackendError::Service {
            operation: "Query",
            message: "Throughput exceeded".to_string(),
        };
        assert_eq!(error.to_string(), "Query failed: Throughput exceeded");
    }

    #[test]
    fn test_unprocessed_display() {
        let error = BackendError::Unprocessed {
            table: "products".to_string(),
            count: 3,
        };
        assert_eq!(
            error.to_string(),
            "3 item(s) were left unprocessed for table 'products'"
        );
    }

    #[test]
    fn test_is_not_found() {
        assert!(BackendError::ResourceNotFound("products".into()).is_not_found());
        assert!(!BackendError::InvalidRequest("bad".into()).is_not_found());
    }
}
