//! Common error types for the karaoke queue

use thiserror::Error;

/// Common result type for queue operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the Queue Store and its clients
#[derive(Error, Debug)]
pub enum Error {
    /// Bad or missing submission fields (user-correctable)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation targeted an entry that is not in the queue
    #[error("Not found: {0}")]
    NotFound(String),

    /// Read or write failure on the backing queue file
    #[error("Storage I/O error: {0}")]
    StorageIo(#[from] std::io::Error),

    /// Title lookup failed (never fatal to a submission)
    #[error("Metadata lookup failed: {0}")]
    MetadataLookup(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for errors the submitter can fix by changing the request
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidInput(_) | Error::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_converts_to_storage_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: Error = io.into();
        assert!(matches!(err, Error::StorageIo(_)));
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(Error::InvalidInput("x".into()).is_client_error());
        assert!(Error::NotFound("x".into()).is_client_error());
        assert!(!Error::Internal("x".into()).is_client_error());
    }
}
