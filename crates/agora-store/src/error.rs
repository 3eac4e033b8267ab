use agora_types::ContentId;

/// Errors from content store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    ///
    /// Read operations report a missing object as `Ok(None)`; this variant
    /// is for callers that need to surface the miss as an error.
    #[error("object not found: {0}")]
    NotFound(ContentId),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure in the shared persistence layer.
    #[error("persistence error: {0}")]
    Persist(#[from] agora_persist::PersistError),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
