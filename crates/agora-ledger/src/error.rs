use agora_types::ContentId;

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// A completed transaction already exists for this `(object, buyer)`
    /// pair; re-purchase is rejected before any record is written.
    #[error("object {content_id} already purchased by {buyer}")]
    AlreadyPurchased {
        content_id: ContentId,
        buyer: String,
    },

    /// Purchase amount must be positive.
    #[error("invalid purchase amount: {0}")]
    InvalidAmount(f64),

    /// The requested transaction was not found.
    ///
    /// Lookups report a missing transaction as `Ok(None)`; this variant is
    /// for callers that need to surface the miss as an error.
    #[error("transaction not found: {0}")]
    TxNotFound(agora_types::TxId),

    /// Failure in the shared persistence layer.
    #[error("persistence error: {0}")]
    Persist(#[from] agora_persist::PersistError),
}
