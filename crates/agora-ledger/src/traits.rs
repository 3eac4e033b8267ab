use serde::{Deserialize, Serialize};

use agora_types::{ContentId, EscrowEntry, Transaction, TxId, TxRole};

use crate::error::LedgerError;

/// Aggregate ledger statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total_transactions: u64,
    pub completed_transactions: u64,
    pub pending_transactions: u64,
    pub failed_transactions: u64,
    /// Sum of amounts across completed transactions.
    pub completed_volume: f64,
    /// Escrow entries still in the held state.
    pub held_escrow_count: u64,
}

/// Write boundary for ledger mutations.
///
/// Every method is an atomic unit of work: it either applies fully or
/// leaves the ledger unchanged. Mutations on a transaction in a terminal
/// state are no-ops reported as `Ok(false)`.
pub trait LedgerWriter: Send + Sync {
    /// Open a purchase: append a pending transaction and its held escrow
    /// entry as one logical unit.
    ///
    /// Fails with [`LedgerError::AlreadyPurchased`] if a completed
    /// transaction already exists for `(content_id, buyer)`, and with
    /// [`LedgerError::InvalidAmount`] for a non-positive amount. Pending
    /// transactions do not block re-purchase; only completed ones do.
    fn create_transaction(
        &self,
        content_id: &ContentId,
        buyer: &str,
        seller: &str,
        amount: f64,
    ) -> Result<Transaction, LedgerError>;

    /// Verify payment and resolve the transaction to `Completed`,
    /// releasing escrow to the seller.
    ///
    /// Returns `Ok(false)` with no side effects when the transaction is
    /// missing, not pending, or payment verification rejects the amount.
    fn complete_transaction(
        &self,
        tx_id: &TxId,
        payment_amount: f64,
    ) -> Result<bool, LedgerError>;

    /// Resolve the transaction to `Failed` with a reason, refunding escrow
    /// to the buyer.
    ///
    /// Returns `Ok(false)` with no side effects when the transaction is
    /// missing or not pending.
    fn fail_transaction(&self, tx_id: &TxId, reason: &str) -> Result<bool, LedgerError>;
}

/// Read boundary for ledger queries.
pub trait LedgerReader: Send + Sync {
    /// Look up a transaction by id. Returns `Ok(None)` if unknown.
    fn transaction(&self, tx_id: &TxId) -> Result<Option<Transaction>, LedgerError>;

    /// All transactions involving `user`, optionally filtered by role.
    fn user_transactions(
        &self,
        user: &str,
        role: Option<TxRole>,
    ) -> Result<Vec<Transaction>, LedgerError>;

    /// All transactions referencing the given object.
    fn object_transactions(&self, content_id: &ContentId)
        -> Result<Vec<Transaction>, LedgerError>;

    /// The escrow entry for a transaction. Returns `Ok(None)` if unknown.
    fn escrow_entry(&self, tx_id: &TxId) -> Result<Option<EscrowEntry>, LedgerError>;

    /// `true` iff a completed transaction exists for `(content_id, buyer)`.
    ///
    /// This is the sole authorization primitive for downloads.
    fn is_purchased(&self, content_id: &ContentId, buyer: &str) -> Result<bool, LedgerError>;

    /// Aggregate counts and completed volume.
    fn stats(&self) -> Result<LedgerStats, LedgerError>;

    /// Like [`transaction`](LedgerReader::transaction), but surfaces an
    /// unknown id as [`LedgerError::TxNotFound`] for callers that treat
    /// the miss as an error.
    fn transaction_required(&self, tx_id: &TxId) -> Result<Transaction, LedgerError> {
        self.transaction(tx_id)?.ok_or(LedgerError::TxNotFound(*tx_id))
    }
}

/// Compute stats from a full view of the ledger state.
pub(crate) fn compute_stats<'a>(
    transactions: impl Iterator<Item = &'a Transaction>,
    held_escrow_count: u64,
) -> LedgerStats {
    let mut stats = LedgerStats {
        held_escrow_count,
        ..Default::default()
    };
    for tx in transactions {
        stats.total_transactions += 1;
        match tx.status {
            agora_types::TxStatus::Pending => stats.pending_transactions += 1,
            agora_types::TxStatus::Completed => {
                stats.completed_transactions += 1;
                stats.completed_volume += tx.amount;
            }
            agora_types::TxStatus::Failed => stats.failed_transactions += 1,
        }
    }
    stats
}
