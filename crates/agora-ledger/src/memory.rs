use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::debug;

use agora_types::{ContentId, EscrowEntry, Transaction, TxId, TxRole, TxStatus};

use crate::error::LedgerError;
use crate::payment::{MockPaymentVerifier, PaymentVerifier};
use crate::traits::{compute_stats, LedgerReader, LedgerStats, LedgerWriter};

/// In-memory escrow ledger for tests, demos, and embedding.
pub struct InMemoryLedger {
    verifier: Arc<dyn PaymentVerifier>,
    seq: AtomicU64,
    inner: RwLock<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    transactions: Vec<Transaction>,
    escrow: BTreeMap<TxId, EscrowEntry>,
}

impl LedgerState {
    fn already_purchased(&self, content_id: &ContentId, buyer: &str) -> bool {
        self.transactions.iter().any(|tx| {
            tx.content_id == *content_id && tx.buyer == buyer && tx.status == TxStatus::Completed
        })
    }

    fn fresh_tx_id(&self, content_id: &ContentId, buyer: &str, amount: f64, seq: u64) -> TxId {
        // The random salt makes a repeat practically impossible; the loop
        // turns "practically" into "actually".
        loop {
            let tx_id = TxId::derive(content_id, buyer, amount, seq);
            if !self.escrow.contains_key(&tx_id) {
                return tx_id;
            }
        }
    }
}

impl InMemoryLedger {
    /// Create a ledger with the given payment verifier.
    pub fn new(verifier: Arc<dyn PaymentVerifier>) -> Self {
        Self {
            verifier,
            seq: AtomicU64::new(0),
            inner: RwLock::new(LedgerState::default()),
        }
    }

    /// Number of transactions in the ledger.
    pub fn len(&self) -> usize {
        self.inner.read().expect("lock poisoned").transactions.len()
    }

    /// Returns `true` if no transactions have been created.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(Arc::new(MockPaymentVerifier))
    }
}

impl LedgerWriter for InMemoryLedger {
    fn create_transaction(
        &self,
        content_id: &ContentId,
        buyer: &str,
        seller: &str,
        amount: f64,
    ) -> Result<Transaction, LedgerError> {
        if amount <= 0.0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let mut state = self.inner.write().expect("lock poisoned");
        if state.already_purchased(content_id, buyer) {
            return Err(LedgerError::AlreadyPurchased {
                content_id: *content_id,
                buyer: buyer.to_owned(),
            });
        }

        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let tx_id = state.fresh_tx_id(content_id, buyer, amount, seq);
        let tx = Transaction::new(tx_id, *content_id, buyer, seller, amount);

        // Transaction and held escrow entry land as one unit under the lock.
        state.escrow.insert(tx_id, EscrowEntry::held_for(&tx));
        state.transactions.push(tx.clone());

        debug!(tx_id = %tx_id, object = %content_id.short_hex(), buyer, "transaction created");
        Ok(tx)
    }

    fn complete_transaction(
        &self,
        tx_id: &TxId,
        payment_amount: f64,
    ) -> Result<bool, LedgerError> {
        if !self.verifier.verify(tx_id, payment_amount) {
            return Ok(false);
        }

        let mut guard = self.inner.write().expect("lock poisoned");
        let state = &mut *guard;
        let Some(tx) = state.transactions.iter_mut().find(|tx| tx.tx_id == *tx_id) else {
            return Ok(false);
        };
        if !tx.mark_completed() {
            return Ok(false);
        }
        if let Some(entry) = state.escrow.get_mut(tx_id) {
            entry.release();
        }

        debug!(tx_id = %tx_id, "transaction completed, escrow released");
        Ok(true)
    }

    fn fail_transaction(&self, tx_id: &TxId, reason: &str) -> Result<bool, LedgerError> {
        let mut guard = self.inner.write().expect("lock poisoned");
        let state = &mut *guard;
        let Some(tx) = state.transactions.iter_mut().find(|tx| tx.tx_id == *tx_id) else {
            return Ok(false);
        };
        if !tx.mark_failed(reason) {
            return Ok(false);
        }
        if let Some(entry) = state.escrow.get_mut(tx_id) {
            entry.refund();
        }

        debug!(tx_id = %tx_id, reason, "transaction failed, escrow refunded");
        Ok(true)
    }
}

impl LedgerReader for InMemoryLedger {
    fn transaction(&self, tx_id: &TxId) -> Result<Option<Transaction>, LedgerError> {
        let state = self.inner.read().expect("lock poisoned");
        Ok(state
            .transactions
            .iter()
            .find(|tx| tx.tx_id == *tx_id)
            .cloned())
    }

    fn user_transactions(
        &self,
        user: &str,
        role: Option<TxRole>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let state = self.inner.read().expect("lock poisoned");
        Ok(state
            .transactions
            .iter()
            .filter(|tx| tx.involves(user, role))
            .cloned()
            .collect())
    }

    fn object_transactions(
        &self,
        content_id: &ContentId,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let state = self.inner.read().expect("lock poisoned");
        Ok(state
            .transactions
            .iter()
            .filter(|tx| tx.content_id == *content_id)
            .cloned()
            .collect())
    }

    fn escrow_entry(&self, tx_id: &TxId) -> Result<Option<EscrowEntry>, LedgerError> {
        let state = self.inner.read().expect("lock poisoned");
        Ok(state.escrow.get(tx_id).cloned())
    }

    fn is_purchased(&self, content_id: &ContentId, buyer: &str) -> Result<bool, LedgerError> {
        let state = self.inner.read().expect("lock poisoned");
        Ok(state.already_purchased(content_id, buyer))
    }

    fn stats(&self) -> Result<LedgerStats, LedgerError> {
        let state = self.inner.read().expect("lock poisoned");
        let held = state.escrow.values().filter(|e| e.is_held()).count() as u64;
        Ok(compute_stats(state.transactions.iter(), held))
    }
}

impl std::fmt::Debug for InMemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLedger")
            .field("transaction_count", &self.len())
            .finish()
    }
}
