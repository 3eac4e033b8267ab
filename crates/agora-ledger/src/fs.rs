use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use agora_persist::{ensure_dir, read_json_or_init, to_json_vec, write_bytes_atomic};
use agora_types::{ContentId, EscrowEntry, Transaction, TxId, TxRole, TxStatus};

use crate::error::LedgerError;
use crate::payment::PaymentVerifier;
use crate::traits::{compute_stats, LedgerReader, LedgerStats, LedgerWriter};

/// Configuration for the filesystem ledger.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FsLedgerConfig {
    /// Directory holding `transactions.json` and `escrow.json`.
    pub root: PathBuf,
}

impl Default for FsLedgerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./storage/ledger"),
        }
    }
}

/// File-backed escrow ledger.
///
/// Durable state is two JSON documents under the configured root: the
/// transaction log (`transactions.json`, an array) and the escrow book
/// (`escrow.json`, a map keyed by transaction id). Every operation takes
/// the process-wide mutex and performs a full read-modify-write, which is
/// sufficient at demo-marketplace scale; an embedded KV store would
/// replace the two documents if mutation cost ever had to be O(1).
///
/// Mutations serialize both documents before touching disk, then persist
/// transactions first and escrow second. If the escrow write fails, the
/// previous transactions document is restored from the retained bytes so
/// the two documents cannot disagree about a transaction's state.
pub struct FsLedger {
    transactions_path: PathBuf,
    escrow_path: PathBuf,
    verifier: Arc<dyn PaymentVerifier>,
    seq: AtomicU64,
    lock: Mutex<()>,
}

type EscrowBook = BTreeMap<TxId, EscrowEntry>;

impl FsLedger {
    /// Open (or create) a ledger under the configured root.
    pub fn open(config: &FsLedgerConfig, verifier: Arc<dyn PaymentVerifier>) -> Result<Self, LedgerError> {
        ensure_dir(&config.root)?;
        let transactions_path = config.root.join("transactions.json");
        let escrow_path = config.root.join("escrow.json");

        // Initialize empty documents on first open and seed the id
        // sequence past whatever is already on disk.
        let transactions: Vec<Transaction> = read_json_or_init(&transactions_path)?;
        let _: EscrowBook = read_json_or_init(&escrow_path)?;

        Ok(Self {
            transactions_path,
            escrow_path,
            verifier,
            seq: AtomicU64::new(transactions.len() as u64),
            lock: Mutex::new(()),
        })
    }

    fn load_transactions(&self) -> Result<Vec<Transaction>, LedgerError> {
        Ok(read_json_or_init(&self.transactions_path)?)
    }

    fn load_escrow(&self) -> Result<EscrowBook, LedgerError> {
        Ok(read_json_or_init(&self.escrow_path)?)
    }

    /// Persist both documents, all-or-nothing from the reader's view.
    fn persist_both(
        &self,
        _guard: &MutexGuard<'_, ()>,
        transactions: &[Transaction],
        escrow: &EscrowBook,
    ) -> Result<(), LedgerError> {
        // Serialize everything before the first disk write so a
        // serialization failure cannot leave half an update behind.
        let tx_bytes = to_json_vec(&transactions)?;
        let escrow_bytes = to_json_vec(escrow)?;
        let prev_tx_bytes = fs::read(&self.transactions_path).ok();

        write_bytes_atomic(&self.transactions_path, &tx_bytes)?;
        if let Err(e) = write_bytes_atomic(&self.escrow_path, &escrow_bytes) {
            if let Some(prev) = prev_tx_bytes {
                if let Err(rollback) = write_bytes_atomic(&self.transactions_path, &prev) {
                    warn!(error = %rollback, "rollback of transaction log failed after escrow write error");
                }
            }
            return Err(e.into());
        }
        Ok(())
    }
}

fn already_purchased(transactions: &[Transaction], content_id: &ContentId, buyer: &str) -> bool {
    transactions.iter().any(|tx| {
        tx.content_id == *content_id && tx.buyer == buyer && tx.status == TxStatus::Completed
    })
}

impl LedgerWriter for FsLedger {
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

        let guard = self.lock.lock().expect("lock poisoned");
        let mut transactions = self.load_transactions()?;
        if already_purchased(&transactions, content_id, buyer) {
            return Err(LedgerError::AlreadyPurchased {
                content_id: *content_id,
                buyer: buyer.to_owned(),
            });
        }
        let mut escrow = self.load_escrow()?;

        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let mut tx_id = TxId::derive(content_id, buyer, amount, seq);
        while escrow.contains_key(&tx_id) {
            tx_id = TxId::derive(content_id, buyer, amount, seq);
        }

        let tx = Transaction::new(tx_id, *content_id, buyer, seller, amount);
        escrow.insert(tx_id, EscrowEntry::held_for(&tx));
        transactions.push(tx.clone());

        self.persist_both(&guard, &transactions, &escrow)?;
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

        let guard = self.lock.lock().expect("lock poisoned");
        let mut transactions = self.load_transactions()?;
        let Some(tx) = transactions.iter_mut().find(|tx| tx.tx_id == *tx_id) else {
            return Ok(false);
        };
        if !tx.mark_completed() {
            return Ok(false);
        }

        let mut escrow = self.load_escrow()?;
        if let Some(entry) = escrow.get_mut(tx_id) {
            entry.release();
        }

        self.persist_both(&guard, &transactions, &escrow)?;
        debug!(tx_id = %tx_id, "transaction completed, escrow released");
        Ok(true)
    }

    fn fail_transaction(&self, tx_id: &TxId, reason: &str) -> Result<bool, LedgerError> {
        let guard = self.lock.lock().expect("lock poisoned");
        let mut transactions = self.load_transactions()?;
        let Some(tx) = transactions.iter_mut().find(|tx| tx.tx_id == *tx_id) else {
            return Ok(false);
        };
        if !tx.mark_failed(reason) {
            return Ok(false);
        }

        let mut escrow = self.load_escrow()?;
        if let Some(entry) = escrow.get_mut(tx_id) {
            entry.refund();
        }

        self.persist_both(&guard, &transactions, &escrow)?;
        debug!(tx_id = %tx_id, reason, "transaction failed, escrow refunded");
        Ok(true)
    }
}

impl LedgerReader for FsLedger {
    fn transaction(&self, tx_id: &TxId) -> Result<Option<Transaction>, LedgerError> {
        let _guard = self.lock.lock().expect("lock poisoned");
        let transactions = self.load_transactions()?;
        Ok(transactions.into_iter().find(|tx| tx.tx_id == *tx_id))
    }

    fn user_transactions(
        &self,
        user: &str,
        role: Option<TxRole>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let _guard = self.lock.lock().expect("lock poisoned");
        let transactions = self.load_transactions()?;
        Ok(transactions
            .into_iter()
            .filter(|tx| tx.involves(user, role))
            .collect())
    }

    fn object_transactions(
        &self,
        content_id: &ContentId,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let _guard = self.lock.lock().expect("lock poisoned");
        let transactions = self.load_transactions()?;
        Ok(transactions
            .into_iter()
            .filter(|tx| tx.content_id == *content_id)
            .collect())
    }

    fn escrow_entry(&self, tx_id: &TxId) -> Result<Option<EscrowEntry>, LedgerError> {
        let _guard = self.lock.lock().expect("lock poisoned");
        let escrow = self.load_escrow()?;
        Ok(escrow.get(tx_id).cloned())
    }

    fn is_purchased(&self, content_id: &ContentId, buyer: &str) -> Result<bool, LedgerError> {
        let _guard = self.lock.lock().expect("lock poisoned");
        let transactions = self.load_transactions()?;
        Ok(already_purchased(&transactions, content_id, buyer))
    }

    fn stats(&self) -> Result<LedgerStats, LedgerError> {
        let _guard = self.lock.lock().expect("lock poisoned");
        let transactions = self.load_transactions()?;
        let escrow = self.load_escrow()?;
        let held = escrow.values().filter(|e| e.is_held()).count() as u64;
        Ok(compute_stats(transactions.iter(), held))
    }
}

impl std::fmt::Debug for FsLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsLedger")
            .field("transactions_path", &self.transactions_path)
            .finish()
    }
}
