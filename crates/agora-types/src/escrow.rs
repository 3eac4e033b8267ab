use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content_id::ContentId;
use crate::tx::{Transaction, TxId};

/// Status of funds held against a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscrowStatus {
    /// Funds are held pending resolution of the transaction.
    Held,
    /// Transaction completed; funds released to the seller.
    Released,
    /// Transaction failed; funds refunded to the buyer.
    Refunded,
}

impl fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Held => write!(f, "held"),
            Self::Released => write!(f, "released"),
            Self::Refunded => write!(f, "refunded"),
        }
    }
}

/// Per-transaction escrow record.
///
/// A projection of the transaction keyed by [`TxId`]. It exists so the
/// "funds are held, not yet disbursed" state is independently queryable
/// and auditable; its status always mirrors its transaction's status.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EscrowEntry {
    pub tx_id: TxId,
    pub content_id: ContentId,
    pub buyer: String,
    pub seller: String,
    pub amount: f64,
    pub status: EscrowStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub released_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refunded_at: Option<DateTime<Utc>>,
}

impl EscrowEntry {
    /// Create a held entry mirroring a freshly created transaction.
    pub fn held_for(tx: &Transaction) -> Self {
        Self {
            tx_id: tx.tx_id,
            content_id: tx.content_id,
            buyer: tx.buyer.clone(),
            seller: tx.seller.clone(),
            amount: tx.amount,
            status: EscrowStatus::Held,
            created_at: tx.created_at,
            released_at: None,
            refunded_at: None,
        }
    }

    /// Flip `Held -> Released`. Returns `false` if not held.
    pub fn release(&mut self) -> bool {
        if self.status != EscrowStatus::Held {
            return false;
        }
        self.status = EscrowStatus::Released;
        self.released_at = Some(Utc::now());
        true
    }

    /// Flip `Held -> Refunded`. Returns `false` if not held.
    pub fn refund(&mut self) -> bool {
        if self.status != EscrowStatus::Held {
            return false;
        }
        self.status = EscrowStatus::Refunded;
        self.refunded_at = Some(Utc::now());
        true
    }

    /// Returns `true` while funds are still held.
    pub fn is_held(&self) -> bool {
        self.status == EscrowStatus::Held
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held_entry() -> EscrowEntry {
        let cid = ContentId::from_blob(b"dataset");
        let tx_id = TxId::derive(&cid, "bob", 5.0, 1);
        let tx = Transaction::new(tx_id, cid, "bob", "alice", 5.0);
        EscrowEntry::held_for(&tx)
    }

    #[test]
    fn held_for_mirrors_transaction() {
        let entry = held_entry();
        assert_eq!(entry.status, EscrowStatus::Held);
        assert!(entry.is_held());
        assert_eq!(entry.buyer, "bob");
        assert_eq!(entry.seller, "alice");
        assert!(entry.released_at.is_none());
    }

    #[test]
    fn release_is_one_way() {
        let mut entry = held_entry();
        assert!(entry.release());
        assert_eq!(entry.status, EscrowStatus::Released);
        assert!(entry.released_at.is_some());
        assert!(!entry.release());
        assert!(!entry.refund());
    }

    #[test]
    fn refund_is_one_way() {
        let mut entry = held_entry();
        assert!(entry.refund());
        assert_eq!(entry.status, EscrowStatus::Refunded);
        assert!(entry.refunded_at.is_some());
        assert!(!entry.release());
    }

    #[test]
    fn serde_roundtrip() {
        let entry = held_entry();
        let json = serde_json::to_string(&entry).unwrap();
        let parsed: EscrowEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
    }
}
