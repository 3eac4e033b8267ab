use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::content_id::ContentId;
use crate::error::TypeError;

/// Short transaction identifier (8 bytes, 16 hex characters).
///
/// Derived by hashing the purchase inputs together with a nanosecond
/// timestamp, a per-ledger sequence number, and a random salt. The
/// sequence and salt keep ids unique even when two purchases for the
/// same `(object, buyer, amount)` are created in the same instant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxId([u8; 8]);

impl TxId {
    /// Derive a fresh transaction id from purchase inputs.
    ///
    /// `seq` is a monotonically increasing counter owned by the ledger
    /// that issued the transaction.
    pub fn derive(content_id: &ContentId, buyer: &str, amount: f64, seq: u64) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let salt: u64 = rand::random();

        let mut hasher = Sha256::new();
        hasher.update(content_id.as_bytes());
        hasher.update(buyer.as_bytes());
        hasher.update(amount.to_bits().to_le_bytes());
        hasher.update(nanos.to_le_bytes());
        hasher.update(seq.to_le_bytes());
        hasher.update(salt.to_le_bytes());
        let digest = hasher.finalize();

        let mut id = [0u8; 8];
        id.copy_from_slice(&digest[..8]);
        Self(id)
    }

    /// Create a `TxId` from raw bytes.
    pub fn from_raw(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Hex-encoded string representation (16 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 8 {
            return Err(TypeError::InvalidLength {
                expected: 8,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 8];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", self.to_hex())
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// Hex-string serde so a `TxId` can key JSON maps in the escrow document.
impl Serialize for TxId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TxId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Status of a purchase transaction.
///
/// `Pending` is the only non-terminal state. Once a transaction reaches
/// `Completed` or `Failed` it never transitions again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Completed,
    Failed,
}

impl TxStatus {
    /// Returns `true` for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Role filter for user transaction queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxRole {
    Buyer,
    Seller,
}

/// A two-phase purchase record.
///
/// Created in `Pending` with funds logically held in escrow; resolves
/// exactly once to `Completed` (escrow released to the seller) or
/// `Failed` (escrow refunded to the buyer).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub tx_id: TxId,
    /// Back-reference into the content store. A plain identifier, never
    /// dereferenced by the ledger itself.
    pub content_id: ContentId,
    pub buyer: String,
    pub seller: String,
    pub amount: f64,
    pub status: TxStatus,
    pub escrow_released: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl Transaction {
    /// Create a new pending transaction.
    pub fn new(tx_id: TxId, content_id: ContentId, buyer: &str, seller: &str, amount: f64) -> Self {
        Self {
            tx_id,
            content_id,
            buyer: buyer.to_owned(),
            seller: seller.to_owned(),
            amount,
            status: TxStatus::Pending,
            escrow_released: false,
            created_at: Utc::now(),
            completed_at: None,
            failed_at: None,
            failure_reason: None,
        }
    }

    /// Returns `true` once the transaction has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Transition `Pending -> Completed`, releasing escrow.
    ///
    /// Returns `false` without mutating if the transaction is not pending.
    pub fn mark_completed(&mut self) -> bool {
        if self.status != TxStatus::Pending {
            return false;
        }
        self.status = TxStatus::Completed;
        self.escrow_released = true;
        self.completed_at = Some(Utc::now());
        true
    }

    /// Transition `Pending -> Failed`, recording the reason.
    ///
    /// Returns `false` without mutating if the transaction is not pending.
    pub fn mark_failed(&mut self, reason: &str) -> bool {
        if self.status != TxStatus::Pending {
            return false;
        }
        self.status = TxStatus::Failed;
        self.failed_at = Some(Utc::now());
        self.failure_reason = Some(reason.to_owned());
        true
    }

    /// Returns `true` if `user` participates as the given role, or as
    /// either party when `role` is `None`.
    pub fn involves(&self, user: &str, role: Option<TxRole>) -> bool {
        match role {
            Some(TxRole::Buyer) => self.buyer == user,
            Some(TxRole::Seller) => self.seller == user,
            None => self.buyer == user || self.seller == user,
        }
    }
}
