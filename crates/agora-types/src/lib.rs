//! Foundation types for the Agora marketplace core.
//!
//! This crate provides the identity and record types shared by the content
//! store and the escrow ledger. Every other Agora crate depends on
//! `agora-types`.
//!
//! # Key Types
//!
//! - [`ContentId`] — Content-addressed identifier (SHA-256 digest of a blob)
//! - [`TxId`] — Short transaction identifier derived from purchase inputs
//! - [`Transaction`] — A two-phase purchase record with a terminal state machine
//! - [`EscrowEntry`] — The held/released/refunded projection of a transaction

pub mod content_id;
pub mod error;
pub mod escrow;
pub mod tx;

pub use content_id::ContentId;
pub use error::TypeError;
pub use escrow::{EscrowEntry, EscrowStatus};
pub use tx::{Transaction, TxId, TxRole, TxStatus};
