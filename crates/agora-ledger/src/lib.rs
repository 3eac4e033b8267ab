//! Escrow transaction ledger for the Agora marketplace core.
//!
//! This crate models a two-phase purchase: funds are logically held when a
//! transaction is created, then released to the seller on completion or
//! refunded to the buyer on failure. It provides:
//!
//! - [`LedgerWriter`] / [`LedgerReader`] trait boundaries
//! - [`InMemoryLedger`] for tests and embedding
//! - [`FsLedger`] keeping the transaction log and escrow book as JSON
//!   documents on disk
//! - The [`PaymentVerifier`] collaborator seam with a demo
//!   [`MockPaymentVerifier`]
//!
//! The ledger stores content ids as plain back-references; it never reaches
//! into the content store. `is_purchased` is the single authorization
//! primitive the download path relies on.

pub mod error;
pub mod fs;
pub mod memory;
pub mod payment;
pub mod traits;

pub use error::LedgerError;
pub use fs::{FsLedger, FsLedgerConfig};
pub use memory::InMemoryLedger;
pub use payment::{MockPaymentVerifier, PaymentVerifier};
pub use traits::{LedgerReader, LedgerStats, LedgerWriter};
