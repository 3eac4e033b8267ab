//! Content-addressed dataset storage for the Agora marketplace core.
//!
//! This crate implements a hash-keyed blob store standing in for a
//! distributed object store. Every dataset is stored as an immutable blob
//! identified by the SHA-256 digest of its bytes, with an open JSON
//! metadata record attached.
//!
//! # Storage Backends
//!
//! All backends implement the [`ContentStore`] trait:
//!
//! - [`InMemoryContentStore`] — `HashMap`-based store for tests and embedding
//! - [`FsContentStore`] — file-per-object store (`blobs/<id>.bin`,
//!   `meta/<id>.json`) under a configured root
//!
//! # Design Rules
//!
//! 1. Blobs are immutable once written (content addressing guarantees this).
//! 2. `store` is idempotent: the same bytes always yield the same id and
//!    never duplicate storage; metadata is refreshed by full replacement.
//! 3. The blob is written before its metadata, so a reader never observes
//!    metadata whose blob is not retrievable. An orphaned blob after a
//!    failed metadata write is harmless and left in place.
//! 4. The store never interprets blob contents or validates metadata
//!    semantics; it only persists what it is handed.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::{FsContentStore, FsStoreConfig};
pub use memory::InMemoryContentStore;
pub use traits::{ContentStore, Metadata, StorageStats};
