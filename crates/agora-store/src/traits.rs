use serde::{Deserialize, Serialize};
use serde_json::Value;

use agora_types::ContentId;

use crate::error::{StoreError, StoreResult};

/// Open metadata record attached to a stored blob.
///
/// Callers supply arbitrary string-keyed JSON values; the store extends
/// the record with `cid`, `file_size`, and `stored_at` on write.
pub type Metadata = serde_json::Map<String, Value>;

/// Aggregate storage statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    /// Number of stored objects.
    pub object_count: u64,
    /// Total blob bytes across all objects.
    pub total_bytes: u64,
}

/// Content-addressed dataset store.
///
/// All implementations must satisfy these invariants:
/// - `store` computes the id as the SHA-256 digest of the blob's exact
///   bytes; identical bytes always collapse to one id (implicit dedup).
/// - Blobs are immutable once written. Metadata is replaced wholesale on
///   re-store, never patched.
/// - A reader never observes metadata without a retrievable blob: the
///   blob write happens before the metadata write.
/// - Reads report a missing id as `Ok(None)`, never as an error.
/// - All I/O errors are propagated, never silently ignored.
pub trait ContentStore: Send + Sync {
    /// Store a blob with its metadata and return the content id.
    ///
    /// Idempotent: storing the same bytes twice yields the same id and
    /// refreshes the metadata record in place.
    fn store(&self, blob: &[u8], metadata: Metadata) -> StoreResult<ContentId>;

    /// Read a blob by id. Returns `Ok(None)` if the object does not exist.
    fn retrieve(&self, id: &ContentId) -> StoreResult<Option<Vec<u8>>>;

    /// Read the metadata record for an id.
    fn metadata(&self, id: &ContentId) -> StoreResult<Option<Metadata>>;

    /// Check whether a blob is retrievable for the given id.
    fn exists(&self, id: &ContentId) -> StoreResult<bool>;

    /// All stored ids, derived from the metadata index (never reads blobs).
    fn list_ids(&self) -> StoreResult<Vec<ContentId>>;

    /// Remove blob and metadata. Returns `true` if anything was removed.
    ///
    /// The store does not know about the ledger; callers that must not
    /// orphan completed purchases consult the ledger before deleting.
    fn delete(&self, id: &ContentId) -> StoreResult<bool>;

    /// Recompute the stored blob's digest and compare it to the id.
    ///
    /// Detects out-of-band corruption. Returns `Ok(false)` for a missing
    /// or corrupted blob; the store never auto-repairs.
    fn verify_integrity(&self, id: &ContentId) -> StoreResult<bool>;

    /// Aggregate object count and byte totals.
    fn stats(&self) -> StoreResult<StorageStats>;

    /// Like [`retrieve`](ContentStore::retrieve), but surfaces a missing
    /// object as [`StoreError::NotFound`] for callers that treat the miss
    /// as an error.
    fn retrieve_required(&self, id: &ContentId) -> StoreResult<Vec<u8>> {
        self.retrieve(id)?.ok_or(StoreError::NotFound(*id))
    }
}

/// Merge the store-owned fields into a caller-supplied metadata record.
pub(crate) fn enrich_metadata(mut metadata: Metadata, id: &ContentId, blob_len: usize) -> Metadata {
    metadata.insert("cid".to_string(), Value::String(id.to_hex()));
    metadata.insert("file_size".to_string(), Value::from(blob_len as u64));
    metadata.insert(
        "stored_at".to_string(),
        Value::String(chrono::Utc::now().to_rfc3339()),
    );
    metadata
}
