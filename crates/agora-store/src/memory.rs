use std::collections::HashMap;
use std::sync::RwLock;

use agora_types::ContentId;

use crate::error::{StoreError, StoreResult};
use crate::traits::{enrich_metadata, ContentStore, Metadata, StorageStats};

#[derive(Clone)]
struct StoredEntry {
    blob: Vec<u8>,
    metadata: Metadata,
}

/// In-memory, HashMap-based content store.
///
/// Intended for tests and embedding. All entries are held in memory behind
/// a `RwLock` for safe concurrent access. Blobs are cloned on read.
pub struct InMemoryContentStore {
    entries: RwLock<HashMap<ContentId, StoredEntry>>,
}

impl InMemoryContentStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }

    /// Remove all objects from the store.
    pub fn clear(&self) {
        self.entries.write().expect("lock poisoned").clear();
    }

    /// Corrupt a stored blob in place, bypassing content addressing.
    ///
    /// Simulates out-of-band damage for `verify_integrity` tests.
    #[cfg(test)]
    pub(crate) fn corrupt_blob(&self, id: &ContentId, bytes: &[u8]) {
        let mut map = self.entries.write().expect("lock poisoned");
        if let Some(entry) = map.get_mut(id) {
            entry.blob = bytes.to_vec();
        }
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore for InMemoryContentStore {
    fn store(&self, blob: &[u8], metadata: Metadata) -> StoreResult<ContentId> {
        let id = ContentId::from_blob(blob);
        let metadata = enrich_metadata(metadata, &id, blob.len());
        let mut map = self.entries.write().expect("lock poisoned");
        // Idempotent on content: the blob for an existing id is identical
        // by construction, so only the metadata record is refreshed.
        match map.get_mut(&id) {
            Some(entry) => entry.metadata = metadata,
            None => {
                map.insert(
                    id,
                    StoredEntry {
                        blob: blob.to_vec(),
                        metadata,
                    },
                );
            }
        }
        Ok(id)
    }

    fn retrieve(&self, id: &ContentId) -> StoreResult<Option<Vec<u8>>> {
        let map = self.entries.read().expect("lock poisoned");
        Ok(map.get(id).map(|entry| entry.blob.clone()))
    }

    fn metadata(&self, id: &ContentId) -> StoreResult<Option<Metadata>> {
        let map = self.entries.read().expect("lock poisoned");
        Ok(map.get(id).map(|entry| entry.metadata.clone()))
    }

    fn exists(&self, id: &ContentId) -> StoreResult<bool> {
        let map = self.entries.read().expect("lock poisoned");
        Ok(map.contains_key(id))
    }

    fn list_ids(&self) -> StoreResult<Vec<ContentId>> {
        let map = self.entries.read().expect("lock poisoned");
        let mut ids: Vec<ContentId> = map.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    fn delete(&self, id: &ContentId) -> StoreResult<bool> {
        let mut map = self.entries.write().expect("lock poisoned");
        Ok(map.remove(id).is_some())
    }

    fn verify_integrity(&self, id: &ContentId) -> StoreResult<bool> {
        let map = self.entries.read().expect("lock poisoned");
        Ok(map
            .get(id)
            .is_some_and(|entry| ContentId::from_blob(&entry.blob) == *id))
    }

    fn stats(&self) -> StoreResult<StorageStats> {
        let map = self.entries.read().expect("lock poisoned");
        Ok(StorageStats {
            object_count: map.len() as u64,
            total_bytes: map.values().map(|entry| entry.blob.len() as u64).sum(),
        })
    }
}

impl std::fmt::Debug for InMemoryContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContentStore")
            .field("object_count", &self.len())
            .finish()
    }
}
