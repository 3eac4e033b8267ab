use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use agora_persist::{ensure_dir, read_json, write_bytes_atomic, write_json_atomic};
use agora_types::ContentId;

use crate::error::StoreResult;
use crate::traits::{enrich_metadata, ContentStore, Metadata, StorageStats};

/// Configuration for the filesystem content store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FsStoreConfig {
    /// Root directory; blobs and metadata live in subdirectories below it.
    pub root: PathBuf,
}

impl Default for FsStoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./storage"),
        }
    }
}

/// File-per-object content store.
///
/// Layout under the configured root:
///
/// ```text
/// <root>/blobs/<hex-id>.bin   raw blob bytes
/// <root>/meta/<hex-id>.json   metadata record
/// ```
///
/// Writes go blob-first, each through an atomic temp-file-and-rename, so a
/// reader never sees a metadata record whose blob is missing and never sees
/// a torn file. No store-level lock is needed: blob content for a given id
/// is invariant, and racing metadata writes resolve last-writer-wins at the
/// rename.
pub struct FsContentStore {
    blobs_dir: PathBuf,
    meta_dir: PathBuf,
}

impl FsContentStore {
    /// Open (or create) a store under the configured root.
    pub fn open(config: &FsStoreConfig) -> StoreResult<Self> {
        let blobs_dir = config.root.join("blobs");
        let meta_dir = config.root.join("meta");
        ensure_dir(&blobs_dir)?;
        ensure_dir(&meta_dir)?;
        Ok(Self {
            blobs_dir,
            meta_dir,
        })
    }

    fn blob_path(&self, id: &ContentId) -> PathBuf {
        self.blobs_dir.join(format!("{}.bin", id.to_hex()))
    }

    fn meta_path(&self, id: &ContentId) -> PathBuf {
        self.meta_dir.join(format!("{}.json", id.to_hex()))
    }
}

fn read_optional(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn remove_optional(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

impl ContentStore for FsContentStore {
    fn store(&self, blob: &[u8], metadata: Metadata) -> StoreResult<ContentId> {
        let id = ContentId::from_blob(blob);

        // Blob first. If the metadata write below fails, the orphaned blob
        // is harmless; metadata pointing at a missing blob would not be.
        write_bytes_atomic(&self.blob_path(&id), blob)?;

        let metadata = enrich_metadata(metadata, &id, blob.len());
        write_json_atomic(&self.meta_path(&id), &metadata)?;

        debug!(id = %id.short_hex(), bytes = blob.len(), "stored object");
        Ok(id)
    }

    fn retrieve(&self, id: &ContentId) -> StoreResult<Option<Vec<u8>>> {
        Ok(read_optional(&self.blob_path(id))?)
    }

    fn metadata(&self, id: &ContentId) -> StoreResult<Option<Metadata>> {
        Ok(read_json(&self.meta_path(id))?)
    }

    fn exists(&self, id: &ContentId) -> StoreResult<bool> {
        Ok(self.blob_path(id).is_file())
    }

    fn list_ids(&self) -> StoreResult<Vec<ContentId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.meta_dir)? {
            let path = entry?.path();
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match ContentId::from_hex(stem) {
                Ok(id) => ids.push(id),
                Err(_) => {
                    warn!(file = %path.display(), "skipping foreign file in metadata directory");
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn delete(&self, id: &ContentId) -> StoreResult<bool> {
        // Metadata first, so a crash mid-delete cannot leave a metadata
        // record without a retrievable blob.
        let meta_removed = remove_optional(&self.meta_path(id))?;
        let blob_removed = remove_optional(&self.blob_path(id))?;
        let removed = meta_removed || blob_removed;
        if removed {
            debug!(id = %id.short_hex(), "deleted object");
        }
        Ok(removed)
    }

    fn verify_integrity(&self, id: &ContentId) -> StoreResult<bool> {
        let Some(blob) = self.retrieve(id)? else {
            return Ok(false);
        };
        let ok = ContentId::from_blob(&blob) == *id;
        if !ok {
            warn!(id = %id.short_hex(), "integrity check failed: digest mismatch");
        }
        Ok(ok)
    }

    fn stats(&self) -> StoreResult<StorageStats> {
        let mut stats = StorageStats::default();
        for entry in fs::read_dir(&self.blobs_dir)? {
            let entry = entry?;
            if entry.path().extension().and_then(|e| e.to_str()) != Some("bin") {
                continue;
            }
            stats.object_count += 1;
            stats.total_bytes += entry.metadata()?.len();
        }
        Ok(stats)
    }
}

impl std::fmt::Debug for FsContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsContentStore")
            .field("blobs_dir", &self.blobs_dir)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn open_temp() -> (tempfile::TempDir, FsContentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::open(&FsStoreConfig {
            root: dir.path().to_path_buf(),
        })
        .unwrap();
        (dir, store)
    }

    fn titled(title: &str) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("title".to_string(), Value::String(title.into()));
        metadata
    }

    #[test]
    fn store_and_retrieve_roundtrip() {
        let (_dir, store) = open_temp();
        let id = store.store(b"a,b\n1,2\n", titled("t")).unwrap();
        assert_eq!(id, ContentId::from_blob(b"a,b\n1,2\n"));

        let blob = store.retrieve(&id).unwrap().expect("should exist");
        assert_eq!(blob, b"a,b\n1,2\n");

        let metadata = store.metadata(&id).unwrap().unwrap();
        assert_eq!(metadata["file_size"], 8);
        assert_eq!(metadata["title"], "t");
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = FsStoreConfig {
            root: dir.path().to_path_buf(),
        };

        let id = {
            let store = FsContentStore::open(&config).unwrap();
            store.store(b"durable", titled("keep")).unwrap()
        };

        let store = FsContentStore::open(&config).unwrap();
        assert_eq!(store.retrieve(&id).unwrap().unwrap(), b"durable");
        assert_eq!(store.metadata(&id).unwrap().unwrap()["title"], "keep");
        assert_eq!(store.list_ids().unwrap(), vec![id]);
    }

    #[test]
    fn restore_is_idempotent_and_refreshes_metadata() {
        let (_dir, store) = open_temp();
        let id1 = store.store(b"same bytes", titled("first")).unwrap();
        let id2 = store.store(b"same bytes", titled("second")).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.stats().unwrap().object_count, 1);
        assert_eq!(store.metadata(&id1).unwrap().unwrap()["title"], "second");
    }

    #[test]
    fn delete_removes_both_files() {
        let (_dir, store) = open_temp();
        let id = store.store(b"doomed", Metadata::new()).unwrap();
        assert!(store.delete(&id).unwrap());
        assert!(store.retrieve(&id).unwrap().is_none());
        assert!(store.metadata(&id).unwrap().is_none());
        assert!(!store.delete(&id).unwrap());
    }

    #[test]
    fn verify_integrity_detects_disk_corruption() {
        let (_dir, store) = open_temp();
        let id = store.store(b"pristine", Metadata::new()).unwrap();
        assert!(store.verify_integrity(&id).unwrap());

        // Damage the blob file behind the store's back.
        fs::write(store.blob_path(&id), b"tampered").unwrap();
        assert!(!store.verify_integrity(&id).unwrap());
    }

    #[test]
    fn verify_integrity_missing_is_false() {
        let (_dir, store) = open_temp();
        assert!(!store
            .verify_integrity(&ContentId::from_blob(b"absent"))
            .unwrap());
    }

    #[test]
    fn list_ids_skips_foreign_files() {
        let (dir, store) = open_temp();
        let id = store.store(b"real", Metadata::new()).unwrap();
        fs::write(dir.path().join("meta/readme.txt"), b"not an object").unwrap();
        assert_eq!(store.list_ids().unwrap(), vec![id]);
    }

    #[test]
    fn stats_counts_blob_bytes() {
        let (_dir, store) = open_temp();
        store.store(b"12345", Metadata::new()).unwrap();
        store.store(b"123456789", Metadata::new()).unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.object_count, 2);
        assert_eq!(stats.total_bytes, 14);
    }

    #[test]
    fn concurrent_stores_for_same_bytes_converge() {
        use std::sync::Arc;
        use std::thread;

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            FsContentStore::open(&FsStoreConfig {
                root: dir.path().to_path_buf(),
            })
            .unwrap(),
        );

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.store(b"contended", titled("race")).unwrap())
            })
            .collect();

        let mut ids: Vec<ContentId> = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .collect();
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert!(store.verify_integrity(&ids[0]).unwrap());
        assert_eq!(store.stats().unwrap().object_count, 1);
    }
}
