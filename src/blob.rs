//! In-memory blobs addressed by revocable object URLs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use sha2::{Digest, Sha256};

const URL_PREFIX: &str = "blob:codepicture/";

/// Immutable binary resource with a mime type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    mime: String,
    data: Arc<[u8]>,
}

impl Blob {
    pub fn new(mime: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            mime: mime.into(),
            data: data.into(),
        }
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Hex SHA-256 of the contents
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(&self.data))
    }
}

/// Handle to a blob registered in a [`BlobStore`].
///
/// Valid until passed to [`BlobStore::revoke`]; whoever created it must
/// revoke it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Default)]
struct StoreInner {
    next_id: u64,
    entries: HashMap<String, Blob>,
}

/// Registry of live object URLs. Cloning shares the registry.
#[derive(Clone, Default)]
pub struct BlobStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn create_object_url(&self, blob: Blob) -> ObjectUrl {
        let mut inner = self.lock();
        inner.next_id += 1;
        let url = format!("{}{}-{}", URL_PREFIX, inner.next_id, &blob.digest()[..12]);
        log::debug!("created {} ({} bytes, {})", url, blob.len(), blob.mime());
        inner.entries.insert(url.clone(), blob);
        ObjectUrl(url)
    }

    /// The blob behind `url`, if it has not been revoked
    pub fn resolve(&self, url: &ObjectUrl) -> Option<Blob> {
        self.lock().entries.get(&url.0).cloned()
    }

    /// Release `url`. Returns false if it was already revoked.
    pub fn revoke(&self, url: &ObjectUrl) -> bool {
        let removed = self.lock().entries.remove(&url.0).is_some();
        if removed {
            log::debug!("revoked {}", url);
        }
        removed
    }

    /// Number of live object URLs
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStore").field("live", &self.len()).finish()
    }
}
