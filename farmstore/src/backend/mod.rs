// Persistence backends - where the single document lives

mod file;
mod sqlite;

pub use file::FileBackend;
pub use sqlite::SqliteBackend;

use crate::document::Document;
use crate::error::Result;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Durable storage for one document.
///
/// `save` must be atomic: after a crash, `load` returns either the previous
/// document or the new one, never a mix. Backends do no validation, merging
/// or versioning; that is the store's job.
pub trait Backend: Send {
    /// Short name for logs and status output.
    fn name(&self) -> &'static str;

    /// Load the persisted document, or `None` if nothing was ever written.
    /// Unparseable content is `CorruptState`.
    fn load(&self) -> Result<Option<Document>>;

    /// Overwrite the persisted document in full.
    fn save(&self, doc: &Document) -> Result<()>;
}

/// In-memory backend. Clones share the same slot, so a test can keep a
/// handle and inspect or sabotage what the store persisted.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    slot: Arc<Mutex<Option<String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with raw persisted content, which need not be valid JSON.
    pub fn with_raw(raw: &str) -> Self {
        let backend = Self::new();
        *backend.lock() = Some(raw.to_string());
        backend
    }

    /// Make every subsequent `save` fail with an I/O error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// The raw persisted content.
    pub fn raw(&self) -> Option<String> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        // The slot holds plain data; a poisoned lock still holds a whole value.
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn load(&self) -> Result<Option<Document>> {
        match self.lock().as_deref() {
            Some(raw) => Ok(Some(Document::from_json(raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, doc: &Document) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "simulated write failure").into());
        }
        let json = doc.to_json(false)?;
        *self.lock() = Some(json);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FarmStoreError;

    #[test]
    fn test_memory_backend_round_trip() {
        let backend = MemoryBackend::new();
        assert!(backend.load().unwrap().is_none());

        let doc = Document::bootstrap();
        backend.save(&doc).unwrap();
        assert_eq!(backend.load().unwrap(), Some(doc));
    }

    #[test]
    fn test_memory_backend_clones_share_state() {
        let backend = MemoryBackend::new();
        let handle = backend.clone();
        backend.save(&Document::bootstrap()).unwrap();
        assert!(handle.raw().is_some());
    }

    #[test]
    fn test_memory_backend_simulated_failure() {
        let backend = MemoryBackend::new();
        backend.set_fail_writes(true);
        let err = backend.save(&Document::bootstrap()).unwrap_err();
        assert!(err.is_persistence());
        assert!(backend.raw().is_none());
    }

    #[test]
    fn test_memory_backend_corrupt_content() {
        let backend = MemoryBackend::with_raw("not json");
        assert!(matches!(
            backend.load(),
            Err(FarmStoreError::CorruptState(_))
        ));
    }
}
