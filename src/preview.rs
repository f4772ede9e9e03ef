use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Opaque handle to preview bytes held by a [`PreviewStore`]. Stale ids
/// resolve to nothing; they are never reused.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PreviewId(Uuid);

impl PreviewId {
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl std::fmt::Display for PreviewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub struct PreviewData {
    pub bytes: Arc<Vec<u8>>,
    pub mime: String,
}

// Registry of live preview handles. Acquisition and release are explicit:
// the composer holds at most one handle, the conversation holds one per sent
// image bubble and releases them all at teardown. Nothing here is dropped
// implicitly.
#[derive(Default)]
pub struct PreviewStore {
    entries: DashMap<PreviewId, PreviewData>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers preview bytes and returns the handle that owns them.
    pub fn create(&self, bytes: Arc<Vec<u8>>, mime: impl Into<String>) -> PreviewId {
        let id = PreviewId(Uuid::new_v4());
        self.entries.insert(
            id,
            PreviewData {
                bytes,
                mime: mime.into(),
            },
        );
        log::debug!("Preview handle {} created", id);
        id
    }

    /// Releases a handle. Returns false if it was already revoked, which is
    /// harmless: revocation is idempotent.
    pub fn revoke(&self, id: PreviewId) -> bool {
        let removed = self.entries.remove(&id).is_some();
        if removed {
            log::debug!("Preview handle {} revoked", id);
        }
        removed
    }

    /// Resolves a handle to its bytes, for thumbnail rendering.
    pub fn resolve(&self, id: PreviewId) -> Option<PreviewData> {
        self.entries.get(&id).map(|entry| entry.value().clone())
    }

    pub fn live_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_resolve_revoke_cycle() {
        let store = PreviewStore::new();
        let id = store.create(Arc::new(vec![1, 2, 3]), "image/png");
        assert_eq!(store.live_count(), 1);

        let data = store.resolve(id).expect("handle should resolve");
        assert_eq!(*data.bytes, vec![1, 2, 3]);
        assert_eq!(data.mime, "image/png");

        assert!(store.revoke(id));
        assert_eq!(store.live_count(), 0);
        assert!(store.resolve(id).is_none());
    }

    #[test]
    fn revoke_is_idempotent() {
        let store = PreviewStore::new();
        let id = store.create(Arc::new(vec![0]), "image/gif");
        assert!(store.revoke(id));
        assert!(!store.revoke(id));
    }
}
