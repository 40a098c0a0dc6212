use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::error::{CoreError, ValidationError};
use crate::ports::ProfilesPort;
use quickroute_core::{ProfileCollection, ProfileUid};

/// Owner of the ordered profile collection and the `current` pointer.
///
/// Consumers only ever get snapshots.
pub struct ProfileStore {
    backend: Arc<dyn ProfilesPort>,
    collection: Mutex<ProfileCollection>,
    // Reorders queue behind each other so a rollback never clobbers a later move.
    reorder_lock: tokio::sync::Mutex<()>,
}

impl ProfileStore {
    pub fn new(backend: Arc<dyn ProfilesPort>) -> Self {
        Self::with_collection(backend, ProfileCollection::default())
    }

    pub fn with_collection(backend: Arc<dyn ProfilesPort>, collection: ProfileCollection) -> Self {
        let mut collection = collection;
        collection.normalize();
        Self {
            backend,
            collection: Mutex::new(collection),
            reorder_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn list(&self) -> ProfileCollection {
        self.lock().clone()
    }

    /// Current uid, `""` when nothing is active.
    pub fn current(&self) -> ProfileUid {
        self.lock().current_uid().to_string()
    }

    pub fn is_current(&self, uid: &str) -> bool {
        self.lock().is_current(uid)
    }

    /// Moves the pointer only. Returns `false` when `uid` is not in the collection.
    pub fn select(&self, uid: &str) -> bool {
        let mut c = self.lock();
        if !c.contains(uid) {
            return false;
        }
        c.current = Some(uid.to_string());
        true
    }

    /// Replaces the local collection with the backend's.
    pub async fn load(&self) -> Result<ProfileCollection, CoreError> {
        let mut fetched = self
            .backend
            .fetch_profiles()
            .await
            .map_err(CoreError::remote("fetch profiles"))?;
        fetched.normalize();
        debug!(
            count = fetched.items.len(),
            current = fetched.current_uid(),
            "profiles loaded"
        );
        *self.lock() = fetched.clone();
        Ok(fetched)
    }

    /// Moves `source` to `target`'s position and persists the new order.
    ///
    /// `Ok(false)` is a no-op (unknown or identical uids). On persistence
    /// failure only the move is undone: `source` goes back to its old index,
    /// and removals or reloads that landed meanwhile are kept.
    pub async fn reorder(&self, source: &str, target: &str) -> Result<bool, CoreError> {
        let _queued = self.reorder_lock.lock().await;

        let from = {
            let mut c = self.lock();
            let Some(from) = c.position(source) else {
                return Ok(false);
            };
            if !c.move_to(source, target) {
                return Ok(false);
            }
            from
        };

        match self.backend.persist_reorder(source, target).await {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!("reorder {source} -> {target} not persisted, rolling back: {e}");
                let mut c = self.lock();
                if let Some(at) = c.position(source) {
                    let item = c.items.remove(at);
                    let back = from.min(c.items.len());
                    c.items.insert(back, item);
                }
                Err(CoreError::remote("reorder profiles")(e))
            }
        }
    }

    /// Deletes a profile. Clears `current` when it pointed at it; reactivating a
    /// fallback is the caller's job.
    pub async fn remove(&self, uid: &str) -> Result<bool, CoreError> {
        if !self.lock().contains(uid) {
            return Err(ValidationError::UnknownProfile(uid.to_string()).into());
        }
        self.backend
            .delete_profile(uid)
            .await
            .map_err(CoreError::remote("delete profile"))?;
        let mut c = self.lock();
        let was_current = c.is_current(uid);
        c.remove(uid);
        Ok(was_current)
    }

    pub async fn import(&self, url: &str) -> Result<(), CoreError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ValidationError::EmptyUrl.into());
        }
        self.backend
            .import_profile(url)
            .await
            .map_err(CoreError::remote("import profile"))
    }

    fn lock(&self) -> MutexGuard<'_, ProfileCollection> {
        self.collection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
