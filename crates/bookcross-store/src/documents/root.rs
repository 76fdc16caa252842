//! Root document repository

use std::marker::PhantomData;
use std::sync::Arc;

use crate::documents::{DocumentStore, RootDocument};
use crate::error::StoreResult;

/// CRUD over top-level documents in a collection
///
/// Each operation is a single atomic document write, replace, or delete;
/// there are no partial-document semantics. `add` and `update` refresh the
/// version on the caller's instance so a subsequent rewrite carries the
/// right expectation.
pub struct RootRepository<R: RootDocument> {
    store: Arc<dyn DocumentStore>,
    _root: PhantomData<R>,
}

impl<R: RootDocument> Clone for RootRepository<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _root: PhantomData,
        }
    }
}

impl<R: RootDocument> RootRepository<R> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _root: PhantomData,
        }
    }

    pub(crate) fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Fetch a root document by id; `None` when it does not resolve
    pub async fn get_by_id(&self, id: i64) -> StoreResult<Option<R>> {
        let Some(stored) = self.store.get(R::COLLECTION, id).await? else {
            return Ok(None);
        };
        let mut root: R = serde_json::from_value(stored.body)?;
        root.set_version(stored.version);
        Ok(Some(root))
    }

    /// Insert a new root document
    ///
    /// Fails with a constraint error when the id already exists; the
    /// instance's version is set to the stored version on success.
    pub async fn add(&self, root: &mut R) -> StoreResult<()> {
        let body = serde_json::to_value(&*root)?;
        let version = self.store.put(R::COLLECTION, root.id(), body, Some(0)).await?;
        root.set_version(version);
        tracing::debug!(collection = R::COLLECTION, id = root.id(), "root document added");
        Ok(())
    }

    /// Replace the whole root document
    ///
    /// The rewrite is conditional on the version the instance was loaded
    /// with; a stale instance fails with `ConcurrencyConflict` and the
    /// caller decides whether to reload and retry.
    pub async fn update(&self, root: &mut R) -> StoreResult<()> {
        let body = serde_json::to_value(&*root)?;
        let version = self
            .store
            .put(R::COLLECTION, root.id(), body, Some(root.version()))
            .await?;
        root.set_version(version);
        Ok(())
    }

    /// Delete a root document and, with it, every embedded child
    ///
    /// Returns `false` when the id did not resolve.
    pub async fn remove(&self, id: i64) -> StoreResult<bool> {
        let removed = self.store.delete(R::COLLECTION, id).await?;
        if removed {
            tracing::debug!(collection = R::COLLECTION, id, "root document removed");
        }
        Ok(removed)
    }
}
