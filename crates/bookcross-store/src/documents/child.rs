//! Child node repository
//!
//! Children are physically embedded inside their root document, so every
//! mutation here is a whole-root rewrite: load the root, edit the
//! embedded sequence, write the root back under the loaded version.

use std::sync::Arc;

use crate::documents::{ChildNode, DocumentStore, RootDocument, RootRepository};
use crate::error::StoreResult;

/// CRUD over nested child nodes addressed by `(root_id, child_id)`
///
/// Removing the last child leaves the root in place with an empty child
/// sequence; whether an empty root should then be deleted is the caller's
/// policy, not this repository's.
pub struct ChildRepository<R: RootDocument> {
    roots: RootRepository<R>,
}

impl<R: RootDocument> Clone for ChildRepository<R> {
    fn clone(&self) -> Self {
        Self {
            roots: self.roots.clone(),
        }
    }
}

impl<R: RootDocument> ChildRepository<R> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            roots: RootRepository::new(store),
        }
    }

    /// Fetch a child by `(root_id, child_id)`
    ///
    /// Resolved by loading the root and scanning its embedded sequence;
    /// `None` when either id does not resolve.
    pub async fn get_by_id(&self, root_id: i64, child_id: i64) -> StoreResult<Option<R::Child>> {
        let Some(root) = self.roots.get_by_id(root_id).await? else {
            return Ok(None);
        };
        Ok(root.children().iter().find(|c| c.id() == child_id).cloned())
    }

    /// Append a child to the root's sequence and rewrite the root
    ///
    /// Returns `false` without writing when the root does not resolve.
    pub async fn add(&self, root_id: i64, child: R::Child) -> StoreResult<bool> {
        let Some(mut root) = self.roots.get_by_id(root_id).await? else {
            return Ok(false);
        };
        root.children_mut().push(child);
        self.rewrite(&mut root).await?;
        Ok(true)
    }

    /// Replace the child with a matching id and rewrite the root
    ///
    /// Returns `false` when the root or the child id does not resolve.
    pub async fn update(&self, root_id: i64, child: R::Child) -> StoreResult<bool> {
        let Some(mut root) = self.roots.get_by_id(root_id).await? else {
            return Ok(false);
        };
        let Some(slot) = root
            .children_mut()
            .iter_mut()
            .find(|c| c.id() == child.id())
        else {
            return Ok(false);
        };
        *slot = child;
        self.rewrite(&mut root).await?;
        Ok(true)
    }

    /// Remove the child with a matching id and rewrite the root
    ///
    /// Removing an already-removed child id is a no-op (`false`), never an
    /// error.
    pub async fn remove(&self, root_id: i64, child_id: i64) -> StoreResult<bool> {
        let Some(mut root) = self.roots.get_by_id(root_id).await? else {
            return Ok(false);
        };
        let before = root.children().len();
        root.children_mut().retain(|c| c.id() != child_id);
        if root.children().len() == before {
            return Ok(false);
        }
        self.rewrite(&mut root).await?;
        Ok(true)
    }

    /// Whole-root rewrite under the version the root was loaded with
    async fn rewrite(&self, root: &mut R) -> StoreResult<()> {
        let body = serde_json::to_value(&*root)?;
        let version = self
            .roots
            .store()
            .put(R::COLLECTION, root.id(), body, Some(root.version()))
            .await?;
        root.set_version(version);
        Ok(())
    }
}
