//! Document store abstraction for hierarchically nested data
//!
//! Comment threads are stored as whole documents: a root document embeds
//! its child nodes inline, and a child is only addressable through its
//! root. Every child mutation loads the root, edits the embedded
//! sequence, and rewrites the whole document back.
//!
//! # Concurrency
//!
//! A single document write is atomic; two concurrent rewrites of the same
//! root are not isolated from each other. Each rewrite carries the
//! version the root had when it was loaded, and the store rejects a
//! rewrite whose expected version no longer matches, surfaced as
//! `PersistenceError::ConcurrencyConflict`. Retrying the whole rewrite is
//! safe: given the same input image it is idempotent.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::StoreResult;

mod child;
mod root;

pub use child::ChildRepository;
pub use root::RootRepository;

/// A record embedded inside exactly one root document
///
/// Children have no storage location of their own; they exist only inside
/// their root's embedded sequence and are addressed by `(root_id, id)`.
pub trait ChildNode: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn id(&self) -> i64;
}

/// A top-level document with embedded children
///
/// The id mirrors a relational entity (a book's comment thread carries the
/// book's id). The version participates in the compare-and-swap rewrite;
/// implementors store it as a plain field the repositories maintain.
pub trait RootDocument: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection the documents of this type live in
    const COLLECTION: &'static str;

    type Child: ChildNode;

    fn id(&self) -> i64;

    fn version(&self) -> i64;

    fn set_version(&mut self, version: i64);

    fn children(&self) -> &[Self::Child];

    fn children_mut(&mut self) -> &mut Vec<Self::Child>;
}

/// A document as the store holds it: opaque body plus current version
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub body: serde_json::Value,
    pub version: i64,
}

/// Keyed document collection boundary
///
/// The minimal surface the document repositories require: get-by-id,
/// whole-document write, delete-by-id. No partial-document primitive.
/// Implementations: [`PgDocumentStore`](crate::backends::PgDocumentStore)
/// over a JSONB collection table,
/// [`MemoryDocumentStore`](crate::backends::MemoryDocumentStore) for
/// tests.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document; `None` when the id does not resolve
    async fn get(&self, collection: &str, id: i64) -> StoreResult<Option<StoredDocument>>;

    /// Write a whole document, returning its new version
    ///
    /// `expected_version` of `Some(0)` inserts only if the id is absent;
    /// `Some(v)` replaces only while the stored version is still `v`,
    /// failing with `ConcurrencyConflict` otherwise; `None` upserts
    /// unconditionally (last writer wins).
    async fn put(
        &self,
        collection: &str,
        id: i64,
        body: serde_json::Value,
        expected_version: Option<i64>,
    ) -> StoreResult<i64>;

    /// Delete a document; `false` when the id did not resolve
    async fn delete(&self, collection: &str, id: i64) -> StoreResult<bool>;
}
