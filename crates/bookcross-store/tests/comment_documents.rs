//! Comment-thread document repositories over the in-memory store.

use std::sync::Arc;

use chrono::Utc;

use bookcross_store::models::{BookChildComment, BookRootComment};
use bookcross_store::{
    ChildRepository, DocumentStore, MemoryDocumentStore, PersistenceError, RootRepository,
};

fn reply(id: i64, text: &str) -> BookChildComment {
    BookChildComment {
        id,
        owner_id: 10,
        text: text.into(),
        date: Utc::now(),
    }
}

fn repositories() -> (
    RootRepository<BookRootComment>,
    ChildRepository<BookRootComment>,
) {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
    (
        RootRepository::new(Arc::clone(&store)),
        ChildRepository::new(store),
    )
}

#[tokio::test]
async fn test_child_round_trips_inside_its_root() {
    let (roots, children) = repositories();

    let mut root = BookRootComment::new(1, 7, 10, "Great read");
    roots.add(&mut root).await.unwrap();

    assert!(children.add(1, reply(100, "Agreed")).await.unwrap());

    let fetched = children.get_by_id(1, 100).await.unwrap().unwrap();
    assert_eq!(fetched.text, "Agreed");

    let reloaded = roots.get_by_id(1).await.unwrap().unwrap();
    assert_eq!(reloaded.text, "Great read");
    assert_eq!(reloaded.comments.len(), 1);
}

#[tokio::test]
async fn test_removing_the_last_child_keeps_the_root() {
    let (roots, children) = repositories();

    let mut root = BookRootComment::new(1, 7, 10, "Great read");
    root.comments.push(reply(100, "Agreed"));
    roots.add(&mut root).await.unwrap();

    assert!(children.remove(1, 100).await.unwrap());

    let reloaded = roots.get_by_id(1).await.unwrap().unwrap();
    assert!(reloaded.comments.is_empty());
}

#[tokio::test]
async fn test_removing_an_absent_child_is_a_no_op() {
    let (roots, children) = repositories();

    let mut root = BookRootComment::new(1, 7, 10, "Great read");
    roots.add(&mut root).await.unwrap();

    assert!(!children.remove(1, 100).await.unwrap());
    assert!(!children.remove(99, 100).await.unwrap());
}

#[tokio::test]
async fn test_updating_a_child_replaces_it_in_place() {
    let (roots, children) = repositories();

    let mut root = BookRootComment::new(1, 7, 10, "Great read");
    root.comments.push(reply(100, "Agreed"));
    root.comments.push(reply(101, "Not sure"));
    roots.add(&mut root).await.unwrap();

    assert!(children.update(1, reply(101, "Changed my mind")).await.unwrap());
    assert!(!children.update(1, reply(500, "Orphan")).await.unwrap());

    let reloaded = roots.get_by_id(1).await.unwrap().unwrap();
    assert_eq!(reloaded.comments.len(), 2);
    assert_eq!(reloaded.comments[1].text, "Changed my mind");
}

#[tokio::test]
async fn test_stale_root_rewrite_is_rejected() {
    let (roots, children) = repositories();

    let mut root = BookRootComment::new(1, 7, 10, "Great read");
    roots.add(&mut root).await.unwrap();

    // A second loaded copy goes stale once the first one writes.
    let mut stale = roots.get_by_id(1).await.unwrap().unwrap();
    assert!(children.add(1, reply(100, "Agreed")).await.unwrap());

    stale.text = "Edited from a stale copy".into();
    let err = roots.update(&mut stale).await.unwrap_err();
    assert!(matches!(err, PersistenceError::ConcurrencyConflict(_)));

    let reloaded = roots.get_by_id(1).await.unwrap().unwrap();
    assert_eq!(reloaded.text, "Great read");
    assert_eq!(reloaded.comments.len(), 1);
}

#[tokio::test]
async fn test_removing_the_root_removes_its_children() {
    let (roots, children) = repositories();

    let mut root = BookRootComment::new(1, 7, 10, "Great read");
    root.comments.push(reply(100, "Agreed"));
    roots.add(&mut root).await.unwrap();

    assert!(roots.remove(1).await.unwrap());
    assert!(roots.get_by_id(1).await.unwrap().is_none());
    assert!(children.get_by_id(1, 100).await.unwrap().is_none());
    assert!(!roots.remove(1).await.unwrap());
}

#[tokio::test]
async fn test_duplicate_root_id_is_a_constraint_error() {
    let (roots, _children) = repositories();

    let mut root = BookRootComment::new(1, 7, 10, "Great read");
    roots.add(&mut root).await.unwrap();

    let mut duplicate = BookRootComment::new(1, 7, 11, "Also great");
    let err = roots.add(&mut duplicate).await.unwrap_err();
    assert!(matches!(err, PersistenceError::Constraint(_)));
}
