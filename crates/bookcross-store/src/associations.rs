//! Replace-all update protocol for many-to-many associations
//!
//! Join tables expose no generic "diff" operation, so an aggregate update
//! never computes an add/remove delta: inside one transaction it deletes
//! every existing association row of each included kind, flushes, inserts
//! the full new set, updates the aggregate's own columns, and flushes
//! again. Simpler, fewer edge cases, correct at the cost of rewriting
//! unchanged links.
//!
//! A kind the payload omits is left untouched; a kind present with an
//! empty id set clears all links of that kind. Nothing is caught here:
//! any failure rolls the transaction back and propagates, so a partial
//! replacement is never observable.

use crate::entity::{Entity, SqlValue};
use crate::error::StoreResult;
use crate::query::{Comparison, Filter};
use crate::repository::Repository;
use crate::uow::{StagedWrite, UnitOfWork};

/// Static descriptor of one association kind owned by an aggregate
///
/// e.g. for a book's authors: `table = "book_author"`,
/// `owner_column = "book_id"`, `related_column = "author_id"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociationKind {
    pub table: &'static str,
    pub owner_column: &'static str,
    pub related_column: &'static str,
}

/// An entity owning many-to-many association rows
pub trait Aggregate: Entity {
    /// Integer primary key of the aggregate
    fn id(&self) -> i64;

    /// Every association kind this aggregate type owns
    fn association_kinds() -> &'static [AssociationKind];

    /// Related ids carried by this instance for `kind`
    ///
    /// `None` means the kind is absent from the payload and must be left
    /// unchanged; `Some(vec![])` means the payload clears the kind.
    fn association_ids(&self, kind: &AssociationKind) -> Option<Vec<i64>>;
}

/// Update an aggregate and replace its association rows atomically
///
/// Returns `Ok(false)` without side effects when the aggregate id does
/// not exist; `Ok(true)` when the update affected rows. Every failure
/// before commit leaves the store in its pre-update state.
pub async fn update_aggregate<A, U>(uow: &mut U, aggregate: &A) -> StoreResult<bool>
where
    A: Aggregate,
    U: UnitOfWork + ?Sized,
{
    uow.begin().await?;
    match replace_associations(uow, aggregate).await {
        Ok(Some(affected)) => {
            uow.commit().await?;
            tracing::debug!(table = A::TABLE, id = aggregate.id(), affected, "aggregate updated");
            Ok(affected > 0)
        }
        Ok(None) => {
            uow.rollback().await?;
            tracing::debug!(table = A::TABLE, id = aggregate.id(), "aggregate not found");
            Ok(false)
        }
        Err(err) => {
            if let Err(rollback_err) = uow.rollback().await {
                tracing::warn!(error = %rollback_err, "rollback after failed aggregate update");
            }
            Err(err)
        }
    }
}

/// Remove an aggregate together with all of its association rows
///
/// Returns whether anything was deleted. Unlike the update protocol this
/// deletes every kind the aggregate type owns, regardless of what the
/// instance carries.
pub async fn remove_aggregate<A, U>(uow: &mut U, aggregate: &A) -> StoreResult<bool>
where
    A: Aggregate,
    U: UnitOfWork + ?Sized,
{
    for kind in A::association_kinds() {
        uow.stage(StagedWrite::DeleteWhere {
            table: kind.table,
            filters: vec![owner_filter(kind, aggregate.id())],
        });
    }
    Repository::<A>::new().remove(uow, aggregate);
    let affected = uow.save_changes().await?;
    Ok(affected > 0)
}

/// The transactional body: existence check, delete, flush, reinsert,
/// update, flush. `None` means the aggregate id did not resolve.
async fn replace_associations<A, U>(uow: &mut U, aggregate: &A) -> StoreResult<Option<u64>>
where
    A: Aggregate,
    U: UnitOfWork + ?Sized,
{
    let repo = Repository::<A>::new();

    let exists = repo
        .exists(
            uow,
            repo.query()
                .filter(A::ID_COLUMN, Comparison::Eq, SqlValue::Int(aggregate.id())),
        )
        .await?;
    if !exists {
        return Ok(None);
    }

    let included: Vec<(&AssociationKind, Vec<i64>)> = A::association_kinds()
        .iter()
        .filter_map(|kind| aggregate.association_ids(kind).map(|ids| (kind, ids)))
        .collect();

    for (kind, _) in &included {
        uow.stage(StagedWrite::DeleteWhere {
            table: kind.table,
            filters: vec![owner_filter(kind, aggregate.id())],
        });
    }
    // Deletions must hit the store before the reinsert, or the new rows
    // would be wiped by their own kind's delete.
    uow.save_changes().await?;

    for (kind, ids) in &included {
        for related_id in ids {
            uow.stage(StagedWrite::Insert {
                table: kind.table,
                columns: vec![kind.owner_column, kind.related_column],
                values: vec![SqlValue::Int(aggregate.id()), SqlValue::Int(*related_id)],
            });
        }
    }
    repo.update(uow, aggregate);

    let affected = uow.save_changes().await?;
    Ok(Some(affected))
}

fn owner_filter(kind: &AssociationKind, owner_id: i64) -> Filter {
    Filter {
        column: kind.owner_column,
        op: Comparison::Eq,
        value: SqlValue::Int(owner_id),
    }
}
