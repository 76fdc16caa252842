//! Lazy, composable select queries
//!
//! [`SelectQuery`] is the query surface `Repository::query` hands out:
//! filters, ordering, and windowing can be chained freely, and nothing
//! touches the store until the query is fetched or counted. At execution
//! time the typed query lowers into an erased [`SelectPlan`] the unit of
//! work knows how to run.

use std::marker::PhantomData;

use crate::entity::{Entity, SqlValue};

/// Filter comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Substring match; the Postgres backend lowers this to `LIKE`
    Like,
}

/// A single column filter, combined with the others using AND logic
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: &'static str,
    pub op: Comparison,
    pub value: SqlValue,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

/// Erased query plan executed by a unit of work
///
/// Column and table names originate from `Entity` constants (or from an
/// order key validated against them), never from raw user input; backends
/// splice them into SQL as identifiers.
#[derive(Debug, Clone)]
pub struct SelectPlan {
    pub table: &'static str,
    pub columns: &'static [&'static str],
    pub filters: Vec<Filter>,
    pub order: Vec<(String, SortDir)>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Lazy query over a single entity type
///
/// # Examples
///
/// ```rust,ignore
/// let available = repo
///     .query()
///     .filter("available", Comparison::Eq, SqlValue::Bool(true))
///     .order_by("name", SortDir::Asc);
/// let books = repo.fetch(&mut uow, available).await?;
/// ```
#[derive(Debug, Clone)]
pub struct SelectQuery<T: Entity> {
    filters: Vec<Filter>,
    order: Vec<(String, SortDir)>,
    limit: Option<i64>,
    offset: Option<i64>,
    _entity: PhantomData<T>,
}

impl<T: Entity> Default for SelectQuery<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> SelectQuery<T> {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
            _entity: PhantomData,
        }
    }

    /// Add a filter; all filters are combined with AND
    pub fn filter(mut self, column: &'static str, op: Comparison, value: SqlValue) -> Self {
        debug_assert!(
            T::columns().contains(&column),
            "filter column {column} is not a column of {}",
            T::TABLE
        );
        self.filters.push(Filter { column, op, value });
        self
    }

    /// Append an ordering key; earlier keys take precedence
    pub fn order_by(mut self, column: impl Into<String>, dir: SortDir) -> Self {
        self.order.push((column.into(), dir));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Lower into the erased plan a unit of work executes
    pub fn plan(&self) -> SelectPlan {
        SelectPlan {
            table: T::TABLE,
            columns: T::columns(),
            filters: self.filters.clone(),
            order: self.order.clone(),
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Genre;

    #[test]
    fn test_query_is_lazy_and_composable() {
        let query = SelectQuery::<Genre>::new()
            .filter("name", Comparison::Like, SqlValue::Text("fantasy".into()))
            .order_by("name", SortDir::Desc)
            .limit(10)
            .offset(20);

        let plan = query.plan();
        assert_eq!(plan.table, "genre");
        assert_eq!(plan.filters.len(), 1);
        assert_eq!(plan.order, vec![("name".to_string(), SortDir::Desc)]);
        assert_eq!(plan.limit, Some(10));
        assert_eq!(plan.offset, Some(20));
    }

    #[test]
    fn test_empty_query_plan_has_no_window() {
        let plan = SelectQuery::<Genre>::new().plan();
        assert!(plan.filters.is_empty());
        assert!(plan.order.is_empty());
        assert_eq!(plan.limit, None);
        assert_eq!(plan.offset, None);
    }
}
