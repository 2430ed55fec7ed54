//! Persistence session seam.
//!
//! # Responsibility
//! - Define the unit-of-work contract the access layer consumes.
//! - Keep SQL details behind the `Session` boundary.
//!
//! # Invariants
//! - Every write method leaves persisted state committed before returning.
//! - `select` orders by primary key ascending and paginates after filtering.
//! - A session is a single-writer handle; callers serialize access to it.

use crate::crud::CrudResult;
use crate::model::{EntityId, EntityType, Fields, Record, Relationship};
use rusqlite::types::Value;

mod sqlite;

pub use sqlite::SqliteSession;

/// Page size used when callers do not choose one.
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Offset/limit window applied after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Number of matching rows to skip.
    pub offset: u32,
    /// Maximum rows to return. `0` yields an empty page.
    pub limit: u32,
}

impl Page {
    pub fn new(offset: u32, limit: u32) -> Self {
        Self { offset, limit }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_LIMIT)
    }
}

/// Equality filter on one declared scalar column.
#[derive(Debug, Clone, Copy)]
pub struct Filter<'a> {
    pub column: &'a str,
    /// `Value::Null` matches rows where the column is NULL.
    pub value: &'a Value,
}

/// Unit-of-work handle over one persistence connection.
pub trait Session {
    /// Loads a page of records, optionally filtered by column equality.
    fn select(
        &self,
        entity: &EntityType,
        filter: Option<Filter<'_>>,
        page: Page,
    ) -> CrudResult<Vec<Record>>;
    /// Inserts one row built from `fields` and returns its assigned identity.
    fn insert(&self, entity: &EntityType, fields: &Fields) -> CrudResult<EntityId>;
    /// Overwrites `fields` on row `id` and applies `on_update` expressions.
    fn assign(&self, entity: &EntityType, id: EntityId, fields: &Fields) -> CrudResult<()>;
    /// Deletes row `id` together with its relationship memberships.
    fn remove(&self, entity: &EntityType, id: EntityId) -> CrudResult<()>;
    /// Adds `child` to `relationship` of `parent`. Returns `false` when the
    /// membership already existed.
    fn attach(
        &self,
        relationship: &Relationship,
        parent: EntityId,
        child: EntityId,
    ) -> CrudResult<bool>;
    /// Removes one membership of `child` from `relationship` of `parent`.
    /// Returns `false` when `child` was not a member.
    fn detach(
        &self,
        relationship: &Relationship,
        parent: EntityId,
        child: EntityId,
    ) -> CrudResult<bool>;
    /// Reloads row `id` with every relationship collection.
    fn refresh(&self, entity: &EntityType, id: EntityId) -> CrudResult<Option<Record>>;
}
