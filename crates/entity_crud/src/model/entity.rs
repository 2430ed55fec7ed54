//! Entity type descriptors and the typed-entity capability trait.
//!
//! # Responsibility
//! - Declare the scalar columns and relationship attributes of a mapped type.
//! - Resolve attribute names at call time.
//!
//! # Invariants
//! - Primary key columns are insertable but never settable.
//! - A relationship's `back_populates` names the mirror attribute on `target`.

use super::record::Record;
use crate::crud::CrudResult;

/// Scalar attribute of a mapped entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Attribute and SQL column name.
    pub name: &'static str,
    /// Identity column assigned by the persistence layer.
    pub primary_key: bool,
    /// SQL expression written on every update (e.g. `CURRENT_TIMESTAMP`).
    pub on_update: Option<&'static str>,
}

impl Column {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            primary_key: false,
            on_update: None,
        }
    }

    pub const fn primary_key(name: &'static str) -> Self {
        Self {
            name,
            primary_key: true,
            on_update: None,
        }
    }

    /// Refreshes this column with `expression` whenever the row is updated.
    pub const fn on_update(self, expression: &'static str) -> Self {
        Self {
            on_update: Some(expression),
            ..self
        }
    }

    /// Whether update may overwrite this column.
    pub fn is_settable(&self) -> bool {
        !self.primary_key
    }
}

/// Many-to-many relationship attribute backed by a join table.
#[derive(Debug, Clone, Copy)]
pub struct Relationship {
    /// Attribute name on the owning type, e.g. `children`.
    pub name: &'static str,
    /// Descriptor of the related entity type.
    pub target: fn() -> &'static EntityType,
    /// Join table holding one row per membership.
    pub secondary: &'static str,
    /// Join column referencing the owning row.
    pub local_key: &'static str,
    /// Join column referencing the related row.
    pub remote_key: &'static str,
    /// Mirror attribute on the related type, e.g. `parents`.
    pub back_populates: &'static str,
}

impl Relationship {
    pub const fn many_to_many(
        name: &'static str,
        target: fn() -> &'static EntityType,
        secondary: &'static str,
        local_key: &'static str,
        remote_key: &'static str,
        back_populates: &'static str,
    ) -> Self {
        Self {
            name,
            target,
            secondary,
            local_key,
            remote_key,
            back_populates,
        }
    }

    pub fn target_type(&self) -> &'static EntityType {
        (self.target)()
    }

    /// Whether `other` is this relationship seen from the target side:
    /// same join table, swapped keys, pointing back at `owner`.
    pub fn mirrors(&self, other: &Relationship, owner: &EntityType) -> bool {
        other.secondary == self.secondary
            && other.local_key == self.remote_key
            && other.remote_key == self.local_key
            && other.back_populates == self.name
            && other.target_type().table == owner.table
    }
}

/// Descriptor of one mapped record type.
///
/// Descriptors are const-constructible so entity types can keep them in a
/// `static` and hand out `&'static` references.
#[derive(Debug)]
pub struct EntityType {
    pub table: &'static str,
    pub primary_key: &'static str,
    pub columns: &'static [Column],
    pub relationships: &'static [Relationship],
}

impl EntityType {
    pub const fn new(
        table: &'static str,
        primary_key: &'static str,
        columns: &'static [Column],
        relationships: &'static [Relationship],
    ) -> Self {
        Self {
            table,
            primary_key,
            columns,
            relationships,
        }
    }

    /// Looks up a scalar column by attribute name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Looks up a relationship by attribute name.
    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships
            .iter()
            .find(|relationship| relationship.name == name)
    }
}

/// Capability implemented by every typed entity the access layer serves.
///
/// `entity_type` exposes attribute names for dynamic lookups; `from_record`
/// builds the typed instance from state loaded by a session.
pub trait Entity: Sized {
    fn entity_type() -> &'static EntityType;
    fn from_record(record: Record) -> CrudResult<Self>;
}
