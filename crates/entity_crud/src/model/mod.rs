//! Entity descriptors, loaded records and field mappings.
//!
//! # Responsibility
//! - Describe mapped record types by attribute name so one set of access
//!   functions serves every entity.
//! - Carry loaded entity state between the session and typed entities.
//!
//! # Invariants
//! - Every entity is identified by a persistence-assigned `EntityId`.
//! - Relationship attributes are many-to-many and mirrored through a named
//!   back-reference on the target type.

pub mod entity;
pub mod record;

pub use entity::{Column, Entity, EntityType, Relationship};
pub use record::{EntityId, Fields, Record};
