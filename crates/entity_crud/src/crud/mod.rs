//! Entity access layer.
//!
//! # Responsibility
//! - Provide entity-type-agnostic CRUD and relationship operations over any
//!   `Session`.
//! - Resolve attribute names against descriptors before touching storage.
//!
//! # Invariants
//! - Absence on reads is `Ok(None)`, never an error.
//! - Write paths validate every attribute name before the first write, so a
//!   rejected mapping leaves persisted state untouched.
//! - Every mutating operation commits and returns the refreshed instance.

mod error;
mod ops;

pub use error::{CrudError, CrudResult};
pub use ops::{
    create, delete, get, get_by_attribute, link, list, list_by_attribute, unlink, update,
    update_by_attribute,
};
