//! Generic CRUD and many-to-many linking over SQLite-mapped entities.
//!
//! One set of functions serves every entity type that implements [`Entity`];
//! attributes and relationships are addressed by name and resolved against
//! the type's [`EntityType`] descriptor at call time.

pub mod crud;
pub mod db;
pub mod logging;
pub mod model;
pub mod session;

pub use crud::{
    create, delete, get, get_by_attribute, link, list, list_by_attribute, unlink, update,
    update_by_attribute, CrudError, CrudResult,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::{Column, Entity, EntityId, EntityType, Fields, Record, Relationship};
pub use session::{Filter, Page, Session, SqliteSession, DEFAULT_PAGE_LIMIT};
