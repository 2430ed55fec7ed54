//! SQLite connection bootstrap and mapped-schema checks.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the entity access layer.
//! - Verify that a live schema carries what an entity descriptor declares.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Schema definition and migrations stay with the caller; this module
//!   only inspects.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;
mod schema;

pub use open::{open_db, open_db_in_memory};
pub use schema::ensure_mapped;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Table named by a descriptor does not exist.
    MissingRequiredTable(&'static str),
    /// Column named by a descriptor does not exist in its table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Relationship has no matching `back_populates` mirror on its target.
    MissingBackReference {
        table: &'static str,
        relationship: &'static str,
        back_populates: &'static str,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "mapped schema requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "mapped schema requires column `{column}` in table `{table}`"
            ),
            Self::MissingBackReference {
                table,
                relationship,
                back_populates,
            } => write!(
                f,
                "relationship `{relationship}` of `{table}` requires mirror `{back_populates}` on its target"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::MissingRequiredTable(_) => None,
            Self::MissingRequiredColumn { .. } => None,
            Self::MissingBackReference { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
