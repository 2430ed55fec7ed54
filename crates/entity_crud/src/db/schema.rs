//! Live-schema checks against entity descriptors.

use super::{DbError, DbResult};
use crate::model::EntityType;
use rusqlite::Connection;

/// Verifies that `entity` is fully backed by the connected schema.
///
/// # Errors
/// - `MissingRequiredTable` when the entity table or a relationship join
///   table does not exist.
/// - `MissingRequiredColumn` when a declared column or join key is absent.
/// - `MissingBackReference` when the target type does not declare the
///   `back_populates` mirror over the same join table with swapped keys.
pub fn ensure_mapped(conn: &Connection, entity: &EntityType) -> DbResult<()> {
    if !table_exists(conn, entity.table)? {
        return Err(DbError::MissingRequiredTable(entity.table));
    }
    for column in entity.columns {
        if !table_has_column(conn, entity.table, column.name)? {
            return Err(DbError::MissingRequiredColumn {
                table: entity.table,
                column: column.name,
            });
        }
    }

    for relationship in entity.relationships {
        let target = relationship.target_type();
        let mirrored = target
            .relationship(relationship.back_populates)
            .is_some_and(|mirror| relationship.mirrors(mirror, entity));
        if !mirrored {
            return Err(DbError::MissingBackReference {
                table: entity.table,
                relationship: relationship.name,
                back_populates: relationship.back_populates,
            });
        }
        if !table_exists(conn, target.table)? {
            return Err(DbError::MissingRequiredTable(target.table));
        }
        if !table_exists(conn, relationship.secondary)? {
            return Err(DbError::MissingRequiredTable(relationship.secondary));
        }
        for column in [relationship.local_key, relationship.remote_key] {
            if !table_has_column(conn, relationship.secondary, column)? {
                return Err(DbError::MissingRequiredColumn {
                    table: relationship.secondary,
                    column,
                });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> DbResult<bool> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let mut rows = stmt.query([table])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(0)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
