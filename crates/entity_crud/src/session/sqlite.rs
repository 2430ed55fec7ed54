//! SQLite-backed session.
//!
//! # Invariants
//! - Each write runs in its own transaction and commits before returning;
//!   a failed write rolls back when the transaction is dropped.
//! - SQL identifiers come from entity descriptors only and are quoted.

use super::{Filter, Page, Session};
use crate::crud::{CrudError, CrudResult};
use crate::db::ensure_mapped;
use crate::model::{Entity, EntityId, EntityType, Fields, Record, Relationship};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::BTreeMap;

/// Session bound to a borrowed SQLite connection.
pub struct SqliteSession<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSession<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Verifies the connected schema backs every attribute `T` declares.
    pub fn register<T: Entity>(&self) -> CrudResult<()> {
        ensure_mapped(self.conn, T::entity_type())?;
        Ok(())
    }

    fn read_record(&self, entity: &EntityType, row: &Row<'_>) -> CrudResult<Record> {
        let mut values = BTreeMap::new();
        for (index, column) in entity.columns.iter().enumerate() {
            values.insert(column.name, row.get::<_, Value>(index)?);
        }

        let id = match values.get(entity.primary_key) {
            Some(Value::Integer(id)) => *id,
            Some(other) => {
                return Err(CrudError::InvalidData(format!(
                    "identity column {}.{} holds a {} value",
                    entity.table,
                    entity.primary_key,
                    other.data_type()
                )));
            }
            None => {
                return Err(CrudError::InvalidData(format!(
                    "identity column {}.{} is not declared",
                    entity.table, entity.primary_key
                )));
            }
        };

        let mut links = BTreeMap::new();
        for relationship in entity.relationships {
            links.insert(relationship.name, self.load_links(relationship, id)?);
        }

        Ok(Record::new(entity.table, id, values, links))
    }

    fn load_links(&self, relationship: &Relationship, id: EntityId) -> CrudResult<Vec<EntityId>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {remote} FROM {secondary} WHERE {local} = ?1 ORDER BY rowid ASC;",
            remote = quote_ident(relationship.remote_key),
            secondary = quote_ident(relationship.secondary),
            local = quote_ident(relationship.local_key),
        ))?;
        let mut rows = stmt.query([id])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }
}

impl Session for SqliteSession<'_> {
    fn select(
        &self,
        entity: &EntityType,
        filter: Option<Filter<'_>>,
        page: Page,
    ) -> CrudResult<Vec<Record>> {
        let columns = entity
            .columns
            .iter()
            .map(|column| quote_ident(column.name))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("SELECT {columns} FROM {}", quote_ident(entity.table));
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(filter) = filter {
            if *filter.value == Value::Null {
                sql.push_str(&format!(" WHERE {} IS NULL", quote_ident(filter.column)));
            } else {
                sql.push_str(&format!(" WHERE {} = ?", quote_ident(filter.column)));
                bind_values.push(filter.value.clone());
            }
        }

        sql.push_str(&format!(
            " ORDER BY {} ASC LIMIT ? OFFSET ?",
            quote_ident(entity.primary_key)
        ));
        bind_values.push(Value::Integer(i64::from(page.limit)));
        bind_values.push(Value::Integer(i64::from(page.offset)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(self.read_record(entity, row)?);
        }

        Ok(records)
    }

    fn insert(&self, entity: &EntityType, fields: &Fields) -> CrudResult<EntityId> {
        let table = quote_ident(entity.table);
        let returning = quote_ident(entity.primary_key);
        let sql = if fields.is_empty() {
            format!("INSERT INTO {table} DEFAULT VALUES RETURNING {returning};")
        } else {
            let names = fields
                .iter()
                .map(|(name, _)| quote_ident(name))
                .collect::<Vec<_>>()
                .join(", ");
            let placeholders = (1..=fields.len())
                .map(|index| format!("?{index}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "INSERT INTO {table} ({names}) VALUES ({placeholders}) RETURNING {returning};"
            )
        };

        // Read the key itself: it only equals the rowid for INTEGER PRIMARY KEY.
        let tx = self.conn.unchecked_transaction()?;
        let id: EntityId = tx.query_row(
            &sql,
            params_from_iter(fields.iter().map(|(_, value)| value)),
            |row| row.get(0),
        )?;
        tx.commit()?;
        Ok(id)
    }

    fn assign(&self, entity: &EntityType, id: EntityId, fields: &Fields) -> CrudResult<()> {
        if fields.is_empty() {
            return Ok(());
        }

        let id_value = Value::Integer(id);
        let mut assignments = Vec::new();
        let mut bind_values: Vec<&Value> = Vec::new();
        for (name, value) in fields.iter() {
            bind_values.push(value);
            assignments.push(format!("{} = ?{}", quote_ident(name), bind_values.len()));
        }
        for column in entity.columns {
            if let Some(expression) = column.on_update {
                if fields.get(column.name).is_none() {
                    assignments.push(format!("{} = {expression}", quote_ident(column.name)));
                }
            }
        }

        bind_values.push(&id_value);
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{};",
            quote_ident(entity.table),
            assignments.join(", "),
            quote_ident(entity.primary_key),
            bind_values.len()
        );

        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(CrudError::NotFound {
                entity: entity.table,
                id,
            });
        }
        tx.commit()?;
        Ok(())
    }

    fn remove(&self, entity: &EntityType, id: EntityId) -> CrudResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for relationship in entity.relationships {
            tx.execute(
                &format!(
                    "DELETE FROM {} WHERE {} = ?1;",
                    quote_ident(relationship.secondary),
                    quote_ident(relationship.local_key)
                ),
                [id],
            )?;
        }

        let changed = tx.execute(
            &format!(
                "DELETE FROM {} WHERE {} = ?1;",
                quote_ident(entity.table),
                quote_ident(entity.primary_key)
            ),
            [id],
        )?;
        if changed == 0 {
            return Err(CrudError::NotFound {
                entity: entity.table,
                id,
            });
        }
        tx.commit()?;
        Ok(())
    }

    fn attach(
        &self,
        relationship: &Relationship,
        parent: EntityId,
        child: EntityId,
    ) -> CrudResult<bool> {
        let secondary = quote_ident(relationship.secondary);
        let local = quote_ident(relationship.local_key);
        let remote = quote_ident(relationship.remote_key);

        let tx = self.conn.unchecked_transaction()?;
        let exists: i64 = tx.query_row(
            &format!(
                "SELECT EXISTS(
                    SELECT 1 FROM {secondary} WHERE {local} = ?1 AND {remote} = ?2
                );"
            ),
            params![parent, child],
            |row| row.get(0),
        )?;
        if exists == 1 {
            return Ok(false);
        }

        tx.execute(
            &format!("INSERT INTO {secondary} ({local}, {remote}) VALUES (?1, ?2);"),
            params![parent, child],
        )?;
        tx.commit()?;
        Ok(true)
    }

    fn detach(
        &self,
        relationship: &Relationship,
        parent: EntityId,
        child: EntityId,
    ) -> CrudResult<bool> {
        let secondary = quote_ident(relationship.secondary);
        let local = quote_ident(relationship.local_key);
        let remote = quote_ident(relationship.remote_key);

        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            &format!(
                "DELETE FROM {secondary}
                 WHERE rowid = (
                    SELECT rowid FROM {secondary}
                    WHERE {local} = ?1 AND {remote} = ?2
                    ORDER BY rowid ASC
                    LIMIT 1
                 );"
            ),
            params![parent, child],
        )?;
        if changed == 0 {
            return Ok(false);
        }
        tx.commit()?;
        Ok(true)
    }

    fn refresh(&self, entity: &EntityType, id: EntityId) -> CrudResult<Option<Record>> {
        let id_value = Value::Integer(id);
        let filter = Filter {
            column: entity.primary_key,
            value: &id_value,
        };
        let records = self.select(entity, Some(filter), Page::new(0, 1))?;
        Ok(records.into_iter().next())
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::{quote_ident, SqliteSession};
    use crate::db::open_db_in_memory;
    use crate::model::{Column, EntityType, Fields, Relationship};
    use crate::session::{Filter, Page, Session};
    use rusqlite::types::Value;

    static NOTE: EntityType = EntityType::new(
        "notes",
        "id",
        &[
            Column::primary_key("id"),
            Column::new("title"),
            Column::new("folder"),
        ],
        &[Relationship::many_to_many(
            "labels",
            label_type,
            "note_labels",
            "note_id",
            "label_id",
            "notes",
        )],
    );

    static LABEL: EntityType = EntityType::new("labels", "id", &[Column::primary_key("id")], &[]);

    fn label_type() -> &'static EntityType {
        &LABEL
    }

    fn setup() -> rusqlite::Connection {
        let conn = open_db_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE notes (id INTEGER PRIMARY KEY, title TEXT NOT NULL, folder TEXT);
             CREATE TABLE labels (id INTEGER PRIMARY KEY);
             CREATE TABLE note_labels (note_id INTEGER, label_id INTEGER);
             INSERT INTO labels (id) VALUES (1);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn quote_ident_escapes_embedded_quotes() {
        assert_eq!(quote_ident("name"), "\"name\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn null_filter_matches_null_columns() {
        let conn = setup();
        let session = SqliteSession::new(&conn);
        session
            .insert(&NOTE, &Fields::new().with("title", "loose".to_string()))
            .unwrap();
        session
            .insert(
                &NOTE,
                &Fields::new()
                    .with("title", "filed".to_string())
                    .with("folder", "inbox".to_string()),
            )
            .unwrap();

        let loose = session
            .select(
                &NOTE,
                Some(Filter {
                    column: "folder",
                    value: &Value::Null,
                }),
                Page::default(),
            )
            .unwrap();
        assert_eq!(loose.len(), 1);
        assert_eq!(loose[0].value::<String>("title").unwrap(), "loose");
    }

    #[test]
    fn detach_removes_a_single_membership() {
        let conn = setup();
        let session = SqliteSession::new(&conn);
        let note = session
            .insert(&NOTE, &Fields::new().with("title", "n".to_string()))
            .unwrap();
        conn.execute_batch(&format!(
            "INSERT INTO note_labels VALUES ({note}, 1);
             INSERT INTO note_labels VALUES ({note}, 1);"
        ))
        .unwrap();

        let labels = &NOTE.relationships[0];
        assert!(session.detach(labels, note, 1).unwrap());
        let record = session.refresh(&NOTE, note).unwrap().unwrap();
        assert_eq!(record.links("labels").unwrap(), &[1]);
        assert!(!session.attach(labels, note, 1).unwrap());
    }

    #[test]
    fn assign_on_missing_row_reports_not_found() {
        let conn = setup();
        let session = SqliteSession::new(&conn);
        let err = session
            .assign(&NOTE, 42, &Fields::new().with("title", "x".to_string()))
            .unwrap_err();
        assert!(matches!(
            err,
            crate::crud::CrudError::NotFound {
                entity: "notes",
                id: 42
            }
        ));
    }

    #[test]
    fn non_integer_identity_is_reported_without_the_value() {
        static TOKEN: EntityType =
            EntityType::new("tokens", "id", &[Column::primary_key("id")], &[]);
        let conn = open_db_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE tokens (id TEXT PRIMARY KEY);
             INSERT INTO tokens (id) VALUES ('secret-token');",
        )
        .unwrap();
        let session = SqliteSession::new(&conn);

        match session.select(&TOKEN, None, Page::default()) {
            Err(crate::crud::CrudError::InvalidData(message)) => {
                assert!(message.contains("tokens.id"));
                assert!(!message.contains("secret-token"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
