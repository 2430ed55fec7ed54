#![allow(dead_code)]

use entity_crud::db::open_db_in_memory;
use entity_crud::{
    create, Column, CrudResult, Entity, EntityId, EntityType, Fields, Record, Relationship,
    SqliteSession,
};
use rusqlite::Connection;

const SCHEMA: &str = "
CREATE TABLE parent_1 (
    id INTEGER PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    id_modulo INTEGER,
    created TEXT DEFAULT CURRENT_TIMESTAMP,
    updated TEXT DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE children (
    id INTEGER PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    created TEXT DEFAULT CURRENT_TIMESTAMP,
    updated TEXT DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE parents_to_children (
    parent_id INTEGER REFERENCES parent_1(id),
    child_id INTEGER REFERENCES children(id)
);
";

static PARENT: EntityType = EntityType::new(
    "parent_1",
    "id",
    &[
        Column::primary_key("id"),
        Column::new("name"),
        Column::new("id_modulo"),
        Column::new("created"),
        Column::new("updated").on_update("CURRENT_TIMESTAMP"),
    ],
    &[Relationship::many_to_many(
        "children",
        Child::entity_type,
        "parents_to_children",
        "parent_id",
        "child_id",
        "parents",
    )],
);

static CHILD: EntityType = EntityType::new(
    "children",
    "id",
    &[
        Column::primary_key("id"),
        Column::new("name"),
        Column::new("created"),
        Column::new("updated").on_update("CURRENT_TIMESTAMP"),
    ],
    &[Relationship::many_to_many(
        "parents",
        Parent::entity_type,
        "parents_to_children",
        "child_id",
        "parent_id",
        "children",
    )],
);

#[derive(Debug, Clone, PartialEq)]
pub struct Parent {
    pub id: EntityId,
    pub name: String,
    pub id_modulo: Option<i64>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub children: Vec<EntityId>,
}

impl Entity for Parent {
    fn entity_type() -> &'static EntityType {
        &PARENT
    }

    fn from_record(record: Record) -> CrudResult<Self> {
        Ok(Self {
            id: record.id(),
            name: record.value("name")?,
            id_modulo: record.value("id_modulo")?,
            created: record.value("created")?,
            updated: record.value("updated")?,
            children: record.links("children")?.to_vec(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Child {
    pub id: EntityId,
    pub name: String,
    pub parents: Vec<EntityId>,
}

impl Entity for Child {
    fn entity_type() -> &'static EntityType {
        &CHILD
    }

    fn from_record(record: Record) -> CrudResult<Self> {
        Ok(Self {
            id: record.id(),
            name: record.value("name")?,
            parents: record.links("parents")?.to_vec(),
        })
    }
}

pub fn open_test_db() -> Connection {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    conn
}

pub fn parent_fields(name: &str, id_modulo: i64) -> Fields {
    Fields::new()
        .with("name", name.to_string())
        .with("id_modulo", id_modulo)
}

/// Inserts `count` parents named `parent_test_name_{i}` with `id_modulo = i % 10`.
pub fn seed_parents(session: &SqliteSession<'_>, count: i64) -> Vec<Parent> {
    (1..=count)
        .map(|i| {
            create::<Parent>(session, &parent_fields(&format!("parent_test_name_{i}"), i % 10))
                .unwrap()
        })
        .collect()
}

pub fn create_child(session: &SqliteSession<'_>, name: &str) -> Child {
    create::<Child>(session, &Fields::new().with("name", name.to_string())).unwrap()
}
