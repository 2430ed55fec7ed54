//! Loaded entity state and attribute mappings.

use crate::crud::{CrudError, CrudResult};
use rusqlite::types::{FromSql, Value, ValueRef};
use std::collections::BTreeMap;

/// Identity assigned by the persistence layer at creation.
pub type EntityId = i64;

/// Ordered attribute-name to value mapping used by create and update.
///
/// Setting a name that is already present replaces its value in place, so
/// iteration order is first-insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    entries: Vec<(String, Value)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Fields::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Self::new();
        for (name, value) in iter {
            fields.set(name, value);
        }
        fields
    }
}

/// Persisted state of one entity instance as of its last load.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    entity: &'static str,
    id: EntityId,
    values: BTreeMap<&'static str, Value>,
    links: BTreeMap<&'static str, Vec<EntityId>>,
}

impl Record {
    /// Builds a record for `entity` (its table name).
    ///
    /// `links` holds related identities per relationship attribute in
    /// membership order.
    pub fn new(
        entity: &'static str,
        id: EntityId,
        values: BTreeMap<&'static str, Value>,
        links: BTreeMap<&'static str, Vec<EntityId>>,
    ) -> Self {
        Self {
            entity,
            id,
            values,
            links,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the raw value of scalar attribute `name`.
    pub fn raw(&self, name: &str) -> CrudResult<&Value> {
        self.values
            .get(name)
            .ok_or_else(|| CrudError::unknown_attribute(self.entity, name))
    }

    /// Converts scalar attribute `name` into `T`.
    ///
    /// # Errors
    /// - `UnknownAttribute` when `name` was not loaded for this entity.
    /// - `InvalidData` when the stored value does not convert into `T`.
    pub fn value<T: FromSql>(&self, name: &str) -> CrudResult<T> {
        let value = self.raw(name)?;
        T::column_result(ValueRef::from(value)).map_err(|_| {
            CrudError::InvalidData(format!(
                "attribute `{name}` of `{}` row {} holds an unconvertible {} value",
                self.entity,
                self.id,
                value.data_type()
            ))
        })
    }

    /// Returns related identities held by relationship attribute `name`.
    pub fn links(&self, name: &str) -> CrudResult<&[EntityId]> {
        self.links
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| CrudError::unknown_attribute(self.entity, name))
    }
}
