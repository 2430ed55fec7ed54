use super::error::{CrudError, CrudResult};
use crate::model::{Entity, EntityId, EntityType, Fields, Record, Relationship};
use crate::session::{Filter, Page, Session};
use log::{debug, error, info, warn};
use rusqlite::types::Value;
use std::time::Instant;

/// Lists one page of `T` in primary key order.
pub fn list<T: Entity>(session: &impl Session, page: Page) -> CrudResult<Vec<T>> {
    let entity = T::entity_type();
    let result = session.select(entity, None, page);
    log_read("entity_list", entity, &result, |records| records.len());
    result.and_then(into_entities)
}

/// Gets one `T` by identity. Absence is `Ok(None)`.
pub fn get<T: Entity>(session: &impl Session, id: EntityId) -> CrudResult<Option<T>> {
    let entity = T::entity_type();
    get_by_attribute(session, entity.primary_key, id)
}

/// Gets the first `T` (by identity) whose `attribute` equals `value`.
///
/// # Errors
/// - `UnknownAttribute` when `attribute` is not a scalar column of `T`.
pub fn get_by_attribute<T: Entity>(
    session: &impl Session,
    attribute: &str,
    value: impl Into<Value>,
) -> CrudResult<Option<T>> {
    let entity = T::entity_type();
    let result = find_record(session, entity, attribute, &value.into());
    log_read("entity_get", entity, &result, |record| usize::from(record.is_some()));
    result?.map(T::from_record).transpose()
}

/// Lists one page of `T` whose `attribute` equals `value`.
///
/// # Errors
/// - `UnknownAttribute` when `attribute` is not a scalar column of `T`.
pub fn list_by_attribute<T: Entity>(
    session: &impl Session,
    attribute: &str,
    value: impl Into<Value>,
    page: Page,
) -> CrudResult<Vec<T>> {
    let entity = T::entity_type();
    let value = value.into();
    let result = filter_column(entity, attribute).and_then(|column| {
        session.select(
            entity,
            Some(Filter {
                column,
                value: &value,
            }),
            page,
        )
    });
    log_read("entity_list", entity, &result, |records| records.len());
    result.and_then(into_entities)
}

/// Persists a new `T` built from `fields` and returns it as stored.
///
/// # Errors
/// - `UnexpectedField` when a key is not a scalar column of `T`.
/// - Storage errors (e.g. a missing NOT NULL value) unchanged.
pub fn create<T: Entity>(session: &impl Session, fields: &Fields) -> CrudResult<T> {
    let entity = T::entity_type();
    let started_at = Instant::now();
    let result = (|| {
        check_constructor_fields(entity, fields)?;
        let id = session.insert(entity, fields)?;
        require(session, entity, id)
    })();
    log_write("entity_create", entity, started_at, &result);
    result.and_then(T::from_record)
}

/// Overwrites `fields` on the `T` with identity `id`.
///
/// # Errors
/// - `NotFound` when `id` does not resolve.
/// - `UnknownAttribute` / `ReadOnlyAttribute` for a key update may not set.
pub fn update<T: Entity>(session: &impl Session, id: EntityId, fields: &Fields) -> CrudResult<T> {
    let entity = T::entity_type();
    let started_at = Instant::now();
    let result = (|| {
        let record = require(session, entity, id)?;
        apply_update(session, entity, record.id(), fields)
    })();
    log_write("entity_update", entity, started_at, &result);
    result.and_then(T::from_record)
}

/// Same as [`update`], locating the instance via [`get_by_attribute`].
///
/// # Errors
/// - `UnknownAttribute` when `attribute` is not a scalar column of `T`.
/// - `NoMatch` when no instance matches.
pub fn update_by_attribute<T: Entity>(
    session: &impl Session,
    attribute: &str,
    value: impl Into<Value>,
    fields: &Fields,
) -> CrudResult<T> {
    let entity = T::entity_type();
    let value = value.into();
    let started_at = Instant::now();
    let result = (|| {
        let record = find_record(session, entity, attribute, &value)?.ok_or_else(|| {
            CrudError::NoMatch {
                entity: entity.table,
                attribute: attribute.to_string(),
            }
        })?;
        apply_update(session, entity, record.id(), fields)
    })();
    log_write("entity_update", entity, started_at, &result);
    result.and_then(T::from_record)
}

/// Deletes the `T` with identity `id` and its relationship memberships.
///
/// # Errors
/// - `NotFound` when `id` does not resolve.
pub fn delete<T: Entity>(session: &impl Session, id: EntityId) -> CrudResult<()> {
    let entity = T::entity_type();
    let started_at = Instant::now();
    let result = require(session, entity, id).and_then(|_| session.remove(entity, id));
    log_write("entity_delete", entity, started_at, &result);
    result
}

/// Appends child `C` to relationship `relationship` of parent `P`.
///
/// Linking an existing member is a no-op. Returns the refreshed parent; the
/// child's back-reference reflects the new membership on its next load.
///
/// # Errors
/// - `NotFound` when either identity does not resolve.
/// - `UnknownAttribute` when `P` declares no such relationship.
/// - `RelationshipMismatch` when the relationship does not target `C`.
pub fn link<P: Entity, C: Entity>(
    session: &impl Session,
    parent_id: EntityId,
    child_id: EntityId,
    relationship: &str,
) -> CrudResult<P> {
    let parent_type = P::entity_type();
    let started_at = Instant::now();
    let result = (|| {
        let (relationship, parent, child) =
            resolve_pair::<P, C>(session, parent_id, child_id, relationship)?;
        let added = session.attach(relationship, parent, child)?;
        if !added {
            debug!(
                "event=entity_link module=crud status=noop entity={} relationship={} parent={} child={}",
                parent_type.table, relationship.name, parent, child
            );
        }
        require(session, parent_type, parent)
    })();
    log_write("entity_link", parent_type, started_at, &result);
    result.and_then(P::from_record)
}

/// Removes child `C` from relationship `relationship` of parent `P`.
///
/// # Errors
/// - Same as [`link`].
/// - `NotLinked` when the child is not a member.
pub fn unlink<P: Entity, C: Entity>(
    session: &impl Session,
    parent_id: EntityId,
    child_id: EntityId,
    relationship: &str,
) -> CrudResult<P> {
    let parent_type = P::entity_type();
    let started_at = Instant::now();
    let result = (|| {
        let (relationship, parent, child) =
            resolve_pair::<P, C>(session, parent_id, child_id, relationship)?;
        if !session.detach(relationship, parent, child)? {
            return Err(CrudError::NotLinked {
                relationship: relationship.name,
                parent,
                child,
            });
        }
        require(session, parent_type, parent)
    })();
    log_write("entity_unlink", parent_type, started_at, &result);
    result.and_then(P::from_record)
}

fn into_entities<T: Entity>(records: Vec<Record>) -> CrudResult<Vec<T>> {
    records.into_iter().map(T::from_record).collect()
}

fn filter_column(entity: &EntityType, attribute: &str) -> CrudResult<&'static str> {
    match entity.column(attribute) {
        Some(column) => Ok(column.name),
        None => Err(CrudError::unknown_attribute(entity.table, attribute)),
    }
}

fn find_record(
    session: &impl Session,
    entity: &EntityType,
    attribute: &str,
    value: &Value,
) -> CrudResult<Option<Record>> {
    let column = filter_column(entity, attribute)?;
    let records = session.select(entity, Some(Filter { column, value }), Page::new(0, 1))?;
    Ok(records.into_iter().next())
}

fn require(session: &impl Session, entity: &EntityType, id: EntityId) -> CrudResult<Record> {
    session.refresh(entity, id)?.ok_or(CrudError::NotFound {
        entity: entity.table,
        id,
    })
}

fn apply_update(
    session: &impl Session,
    entity: &EntityType,
    id: EntityId,
    fields: &Fields,
) -> CrudResult<Record> {
    check_settable_fields(entity, fields)?;
    session.assign(entity, id, fields)?;
    require(session, entity, id)
}

fn check_constructor_fields(entity: &EntityType, fields: &Fields) -> CrudResult<()> {
    for (name, _) in fields.iter() {
        if entity.column(name).is_none() {
            return Err(CrudError::UnexpectedField {
                entity: entity.table,
                field: name.to_string(),
            });
        }
    }
    Ok(())
}

fn check_settable_fields(entity: &EntityType, fields: &Fields) -> CrudResult<()> {
    for (name, _) in fields.iter() {
        match entity.column(name) {
            Some(column) if column.is_settable() => {}
            Some(_) => {
                return Err(CrudError::ReadOnlyAttribute {
                    entity: entity.table,
                    attribute: name.to_string(),
                });
            }
            // Relationship collections change through link/unlink only.
            None if entity.relationship(name).is_some() => {
                return Err(CrudError::ReadOnlyAttribute {
                    entity: entity.table,
                    attribute: name.to_string(),
                });
            }
            None => return Err(CrudError::unknown_attribute(entity.table, name)),
        }
    }
    Ok(())
}

fn resolve_pair<P: Entity, C: Entity>(
    session: &impl Session,
    parent_id: EntityId,
    child_id: EntityId,
    relationship: &str,
) -> CrudResult<(&'static Relationship, EntityId, EntityId)> {
    let parent_type = P::entity_type();
    let child_type = C::entity_type();
    let parent = require(session, parent_type, parent_id)?;
    let child = require(session, child_type, child_id)?;

    let resolved = parent_type
        .relationship(relationship)
        .ok_or_else(|| CrudError::unknown_attribute(parent_type.table, relationship))?;
    let target = resolved.target_type();
    if target.table != child_type.table {
        return Err(CrudError::RelationshipMismatch {
            relationship: resolved.name,
            expected: target.table,
            actual: child_type.table,
        });
    }

    Ok((resolved, parent.id(), child.id()))
}

fn log_read<R>(
    event: &str,
    entity: &EntityType,
    result: &CrudResult<R>,
    count: impl FnOnce(&R) -> usize,
) {
    match result {
        Ok(value) => debug!(
            "event={} module=crud status=ok entity={} count={}",
            event,
            entity.table,
            count(value)
        ),
        Err(err) => warn!(
            "event={} module=crud status=error entity={} error={}",
            event, entity.table, err
        ),
    }
}

fn log_write<R>(event: &str, entity: &EntityType, started_at: Instant, result: &CrudResult<R>) {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(_) => info!(
            "event={} module=crud status=ok entity={} duration_ms={}",
            event, entity.table, duration_ms
        ),
        Err(err) if matches!(err, CrudError::Db(_) | CrudError::InvalidData(_)) => error!(
            "event={} module=crud status=error entity={} duration_ms={} error={}",
            event, entity.table, duration_ms, err
        ),
        Err(err) => warn!(
            "event={} module=crud status=rejected entity={} duration_ms={} error={}",
            event, entity.table, duration_ms, err
        ),
    }
}
