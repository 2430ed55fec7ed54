use crate::db::DbError;
use crate::model::EntityId;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CrudResult<T> = Result<T, CrudError>;

/// Errors surfaced by the entity access layer.
#[derive(Debug)]
pub enum CrudError {
    /// Name is not a declared attribute of the entity type.
    UnknownAttribute {
        entity: &'static str,
        attribute: String,
    },
    /// Attribute exists but update may not overwrite it.
    ReadOnlyAttribute {
        entity: &'static str,
        attribute: String,
    },
    /// Create mapping carries a key the entity does not accept.
    UnexpectedField {
        entity: &'static str,
        field: String,
    },
    /// No row with this identity.
    NotFound { entity: &'static str, id: EntityId },
    /// No row matches an attribute lookup that must resolve.
    NoMatch {
        entity: &'static str,
        attribute: String,
    },
    /// Unlink target is not a member of the relationship collection.
    NotLinked {
        relationship: &'static str,
        parent: EntityId,
        child: EntityId,
    },
    /// Relationship does not point at the supplied child type.
    RelationshipMismatch {
        relationship: &'static str,
        expected: &'static str,
        actual: &'static str,
    },
    /// Persisted data cannot be converted into the requested shape.
    InvalidData(String),
    Db(DbError),
}

impl CrudError {
    pub(crate) fn unknown_attribute(entity: &'static str, attribute: &str) -> Self {
        Self::UnknownAttribute {
            entity,
            attribute: attribute.to_string(),
        }
    }

    /// Whether this error rejects an attribute name (unknown or read-only).
    pub fn is_attribute_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownAttribute { .. } | Self::ReadOnlyAttribute { .. }
        )
    }
}

impl Display for CrudError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownAttribute { entity, attribute } => {
                write!(f, "`{entity}` has no attribute `{attribute}`")
            }
            Self::ReadOnlyAttribute { entity, attribute } => {
                write!(f, "attribute `{attribute}` of `{entity}` is not settable")
            }
            Self::UnexpectedField { entity, field } => {
                write!(f, "`{entity}` does not accept field `{field}`")
            }
            Self::NotFound { entity, id } => write!(f, "`{entity}` not found: {id}"),
            Self::NoMatch { entity, attribute } => {
                write!(f, "no `{entity}` matches lookup on `{attribute}`")
            }
            Self::NotLinked {
                relationship,
                parent,
                child,
            } => write!(
                f,
                "{child} is not a member of `{relationship}` on {parent}"
            ),
            Self::RelationshipMismatch {
                relationship,
                expected,
                actual,
            } => write!(
                f,
                "relationship `{relationship}` targets `{expected}`, got `{actual}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CrudError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for CrudError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for CrudError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
