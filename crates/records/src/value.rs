//! Column values and their type tags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use keel_core::{EntityId, MessageId};

/// Declared type of a column.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Bool,
    Int,
    Text,
    Timestamp,
    Uuid,
}

/// A value extracted from an entity for one column.
///
/// The derived `Ord` is a total storage order (`Null` first, then by variant)
/// used for sorting query results. Query comparisons go through
/// [`crate::eval`], which rejects mixed-type operands instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ColumnValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
}

/// Shared `Null` for lookups that fall back to it by reference.
pub(crate) static NULL: ColumnValue = ColumnValue::Null;

impl ColumnValue {
    /// Type tag of the value; `None` for `Null`.
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ColumnType::Bool),
            Self::Int(_) => Some(ColumnType::Int),
            Self::Text(_) => Some(ColumnType::Text),
            Self::Timestamp(_) => Some(ColumnType::Timestamp),
            Self::Uuid(_) => Some(ColumnType::Uuid),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether the value may be stored in a column of type `ty` (`Null` always may).
    pub fn conforms_to(&self, ty: ColumnType) -> bool {
        self.column_type().is_none_or(|own| own == ty)
    }
}

impl From<bool> for ColumnValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ColumnValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<u32> for ColumnValue {
    fn from(value: u32) -> Self {
        Self::Int(value.into())
    }
}

impl TryFrom<u64> for ColumnValue {
    type Error = core::num::TryFromIntError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value).map(Self::Int)
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DateTime<Utc>> for ColumnValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<Uuid> for ColumnValue {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<EntityId> for ColumnValue {
    fn from(value: EntityId) -> Self {
        Self::Uuid(value.into())
    }
}

impl From<MessageId> for ColumnValue {
    fn from(value: MessageId) -> Self {
        Self::Uuid(value.into())
    }
}

impl<T> From<Option<T>> for ColumnValue
where
    T: Into<ColumnValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
