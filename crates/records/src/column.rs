//! Columns: named, typed accessors declared once per entity type.

use std::borrow::{Borrow, Cow};

use serde::{Deserialize, Serialize};

use keel_core::Entity;

use crate::value::{ColumnType, ColumnValue};

/// Column name; compares and hashes like the underlying string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnName(Cow<'static, str>);

impl ColumnName {
    pub const fn new(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ColumnName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for ColumnName {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ColumnName {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

impl core::fmt::Display for ColumnName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named accessor over values of type `T`.
///
/// `T` is the entity itself for system columns and the entity state for state
/// columns. Columns are immutable and hold no state beyond name, type and
/// extraction function.
pub struct Column<T> {
    name: ColumnName,
    column_type: ColumnType,
    extract: fn(&T) -> ColumnValue,
}

impl<T> Column<T> {
    pub fn new(name: &'static str, column_type: ColumnType, extract: fn(&T) -> ColumnValue) -> Self {
        Self {
            name: ColumnName::new(name),
            column_type,
            extract,
        }
    }

    pub fn name(&self) -> &ColumnName {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    /// Extract this column's value from `source`.
    pub fn value_in(&self, source: &T) -> ColumnValue {
        (self.extract)(source)
    }
}

impl<T> Clone for Column<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            column_type: self.column_type,
            extract: self.extract,
        }
    }
}

impl<T> core::fmt::Debug for Column<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("column_type", &self.column_type)
            .finish_non_exhaustive()
    }
}

pub const ARCHIVED: &str = "archived";
pub const DELETED: &str = "deleted";
pub const VERSION: &str = "version";

/// The standard system columns: `archived`, `deleted`, `version`.
pub fn lifecycle_columns<E: Entity>() -> Vec<Column<E>> {
    vec![
        Column::new(ARCHIVED, ColumnType::Bool, |e: &E| e.lifecycle().archived.into()),
        Column::new(DELETED, ColumnType::Bool, |e: &E| e.lifecycle().deleted.into()),
        Column::new(VERSION, ColumnType::Int, |e: &E| version_value(e.version())),
    ]
}

/// The `version` column value. Versions above `i64::MAX` are stored as
/// `i64::MAX`, so ordering by version stops distinguishing them there.
pub(crate) fn version_value(version: u64) -> ColumnValue {
    ColumnValue::try_from(version).unwrap_or(ColumnValue::Int(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn names_look_up_by_str() {
        let mut map = BTreeMap::new();
        map.insert(ColumnName::new("total"), 1);
        map.insert(ColumnName::from("owner".to_string()), 2);

        assert_eq!(map.get("total"), Some(&1));
        assert_eq!(map.get("owner"), Some(&2));
    }

    #[test]
    fn versions_past_int_range_saturate() {
        assert_eq!(version_value(3), ColumnValue::Int(3));
        assert_eq!(version_value(i64::MAX as u64), ColumnValue::Int(i64::MAX));
        assert_eq!(version_value(u64::MAX), ColumnValue::Int(i64::MAX));
    }

    #[test]
    fn column_extracts_through_function() {
        let len = Column::new("len", ColumnType::Int, |s: &String| (s.len() as i64).into());
        assert_eq!(len.value_in(&"four".to_string()), ColumnValue::Int(4));
        assert_eq!(len.name().as_str(), "len");
        assert_eq!(len.column_type(), ColumnType::Int);
    }
}
