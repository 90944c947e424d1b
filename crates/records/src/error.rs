//! Record layer error model.

use thiserror::Error;

use crate::value::ColumnType;

/// A column name did not resolve against a record specification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ColumnError {
    #[error("column `{column}` is not declared by record type `{record_type}`")]
    NotFound { record_type: String, column: String },
}

impl ColumnError {
    pub fn not_found(record_type: impl Into<String>, column: impl Into<String>) -> Self {
        Self::NotFound {
            record_type: record_type.into(),
            column: column.into(),
        }
    }
}

/// A record specification could not be built or applied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpecificationError {
    /// Column names must be unique across system and state columns.
    #[error("record type `{record_type}` declares column `{column}` more than once")]
    DuplicateColumn { record_type: String, column: String },

    /// A record carries a column key its specification does not declare.
    #[error("record type `{record_type}` does not declare column `{column}`")]
    UndeclaredColumn { record_type: String, column: String },

    /// An extracted value contradicts the column's declared type.
    #[error("column `{column}` of `{record_type}` is declared {expected:?} but produced {found:?}")]
    TypeMismatch {
        record_type: String,
        column: String,
        expected: ColumnType,
        found: ColumnType,
    },

    #[error("specification registry lock poisoned")]
    Poisoned,
}

/// A predicate or query could not be evaluated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error(transparent)]
    Column(#[from] ColumnError),

    /// Two non-null operands of different types were compared.
    #[error("cannot compare {left:?} with {right:?}")]
    TypeMismatch { left: ColumnType, right: ColumnType },

    /// A predicate compares a column with a value of another type.
    #[error("column `{column}` holds {expected:?} values but the predicate uses {found:?}")]
    ValueTypeMismatch {
        column: String,
        expected: ColumnType,
        found: ColumnType,
    },
}

/// Record store operation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordStoreError {
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The record's columns do not fit the store's specification.
    #[error("invalid record: {0}")]
    InvalidRecord(#[from] SpecificationError),

    #[error("record store lock poisoned")]
    Poisoned,
}
