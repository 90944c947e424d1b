//! `keel-records`: columnar record specifications and in-memory querying.
//!
//! ```text
//! Entity ─ RecordSpecification::values_in ─▶ RecordWithColumns ─▶ RecordStore::write
//! RecordStore::query(RecordQuery) ─ Predicate::matches per record ─▶ matching records
//! ```
//!
//! Columns let a store filter and order entities without deserializing their
//! full state: each column is extracted once, at write time.

pub mod column;
pub mod error;
pub mod query;
pub mod record;
pub mod registry;
pub mod spec;
pub mod store;
pub mod value;

pub use column::{Column, ColumnName, lifecycle_columns};
pub use error::{ColumnError, QueryError, RecordStoreError, SpecificationError};
pub use query::{Direction, Operator, OrderBy, Predicate, RecordQuery, eval};
pub use record::{EntityRecord, LifecycleRecord, RecordWithColumns};
pub use registry::SpecificationRegistry;
pub use spec::{ColumnCatalog, ColumnRef, EntityColumns, RecordSpecification};
pub use store::{InMemoryRecordStore, RecordStore};
pub use value::{ColumnType, ColumnValue};
