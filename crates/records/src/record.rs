//! Stored records: a payload plus the column values extracted from it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use keel_core::{Entity, LifecycleFlags};

use crate::column::{ARCHIVED, ColumnName, DELETED, VERSION, version_value};
use crate::spec::RecordSpecification;
use crate::value::{ColumnValue, NULL};

/// Payloads that carry the lifecycle columns themselves.
pub trait LifecycleRecord {
    fn lifecycle(&self) -> LifecycleFlags;

    fn version(&self) -> u64;
}

/// Default stored payload: a snapshot of an entity's state and lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRecord<S> {
    pub state: S,
    pub version: u64,
    pub lifecycle: LifecycleFlags,
}

impl<S: Clone> EntityRecord<S> {
    pub fn of<E>(entity: &E) -> Self
    where
        E: Entity<State = S>,
    {
        Self {
            state: entity.state().clone(),
            version: entity.version(),
            lifecycle: entity.lifecycle(),
        }
    }
}

impl<S> LifecycleRecord for EntityRecord<S> {
    fn lifecycle(&self) -> LifecycleFlags {
        self.lifecycle
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// A record keyed by entity id, with its column values stored alongside.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordWithColumns<I, R> {
    id: I,
    record: R,
    columns: BTreeMap<ColumnName, ColumnValue>,
}

impl<I, R> RecordWithColumns<I, R> {
    pub fn new(id: I, record: R, columns: BTreeMap<ColumnName, ColumnValue>) -> Self {
        Self {
            id,
            record,
            columns,
        }
    }

    /// Extract every column of `spec` from `entity` and pair them with `record`.
    pub fn create<E>(spec: &RecordSpecification<E>, entity: &E, record: R) -> Self
    where
        E: Entity<Id = I>,
    {
        Self::new(spec.id_value_in(entity), record, spec.values_in(entity))
    }

    pub fn id(&self) -> &I {
        &self.id
    }

    pub fn record(&self) -> &R {
        &self.record
    }

    pub fn columns(&self) -> &BTreeMap<ColumnName, ColumnValue> {
        &self.columns
    }

    /// Value of `column`, or `Null` when the record does not carry it.
    pub fn value(&self, column: &str) -> &ColumnValue {
        self.columns.get(column).unwrap_or(&NULL)
    }

    pub fn into_parts(self) -> (I, R, BTreeMap<ColumnName, ColumnValue>) {
        (self.id, self.record, self.columns)
    }
}

impl<I, R: LifecycleRecord> RecordWithColumns<I, R> {
    /// Build from a payload that knows its own lifecycle; only the lifecycle
    /// columns are populated.
    pub fn from_record(id: I, record: R) -> Self {
        let lifecycle = record.lifecycle();
        let columns = BTreeMap::from([
            (ColumnName::new(ARCHIVED), lifecycle.archived.into()),
            (ColumnName::new(DELETED), lifecycle.deleted.into()),
            (ColumnName::new(VERSION), version_value(record.version())),
        ]);
        Self::new(id, record, columns)
    }
}
