use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use keel_core::Entity;

use crate::error::RecordStoreError;
use crate::query::RecordQuery;
use crate::record::{EntityRecord, RecordWithColumns};
use crate::spec::RecordSpecification;

/// Keyed storage of records with columns, queryable by column predicates.
pub trait RecordStore<E: Entity, R>: Send + Sync {
    /// Column set every stored record is extracted with.
    fn specification(&self) -> &RecordSpecification<E>;

    /// Insert or replace the record stored under its id.
    ///
    /// Fails with [`RecordStoreError::InvalidRecord`] if a column key is not
    /// declared by the specification or a value contradicts its column type.
    fn write(&self, record: RecordWithColumns<E::Id, R>) -> Result<(), RecordStoreError>;

    fn read(&self, id: &E::Id) -> Result<Option<RecordWithColumns<E::Id, R>>, RecordStoreError>;

    /// Remove the record; `false` if nothing was stored under `id`.
    fn delete(&self, id: &E::Id) -> Result<bool, RecordStoreError>;

    fn query(&self, query: &RecordQuery) -> Result<Vec<RecordWithColumns<E::Id, R>>, RecordStoreError>;

    fn len(&self) -> Result<usize, RecordStoreError>;

    /// Extract the columns of `entity` and store them with `record`.
    fn write_entity(&self, entity: &E, record: R) -> Result<(), RecordStoreError> {
        let spec = self.specification();
        let columns = spec.checked_values_in(entity)?;
        self.write(RecordWithColumns::new(spec.id_value_in(entity), record, columns))
    }

    fn is_empty(&self) -> Result<bool, RecordStoreError> {
        Ok(self.len()? == 0)
    }
}

impl<E, R, S> RecordStore<E, R> for Arc<S>
where
    E: Entity,
    S: RecordStore<E, R> + ?Sized,
{
    fn specification(&self) -> &RecordSpecification<E> {
        (**self).specification()
    }

    fn write(&self, record: RecordWithColumns<E::Id, R>) -> Result<(), RecordStoreError> {
        (**self).write(record)
    }

    fn read(&self, id: &E::Id) -> Result<Option<RecordWithColumns<E::Id, R>>, RecordStoreError> {
        (**self).read(id)
    }

    fn delete(&self, id: &E::Id) -> Result<bool, RecordStoreError> {
        (**self).delete(id)
    }

    fn query(&self, query: &RecordQuery) -> Result<Vec<RecordWithColumns<E::Id, R>>, RecordStoreError> {
        (**self).query(query)
    }

    fn len(&self) -> Result<usize, RecordStoreError> {
        (**self).len()
    }
}

/// In-memory record store for tests/dev.
///
/// Queries are validated against the store's specification before any record
/// is scanned, so an unknown column fails even on an empty store.
pub struct InMemoryRecordStore<E: Entity, R = EntityRecord<<E as Entity>::State>> {
    spec: Arc<RecordSpecification<E>>,
    records: RwLock<HashMap<E::Id, RecordWithColumns<E::Id, R>>>,
}

impl<E: Entity, R> InMemoryRecordStore<E, R> {
    pub fn new(spec: Arc<RecordSpecification<E>>) -> Self {
        Self {
            spec,
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl<E> InMemoryRecordStore<E>
where
    E: Entity,
    E::State: Clone,
{
    /// Store a snapshot of `entity` as an [`EntityRecord`].
    pub fn write_snapshot(&self, entity: &E) -> Result<(), RecordStoreError> {
        self.write_entity(entity, EntityRecord::of(entity))
    }
}

impl<E, R> RecordStore<E, R> for InMemoryRecordStore<E, R>
where
    E: Entity,
    R: Clone + Send + Sync + 'static,
{
    fn specification(&self) -> &RecordSpecification<E> {
        &self.spec
    }

    fn write(&self, record: RecordWithColumns<E::Id, R>) -> Result<(), RecordStoreError> {
        if let Err(err) = self.spec.check_columns(record.columns()) {
            tracing::warn!(record_type = self.spec.record_type(), error = %err, "record rejected");
            return Err(err.into());
        }

        let mut records = self.records.write().map_err(|_| RecordStoreError::Poisoned)?;
        let id = record.id().clone();
        let replaced = records.insert(id, record).is_some();
        tracing::debug!(record_type = self.spec.record_type(), replaced, "record written");
        Ok(())
    }

    fn read(&self, id: &E::Id) -> Result<Option<RecordWithColumns<E::Id, R>>, RecordStoreError> {
        let records = self.records.read().map_err(|_| RecordStoreError::Poisoned)?;
        Ok(records.get(id).cloned())
    }

    fn delete(&self, id: &E::Id) -> Result<bool, RecordStoreError> {
        let mut records = self.records.write().map_err(|_| RecordStoreError::Poisoned)?;
        Ok(records.remove(id).is_some())
    }

    fn query(&self, query: &RecordQuery) -> Result<Vec<RecordWithColumns<E::Id, R>>, RecordStoreError> {
        query.validate(self.spec.as_ref())?;

        let records = self.records.read().map_err(|_| RecordStoreError::Poisoned)?;
        let found: Vec<_> = query
            .apply(records.values())?
            .into_iter()
            .cloned()
            .collect();

        tracing::debug!(
            record_type = self.spec.record_type(),
            scanned = records.len(),
            matched = found.len(),
            "record query evaluated"
        );
        Ok(found)
    }

    fn len(&self) -> Result<usize, RecordStoreError> {
        let records = self.records.read().map_err(|_| RecordStoreError::Poisoned)?;
        Ok(records.len())
    }
}

impl<E: Entity, R> core::fmt::Debug for InMemoryRecordStore<E, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryRecordStore")
            .field("record_type", &self.spec.record_type())
            .field("len", &self.records.read().map(|r| r.len()).ok())
            .finish()
    }
}
