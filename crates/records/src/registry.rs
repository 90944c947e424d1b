//! Process-wide cache of record specifications, one per entity type.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::SpecificationError;
use crate::spec::{EntityColumns, RecordSpecification};

type AnySpecification = Arc<dyn Any + Send + Sync>;

/// Builds each entity type's specification on first use and hands out the
/// same `Arc` afterwards.
#[derive(Default)]
pub struct SpecificationRegistry {
    specs: RwLock<HashMap<TypeId, AnySpecification>>,
}

impl SpecificationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Specification of `E`, scanning its columns if this is the first request.
    pub fn get<E: EntityColumns>(&self) -> Result<Arc<RecordSpecification<E>>, SpecificationError> {
        let key = TypeId::of::<E>();

        if let Some(found) = self
            .specs
            .read()
            .map_err(|_| SpecificationError::Poisoned)?
            .get(&key)
        {
            return downcast::<E>(Arc::clone(found));
        }

        let built = Arc::new(RecordSpecification::<E>::of()?);

        let mut specs = self.specs.write().map_err(|_| SpecificationError::Poisoned)?;
        // Another caller may have built it between the two locks; keep theirs.
        let entry = specs
            .entry(key)
            .or_insert_with(|| built as AnySpecification);
        tracing::debug!(record_type = E::record_type(), "record specification cached");
        downcast::<E>(Arc::clone(entry))
    }

    pub fn contains<E: EntityColumns>(&self) -> bool {
        self.specs
            .read()
            .map(|specs| specs.contains_key(&TypeId::of::<E>()))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.specs.read().map(|specs| specs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn downcast<E: EntityColumns>(
    spec: AnySpecification,
) -> Result<Arc<RecordSpecification<E>>, SpecificationError> {
    // Keys are the `TypeId` of `E`, so the stored value is always `RecordSpecification<E>`.
    spec.downcast::<RecordSpecification<E>>()
        .map_err(|_| SpecificationError::Poisoned)
}

impl core::fmt::Debug for SpecificationRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpecificationRegistry")
            .field("len", &self.len())
            .finish()
    }
}
