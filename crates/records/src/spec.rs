//! Record specifications: the closed, ordered column set of an entity type.
//!
//! A specification is built **once per entity type** by scanning the columns
//! the type declares through [`EntityColumns`]. Build it through a
//! [`crate::SpecificationRegistry`] (or keep your own `Arc`) rather than
//! calling [`RecordSpecification::of`] per record.

use std::collections::{BTreeMap, HashSet};

use keel_core::Entity;

use crate::column::{Column, ColumnName, lifecycle_columns};
use crate::error::{ColumnError, SpecificationError};
use crate::value::{ColumnType, ColumnValue};

/// Column declarations of an entity type.
///
/// ```ignore
/// impl EntityColumns for Order {
///     fn state_columns() -> Vec<Column<OrderState>> {
///         vec![
///             Column::new("total", ColumnType::Int, |s: &OrderState| s.total.into()),
///             Column::new("customer", ColumnType::Text, |s: &OrderState| s.customer.as_str().into()),
///         ]
///     }
/// }
/// ```
pub trait EntityColumns: Entity + Sized {
    /// Columns over the entity wrapper; the lifecycle columns unless overridden.
    fn system_columns() -> Vec<Column<Self>> {
        lifecycle_columns::<Self>()
    }

    /// Columns over the entity state.
    fn state_columns() -> Vec<Column<Self::State>>;

    /// Record type name used in errors.
    fn record_type() -> &'static str {
        core::any::type_name::<Self::State>()
    }
}

/// Name → type lookup over a set of declared columns.
///
/// Queries validate against a catalog before touching any record.
pub trait ColumnCatalog {
    fn record_type(&self) -> &str;

    fn column_type(&self, name: &str) -> Option<ColumnType>;
}

/// A column found in a specification: either a system or a state column.
pub enum ColumnRef<'a, E: Entity> {
    System(&'a Column<E>),
    State(&'a Column<E::State>),
}

impl<'a, E: Entity> ColumnRef<'a, E> {
    pub fn name(&self) -> &'a ColumnName {
        match *self {
            Self::System(c) => c.name(),
            Self::State(c) => c.name(),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::System(c) => c.column_type(),
            Self::State(c) => c.column_type(),
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Self::System(_))
    }

    pub fn value_in(&self, entity: &E) -> ColumnValue {
        match self {
            Self::System(c) => c.value_in(entity),
            Self::State(c) => c.value_in(entity.state()),
        }
    }
}

impl<E: Entity> Clone for ColumnRef<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: Entity> Copy for ColumnRef<'_, E> {}

impl<E: Entity> core::fmt::Debug for ColumnRef<'_, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::System(c) => f.debug_tuple("System").field(c).finish(),
            Self::State(c) => f.debug_tuple("State").field(c).finish(),
        }
    }
}

/// Immutable column set of one entity type.
pub struct RecordSpecification<E: Entity> {
    record_type: String,
    system: Vec<Column<E>>,
    state: Vec<Column<E::State>>,
}

impl<E: EntityColumns> RecordSpecification<E> {
    /// Scan the columns `E` declares.
    pub fn of() -> Result<Self, SpecificationError> {
        Self::new(E::record_type(), E::system_columns(), E::state_columns())
    }

    /// Same as [`Self::of`], for callers holding an instance.
    pub fn of_entity(_entity: &E) -> Result<Self, SpecificationError> {
        Self::of()
    }
}

impl<E: Entity> RecordSpecification<E> {
    /// Build from explicit column lists.
    ///
    /// Fails if any name appears twice, within a list or across both.
    pub fn new(
        record_type: impl Into<String>,
        system: Vec<Column<E>>,
        state: Vec<Column<E::State>>,
    ) -> Result<Self, SpecificationError> {
        let record_type = record_type.into();

        let mut seen = HashSet::new();
        let names = system.iter().map(Column::name).chain(state.iter().map(Column::name));
        for name in names {
            if !seen.insert(name.as_str()) {
                return Err(SpecificationError::DuplicateColumn {
                    record_type,
                    column: name.to_string(),
                });
            }
        }

        Ok(Self {
            record_type,
            system,
            state,
        })
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    pub fn system_columns(&self) -> &[Column<E>] {
        &self.system
    }

    pub fn state_columns(&self) -> &[Column<E::State>] {
        &self.state
    }

    /// Every declared column name, system columns first.
    pub fn column_names(&self) -> impl Iterator<Item = &ColumnName> {
        self.system
            .iter()
            .map(Column::name)
            .chain(self.state.iter().map(Column::name))
    }

    pub fn len(&self) -> usize {
        self.system.len() + self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evaluate every column against `entity`.
    ///
    /// The key set is exactly the declared column names.
    pub fn values_in(&self, entity: &E) -> BTreeMap<ColumnName, ColumnValue> {
        let system = self
            .system
            .iter()
            .map(|c| (c.name().clone(), c.value_in(entity)));
        let state = entity.state();
        let state = self
            .state
            .iter()
            .map(|c| (c.name().clone(), c.value_in(state)));
        system.chain(state).collect()
    }

    /// Like [`Self::values_in`], but fails if a value contradicts its column type.
    pub fn checked_values_in(
        &self,
        entity: &E,
    ) -> Result<BTreeMap<ColumnName, ColumnValue>, SpecificationError> {
        let values = self.values_in(entity);
        self.check_columns(&values)?;
        Ok(values)
    }

    /// Check externally built columns: every key must be declared and every
    /// value must conform to its column type. Missing keys are allowed.
    pub fn check_columns(
        &self,
        columns: &BTreeMap<ColumnName, ColumnValue>,
    ) -> Result<(), SpecificationError> {
        for (name, value) in columns {
            let Some(expected) = self.column_type(name.as_str()) else {
                return Err(SpecificationError::UndeclaredColumn {
                    record_type: self.record_type.clone(),
                    column: name.to_string(),
                });
            };
            // Null conforms to every type.
            if let Some(found) = value.column_type().filter(|found| *found != expected) {
                return Err(SpecificationError::TypeMismatch {
                    record_type: self.record_type.clone(),
                    column: name.to_string(),
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }

    pub fn id_value_in(&self, entity: &E) -> E::Id {
        entity.id().clone()
    }

    /// Look a column up by name: state columns first, then system columns.
    pub fn find_column(&self, name: &str) -> Option<ColumnRef<'_, E>> {
        self.state
            .iter()
            .find(|c| c.name().as_str() == name)
            .map(ColumnRef::State)
            .or_else(|| {
                self.system
                    .iter()
                    .find(|c| c.name().as_str() == name)
                    .map(ColumnRef::System)
            })
    }

    /// Like [`Self::find_column`], but a missing column is an error.
    pub fn get(&self, name: &str) -> Result<ColumnRef<'_, E>, ColumnError> {
        self.find_column(name)
            .ok_or_else(|| ColumnError::not_found(self.record_type.as_str(), name))
    }
}

impl<E: Entity> ColumnCatalog for RecordSpecification<E> {
    fn record_type(&self) -> &str {
        &self.record_type
    }

    fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.find_column(name).map(|c| c.column_type())
    }
}

impl<E: Entity> core::fmt::Debug for RecordSpecification<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RecordSpecification")
            .field("record_type", &self.record_type)
            .field("system", &self.system)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::{EntityId, LifecycleFlags};

    #[derive(Debug, Clone)]
    struct InvoiceState {
        total: i64,
        customer: String,
    }

    #[derive(Debug, Clone)]
    struct Invoice {
        id: EntityId,
        state: InvoiceState,
        version: u64,
        lifecycle: LifecycleFlags,
    }

    impl Entity for Invoice {
        type Id = EntityId;
        type State = InvoiceState;

        fn id(&self) -> &EntityId {
            &self.id
        }

        fn state(&self) -> &InvoiceState {
            &self.state
        }

        fn version(&self) -> u64 {
            self.version
        }

        fn lifecycle(&self) -> LifecycleFlags {
            self.lifecycle
        }
    }

    impl EntityColumns for Invoice {
        fn system_columns() -> Vec<Column<Self>> {
            vec![Column::new("archived", ColumnType::Bool, |e: &Invoice| {
                e.lifecycle.archived.into()
            })]
        }

        fn state_columns() -> Vec<Column<InvoiceState>> {
            vec![
                Column::new("total", ColumnType::Int, |s: &InvoiceState| s.total.into()),
                Column::new("customer", ColumnType::Text, |s: &InvoiceState| {
                    s.customer.as_str().into()
                }),
            ]
        }

        fn record_type() -> &'static str {
            "billing.Invoice"
        }
    }

    fn invoice(total: i64) -> Invoice {
        Invoice {
            id: EntityId::new(),
            state: InvoiceState {
                total,
                customer: "acme".to_string(),
            },
            version: 3,
            lifecycle: LifecycleFlags::default(),
        }
    }

    #[test]
    fn values_cover_system_and_state_columns() {
        let spec = RecordSpecification::<Invoice>::of().unwrap();
        let values = spec.values_in(&invoice(5));

        assert_eq!(values.get("archived"), Some(&ColumnValue::Bool(false)));
        assert_eq!(values.get("total"), Some(&ColumnValue::Int(5)));
        assert_eq!(values.get("customer"), Some(&ColumnValue::from("acme")));

        let keys: Vec<&str> = values.keys().map(ColumnName::as_str).collect();
        let mut declared: Vec<&str> = spec.column_names().map(ColumnName::as_str).collect();
        declared.sort();
        assert_eq!(keys, declared);
    }

    #[test]
    fn find_and_get_resolve_both_kinds() {
        let spec = RecordSpecification::<Invoice>::of().unwrap();

        let total = spec.find_column("total").unwrap();
        assert!(!total.is_system());
        assert_eq!(total.column_type(), ColumnType::Int);

        let archived = spec.get("archived").unwrap();
        assert!(archived.is_system());
        assert_eq!(archived.value_in(&invoice(1)), ColumnValue::Bool(false));

        assert!(spec.find_column("missing").is_none());
        assert_eq!(
            spec.get("missing").unwrap_err(),
            ColumnError::not_found("billing.Invoice", "missing")
        );
    }

    #[test]
    fn state_column_may_not_reuse_a_system_name() {
        let err = RecordSpecification::<Invoice>::new(
            "billing.Invoice",
            Invoice::system_columns(),
            vec![Column::new("archived", ColumnType::Bool, |_s: &InvoiceState| {
                true.into()
            })],
        )
        .unwrap_err();

        assert_eq!(
            err,
            SpecificationError::DuplicateColumn {
                record_type: "billing.Invoice".to_string(),
                column: "archived".to_string(),
            }
        );
    }

    #[test]
    fn id_is_taken_from_the_entity() {
        let spec = RecordSpecification::<Invoice>::of().unwrap();
        let inv = invoice(1);
        assert_eq!(spec.id_value_in(&inv), inv.id);
    }

    #[test]
    fn checked_values_reject_contradicting_extractors() {
        let spec = RecordSpecification::<Invoice>::new(
            "billing.Invoice",
            vec![],
            vec![Column::new("total", ColumnType::Text, |s: &InvoiceState| {
                s.total.into()
            })],
        )
        .unwrap();

        let err = spec.checked_values_in(&invoice(9)).unwrap_err();
        assert!(matches!(
            err,
            SpecificationError::TypeMismatch { expected: ColumnType::Text, found: ColumnType::Int, .. }
        ));
    }

    #[test]
    fn foreign_columns_are_checked_against_the_declared_ones() {
        let spec = RecordSpecification::<Invoice>::of().unwrap();

        let partial = BTreeMap::from([
            (ColumnName::from("total"), ColumnValue::Int(4)),
            (ColumnName::from("customer"), ColumnValue::Null),
        ]);
        assert_eq!(spec.check_columns(&partial), Ok(()));

        let undeclared = BTreeMap::from([(ColumnName::from("region"), ColumnValue::from("eu"))]);
        assert_eq!(
            spec.check_columns(&undeclared),
            Err(SpecificationError::UndeclaredColumn {
                record_type: "billing.Invoice".to_string(),
                column: "region".to_string(),
            })
        );

        let mistyped = BTreeMap::from([(ColumnName::from("total"), ColumnValue::from("five"))]);
        assert_eq!(
            spec.check_columns(&mistyped),
            Err(SpecificationError::TypeMismatch {
                record_type: "billing.Invoice".to_string(),
                column: "total".to_string(),
                expected: ColumnType::Int,
                found: ColumnType::Text,
            })
        );
    }

    #[test]
    fn default_system_columns_are_the_lifecycle_ones() {
        struct Bare(EntityId, ());

        impl Entity for Bare {
            type Id = EntityId;
            type State = ();

            fn id(&self) -> &EntityId {
                &self.0
            }

            fn state(&self) -> &() {
                &self.1
            }

            fn version(&self) -> u64 {
                7
            }
        }

        impl EntityColumns for Bare {
            fn state_columns() -> Vec<Column<()>> {
                vec![]
            }
        }

        let spec = RecordSpecification::<Bare>::of().unwrap();
        let values = spec.values_in(&Bare(EntityId::new(), ()));
        assert_eq!(values.get("archived"), Some(&ColumnValue::Bool(false)));
        assert_eq!(values.get("deleted"), Some(&ColumnValue::Bool(false)));
        assert_eq!(values.get("version"), Some(&ColumnValue::Int(7)));
    }
}
