//! Entity → specification → store → query, end to end.

use std::sync::Arc;

use keel_core::{Entity, EntityId, LifecycleFlags};
use keel_records::{
    Column, ColumnError, ColumnName, ColumnType, ColumnValue, Direction, EntityColumns,
    EntityRecord, InMemoryRecordStore, Predicate, QueryError, RecordQuery, RecordSpecification,
    RecordStore, RecordStoreError, RecordWithColumns, SpecificationError, SpecificationRegistry,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
struct OrderState {
    total: i64,
    customer: String,
    note: Option<String>,
}

#[derive(Debug, Clone)]
struct Order {
    id: EntityId,
    state: OrderState,
    version: u64,
    lifecycle: LifecycleFlags,
}

impl Entity for Order {
    type Id = EntityId;
    type State = OrderState;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn state(&self) -> &OrderState {
        &self.state
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn lifecycle(&self) -> LifecycleFlags {
        self.lifecycle
    }
}

impl EntityColumns for Order {
    fn state_columns() -> Vec<Column<OrderState>> {
        vec![
            Column::new("total", ColumnType::Int, |s: &OrderState| s.total.into()),
            Column::new("customer", ColumnType::Text, |s: &OrderState| {
                s.customer.as_str().into()
            }),
            Column::new("note", ColumnType::Text, |s: &OrderState| s.note.clone().into()),
        ]
    }

    fn record_type() -> &'static str {
        "sales.Order"
    }
}

fn order(total: i64, customer: &str) -> Order {
    Order {
        id: EntityId::new(),
        state: OrderState {
            total,
            customer: customer.to_string(),
            note: None,
        },
        version: 1,
        lifecycle: LifecycleFlags::default(),
    }
}

fn store_with(orders: &[Order]) -> InMemoryRecordStore<Order> {
    let registry = SpecificationRegistry::new();
    let store = InMemoryRecordStore::new(registry.get::<Order>().unwrap());
    for order in orders {
        store.write_snapshot(order).unwrap();
    }
    store
}

fn customers(found: &[RecordWithColumns<EntityId, EntityRecord<OrderState>>]) -> Vec<String> {
    found
        .iter()
        .map(|r| r.record().state.customer.clone())
        .collect()
}

/// An entity whose only system column is `archived`, with one state column.
mod minimal {
    use super::*;

    pub struct Invoice {
        pub id: EntityId,
        pub total: i64,
    }

    impl Entity for Invoice {
        type Id = EntityId;
        type State = i64;

        fn id(&self) -> &EntityId {
            &self.id
        }

        fn state(&self) -> &i64 {
            &self.total
        }

        fn version(&self) -> u64 {
            1
        }
    }

    impl EntityColumns for Invoice {
        fn system_columns() -> Vec<Column<Self>> {
            vec![Column::new("archived", ColumnType::Bool, |e: &Invoice| {
                e.lifecycle().archived.into()
            })]
        }

        fn state_columns() -> Vec<Column<i64>> {
            vec![Column::new("total", ColumnType::Int, |t: &i64| (*t).into())]
        }

        fn record_type() -> &'static str {
            "billing.Invoice"
        }
    }
}

#[test]
fn values_in_merges_system_and_state_columns() {
    let spec = RecordSpecification::<minimal::Invoice>::of().unwrap();
    let invoice = minimal::Invoice {
        id: EntityId::new(),
        total: 5,
    };

    let values = spec.values_in(&invoice);

    assert_eq!(values.len(), 2);
    assert_eq!(values.get("archived"), Some(&ColumnValue::Bool(false)));
    assert_eq!(values.get("total"), Some(&ColumnValue::Int(5)));
}

#[test]
fn record_columns_match_the_specification() {
    keel_observability::init_for_tests();

    let spec = RecordSpecification::<Order>::of().unwrap();
    let order = order(12, "acme");
    let record = RecordWithColumns::create(&spec, &order, EntityRecord::of(&order));

    let mut declared: Vec<&ColumnName> = spec.column_names().collect();
    declared.sort();
    let stored: Vec<&ColumnName> = record.columns().keys().collect();

    assert_eq!(stored, declared);
    assert_eq!(record.id(), &order.id);
    assert_eq!(record.value("note"), &ColumnValue::Null);
    assert_eq!(record.value("version"), &ColumnValue::Int(1));
}

#[test]
fn unknown_column_fails_before_scanning() {
    let store = store_with(&[]);

    let err = store
        .query(&RecordQuery::matching(Predicate::equal("region", "eu")))
        .unwrap_err();

    assert_eq!(
        err,
        RecordStoreError::Query(QueryError::Column(ColumnError::not_found(
            "sales.Order",
            "region"
        )))
    );
    assert!(err.to_string().contains("sales.Order"));
    assert!(err.to_string().contains("region"));
}

#[test]
fn query_filters_orders_and_limits() {
    let store = store_with(&[
        order(40, "acme"),
        order(5, "globex"),
        order(25, "initech"),
        order(15, "umbrella"),
    ]);

    let big = RecordQuery::matching(Predicate::ge("total", 15))
        .order_by("total", Direction::Descending)
        .limit(2);
    assert_eq!(customers(&store.query(&big).unwrap()), vec!["acme", "initech"]);

    let either = RecordQuery::matching(Predicate::either([
        Predicate::equal("customer", "globex"),
        Predicate::lt("total", 20),
    ]))
    .order_by("customer", Direction::Ascending);
    assert_eq!(
        customers(&store.query(&either).unwrap()),
        vec!["globex", "umbrella"]
    );
}

#[test]
fn null_columns_compare_only_by_equality() {
    let mut noted = order(10, "acme");
    noted.state.note = Some("rush".to_string());
    let store = store_with(&[noted, order(20, "globex")]);

    let without_note = RecordQuery::matching(Predicate::equal("note", ColumnValue::Null));
    assert_eq!(customers(&store.query(&without_note).unwrap()), vec!["globex"]);

    let sorted = RecordQuery::all().order_by("note", Direction::Ascending);
    assert_eq!(customers(&store.query(&sorted).unwrap()), vec!["globex", "acme"]);

    let after = RecordQuery::matching(Predicate::gt("note", "a"));
    assert_eq!(customers(&store.query(&after).unwrap()), vec!["acme"]);
}

#[test]
fn active_query_skips_archived_and_deleted() {
    let mut archived = order(1, "archived");
    archived.lifecycle = LifecycleFlags::archived();
    let mut deleted = order(2, "deleted");
    deleted.lifecycle = LifecycleFlags::deleted();

    let store = store_with(&[archived, deleted, order(3, "live")]);

    assert_eq!(customers(&store.query(&RecordQuery::active()).unwrap()), vec!["live"]);
    assert_eq!(store.len().unwrap(), 3);
}

#[test]
fn write_replaces_and_delete_removes() {
    let mut first = order(10, "acme");
    let store = store_with(&[first.clone()]);

    first.state.total = 11;
    first.version = 2;
    store.write_snapshot(&first).unwrap();

    let stored = store.read(&first.id).unwrap().unwrap();
    assert_eq!(stored.value("total"), &ColumnValue::Int(11));
    assert_eq!(stored.record().version, 2);
    assert_eq!(store.len().unwrap(), 1);

    assert!(store.delete(&first.id).unwrap());
    assert!(!store.delete(&first.id).unwrap());
    assert!(store.read(&first.id).unwrap().is_none());
    assert!(store.is_empty().unwrap());
}

#[test]
fn shared_store_through_trait_object() {
    let store: Arc<dyn RecordStore<Order, EntityRecord<OrderState>>> = Arc::new(store_with(&[]));

    let order = order(7, "acme");
    store.write_entity(&order, EntityRecord::of(&order)).unwrap();

    assert_eq!(store.specification().record_type(), "sales.Order");
    let found = store
        .query(&RecordQuery::matching(Predicate::equal("customer", "acme")))
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].record().state, order.state);
}

#[test]
fn degraded_records_only_carry_lifecycle_columns() {
    let store = store_with(&[]);
    let order = order(3, "acme");

    store
        .write(RecordWithColumns::from_record(
            order.id,
            EntityRecord {
                state: order.state.clone(),
                version: 4,
                lifecycle: LifecycleFlags::default(),
            },
        ))
        .unwrap();

    assert_eq!(store.query(&RecordQuery::active()).unwrap().len(), 1);
    // `total` was never extracted, so it reads as null.
    assert!(store
        .query(&RecordQuery::matching(Predicate::gt("total", 0)))
        .unwrap()
        .is_empty());
}

#[test]
fn malformed_records_are_rejected_at_write_time() {
    keel_observability::init_for_tests();

    let store = store_with(&[]);
    let stray = order(1, "stray");

    let undeclared = RecordWithColumns::new(
        stray.id,
        EntityRecord::of(&stray),
        BTreeMap::from([
            (ColumnName::from("bogus"), ColumnValue::Int(1)),
            (ColumnName::from("total"), ColumnValue::Int(1)),
        ]),
    );
    assert_eq!(
        store.write(undeclared).unwrap_err(),
        RecordStoreError::InvalidRecord(SpecificationError::UndeclaredColumn {
            record_type: "sales.Order".to_string(),
            column: "bogus".to_string(),
        })
    );

    let mistyped = RecordWithColumns::new(
        stray.id,
        EntityRecord::of(&stray),
        BTreeMap::from([(ColumnName::from("total"), ColumnValue::from("five"))]),
    );
    let err = store.write(mistyped).unwrap_err();
    assert!(matches!(
        err,
        RecordStoreError::InvalidRecord(SpecificationError::TypeMismatch {
            expected: ColumnType::Int,
            found: ColumnType::Text,
            ..
        })
    ));
    assert!(err.to_string().contains("total"));
    assert!(store.is_empty().unwrap());

    // Nothing poisoned the column, so typed queries keep working.
    store.write_snapshot(&order(8, "acme")).unwrap();
    let found = store
        .query(&RecordQuery::matching(Predicate::gt("total", 0)))
        .unwrap();
    assert_eq!(customers(&found), vec!["acme"]);
}

#[test]
fn write_entity_checks_extracted_values() {
    // Same entity, but the extractor disagrees with its declared type.
    let spec = RecordSpecification::<Order>::new(
        "sales.Order",
        Order::system_columns(),
        vec![Column::new("total", ColumnType::Text, |s: &OrderState| s.total.into())],
    )
    .unwrap();
    let store = InMemoryRecordStore::new(Arc::new(spec));

    let err = store.write_snapshot(&order(3, "acme")).unwrap_err();
    assert!(matches!(
        err,
        RecordStoreError::InvalidRecord(SpecificationError::TypeMismatch { .. })
    ));
    assert!(store.is_empty().unwrap());
}
