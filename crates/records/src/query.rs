//! Column predicates and in-memory query evaluation.
//!
//! Everything here is pure: predicates are plain values, evaluation reads only
//! the column map of one record at a time.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::column::{ARCHIVED, ColumnName, DELETED};
use crate::error::{ColumnError, QueryError};
use crate::record::RecordWithColumns;
use crate::spec::ColumnCatalog;
use crate::value::{ColumnType, ColumnValue, NULL};

/// Comparison operators over two column values.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equal,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
}

impl core::fmt::Display for Operator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Equal => "=",
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
        })
    }
}

/// Compare `left` with `right`.
///
/// `Null` only takes part in `Equal` (`Null = Null` holds); every ordering
/// comparison involving `Null` is `false`. Two non-null values of different
/// types are an error.
pub fn eval(operator: Operator, left: &ColumnValue, right: &ColumnValue) -> Result<bool, QueryError> {
    match (left.column_type(), right.column_type()) {
        (None, None) => return Ok(operator == Operator::Equal),
        (None, Some(_)) | (Some(_), None) => return Ok(false),
        (Some(l), Some(r)) if l != r => return Err(QueryError::TypeMismatch { left: l, right: r }),
        _ => {}
    }

    let ordering = left.cmp(right);
    Ok(match operator {
        Operator::Equal => ordering == Ordering::Equal,
        Operator::GreaterThan => ordering == Ordering::Greater,
        Operator::LessThan => ordering == Ordering::Less,
        Operator::GreaterOrEqual => ordering != Ordering::Less,
        Operator::LessOrEqual => ordering != Ordering::Greater,
    })
}

/// A filter over the column values of one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Const(bool),
    Compare {
        column: ColumnName,
        operator: Operator,
        value: ColumnValue,
    },
    /// Conjunction; `true` when empty.
    All(Vec<Predicate>),
    /// Disjunction; `false` when empty.
    Either(Vec<Predicate>),
}

impl Predicate {
    pub fn always() -> Self {
        Self::Const(true)
    }

    pub fn compare(
        column: impl Into<ColumnName>,
        operator: Operator,
        value: impl Into<ColumnValue>,
    ) -> Self {
        Self::Compare {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn equal(column: impl Into<ColumnName>, value: impl Into<ColumnValue>) -> Self {
        Self::compare(column, Operator::Equal, value)
    }

    pub fn gt(column: impl Into<ColumnName>, value: impl Into<ColumnValue>) -> Self {
        Self::compare(column, Operator::GreaterThan, value)
    }

    pub fn lt(column: impl Into<ColumnName>, value: impl Into<ColumnValue>) -> Self {
        Self::compare(column, Operator::LessThan, value)
    }

    pub fn ge(column: impl Into<ColumnName>, value: impl Into<ColumnValue>) -> Self {
        Self::compare(column, Operator::GreaterOrEqual, value)
    }

    pub fn le(column: impl Into<ColumnName>, value: impl Into<ColumnValue>) -> Self {
        Self::compare(column, Operator::LessOrEqual, value)
    }

    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self::All(predicates.into_iter().collect())
    }

    pub fn either(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self::Either(predicates.into_iter().collect())
    }

    /// Evaluate against a record's columns. A column the record does not
    /// carry reads as `Null`.
    ///
    /// Sub-predicates run in declaration order; `All` stops at the first
    /// `false`, `Either` at the first `true`.
    pub fn matches(&self, columns: &BTreeMap<ColumnName, ColumnValue>) -> Result<bool, QueryError> {
        match self {
            Self::Const(value) => Ok(*value),
            Self::Compare {
                column,
                operator,
                value,
            } => {
                let stored = columns.get(column).unwrap_or(&NULL);
                eval(*operator, stored, value)
            }
            Self::All(predicates) => {
                for predicate in predicates {
                    if !predicate.matches(columns)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Either(predicates) => {
                for predicate in predicates {
                    if predicate.matches(columns)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    /// Check every referenced column against `catalog`.
    pub fn validate(&self, catalog: &dyn ColumnCatalog) -> Result<(), QueryError> {
        match self {
            Self::Const(_) => Ok(()),
            Self::Compare { column, value, .. } => {
                let expected = column_type_in(catalog, column)?;
                match value.column_type() {
                    Some(found) if found != expected => Err(QueryError::ValueTypeMismatch {
                        column: column.to_string(),
                        expected,
                        found,
                    }),
                    _ => Ok(()),
                }
            }
            Self::All(predicates) | Self::Either(predicates) => predicates
                .iter()
                .try_for_each(|predicate| predicate.validate(catalog)),
        }
    }
}

impl Default for Predicate {
    fn default() -> Self {
        Self::always()
    }
}

fn column_type_in(
    catalog: &dyn ColumnCatalog,
    column: &ColumnName,
) -> Result<ColumnType, QueryError> {
    catalog
        .column_type(column.as_str())
        .ok_or_else(|| ColumnError::not_found(catalog.record_type(), column.as_str()).into())
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: ColumnName,
    pub direction: Direction,
}

/// Predicate plus optional ordering and limit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordQuery {
    pub predicate: Predicate,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
}

impl RecordQuery {
    /// Every record.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matching(predicate: Predicate) -> Self {
        Self {
            predicate,
            ..Self::default()
        }
    }

    /// Records that are neither archived nor deleted.
    pub fn active() -> Self {
        Self::matching(Predicate::all([
            Predicate::equal(ARCHIVED, false),
            Predicate::equal(DELETED, false),
        ]))
    }

    /// Append a sort key; earlier keys take precedence.
    pub fn order_by(mut self, column: impl Into<ColumnName>, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check the predicate and sort keys against `catalog`.
    pub fn validate(&self, catalog: &dyn ColumnCatalog) -> Result<(), QueryError> {
        self.predicate.validate(catalog)?;
        self.order_by
            .iter()
            .try_for_each(|order| column_type_in(catalog, &order.column).map(|_| ()))
    }

    /// Filter, sort and truncate `records`.
    ///
    /// Ascending order puts `Null` first. Records that compare equal keep
    /// their input order.
    pub fn apply<'a, I, R>(
        &self,
        records: impl IntoIterator<Item = &'a RecordWithColumns<I, R>>,
    ) -> Result<Vec<&'a RecordWithColumns<I, R>>, QueryError>
    where
        I: 'a,
        R: 'a,
    {
        let mut matched = Vec::new();
        for record in records {
            if self.predicate.matches(record.columns())? {
                matched.push(record);
            }
        }

        if !self.order_by.is_empty() {
            matched.sort_by(|a, b| self.compare(a, b));
        }
        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    fn compare<I, R>(&self, a: &RecordWithColumns<I, R>, b: &RecordWithColumns<I, R>) -> Ordering {
        self.order_by
            .iter()
            .map(|order| {
                let ordering = a.value(order.column.as_str()).cmp(b.value(order.column.as_str()));
                match order.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}
