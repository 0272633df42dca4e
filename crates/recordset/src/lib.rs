//! Pull-based relational operators over record sets.
//!
//! A [`RecordSet`] is a schema-bearing source of records; iterating it
//! drives evaluation. Operators wrap their upstream lazily — nothing is
//! materialized except where ordering and grouping require it.
//!
//! ```text
//! Table → Join* → Filter → GroupBy+Aggregate | Aggregated → Projection → OrderBy
//! ```
//!
//! Each operator pulls rows from its upstream through a [`Cursor`], the
//! engine's Volcano-style `next()` loop. The [`Select`] builder composes
//! the operators in that fixed order.

mod aggregated;
mod filter;
mod join;
mod project;
mod select;
mod sort;

pub use aggregated::{Aggregated, GroupBy};
pub use filter::Filter;
pub use join::{Join, JoinKind};
pub use project::Projection;
pub use select::{select_from, Select};
pub use sort::{asc, desc, OrderBy, SortKey};

use common::{pretty, EngineError, EngineResult};
use expr::{ColumnSet, Expr, Record};
use std::rc::Rc;

/// A schema-bearing, lazily iterable sequence of records.
pub trait RecordSet {
    /// The expressions describing the row shape this set produces.
    fn schema(&self) -> &ColumnSet;

    /// Open a cursor over this set. Each call starts a fresh iteration.
    fn scan(&self) -> EngineResult<Box<dyn Cursor + '_>>;
}

impl std::fmt::Debug for dyn RecordSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordSet").field("schema", self.schema()).finish()
    }
}

/// Pull-based iteration: `next` yields the next record or `None` when the
/// set is exhausted. Errors abort the iteration.
pub trait Cursor {
    fn next(&mut self) -> EngineResult<Option<Record>>;
}

/// Shared handle to a record set. The engine is single-threaded, so
/// reference counting does not need atomics.
pub type SharedRecordSet = Rc<dyn RecordSet>;

/// Materialized record set: wraps rows that already exist in memory.
/// Group-by output and test fixtures use this.
pub struct SimpleRecordSet {
    schema: Rc<ColumnSet>,
    records: Vec<Record>,
}

impl SimpleRecordSet {
    pub fn new(schema: Rc<ColumnSet>, records: Vec<Record>) -> Self {
        SimpleRecordSet { schema, records }
    }

    /// Build from records alone, taking the schema of the first one.
    pub fn from_records(records: Vec<Record>) -> Self {
        let schema = records
            .first()
            .map(Record::schema_rc)
            .unwrap_or_else(|| Rc::new(ColumnSet::default()));
        SimpleRecordSet { schema, records }
    }
}

impl RecordSet for SimpleRecordSet {
    fn schema(&self) -> &ColumnSet {
        &self.schema
    }

    fn scan(&self) -> EngineResult<Box<dyn Cursor + '_>> {
        Ok(Box::new(SliceCursor {
            records: &self.records,
            pos: 0,
        }))
    }
}

struct SliceCursor<'a> {
    records: &'a [Record],
    pos: usize,
}

impl Cursor for SliceCursor<'_> {
    fn next(&mut self) -> EngineResult<Option<Record>> {
        let record = self.records.get(self.pos).cloned();
        self.pos += 1;
        Ok(record)
    }
}

/// Convenience methods available on every record set, `dyn` included.
pub trait RecordSetExt: RecordSet {
    /// Drain the set into a vector.
    fn collect(&self) -> EngineResult<Vec<Record>> {
        let mut cursor = self.scan()?;
        let mut records = Vec::new();
        while let Some(record) = cursor.next()? {
            records.push(record);
        }
        Ok(records)
    }

    /// Render the set as a console table, optionally truncated.
    fn render(&self, max_records: Option<usize>) -> EngineResult<String> {
        let headers = self.schema().names();
        let mut cursor = self.scan()?;
        let mut rows = Vec::new();
        while let Some(record) = cursor.next()? {
            rows.push(record.values_in_schema_order());
            if max_records.is_some_and(|max| rows.len() >= max) {
                break;
            }
        }
        Ok(pretty::render_rows(&headers, &rows, pretty::TableStyleKind::Ascii))
    }
}

impl<T: RecordSet + ?Sized> RecordSetExt for T {}

/// Operator methods: each wraps the receiver in a new record set.
pub trait RecordSetOps {
    fn select(&self, exprs: Vec<Expr>) -> SharedRecordSet;
    fn filter(&self, predicate: Expr) -> EngineResult<SharedRecordSet>;
    fn order_by(&self, keys: Vec<SortKey>) -> EngineResult<SharedRecordSet>;
    fn aggregate(&self, aggregations: Vec<Expr>) -> EngineResult<SharedRecordSet>;
    fn group_by(&self, keys: Vec<Expr>) -> GroupBy;
    fn join(
        &self,
        other: SharedRecordSet,
        left_key: Option<Expr>,
        right_key: Option<Expr>,
        condition: Option<Expr>,
        kind: JoinKind,
    ) -> EngineResult<SharedRecordSet>;
}

impl RecordSetOps for SharedRecordSet {
    fn select(&self, exprs: Vec<Expr>) -> SharedRecordSet {
        Rc::new(Projection::new(Rc::clone(self), exprs))
    }

    fn filter(&self, predicate: Expr) -> EngineResult<SharedRecordSet> {
        Ok(Rc::new(Filter::new(Rc::clone(self), predicate)?))
    }

    fn order_by(&self, keys: Vec<SortKey>) -> EngineResult<SharedRecordSet> {
        Ok(Rc::new(OrderBy::new(Rc::clone(self), keys)?))
    }

    fn aggregate(&self, aggregations: Vec<Expr>) -> EngineResult<SharedRecordSet> {
        Ok(Rc::new(Aggregated::new(Rc::clone(self), aggregations)?))
    }

    fn group_by(&self, keys: Vec<Expr>) -> GroupBy {
        GroupBy::new(Rc::clone(self), keys)
    }

    fn join(
        &self,
        other: SharedRecordSet,
        left_key: Option<Expr>,
        right_key: Option<Expr>,
        condition: Option<Expr>,
        kind: JoinKind,
    ) -> EngineResult<SharedRecordSet> {
        Ok(Rc::new(Join::new(
            Rc::clone(self),
            other,
            left_key,
            right_key,
            condition,
            kind,
        )?))
    }
}

/// Verify that every field an expression reads exists in the schema.
/// Shared by the filter and ordering builders.
pub(crate) fn check_references(schema: &ColumnSet, expr: &Expr) -> EngineResult<()> {
    for (name, original) in expr.referenced_fields() {
        if !schema.contains_name(&name) && !schema.contains_name(&original) {
            return Err(EngineError::SchemaMismatch(format!(
                "'{}' references '{name}' which is not in the column set",
                expr.name()
            )));
        }
    }
    Ok(())
}
