//! OrderBy: materializes the upstream and yields it in sorted order.

use crate::{check_references, Cursor, RecordSet, SharedRecordSet};
use common::EngineResult;
use expr::{ColumnSet, CompiledExpr, Expr, Record};
use std::cmp::Ordering;
use std::rc::Rc;
use types::Value;

/// One ordering: an expression and a direction. Descending inverts the
/// comparison order, so it works for every value type, not only ones
/// supporting negation.
#[derive(Clone, Debug)]
pub struct SortKey {
    pub expr: Expr,
    pub descending: bool,
}

/// Ascending sort key.
pub fn asc(expr: impl Into<Expr>) -> SortKey {
    SortKey {
        expr: expr.into(),
        descending: false,
    }
}

/// Descending sort key.
pub fn desc(expr: impl Into<Expr>) -> SortKey {
    SortKey {
        expr: expr.into(),
        descending: true,
    }
}

impl From<Expr> for SortKey {
    fn from(expr: Expr) -> Self {
        asc(expr)
    }
}

#[derive(Debug)]
pub struct OrderBy {
    source: SharedRecordSet,
    schema: Rc<ColumnSet>,
    keys: Vec<(SortKey, CompiledExpr)>,
}

impl OrderBy {
    /// Wrap `source`, sorting by `keys` in order. Referenced fields are
    /// checked against the upstream schema at build time.
    pub fn new(source: SharedRecordSet, keys: Vec<SortKey>) -> EngineResult<OrderBy> {
        for key in &keys {
            check_references(source.schema(), &key.expr)?;
        }
        let schema = Rc::new(source.schema().clone());
        let keys = keys
            .into_iter()
            .map(|key| {
                let compiled = key.expr.compile();
                (key, compiled)
            })
            .collect();
        Ok(OrderBy {
            source,
            schema,
            keys,
        })
    }

    fn materialize_sorted(&self) -> EngineResult<Vec<Record>> {
        let mut cursor = self.source.scan()?;
        let mut keyed: Vec<(Vec<Value>, Record)> = Vec::new();
        while let Some(record) = cursor.next()? {
            let mut key_values = Vec::with_capacity(self.keys.len());
            for (_, compiled) in &self.keys {
                key_values.push(compiled.eval(&record)?);
            }
            keyed.push((key_values, record));
        }

        let directions: Vec<bool> = self.keys.iter().map(|(k, _)| k.descending).collect();
        keyed.sort_by(|(a, _), (b, _)| compare_key_tuples(a, b, &directions));

        Ok(keyed.into_iter().map(|(_, record)| record).collect())
    }
}

fn compare_key_tuples(a: &[Value], b: &[Value], descending: &[bool]) -> Ordering {
    for ((x, y), desc) in a.iter().zip(b.iter()).zip(descending.iter()) {
        let ordering = x.cmp_for_sort(y);
        let directed = if *desc { ordering.reverse() } else { ordering };
        if directed != Ordering::Equal {
            return directed;
        }
    }
    Ordering::Equal
}

impl RecordSet for OrderBy {
    fn schema(&self) -> &ColumnSet {
        &self.schema
    }

    fn scan(&self) -> EngineResult<Box<dyn Cursor + '_>> {
        let sorted = self.materialize_sorted()?;
        Ok(Box::new(SortedCursor {
            records: sorted.into_iter(),
        }))
    }
}

struct SortedCursor {
    records: std::vec::IntoIter<Record>,
}

impl Cursor for SortedCursor {
    fn next(&mut self) -> EngineResult<Option<Record>> {
        Ok(self.records.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{field, ints, rows};
    use crate::RecordSetExt;
    use common::EngineError;
    use expr::raw;

    fn column_values(out: &[Record], name: &str) -> Vec<Value> {
        out.iter().map(|r| field(r, name)).collect()
    }

    #[test]
    fn ascending_is_the_default() {
        let source = ints(&["a"], &[&[3], &[1], &[2]]);
        let sorted = OrderBy::new(source, vec![raw("a").into()]).unwrap();
        let out = sorted.collect().unwrap();
        assert_eq!(
            column_values(&out, "a"),
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );
    }

    #[test]
    fn descending_reverses_comparison() {
        let source = ints(&["a"], &[&[3], &[1], &[2]]);
        let sorted = OrderBy::new(source, vec![desc(raw("a"))]).unwrap();
        let out = sorted.collect().unwrap();
        assert_eq!(
            column_values(&out, "a"),
            vec![Value::Int(3), Value::Int(2), Value::Int(1)]
        );
    }

    #[test]
    fn descending_works_for_strings() {
        let source = rows(
            &["s"],
            &[
                &[Value::Str("pear".into())],
                &[Value::Str("apple".into())],
                &[Value::Str("fig".into())],
            ],
        );
        let sorted = OrderBy::new(source, vec![desc(raw("s"))]).unwrap();
        let out = sorted.collect().unwrap();
        assert_eq!(
            column_values(&out, "s"),
            vec![
                Value::Str("pear".into()),
                Value::Str("fig".into()),
                Value::Str("apple".into())
            ]
        );
    }

    #[test]
    fn multiple_keys_break_ties_in_order() {
        let source = ints(&["a", "b"], &[&[1, 2], &[0, 9], &[1, 1], &[0, 3]]);
        let sorted = OrderBy::new(source, vec![asc(raw("a")), desc(raw("b"))]).unwrap();
        let out = sorted.collect().unwrap();
        assert_eq!(
            column_values(&out, "b"),
            vec![Value::Int(9), Value::Int(3), Value::Int(2), Value::Int(1)]
        );
    }

    #[test]
    fn computed_sort_keys_are_allowed() {
        let source = ints(&["a"], &[&[1], &[3], &[2]]);
        let sorted = OrderBy::new(source, vec![desc(raw("a") * -1)]).unwrap();
        let out = sorted.collect().unwrap();
        assert_eq!(
            column_values(&out, "a"),
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );
    }

    #[test]
    fn unknown_key_is_rejected_at_build_time() {
        let source = ints(&["a"], &[&[1]]);
        let err = OrderBy::new(source, vec![asc(raw("zzz"))]).unwrap_err();
        assert!(matches!(err, EngineError::SchemaMismatch(_)));
    }

    #[test]
    fn nulls_sort_first() {
        let source = rows(&["a"], &[&[Value::Int(1)], &[Value::Null], &[Value::Int(0)]]);
        let sorted = OrderBy::new(source, vec![asc(raw("a"))]).unwrap();
        let out = sorted.collect().unwrap();
        assert_eq!(
            column_values(&out, "a"),
            vec![Value::Null, Value::Int(0), Value::Int(1)]
        );
    }
}
