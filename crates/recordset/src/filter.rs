//! Filter: keeps records for which the predicate is truthy.

use crate::{check_references, Cursor, RecordSet, SharedRecordSet};
use common::EngineResult;
use expr::{ColumnSet, CompiledExpr, Expr, Record};
use std::rc::Rc;

#[derive(Debug)]
pub struct Filter {
    source: SharedRecordSet,
    schema: Rc<ColumnSet>,
    predicate: CompiledExpr,
}

impl Filter {
    /// Wrap `source`, keeping rows where `predicate` evaluates truthy.
    /// Fields the predicate references are checked against the upstream
    /// schema here, at build time, not during iteration.
    pub fn new(source: SharedRecordSet, predicate: Expr) -> EngineResult<Filter> {
        check_references(source.schema(), &predicate)?;
        let schema = Rc::new(source.schema().clone());
        Ok(Filter {
            source,
            schema,
            predicate: predicate.compile(),
        })
    }
}

impl RecordSet for Filter {
    fn schema(&self) -> &ColumnSet {
        &self.schema
    }

    fn scan(&self) -> EngineResult<Box<dyn Cursor + '_>> {
        Ok(Box::new(FilterCursor {
            upstream: self.source.scan()?,
            predicate: &self.predicate,
        }))
    }
}

struct FilterCursor<'a> {
    upstream: Box<dyn Cursor + 'a>,
    predicate: &'a CompiledExpr,
}

impl Cursor for FilterCursor<'_> {
    fn next(&mut self) -> EngineResult<Option<Record>> {
        while let Some(record) = self.upstream.next()? {
            if self.predicate.eval(&record)?.is_truthy() {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{field, ints};
    use crate::RecordSetExt;
    use common::EngineError;
    use expr::raw;
    use types::Value;

    #[test]
    fn keeps_only_matching_rows() {
        let source = ints(&["a"], &[&[1], &[5], &[3], &[9]]);
        let filter = Filter::new(source, raw("a").gt(2)).unwrap();
        let out = filter.collect().unwrap();
        let kept: Vec<Value> = out.iter().map(|r| field(r, "a")).collect();
        assert_eq!(kept, vec![Value::Int(5), Value::Int(3), Value::Int(9)]);
    }

    #[test]
    fn composite_predicates_work() {
        let source = ints(&["a", "b"], &[&[1, 10], &[5, 10], &[5, 30]]);
        let filter = Filter::new(source, raw("a").gt(2) & raw("b").lt(20)).unwrap();
        let out = filter.collect().unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(field(&out[0], "a"), Value::Int(5));
    }

    #[test]
    fn unknown_reference_is_rejected_at_build_time() {
        let source = ints(&["a"], &[&[1]]);
        let err = Filter::new(source, raw("missing").gt(0)).unwrap_err();
        assert!(matches!(err, EngineError::SchemaMismatch(_)));
    }

    #[test]
    fn schema_passes_through() {
        let source = ints(&["a", "b"], &[]);
        let filter = Filter::new(source, raw("a").gt(0)).unwrap();
        assert_eq!(filter.schema().names(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn truthiness_drives_non_boolean_predicates() {
        let source = ints(&["a"], &[&[0], &[2]]);
        // The raw field itself is the predicate: 0 is falsy.
        let filter = Filter::new(source, raw("a")).unwrap();
        let out = filter.collect().unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(field(&out[0], "a"), Value::Int(2));
    }
}
