//! Projection: maps each upstream record onto a new row shape.

use crate::{Cursor, RecordSet, SharedRecordSet};
use common::EngineResult;
use expr::{ColumnSet, CompiledExpr, Expr, Record};
use hashbrown::HashMap;
use std::rc::Rc;

enum OutputField {
    /// A scalar expression, compiled once at build time.
    Computed { name: String, compiled: CompiledExpr },
    /// An aggregation: its value was produced by the upstream aggregating
    /// stage, so it is read back by name (falling back to the structural
    /// name when the stage wrote under an alias that was since replaced).
    AggregateRead { name: String, original: String },
}

pub struct Projection {
    source: SharedRecordSet,
    schema: Rc<ColumnSet>,
    fields: Vec<OutputField>,
}

impl Projection {
    pub fn new(source: SharedRecordSet, exprs: Vec<Expr>) -> Self {
        let fields = exprs
            .iter()
            .map(|expr| {
                if expr.is_aggregate() {
                    OutputField::AggregateRead {
                        name: expr.name(),
                        original: expr.original_name(),
                    }
                } else {
                    OutputField::Computed {
                        name: expr.name(),
                        compiled: expr.compile(),
                    }
                }
            })
            .collect();
        Projection {
            source,
            schema: Rc::new(ColumnSet::new(exprs)),
            fields,
        }
    }
}

impl RecordSet for Projection {
    fn schema(&self) -> &ColumnSet {
        &self.schema
    }

    fn scan(&self) -> EngineResult<Box<dyn Cursor + '_>> {
        Ok(Box::new(ProjectionCursor {
            upstream: self.source.scan()?,
            schema: &self.schema,
            fields: &self.fields,
        }))
    }
}

struct ProjectionCursor<'a> {
    upstream: Box<dyn Cursor + 'a>,
    schema: &'a Rc<ColumnSet>,
    fields: &'a [OutputField],
}

impl Cursor for ProjectionCursor<'_> {
    fn next(&mut self) -> EngineResult<Option<Record>> {
        let Some(record) = self.upstream.next()? else {
            return Ok(None);
        };

        let mut values = HashMap::with_capacity(self.fields.len());
        for field in self.fields {
            match field {
                OutputField::Computed { name, compiled } => {
                    values.insert(name.clone(), compiled.eval(&record)?);
                }
                OutputField::AggregateRead { name, original } => {
                    let value = record.field_with_fallback(name, original)?.clone();
                    values.insert(name.clone(), value);
                }
            }
        }
        Ok(Some(Record::new(Rc::clone(self.schema), values)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{field, ints};
    use crate::RecordSetExt;
    use expr::raw;
    use types::Value;

    #[test]
    fn projects_computed_expressions_under_their_names() {
        let source = ints(&["a", "b"], &[&[1, 10], &[2, 20]]);
        let projection = Projection::new(
            source,
            vec![(raw("a") + raw("b")).alias("sum"), raw("a")],
        );

        let out = projection.collect().unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(field(&out[0], "sum"), Value::Int(11));
        assert_eq!(field(&out[0], "a"), Value::Int(1));
        assert_eq!(field(&out[1], "sum"), Value::Int(22));
    }

    #[test]
    fn schema_matches_projected_names() {
        let source = ints(&["a"], &[]);
        let projection = Projection::new(source, vec![(raw("a") * 2).alias("twice")]);
        assert_eq!(projection.schema().names(), vec!["twice".to_string()]);
    }

    #[test]
    fn aggregation_values_are_read_not_reevaluated() {
        // The upstream stage already materialized "sum(a)"; the
        // projection must read it rather than try to aggregate again.
        let source = ints(&["sum(a)"], &[&[42]]);
        let projection = Projection::new(source, vec![expr::sum(raw("a"))]);
        let out = projection.collect().unwrap();
        assert_eq!(field(&out[0], "sum(a)"), Value::Int(42));
    }

    #[test]
    fn renamed_aggregation_falls_back_to_structural_name() {
        let source = ints(&["sum(a)"], &[&[7]]);
        let projection = Projection::new(source, vec![expr::sum(raw("a")).alias("total")]);
        let out = projection.collect().unwrap();
        assert_eq!(field(&out[0], "total"), Value::Int(7));
    }

    #[test]
    fn missing_projected_field_aborts_iteration() {
        let source = ints(&["a"], &[&[1]]);
        let projection = Projection::new(source, vec![raw("nope")]);
        assert!(projection.collect().is_err());
    }
}
