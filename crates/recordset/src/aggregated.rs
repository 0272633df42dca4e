//! Aggregated and GroupBy: reduce records to aggregate values.

use crate::{Cursor, RecordSet, RecordSetExt, SharedRecordSet, SimpleRecordSet};
use common::{EngineError, EngineResult};
use expr::{ColumnSet, CompiledAggregate, CompiledExpr, Expr, Record};
use hashbrown::HashMap;
use std::rc::Rc;
use types::Value;

fn compile_aggregations(
    aggregations: &[Expr],
) -> EngineResult<Vec<(String, CompiledAggregate)>> {
    aggregations
        .iter()
        .map(|expr| {
            let agg = expr.as_aggregate().ok_or_else(|| {
                EngineError::SchemaMismatch(format!("'{}' is not an aggregation", expr.name()))
            })?;
            Ok((expr.name(), agg.compile()))
        })
        .collect()
}

/// Materializes the upstream and emits exactly one record holding one
/// field per aggregation, named by the aggregation's name.
#[derive(Debug)]
pub struct Aggregated {
    source: SharedRecordSet,
    schema: Rc<ColumnSet>,
    aggregations: Vec<(String, CompiledAggregate)>,
}

impl Aggregated {
    pub fn new(source: SharedRecordSet, aggregations: Vec<Expr>) -> EngineResult<Aggregated> {
        let compiled = compile_aggregations(&aggregations)?;
        Ok(Aggregated {
            source,
            schema: Rc::new(ColumnSet::new(aggregations)),
            aggregations: compiled,
        })
    }
}

impl RecordSet for Aggregated {
    fn schema(&self) -> &ColumnSet {
        &self.schema
    }

    fn scan(&self) -> EngineResult<Box<dyn Cursor + '_>> {
        let records = self.source.collect()?;
        let mut values = HashMap::with_capacity(self.aggregations.len());
        for (name, aggregation) in &self.aggregations {
            values.insert(name.clone(), aggregation.aggregate(&records)?);
        }
        Ok(Box::new(OnceCursor {
            record: Some(Record::new(Rc::clone(&self.schema), values)),
        }))
    }
}

struct OnceCursor {
    record: Option<Record>,
}

impl Cursor for OnceCursor {
    fn next(&mut self) -> EngineResult<Option<Record>> {
        Ok(self.record.take())
    }
}

/// Grouping keys waiting for aggregations. Not a record set on its own:
/// combine with [`GroupBy::aggregate`] to get one.
#[derive(Debug)]
pub struct GroupBy {
    source: SharedRecordSet,
    keys: Vec<Expr>,
}

impl GroupBy {
    pub fn new(source: SharedRecordSet, keys: Vec<Expr>) -> GroupBy {
        GroupBy { source, keys }
    }

    /// Partition the upstream by the key tuple and reduce every group.
    /// Groups keep first-seen order; the output schema is the keys
    /// followed by the aggregations.
    pub fn aggregate(&self, aggregations: Vec<Expr>) -> EngineResult<SimpleRecordSet> {
        let compiled_aggs = compile_aggregations(&aggregations)?;
        let compiled_keys: Vec<(String, CompiledExpr)> = self
            .keys
            .iter()
            .map(|key| (key.name(), key.compile()))
            .collect();

        let mut group_index: HashMap<Vec<Value>, usize> = HashMap::new();
        let mut groups: Vec<(Vec<Value>, Vec<Record>)> = Vec::new();

        let mut cursor = self.source.scan()?;
        while let Some(record) = cursor.next()? {
            let mut key = Vec::with_capacity(compiled_keys.len());
            for (_, compiled) in &compiled_keys {
                key.push(compiled.eval(&record)?);
            }
            match group_index.get(&key) {
                Some(&idx) => groups[idx].1.push(record),
                None => {
                    group_index.insert(key.clone(), groups.len());
                    groups.push((key, vec![record]));
                }
            }
        }

        let schema = Rc::new(ColumnSet::new(
            self.keys.iter().cloned().chain(aggregations.iter().cloned()),
        ));

        let mut results = Vec::with_capacity(groups.len());
        for (key, members) in groups {
            let mut values = HashMap::with_capacity(compiled_keys.len() + compiled_aggs.len());
            for ((name, _), value) in compiled_keys.iter().zip(key) {
                values.insert(name.clone(), value);
            }
            for (name, aggregation) in &compiled_aggs {
                values.insert(name.clone(), aggregation.aggregate(&members)?);
            }
            results.push(Record::new(Rc::clone(&schema), values));
        }

        Ok(SimpleRecordSet::new(schema, results))
    }
}
