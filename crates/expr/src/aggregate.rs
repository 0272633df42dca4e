use crate::{Expr, Record};
use common::EngineResult;
use std::collections::BTreeMap;
use std::fmt;
use types::Value;

/// An aggregation reduces a sequence of records to one value. Its name
/// participates in projection like any other expression name.
#[derive(Clone, Debug)]
pub enum Aggregate {
    /// `sum(e)`: the running sum of the evaluated expression. An empty
    /// input yields the additive identity `0`.
    Sum(Box<Expr>),
    /// `count()` counts records; `count(e)` counts the records whose
    /// schema carries `e` (membership by name, not by value).
    Count(Option<Box<Expr>>),
    /// `list(e)`: every evaluated value, duplicates and order preserved.
    List(Box<Expr>),
    /// `dict(e1, .., en)`: one map from expression name to field value.
    ///
    /// Caveat: the map is overwritten per record, so each key holds the
    /// field of the *last* record of the input.
    Dict(Vec<Expr>),
}

/// An aggregation with its inner expressions resolved once.
pub struct CompiledAggregate(Box<dyn Fn(&[Record]) -> EngineResult<Value>>);

impl CompiledAggregate {
    pub fn aggregate(&self, records: &[Record]) -> EngineResult<Value> {
        (self.0)(records)
    }
}

impl fmt::Debug for CompiledAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<compiled aggregate>")
    }
}

impl Aggregate {
    pub fn structural_name(&self) -> String {
        match self {
            Aggregate::Sum(e) => format!("sum({})", e.name()),
            Aggregate::Count(Some(e)) => format!("count({})", e.name()),
            Aggregate::Count(None) => "count()".to_string(),
            Aggregate::List(e) => format!("list({})", e.name()),
            Aggregate::Dict(exprs) => {
                let names: Vec<String> = exprs.iter().map(Expr::name).collect();
                format!("dict({})", names.join(", "))
            }
        }
    }

    /// Reduce the records with the interpreter path.
    pub fn aggregate(&self, records: &[Record]) -> EngineResult<Value> {
        match self {
            Aggregate::Sum(e) => {
                sum_records(records, &self.structural_name(), |record| e.evaluate(record))
            }
            Aggregate::Count(target) => count_records(records, target.as_deref()),
            Aggregate::List(e) => {
                let mut items = Vec::with_capacity(records.len());
                for record in records {
                    items.push(e.evaluate(record)?);
                }
                Ok(Value::List(items))
            }
            Aggregate::Dict(exprs) => dict_records(records, exprs),
        }
    }

    /// Pre-resolve the inner expressions and return the closure form.
    pub fn compile(&self) -> CompiledAggregate {
        match self {
            Aggregate::Sum(e) => {
                let compiled = e.compile();
                let name = self.structural_name();
                CompiledAggregate(Box::new(move |records| {
                    sum_records(records, &name, |record| compiled.eval(record))
                }))
            }
            Aggregate::Count(target) => {
                let name = target.as_ref().map(|e| e.name());
                CompiledAggregate(Box::new(move |records| match &name {
                    None => Ok(Value::Int(records.len() as i64)),
                    Some(name) => Ok(Value::Int(
                        records
                            .iter()
                            .filter(|r| r.schema().contains_name(name))
                            .count() as i64,
                    )),
                }))
            }
            Aggregate::List(e) => {
                let compiled = e.compile();
                CompiledAggregate(Box::new(move |records| {
                    let mut items = Vec::with_capacity(records.len());
                    for record in records {
                        items.push(compiled.eval(record)?);
                    }
                    Ok(Value::List(items))
                }))
            }
            Aggregate::Dict(exprs) => {
                let names: Vec<String> = exprs.iter().map(Expr::name).collect();
                CompiledAggregate(Box::new(move |records| dict_by_names(records, &names)))
            }
        }
    }
}

fn sum_records(
    records: &[Record],
    name: &str,
    eval: impl Fn(&Record) -> EngineResult<Value>,
) -> EngineResult<Value> {
    let mut total = Value::Int(0);
    for record in records {
        let v = eval(record)?;
        total = total
            .try_add(&v)
            .map_err(|e| common::EngineError::type_mismatch(name, e))?;
    }
    Ok(total)
}

fn count_records(records: &[Record], target: Option<&Expr>) -> EngineResult<Value> {
    match target {
        None => Ok(Value::Int(records.len() as i64)),
        Some(e) => {
            let name = e.name();
            Ok(Value::Int(
                records
                    .iter()
                    .filter(|r| r.schema().contains_name(&name))
                    .count() as i64,
            ))
        }
    }
}

fn dict_records(records: &[Record], exprs: &[Expr]) -> EngineResult<Value> {
    let names: Vec<String> = exprs.iter().map(Expr::name).collect();
    dict_by_names(records, &names)
}

fn dict_by_names(records: &[Record], names: &[String]) -> EngineResult<Value> {
    let mut map = BTreeMap::new();
    for name in names {
        for record in records {
            map.insert(name.clone(), record.field(name)?.clone());
        }
    }
    Ok(Value::Map(map))
}
