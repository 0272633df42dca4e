use crate::Expr;
use common::{EngineError, EngineResult};
use hashbrown::HashMap;
use std::rc::Rc;
use types::Value;

/// The set of expressions describing a row shape: unique by name,
/// insertion order preserved. A later expression with an already-present
/// name replaces the earlier one in place.
#[derive(Clone, Debug, Default)]
pub struct ColumnSet {
    exprs: Vec<Expr>,
}

impl ColumnSet {
    pub fn new(exprs: impl IntoIterator<Item = Expr>) -> Self {
        let mut set = ColumnSet::default();
        for expr in exprs {
            set.push(expr);
        }
        set
    }

    fn push(&mut self, expr: Expr) {
        let name = expr.name();
        match self.exprs.iter().position(|e| e.name() == name) {
            Some(idx) => self.exprs[idx] = expr,
            None => self.exprs.push(expr),
        }
    }

    pub fn exprs(&self) -> &[Expr] {
        &self.exprs
    }

    pub fn iter(&self) -> impl Iterator<Item = &Expr> {
        self.exprs.iter()
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.exprs.iter().any(|e| e.name() == name)
    }

    pub fn get(&self, name: &str) -> Option<&Expr> {
        self.exprs.iter().find(|e| e.name() == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.exprs.iter().map(Expr::name).collect()
    }

    /// Concatenate two column sets (left first), deduplicating by name.
    pub fn merged(&self, other: &ColumnSet) -> ColumnSet {
        ColumnSet::new(self.exprs.iter().chain(other.exprs.iter()).cloned())
    }
}

impl PartialEq for ColumnSet {
    fn eq(&self, other: &ColumnSet) -> bool {
        self.names() == other.names()
    }
}

impl Eq for ColumnSet {}

impl FromIterator<Expr> for ColumnSet {
    fn from_iter<I: IntoIterator<Item = Expr>>(iter: I) -> Self {
        ColumnSet::new(iter)
    }
}

/// One row: a map from field name to value plus the schema that describes
/// it. Field order for display purposes comes from the schema.
#[derive(Clone, Debug)]
pub struct Record {
    schema: Rc<ColumnSet>,
    values: HashMap<String, Value>,
}

impl Record {
    pub fn new(schema: Rc<ColumnSet>, values: HashMap<String, Value>) -> Self {
        Record { schema, values }
    }

    /// Build a record from name/value pairs; the schema becomes raw field
    /// reads in pair order.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, Value)>) -> Self {
        let mut values = HashMap::new();
        let mut exprs = Vec::new();
        for (name, value) in pairs {
            exprs.push(crate::raw(name.clone()));
            values.insert(name, value);
        }
        Record {
            schema: Rc::new(ColumnSet::new(exprs)),
            values,
        }
    }

    pub fn schema(&self) -> &ColumnSet {
        &self.schema
    }

    pub fn schema_rc(&self) -> Rc<ColumnSet> {
        Rc::clone(&self.schema)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Look a field up by name; absence is an `UnknownField` error.
    pub fn field(&self, name: &str) -> EngineResult<&Value> {
        self.values
            .get(name)
            .ok_or_else(|| EngineError::UnknownField(name.to_string()))
    }

    /// Look a field up by its (aliased) name, falling back to the
    /// structural name. Lets renamed results propagate across stages.
    pub fn field_with_fallback(&self, name: &str, original: &str) -> EngineResult<&Value> {
        if let Some(v) = self.values.get(name) {
            return Ok(v);
        }
        self.values
            .get(original)
            .ok_or_else(|| EngineError::UnknownField(name.to_string()))
    }

    /// Look a field up by an expression's name.
    pub fn field_by_expr(&self, expr: &Expr) -> EngineResult<&Value> {
        self.field(&expr.name())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Values in schema order; fields absent from the map render as null.
    pub fn values_in_schema_order(&self) -> Vec<Value> {
        self.schema
            .iter()
            .map(|e| self.values.get(&e.name()).cloned().unwrap_or(Value::Null))
            .collect()
    }

    pub fn into_values(self) -> HashMap<String, Value> {
        self.values
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Record) -> bool {
        self.values == other.values
    }
}

impl Eq for Record {}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, expr) in self.schema.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            let name = expr.name();
            match self.values.get(&name) {
                Some(v) => write!(f, "{name}: {v}")?,
                None => write!(f, "{name}: ")?,
            }
        }
        write!(f, "}}")
    }
}
