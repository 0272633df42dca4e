//! Typed, compilable scalar expressions over records.
//!
//! An [`Expr`] is a tree of constants, field reads, operators and
//! aggregations. Every expression has a deterministic structural name
//! (`(a + b)`, `sum(foo.a)`, `~x`) that doubles as its key when written
//! into and read out of records; an alias shadows that name while keeping
//! the structural one reachable as `original_name`.
//!
//! Expressions can be interpreted directly with [`Expr::evaluate`] or
//! compiled once into a closure tree with [`Expr::compile`]; operators
//! compile their expressions at construction time and drive the compiled
//! form in their iteration loops. Both paths produce identical results.

mod aggregate;
mod record;

pub use aggregate::{Aggregate, CompiledAggregate};
pub use record::{ColumnSet, Record};

use common::{EngineError, EngineResult};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use types::{ColumnType, Value, ValueError};

/// Unary operators. `Not` is the `~` of the expression language: logical
/// negation by truthiness.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

/// Binary operators. Arithmetic follows the semantics in `types`;
/// `And`/`Or` short-circuit on truthiness and yield the deciding operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Rem,
    Pow,
    And,
    Or,
    Xor,
    Lt,
    Le,
    Eq,
    Ne,
    Gt,
    Ge,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Rem => "%",
            BinaryOp::Pow => "**",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

/// A named scalar function wrapped for use inside an expression tree.
/// The name participates in the structural name (`upper(a)`), the closure
/// does the work.
#[derive(Clone)]
pub struct ScalarFn(Rc<dyn Fn(Value) -> EngineResult<Value>>);

impl ScalarFn {
    pub fn new(f: impl Fn(Value) -> EngineResult<Value> + 'static) -> Self {
        ScalarFn(Rc::new(f))
    }

    pub fn call(&self, value: Value) -> EngineResult<Value> {
        (self.0)(value)
    }
}

impl fmt::Debug for ScalarFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<scalar fn>")
    }
}

/// Expression tree. Two expressions are considered the same expression
/// when their names match; hashing follows the same rule.
#[derive(Clone, Debug)]
pub enum Expr {
    Constant(Value),
    /// Read a field by name, as-is.
    Raw(String),
    /// A table-qualified, typed field read. The structural name is
    /// `table.name`; an aliased column falls back to that qualified name
    /// on lookup so renamed results keep resolving downstream.
    Column {
        table: String,
        name: String,
        ty: ColumnType,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// Named scalar function application, e.g. `upper(name)`.
    Func {
        name: String,
        f: ScalarFn,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Aggregate(Aggregate),
    /// Copy-on-alias wrapper: reports `alias` as the name and keeps the
    /// wrapped expression's structural name as `original_name`.
    Aliased {
        inner: Box<Expr>,
        alias: String,
    },
}

/// A compiled expression: the tree pre-resolved into a closure.
pub struct CompiledExpr(Box<dyn Fn(&Record) -> EngineResult<Value>>);

impl CompiledExpr {
    pub fn eval(&self, record: &Record) -> EngineResult<Value> {
        (self.0)(record)
    }
}

impl fmt::Debug for CompiledExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<compiled expr>")
    }
}

impl Expr {
    /// The effective name: the alias when one is set, else the structural
    /// name. Used as the record key on both write and read.
    pub fn name(&self) -> String {
        match self {
            Expr::Aliased { alias, .. } => alias.clone(),
            other => other.structural_name(),
        }
    }

    /// The structural name, ignoring any alias.
    pub fn original_name(&self) -> String {
        match self {
            Expr::Aliased { inner, .. } => inner.original_name(),
            other => other.structural_name(),
        }
    }

    fn structural_name(&self) -> String {
        match self {
            Expr::Constant(v) => match v {
                Value::Str(s) => s.clone(),
                other => other.to_string(),
            },
            Expr::Raw(name) => name.clone(),
            Expr::Column { table, name, .. } => format!("{table}.{name}"),
            Expr::Unary { op, operand } => {
                let symbol = match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Pos => "+",
                    UnaryOp::Not => "~",
                };
                format!("{symbol}{}", operand.name())
            }
            Expr::Func { name, operand, .. } => format!("{name}({})", operand.name()),
            Expr::Binary { op, left, right } => {
                format!("({} {} {})", left.name(), op.symbol(), right.name())
            }
            Expr::Aggregate(agg) => agg.structural_name(),
            Expr::Aliased { inner, .. } => inner.original_name(),
        }
    }

    /// Rename this expression. Returns a copy so the same expression can
    /// be reused under several aliases without colliding.
    pub fn alias(&self, alias: impl Into<String>) -> Expr {
        match self {
            Expr::Aliased { inner, .. } => Expr::Aliased {
                inner: inner.clone(),
                alias: alias.into(),
            },
            other => Expr::Aliased {
                inner: Box::new(other.clone()),
                alias: alias.into(),
            },
        }
    }

    /// The record fields this expression reads, as `(name, fallback)`
    /// pairs. Build-time schema checks accept a field under either name.
    pub fn referenced_fields(&self) -> Vec<(String, String)> {
        let mut fields = Vec::new();
        self.collect_referenced_fields(&mut fields);
        fields
    }

    fn collect_referenced_fields(&self, out: &mut Vec<(String, String)>) {
        match self {
            Expr::Constant(_) => {}
            Expr::Raw(name) => out.push((name.clone(), name.clone())),
            Expr::Column { .. } | Expr::Aggregate(_) => {
                out.push((self.name(), self.original_name()));
            }
            Expr::Unary { operand, .. } => operand.collect_referenced_fields(out),
            Expr::Func { operand, .. } => operand.collect_referenced_fields(out),
            Expr::Binary { left, right, .. } => {
                left.collect_referenced_fields(out);
                right.collect_referenced_fields(out);
            }
            Expr::Aliased { inner, alias } => match inner.as_ref() {
                Expr::Column { .. } | Expr::Aggregate(_) => {
                    out.push((alias.clone(), inner.original_name()));
                }
                other => other.collect_referenced_fields(out),
            },
        }
    }

    pub fn is_aggregate(&self) -> bool {
        match self {
            Expr::Aggregate(_) => true,
            Expr::Aliased { inner, .. } => inner.is_aggregate(),
            _ => false,
        }
    }

    /// The aggregation behind this expression, if it is one (possibly
    /// behind an alias).
    pub fn as_aggregate(&self) -> Option<&Aggregate> {
        match self {
            Expr::Aggregate(agg) => Some(agg),
            Expr::Aliased { inner, .. } => inner.as_aggregate(),
            _ => None,
        }
    }

    /// Interpret this expression against a record.
    pub fn evaluate(&self, record: &Record) -> EngineResult<Value> {
        match self {
            Expr::Constant(v) => Ok(v.clone()),
            Expr::Raw(name) => record.field(name).cloned(),
            Expr::Column { .. } => {
                let name = self.structural_name();
                record.field(&name).cloned()
            }
            Expr::Unary { op, operand } => {
                let v = operand.evaluate(record)?;
                apply_unary(*op, &v).map_err(|e| EngineError::type_mismatch(self.name(), e))
            }
            Expr::Func { f, operand, .. } => f.call(operand.evaluate(record)?),
            Expr::Binary { op, left, right } => {
                let l = left.evaluate(record)?;
                let r = right.evaluate(record)?;
                apply_binary(*op, l, r).map_err(|e| EngineError::type_mismatch(self.name(), e))
            }
            // An aggregation read as a scalar resolves to the field the
            // aggregating stage wrote under its name.
            Expr::Aggregate(agg) => record.field(&agg.structural_name()).cloned(),
            Expr::Aliased { inner, alias } => match inner.as_ref() {
                Expr::Column { .. } => record
                    .field_with_fallback(alias, &inner.original_name())
                    .cloned(),
                Expr::Aggregate(_) => record.field(alias).cloned(),
                other => other.evaluate(record),
            },
        }
    }

    /// Compile this expression into a closure. Each subexpression is
    /// resolved exactly once; the returned closure only walks closures.
    pub fn compile(&self) -> CompiledExpr {
        match self {
            Expr::Constant(v) => {
                let v = v.clone();
                CompiledExpr(Box::new(move |_| Ok(v.clone())))
            }
            Expr::Raw(name) => {
                let name = name.clone();
                CompiledExpr(Box::new(move |record| record.field(&name).cloned()))
            }
            Expr::Column { .. } => {
                let name = self.structural_name();
                CompiledExpr(Box::new(move |record| record.field(&name).cloned()))
            }
            Expr::Unary { op, operand } => {
                let op = *op;
                let display = self.name();
                let operand = operand.compile();
                CompiledExpr(Box::new(move |record| {
                    let v = operand.eval(record)?;
                    apply_unary(op, &v).map_err(|e| EngineError::type_mismatch(display.clone(), e))
                }))
            }
            Expr::Func { f, operand, .. } => {
                let f = f.clone();
                let operand = operand.compile();
                CompiledExpr(Box::new(move |record| f.call(operand.eval(record)?)))
            }
            Expr::Binary { op, left, right } => {
                let op = *op;
                let display = self.name();
                let left = left.compile();
                let right = right.compile();
                CompiledExpr(Box::new(move |record| {
                    let l = left.eval(record)?;
                    let r = right.eval(record)?;
                    apply_binary(op, l, r)
                        .map_err(|e| EngineError::type_mismatch(display.clone(), e))
                }))
            }
            Expr::Aggregate(agg) => {
                let name = agg.structural_name();
                CompiledExpr(Box::new(move |record| record.field(&name).cloned()))
            }
            Expr::Aliased { inner, alias } => match inner.as_ref() {
                Expr::Column { .. } => {
                    let alias = alias.clone();
                    let original = inner.original_name();
                    CompiledExpr(Box::new(move |record| {
                        record.field_with_fallback(&alias, &original).cloned()
                    }))
                }
                Expr::Aggregate(_) => {
                    let alias = alias.clone();
                    CompiledExpr(Box::new(move |record| record.field(&alias).cloned()))
                }
                other => other.compile(),
            },
        }
    }

    // Comparison builders. These shadow `PartialEq::eq`/`ne` in
    // method-call position on purpose: `a.eq(b)` builds the predicate
    // `(a == b)`, the `==` operator still compares expression names.
    pub fn lt(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOp::Lt, self, other.into())
    }

    pub fn le(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOp::Le, self, other.into())
    }

    pub fn eq(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOp::Eq, self, other.into())
    }

    pub fn ne(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOp::Ne, self, other.into())
    }

    pub fn gt(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOp::Gt, self, other.into())
    }

    pub fn ge(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOp::Ge, self, other.into())
    }

    pub fn floordiv(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOp::FloorDiv, self, other.into())
    }

    pub fn pow(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOp::Pow, self, other.into())
    }
}

fn apply_unary(op: UnaryOp, v: &Value) -> Result<Value, ValueError> {
    match op {
        UnaryOp::Neg => v.try_neg(),
        UnaryOp::Pos => v.try_pos(),
        UnaryOp::Not => Ok(Value::Bool(!v.is_truthy())),
    }
}

fn apply_binary(op: BinaryOp, l: Value, r: Value) -> Result<Value, ValueError> {
    match op {
        BinaryOp::Add => l.try_add(&r),
        BinaryOp::Sub => l.try_sub(&r),
        BinaryOp::Mul => l.try_mul(&r),
        BinaryOp::Div => l.try_div(&r),
        BinaryOp::FloorDiv => l.try_floordiv(&r),
        BinaryOp::Rem => l.try_rem(&r),
        BinaryOp::Pow => l.try_pow(&r),
        BinaryOp::And => Ok(if l.is_truthy() { r } else { l }),
        BinaryOp::Or => Ok(if l.is_truthy() { l } else { r }),
        BinaryOp::Xor => Ok(Value::Bool(l.is_truthy() ^ r.is_truthy())),
        BinaryOp::Eq => Ok(Value::Bool(l.loose_eq(&r))),
        BinaryOp::Ne => Ok(Value::Bool(!l.loose_eq(&r))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ord = l.compare(&r).ok_or(ValueError::BadOperands {
                op: op.symbol(),
                left: l.type_name(),
                right: r.type_name(),
            })?;
            let keep = match op {
                BinaryOp::Lt => ord == std::cmp::Ordering::Less,
                BinaryOp::Le => ord != std::cmp::Ordering::Greater,
                BinaryOp::Gt => ord == std::cmp::Ordering::Greater,
                BinaryOp::Ge => ord != std::cmp::Ordering::Less,
                _ => unreachable!(),
            };
            Ok(Value::Bool(keep))
        }
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Expr) -> bool {
        self.name() == other.name()
    }
}

impl Eq for Expr {}

impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

// Constructors

/// Read a field by name.
pub fn raw(name: impl Into<String>) -> Expr {
    Expr::Raw(name.into())
}

/// A constant value.
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Constant(value.into())
}

/// A table-qualified, typed column reference.
pub fn column(table: impl Into<String>, name: impl Into<String>, ty: ColumnType) -> Expr {
    Expr::Column {
        table: table.into(),
        name: name.into(),
        ty,
    }
}

/// A named scalar function over an expression.
pub fn func(
    name: impl Into<String>,
    f: impl Fn(Value) -> EngineResult<Value> + 'static,
    operand: impl Into<Expr>,
) -> Expr {
    Expr::Func {
        name: name.into(),
        f: ScalarFn::new(f),
        operand: Box::new(operand.into()),
    }
}

/// `sum(expr)` aggregation.
pub fn sum(expr: impl Into<Expr>) -> Expr {
    Expr::Aggregate(Aggregate::Sum(Box::new(expr.into())))
}

/// `count()` aggregation: the number of records.
pub fn count() -> Expr {
    Expr::Aggregate(Aggregate::Count(None))
}

/// `count(expr)` aggregation: the number of records whose schema carries
/// the expression.
pub fn count_of(expr: impl Into<Expr>) -> Expr {
    Expr::Aggregate(Aggregate::Count(Some(Box::new(expr.into()))))
}

/// `list(expr)` aggregation: every evaluated value, in input order.
pub fn list(expr: impl Into<Expr>) -> Expr {
    Expr::Aggregate(Aggregate::List(Box::new(expr.into())))
}

/// `dict(e1, .., en)` aggregation. See [`Aggregate::Dict`] for the
/// last-record caveat.
pub fn dict(exprs: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::Aggregate(Aggregate::Dict(exprs.into_iter().collect()))
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Expr::Constant(v)
    }
}

impl From<i64> for Expr {
    fn from(v: i64) -> Self {
        Expr::Constant(Value::Int(v))
    }
}

// Unsuffixed integer literals land on i32; route them to Int too.
impl From<i32> for Expr {
    fn from(v: i32) -> Self {
        Expr::Constant(Value::Int(i64::from(v)))
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Self {
        Expr::Constant(Value::Float(v))
    }
}

impl From<&str> for Expr {
    fn from(v: &str) -> Self {
        Expr::Constant(Value::Str(v.to_string()))
    }
}

impl From<bool> for Expr {
    fn from(v: bool) -> Self {
        Expr::Constant(Value::Bool(v))
    }
}

impl<T: Into<Expr>> std::ops::Add<T> for Expr {
    type Output = Expr;
    fn add(self, rhs: T) -> Expr {
        binary(BinaryOp::Add, self, rhs.into())
    }
}

impl<T: Into<Expr>> std::ops::Sub<T> for Expr {
    type Output = Expr;
    fn sub(self, rhs: T) -> Expr {
        binary(BinaryOp::Sub, self, rhs.into())
    }
}

impl<T: Into<Expr>> std::ops::Mul<T> for Expr {
    type Output = Expr;
    fn mul(self, rhs: T) -> Expr {
        binary(BinaryOp::Mul, self, rhs.into())
    }
}

impl<T: Into<Expr>> std::ops::Div<T> for Expr {
    type Output = Expr;
    fn div(self, rhs: T) -> Expr {
        binary(BinaryOp::Div, self, rhs.into())
    }
}

impl<T: Into<Expr>> std::ops::Rem<T> for Expr {
    type Output = Expr;
    fn rem(self, rhs: T) -> Expr {
        binary(BinaryOp::Rem, self, rhs.into())
    }
}

impl std::ops::Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::Unary {
            op: UnaryOp::Neg,
            operand: Box::new(self),
        }
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;
    fn not(self) -> Expr {
        Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(self),
        }
    }
}

impl<T: Into<Expr>> std::ops::BitAnd<T> for Expr {
    type Output = Expr;
    fn bitand(self, rhs: T) -> Expr {
        binary(BinaryOp::And, self, rhs.into())
    }
}

impl<T: Into<Expr>> std::ops::BitOr<T> for Expr {
    type Output = Expr;
    fn bitor(self, rhs: T) -> Expr {
        binary(BinaryOp::Or, self, rhs.into())
    }
}

impl<T: Into<Expr>> std::ops::BitXor<T> for Expr {
    type Output = Expr;
    fn bitxor(self, rhs: T) -> Expr {
        binary(BinaryOp::Xor, self, rhs.into())
    }
}
