use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Declared type of a table column. Drives coercion when rows are read
/// back from their textual page representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Int,
    Float,
    Str,
    /// A list literal stored as a JSON array in the page cell.
    List,
}

/// Runtime scalar flowing through records and expressions.
///
/// `Map` only appears as the output of the dict aggregation; `Bool` and
/// `Null` are runtime-only (columns are declared as one of `ColumnType`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Null,
}

/// Failure of a primitive value operation. The expression layer attaches
/// the offending expression's name before surfacing it.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("unsupported operands {left} and {right} for '{op}'")]
    BadOperands {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("unsupported operand {operand} for unary '{op}'")]
    BadUnary {
        op: &'static str,
        operand: &'static str,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    Overflow,
}

pub type ValueResult = Result<Value, ValueError>;

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Null => "null",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness as used by filters and the boolean connectives: zero,
    /// the empty string, the empty list, `false` and `Null` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::List(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
            Value::Null => false,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn bad_operands(&self, op: &'static str, other: &Value) -> ValueError {
        ValueError::BadOperands {
            op,
            left: self.type_name(),
            right: other.type_name(),
        }
    }

    pub fn try_add(&self, other: &Value) -> ValueResult {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_add(*b)
                .map(Value::Int)
                .ok_or(ValueError::Overflow),
            (Value::Str(a), Value::Str(b)) => {
                let mut s = String::with_capacity(a.len() + b.len());
                s.push_str(a);
                s.push_str(b);
                Ok(Value::Str(s))
            }
            (Value::List(a), Value::List(b)) => {
                let mut items = a.clone();
                items.extend(b.iter().cloned());
                Ok(Value::List(items))
            }
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => Ok(Value::Float(a + b)),
                _ => Err(self.bad_operands("+", other)),
            },
        }
    }

    pub fn try_sub(&self, other: &Value) -> ValueResult {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_sub(*b)
                .map(Value::Int)
                .ok_or(ValueError::Overflow),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => Ok(Value::Float(a - b)),
                _ => Err(self.bad_operands("-", other)),
            },
        }
    }

    pub fn try_mul(&self, other: &Value) -> ValueResult {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_mul(*b)
                .map(Value::Int)
                .ok_or(ValueError::Overflow),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => Ok(Value::Float(a * b)),
                _ => Err(self.bad_operands("*", other)),
            },
        }
    }

    /// True division: always a float, like the source language's `/`.
    pub fn try_div(&self, other: &Value) -> ValueResult {
        match (self.as_f64(), other.as_f64()) {
            (Some(_), Some(b)) if b == 0.0 => Err(ValueError::DivisionByZero),
            (Some(a), Some(b)) => Ok(Value::Float(a / b)),
            _ => Err(self.bad_operands("/", other)),
        }
    }

    /// Floor division with sign-follows-divisor semantics.
    pub fn try_floordiv(&self, other: &Value) -> ValueResult {
        match (self, other) {
            (Value::Int(_), Value::Int(0)) => Err(ValueError::DivisionByZero),
            (Value::Int(a), Value::Int(b)) => a
                .checked_div_euclid(*b)
                .map(Value::Int)
                .ok_or(ValueError::Overflow),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(_), Some(b)) if b == 0.0 => Err(ValueError::DivisionByZero),
                (Some(a), Some(b)) => Ok(Value::Float((a / b).floor())),
                _ => Err(self.bad_operands("//", other)),
            },
        }
    }

    /// Remainder with sign-follows-divisor semantics.
    pub fn try_rem(&self, other: &Value) -> ValueResult {
        match (self, other) {
            (Value::Int(_), Value::Int(0)) => Err(ValueError::DivisionByZero),
            (Value::Int(a), Value::Int(b)) => a
                .checked_rem_euclid(*b)
                .map(Value::Int)
                .ok_or(ValueError::Overflow),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(_), Some(b)) if b == 0.0 => Err(ValueError::DivisionByZero),
                (Some(a), Some(b)) => Ok(Value::Float(a - (a / b).floor() * b)),
                _ => Err(self.bad_operands("%", other)),
            },
        }
    }

    pub fn try_pow(&self, other: &Value) -> ValueResult {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) if *b >= 0 => {
                let exp = u32::try_from(*b).map_err(|_| ValueError::Overflow)?;
                a.checked_pow(exp).map(Value::Int).ok_or(ValueError::Overflow)
            }
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => Ok(Value::Float(a.powf(b))),
                _ => Err(self.bad_operands("**", other)),
            },
        }
    }

    pub fn try_neg(&self) -> ValueResult {
        match self {
            Value::Int(a) => a.checked_neg().map(Value::Int).ok_or(ValueError::Overflow),
            Value::Float(a) => Ok(Value::Float(-a)),
            _ => Err(ValueError::BadUnary {
                op: "-",
                operand: self.type_name(),
            }),
        }
    }

    pub fn try_pos(&self) -> ValueResult {
        match self {
            Value::Int(_) | Value::Float(_) => Ok(self.clone()),
            _ => Err(ValueError::BadUnary {
                op: "+",
                operand: self.type_name(),
            }),
        }
    }

    /// Equality for the `==`/`!=` predicates: ints and floats coerce,
    /// incompatible types are simply unequal (never an error).
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    /// Ordering for the `<`/`<=`/`>`/`>=` predicates. `None` means the
    /// two types cannot be ordered and the comparison is a type error.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::List(a), Value::List(b)) => compare_lists(a, b),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }

    /// Total ordering used by `OrderBy`: nulls first, numerics coerced,
    /// otherwise by type rank. Never fails, so sorting mixed columns is
    /// deterministic.
    pub fn cmp_for_sort(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Map(a), Value::Map(b)) => compare_maps(a, b),
            _ => {
                if let Some(ord) = self.compare(other) {
                    return ord;
                }
                self.type_rank().cmp(&other.type_rank())
            }
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::Str(_) => 3,
            Value::List(_) => 4,
            Value::Map(_) => 5,
        }
    }
}

fn compare_lists(a: &[Value], b: &[Value]) -> Option<Ordering> {
    for (x, y) in a.iter().zip(b.iter()) {
        match x.compare(y)? {
            Ordering::Equal => continue,
            other => return Some(other),
        }
    }
    Some(a.len().cmp(&b.len()))
}

fn compare_maps(a: &BTreeMap<String, Value>, b: &BTreeMap<String, Value>) -> Ordering {
    for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
        match ka.cmp(kb) {
            Ordering::Equal => {}
            other => return other,
        }
        match va.cmp_for_sort(vb) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

// Floats take part in hash-join and group-by keys, so equality and hashing
// must agree: both go through the bit pattern.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Int(a) => a.hash(state),
            Value::Float(a) => a.to_bits().hash(state),
            Value::Str(a) => a.hash(state),
            Value::Bool(a) => a.hash(state),
            Value::List(a) => a.hash(state),
            Value::Map(a) => a.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            Value::Null => Ok(()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

// Unsuffixed integer literals land on i32; route them to Int too.
impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cmp::Ordering::{Greater, Less};

    #[test]
    fn int_arithmetic_stays_int() {
        assert_eq!(Value::Int(2).try_add(&Value::Int(3)), Ok(Value::Int(5)));
        assert_eq!(Value::Int(7).try_floordiv(&Value::Int(2)), Ok(Value::Int(3)));
        assert_eq!(Value::Int(2).try_pow(&Value::Int(10)), Ok(Value::Int(1024)));
    }

    #[test]
    fn mixed_arithmetic_coerces_to_float() {
        assert_eq!(
            Value::Int(1).try_add(&Value::Float(0.5)),
            Ok(Value::Float(1.5))
        );
        assert_eq!(Value::Int(1).try_div(&Value::Int(2)), Ok(Value::Float(0.5)));
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(
            Value::Str("ab".into()).try_add(&Value::Str("cd".into())),
            Ok(Value::Str("abcd".into()))
        );
    }

    #[test]
    fn sign_follows_divisor() {
        assert_eq!(Value::Int(-7).try_rem(&Value::Int(3)), Ok(Value::Int(2)));
        assert_eq!(Value::Int(-7).try_floordiv(&Value::Int(3)), Ok(Value::Int(-3)));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert_eq!(
            Value::Int(1).try_div(&Value::Int(0)),
            Err(ValueError::DivisionByZero)
        );
        assert_eq!(
            Value::Int(1).try_rem(&Value::Int(0)),
            Err(ValueError::DivisionByZero)
        );
    }

    #[test]
    fn incompatible_operands_are_rejected() {
        assert!(Value::Str("a".into()).try_sub(&Value::Int(1)).is_err());
        assert!(Value::Bool(true).try_neg().is_err());
    }

    #[test]
    fn loose_eq_coerces_numerics_only() {
        assert!(Value::Int(1).loose_eq(&Value::Float(1.0)));
        assert!(!Value::Int(1).loose_eq(&Value::Str("1".into())));
    }

    #[test]
    fn compare_rejects_cross_type() {
        assert_eq!(Value::Int(1).compare(&Value::Int(2)), Some(Less));
        assert_eq!(Value::Int(1).compare(&Value::Str("1".into())), None);
    }

    #[test]
    fn sort_order_is_total() {
        assert_eq!(Value::Null.cmp_for_sort(&Value::Int(0)), Less);
        assert_eq!(
            Value::Str("a".into()).cmp_for_sort(&Value::Str("b".into())),
            Less
        );
        assert_eq!(Value::Int(2).cmp_for_sort(&Value::Float(1.5)), Greater);
        assert_eq!(Value::Bool(true).cmp_for_sort(&Value::Str("".into())), Less);
    }

    #[test]
    fn truthiness() {
        assert!(Value::Int(1).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(Value::List(vec![Value::Null]).is_truthy());
    }

    #[test]
    fn float_keys_hash_consistently() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(Value::Float(1.5));
        assert!(set.contains(&Value::Float(1.5)));
    }

    #[test]
    fn serde_round_trip_stability() {
        let vals = vec![
            Value::Int(-42),
            Value::Float(2.5),
            Value::Str("Ada".into()),
            Value::Bool(true),
            Value::List(vec![Value::Float(1.0), Value::Float(2.0)]),
            Value::Null,
        ];

        let json = serde_json::to_string(&vals).unwrap();
        let back: Vec<Value> = serde_json::from_str(&json).unwrap();

        assert_eq!(vals, back);
    }

    proptest! {
        #[test]
        fn sort_order_is_antisymmetric(i in any::<i64>(), j in any::<i64>()) {
            let a = Value::Int(i);
            let b = Value::Int(j);
            prop_assert_eq!(a.cmp_for_sort(&b), b.cmp_for_sort(&a).reverse());
        }

        #[test]
        fn add_then_sub_round_trips(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
            let sum = Value::Int(a).try_add(&Value::Int(b)).unwrap();
            prop_assert_eq!(sum.try_sub(&Value::Int(b)), Ok(Value::Int(a)));
        }

        #[test]
        fn rem_sign_matches_divisor(a in any::<i32>(), b in 1i32..1000) {
            let r = Value::Int(a as i64).try_rem(&Value::Int(b as i64)).unwrap();
            match r {
                Value::Int(r) => prop_assert!((0..b as i64).contains(&r)),
                other => prop_assert!(false, "unexpected {:?}", other),
            }
        }
    }
}
