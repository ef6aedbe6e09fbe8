//! Values in the runtime.
//!
//! [`Value`] is every value an F-IA expression can evaluate to.
//! Lists and dicts are reference values: cloning one clones the
//! handle, not the contents.

use std::cell::RefCell;
use std::fmt::Display;
use std::rc::Rc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{op, Literal};

use super::modules::ModuleHandle;
use super::{RtResult, TypeErr, ValueErr};

/// A value of the runtime.
#[derive(Debug, Clone)]
pub enum Value {
    /// An integer
    Int(isize),
    /// A float
    Float(f64),
    /// A string
    Str(String),
    /// A boolean (`vrai`, `faux`)
    Bool(bool),
    /// The null value (`nul`)
    Null,
    /// A list
    List(Rc<RefCell<Vec<Value>>>),
    /// A dict, with insertion order kept
    Dict(Rc<RefCell<IndexMap<String, Value>>>),
    /// A loaded module
    Module(Rc<ModuleHandle>)
}

/// Matches the strings that number coercion accepts.
static NUM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?[0-9]+(\.[0-9]+)?$").unwrap()
});

/// A coerced number, keeping the int/float split.
#[derive(Debug, Clone, Copy)]
pub(super) enum Num {
    Int(isize),
    Float(f64)
}

impl Num {
    pub(super) fn as_f64(self) -> f64 {
        match self {
            Num::Int(n)   => n as f64,
            Num::Float(f) => f,
        }
    }
}

impl Value {
    /// Create a list value out of a vec.
    pub fn new_list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    /// Create a dict value out of a map.
    pub fn new_dict(entries: IndexMap<String, Value>) -> Self {
        Value::Dict(Rc::new(RefCell::new(entries)))
    }

    /// The truth value.
    ///
    /// `nul`, `faux`, zero, the empty string, and empty collections
    /// are the falsy values.
    pub fn truth(&self) -> bool {
        match self {
            Value::Int(n)    => *n != 0,
            Value::Float(f)  => *f != 0.0,
            Value::Str(s)    => !s.is_empty(),
            Value::Bool(b)   => *b,
            Value::Null      => false,
            Value::List(l)   => !l.borrow().is_empty(),
            Value::Dict(d)   => !d.borrow().is_empty(),
            Value::Module(_) => true,
        }
    }

    /// The name of this value's type.
    pub fn ty(&self) -> &'static str {
        match self {
            Value::Int(_)    => "entier",
            Value::Float(_)  => "décimal",
            Value::Str(_)    => "chaîne",
            Value::Bool(_)   => "booléen",
            Value::Null      => "nul",
            Value::List(_)   => "liste",
            Value::Dict(_)   => "dictionnaire",
            Value::Module(_) => "module",
        }
    }

    /// Coerce to a number. Booleans count as 0/1, and strings that
    /// look like numbers are parsed.
    pub(super) fn as_num(&self) -> Option<Num> {
        match self {
            Value::Int(n)   => Some(Num::Int(*n)),
            Value::Float(f) => Some(Num::Float(*f)),
            Value::Bool(b)  => Some(Num::Int(*b as isize)),
            Value::Str(s) => {
                let t = s.trim();
                if !NUM_RE.is_match(t) { return None; }

                if t.contains('.') {
                    t.parse().ok().map(Num::Float)
                } else {
                    t.parse().ok().map(Num::Int)
                }
            },
            _ => None,
        }
    }

    /// The values a `pour ... dans` loop walks over,
    /// or `None` if this value cannot be iterated.
    pub fn iterate(&self) -> Option<Vec<Value>> {
        match self {
            Value::List(l) => Some(l.borrow().clone()),
            Value::Str(s) => Some(
                s.chars()
                    .map(|c| Value::Str(c.to_string()))
                    .collect()
            ),
            Value::Dict(d) => Some(
                d.borrow().keys()
                    .cloned()
                    .map(Value::Str)
                    .collect()
            ),
            _ => None,
        }
    }

    /// Like [`Display`], but strings are quoted. This is the form
    /// lists and dicts print their elements with.
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("\"{s}\""),
            Value::List(l) => {
                let items: Vec<_> = l.borrow().iter()
                    .map(Value::repr)
                    .collect();
                format!("[{}]", items.join(", "))
            },
            Value::Dict(d) => {
                let entries: Vec<_> = d.borrow().iter()
                    .map(|(k, v)| format!("\"{k}\": {}", v.repr()))
                    .collect();
                format!("{{{}}}", entries.join(", "))
            },
            _ => self.to_string(),
        }
    }

    /// The compact rendering `chaine()` uses for lists and dicts:
    /// no spaces after the separators.
    pub fn compact_repr(&self) -> String {
        match self {
            Value::Str(s) => format!("\"{s}\""),
            Value::List(l) => {
                let items: Vec<_> = l.borrow().iter()
                    .map(Value::compact_repr)
                    .collect();
                format!("[{}]", items.join(","))
            },
            Value::Dict(d) => {
                let entries: Vec<_> = d.borrow().iter()
                    .map(|(k, v)| format!("\"{k}\":{}", v.compact_repr()))
                    .collect();
                format!("{{{}}}", entries.join(","))
            },
            _ => self.to_string(),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(n) => Display::fmt(n, f),
            Value::Float(n) if n.fract() == 0.0 && n.is_finite() => write!(f, "{n:.1}"),
            Value::Float(n)  => Display::fmt(n, f),
            Value::Str(s)    => f.write_str(s),
            Value::Bool(b)   => f.write_str(if *b { "vrai" } else { "faux" }),
            Value::Null      => f.write_str("nul"),
            Value::List(_) | Value::Dict(_) => f.write_str(&self.repr()),
            Value::Module(m) => write!(f, "<module '{}'>", m.name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b))       => a == b,
            (Value::Null, Value::Null)           => true,
            (Value::List(a), Value::List(b))     => *a.borrow() == *b.borrow(),
            (Value::Dict(a), Value::Dict(b))     => *a.borrow() == *b.borrow(),
            (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),

            // ints, floats, and booleans compare as numbers
            (
                a @ (Value::Int(_) | Value::Float(_) | Value::Bool(_)),
                b @ (Value::Int(_) | Value::Float(_) | Value::Bool(_))
            ) => match (a.as_num(), b.as_num()) {
                (Some(Num::Int(x)), Some(Num::Int(y))) => x == y,
                (Some(x), Some(y)) => x.as_f64() == y.as_f64(),
                _ => false,
            },

            _ => false,
        }
    }
}

impl From<&Literal> for Value {
    fn from(lit: &Literal) -> Self {
        match lit {
            Literal::Int(n)   => Value::Int(*n),
            Literal::Float(f) => Value::Float(*f),
            Literal::Str(s)   => Value::Str(s.clone()),
            Literal::Bool(b)  => Value::Bool(*b),
            Literal::Null     => Value::Null,
        }
    }
}

/// Apply a unary operator to a value.
pub fn apply_unary(op: op::Unary, v: Value) -> RtResult<Value> {
    match op {
        op::Unary::Not => Ok(Value::Bool(!v.truth())),
        op::Unary::Neg => match v.as_num() {
            Some(Num::Int(n))   => Ok(Value::Int(-n)),
            Some(Num::Float(f)) => Ok(Value::Float(-f)),
            None => Err(TypeErr::CannotUnary(op, v.ty()))?,
        },
    }
}

/// Apply a binary operator to two values.
///
/// `et` and `ou` return one of their operand values based on the
/// truth of the left one. Both operands are already evaluated when
/// this is called.
pub fn apply_binary(op: op::Binary, left: Value, right: Value) -> RtResult<Value> {
    match op {
        op::Binary::LogAnd => Ok(if left.truth() { right } else { left }),
        op::Binary::LogOr  => Ok(if left.truth() { left } else { right }),

        op::Binary::Eq => Ok(Value::Bool(left == right)),
        op::Binary::Ne => Ok(Value::Bool(left != right)),

        // a string on either side of `+` means concatenation
        op::Binary::Add if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) => {
            Ok(Value::Str(format!("{left}{right}")))
        },

        op::Binary::Div => {
            let (Some(a), Some(b)) = (left.as_num(), right.as_num()) else {
                return Err(TypeErr::CannotBinary(op, left.ty(), right.ty()).into());
            };

            if b.as_f64() == 0.0 {
                return Err(ValueErr::DivisionByZero.into());
            }
            Ok(Value::Float(a.as_f64() / b.as_f64()))
        },

        op::Binary::Add | op::Binary::Sub | op::Binary::Mul | op::Binary::Mod => {
            numeric_binary(op, left, right)
        },

        op::Binary::Lt | op::Binary::Le | op::Binary::Gt | op::Binary::Ge => {
            compare(op, left, right)
        },
    }
}

fn numeric_binary(op: op::Binary, left: Value, right: Value) -> RtResult<Value> {
    let (Some(a), Some(b)) = (left.as_num(), right.as_num()) else {
        return Err(TypeErr::CannotBinary(op, left.ty(), right.ty()).into());
    };

    if let (Num::Int(a), Num::Int(b)) = (a, b) {
        let n = match op {
            op::Binary::Add => a + b,
            op::Binary::Sub => a - b,
            op::Binary::Mul => a * b,
            op::Binary::Mod => {
                if b == 0 {
                    return Err(ValueErr::DivisionByZero.into());
                }
                // the result takes the divisor's sign
                (a % b + b) % b
            },
            _ => unreachable!("numeric_binary: {op}"),
        };

        Ok(Value::Int(n))
    } else {
        let (a, b) = (a.as_f64(), b.as_f64());
        let f = match op {
            op::Binary::Add => a + b,
            op::Binary::Sub => a - b,
            op::Binary::Mul => a * b,
            op::Binary::Mod => {
                if b == 0.0 {
                    return Err(ValueErr::DivisionByZero.into());
                }
                (a % b + b) % b
            },
            _ => unreachable!("numeric_binary: {op}"),
        };

        Ok(Value::Float(f))
    }
}

fn compare(op: op::Binary, left: Value, right: Value) -> RtResult<Value> {
    use std::cmp::Ordering;

    let ord = match (&left, &right) {
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        _ => match (left.as_num(), right.as_num()) {
            (Some(a), Some(b)) => match a.as_f64().partial_cmp(&b.as_f64()) {
                Some(ord) => ord,
                None => return Ok(Value::Bool(false)),
            },
            _ => return Err(TypeErr::CannotBinary(op, left.ty(), right.ty()).into()),
        },
    };

    let holds = match op {
        op::Binary::Lt => ord == Ordering::Less,
        op::Binary::Le => ord != Ordering::Greater,
        op::Binary::Gt => ord == Ordering::Greater,
        op::Binary::Ge => ord != Ordering::Less,
        _ => unreachable!("compare: {op}"),
    };

    Ok(Value::Bool(holds))
}

/// Index into a value.
///
/// Lists and strings take integer indices, negative ones counting
/// from the end. Dicts take their key's string form.
pub fn get_index(val: Value, idx: Value) -> RtResult<Value> {
    match val {
        Value::List(l) => {
            let list = l.borrow();
            let i = normalize_index(&idx, list.len())?;
            Ok(list[i].clone())
        },
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = normalize_index(&idx, chars.len())?;
            Ok(Value::Str(chars[i].to_string()))
        },
        Value::Dict(d) => {
            let key = idx.to_string();
            d.borrow().get(&key)
                .cloned()
                .ok_or_else(|| ValueErr::KeyNotFound(key).into())
        },
        v => Err(TypeErr::CannotIndex(v.ty()))?,
    }
}

/// Write into an element of a list or an entry of a dict.
pub fn set_index(val: Value, idx: Value, to: Value) -> RtResult<()> {
    match val {
        Value::List(l) => {
            let mut list = l.borrow_mut();
            let len = list.len();
            let i = normalize_index(&idx, len)?;
            list[i] = to;
            Ok(())
        },
        Value::Dict(d) => {
            d.borrow_mut().insert(idx.to_string(), to);
            Ok(())
        },
        v => Err(TypeErr::CannotIndex(v.ty()))?,
    }
}

/// Read a dict entry under a key known at parse time.
pub fn get_dict_key(val: &Value, key: &str) -> RtResult<Value> {
    match val {
        Value::Dict(d) => d.borrow().get(key)
            .cloned()
            .ok_or_else(|| ValueErr::KeyNotFound(key.to_string()).into()),
        v => Err(TypeErr::CannotIndex(v.ty()))?,
    }
}

pub(super) fn normalize_index(idx: &Value, len: usize) -> RtResult<usize> {
    let Value::Int(i) = idx else {
        return Err(TypeErr::IndexMustBeInt(idx.ty()).into());
    };

    let resolved = if *i < 0 { len as isize + i } else { *i };
    if (0..len as isize).contains(&resolved) {
        Ok(resolved as usize)
    } else {
        Err(ValueErr::IndexOutOfBounds(*i))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::runtime::RuntimeErr;

    fn assert_value(result: RtResult<Value>, expected: Value) {
        match result {
            Ok(v)  => assert_eq!(v, expected),
            Err(e) => panic!("operation failed: {}", e.short_msg()),
        }
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Null.truth());
        assert!(!Value::Bool(false).truth());
        assert!(!Value::Int(0).truth());
        assert!(!Value::Float(0.0).truth());
        assert!(!Value::Str(String::new()).truth());
        assert!(!Value::new_list(vec![]).truth());

        assert!(Value::Int(-1).truth());
        assert!(Value::Str(String::from("0")).truth());
        assert!(Value::new_list(vec![Value::Null]).truth());
    }

    #[test]
    fn string_concat() {
        assert_value(
            apply_binary(op::Binary::Add, Value::Str(String::from("a")), Value::Int(1)),
            Value::Str(String::from("a1"))
        );
        assert_value(
            apply_binary(op::Binary::Add, Value::Int(2), Value::Str(String::from("x"))),
            Value::Str(String::from("2x"))
        );
    }

    #[test]
    fn numeric_coercion() {
        // booleans and numeric strings count as numbers
        assert_value(
            apply_binary(op::Binary::Add, Value::Bool(true), Value::Int(2)),
            Value::Int(3)
        );
        assert_value(
            apply_binary(op::Binary::Mul, Value::Str(String::from("3")), Value::Int(2)),
            Value::Int(6)
        );
        assert_value(
            apply_binary(op::Binary::Sub, Value::Str(String::from("1.5")), Value::Int(1)),
            Value::Float(0.5)
        );
    }

    #[test]
    fn modulo_follows_divisor_sign() {
        assert_value(
            apply_binary(op::Binary::Mod, Value::Int(7), Value::Int(3)),
            Value::Int(1)
        );
        assert_value(
            apply_binary(op::Binary::Mod, Value::Int(7), Value::Int(-3)),
            Value::Int(-2)
        );
        assert_value(
            apply_binary(op::Binary::Mod, Value::Int(-7), Value::Int(3)),
            Value::Int(2)
        );
        assert_value(
            apply_binary(op::Binary::Mod, Value::Float(7.5), Value::Int(-2)),
            Value::Float(-0.5)
        );
    }

    #[test]
    fn division_is_float() {
        assert_value(
            apply_binary(op::Binary::Div, Value::Int(7), Value::Int(2)),
            Value::Float(3.5)
        );

        let err = apply_binary(op::Binary::Div, Value::Int(1), Value::Int(0))
            .expect_err("1 / 0 should fail");
        assert!(matches!(err.err, RuntimeErr::ValueErr(ValueErr::DivisionByZero)));
    }

    #[test]
    fn logical_ops_return_operands() {
        assert_value(
            apply_binary(op::Binary::LogAnd, Value::Int(1), Value::Str(String::from("b"))),
            Value::Str(String::from("b"))
        );
        assert_value(
            apply_binary(op::Binary::LogOr, Value::Int(0), Value::Str(String::from("b"))),
            Value::Str(String::from("b"))
        );
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Bool(true).to_string(), "vrai");
        assert_eq!(Value::Null.to_string(), "nul");

        let l = Value::new_list(vec![Value::Int(1), Value::Str(String::from("a"))]);
        assert_eq!(l.to_string(), "[1, \"a\"]");
        assert_eq!(l.compact_repr(), "[1,\"a\"]");
    }

    #[test]
    fn negative_indexing() {
        let l = Value::new_list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_value(get_index(l.clone(), Value::Int(-1)), Value::Int(3));

        let err = get_index(l, Value::Int(3)).expect_err("index 3 is out of bounds");
        assert!(matches!(err.err, RuntimeErr::ValueErr(ValueErr::IndexOutOfBounds(3))));
    }
}
