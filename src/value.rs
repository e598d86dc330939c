//! Runtime values.
//!
//! The set of variants is closed; every operation below matches on all of
//! them so adding a variant is a compile error until each rule is decided.

use std::fmt;
use std::rc::Rc;

use crate::class::{LoxClass, LoxInstance};
use crate::function::{Callable, LoxFunction, NativeFunction};

#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    String(String),
    Number(f64),
    Nil,
    NativeFunction(Rc<NativeFunction>),
    Function(Rc<LoxFunction>),
    Class(Rc<LoxClass>),
    Instance(Rc<LoxInstance>),
}

impl Value {
    /// Only `false` and `nil` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            Value::String(_)
            | Value::Number(_)
            | Value::NativeFunction(_)
            | Value::Function(_)
            | Value::Class(_)
            | Value::Instance(_) => true,
        }
    }

    /// Type name used in operator error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Nil => "nil",
            Value::NativeFunction(_) => "native function",
            Value::Function(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
        }
    }

    /// Lox equality: tags must match, no coercion.  Primitives compare by
    /// value (so `NaN != NaN`), heap values by identity.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::NativeFunction(a), Value::NativeFunction(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// The callable capability of this value, if it has one.
    pub fn as_callable(&self) -> Option<&dyn Callable> {
        match self {
            Value::NativeFunction(native) => Some(native.as_ref() as &dyn Callable),
            Value::Function(function) => Some(function.as_ref() as &dyn Callable),
            Value::Class(class) => Some(class as &dyn Callable),
            Value::Bool(_) | Value::String(_) | Value::Number(_) | Value::Nil => None,
            Value::Instance(_) => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::NativeFunction(_) => write!(f, "<native fn>"),

            Value::Function(function) => write!(f, "{}", function),

            Value::Class(class) => write!(f, "{}", class.name()),

            Value::Instance(instance) => write!(f, "{} instance", instance.class().name()),

            Value::Number(n) => {
                if n.is_nan() {
                    write!(f, "NaN")
                } else if n.is_infinite() {
                    write!(f, "{}Infinity", if *n < 0.0 { "-" } else { "" })
                } else if n.fract() == 0.0 {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::String(s) => write!(f, "{}", s),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Nil => write!(f, "nil"),
        }
    }
}
