//! The dynamic value universe: everything an expression can evaluate to.

use crate::callable::LoxFunction;
use crate::class::{LoxClass, LoxInstance};

/// Signature of a built-in function.  Errors surface as runtime errors at the
/// call site.
pub type NativeFn<'a> = fn(&[Value<'a>]) -> std::result::Result<Value<'a>, String>;

#[derive(Debug, Clone)]
pub enum Value<'a> {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),

    /// A built-in callable seeded into the global environment.
    NativeFunction {
        name: String,
        arity: usize,
        func: NativeFn<'a>,
    },

    /// A user-declared function or bound method.
    Function(LoxFunction<'a>),

    /// A class value; calling it produces an instance.
    Class(LoxClass<'a>),

    /// An object created by calling a class.
    Instance(LoxInstance<'a>),
}

impl<'a> Value<'a> {
    /// Language-level equality: `nil` equals only `nil`; numbers, strings,
    /// and booleans compare by value; callables and instances compare by
    /// identity.  Values of different kinds are never equal — `==` performs
    /// no coercion.
    pub fn equals(&self, other: &Value<'a>) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,

            // A native's name uniquely identifies the builtin.
            (Value::NativeFunction { name: a, .. }, Value::NativeFunction { name: b, .. }) => {
                a == b
            }

            (Value::Function(a), Value::Function(b)) => a.equals(b),
            (Value::Class(a), Value::Class(b)) => a.equals(b),
            (Value::Instance(a), Value::Instance(b)) => a.equals(b),

            _ => false,
        }
    }
}

impl<'a> std::fmt::Display for Value<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Number(n) => {
                if n.fract() == 0.0 {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::String(s) => write!(f, "{}", s),

            Value::NativeFunction { name, .. } => write!(f, "<native fn {}>", name),

            Value::Function(function) => write!(f, "{}", function),

            Value::Class(class) => write!(f, "{}", class),

            Value::Instance(instance) => write!(f, "{}", instance),
        }
    }
}
