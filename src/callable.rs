//! User-declared function values: closure capture, parameter binding, and
//! the `this` rebinding used for methods.

use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::class::LoxInstance;
use crate::environment::Environment;
use crate::error::Result;
use crate::interpreter::{Flow, Interpreter};
use crate::value::Value;

/// A function value: the declaration node it was built from, the environment
/// captured at its definition site, and whether it is a class initializer.
///
/// Cloning shares the closure handle, so every copy of the value observes
/// (and mutates) the same captured variables.
#[derive(Clone)]
pub struct LoxFunction<'a> {
    declaration: &'a FunctionDecl<'a>,
    closure: Rc<RefCell<Environment<'a>>>,
    is_initializer: bool,
}

impl<'a> LoxFunction<'a> {
    pub fn new(
        declaration: &'a FunctionDecl<'a>,
        closure: Rc<RefCell<Environment<'a>>>,
        is_initializer: bool,
    ) -> Self {
        LoxFunction {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &'a str {
        self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Produce a copy of this method whose closure has `this` bound to the
    /// given instance.  Property lookups call this before handing a method
    /// out, so `this` inside the body refers to the receiving instance no
    /// matter where the method value travels afterwards.
    pub fn bind(&self, instance: LoxInstance<'a>) -> LoxFunction<'a> {
        let mut env = Environment::with_enclosing(Rc::clone(&self.closure));

        env.define("this", Value::Instance(instance));

        LoxFunction {
            declaration: self.declaration,
            closure: Rc::new(RefCell::new(env)),
            is_initializer: self.is_initializer,
        }
    }

    /// Invoke the function: bind parameters in a fresh child of the captured
    /// environment, run the body, and map the resulting control flow to a
    /// value.  Initializers always yield `this`, even through an early
    /// `return`.
    pub fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<'a, W>,
        arguments: Vec<Value<'a>>,
        line: usize,
    ) -> Result<Value<'a>> {
        debug!(
            "Calling '{}' with {} argument(s)",
            self.name(),
            arguments.len()
        );

        let mut env = Environment::with_enclosing(Rc::clone(&self.closure));

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            env.define(param.lexeme, argument);
        }

        let flow = interpreter.execute_block(&self.declaration.body, Rc::new(RefCell::new(env)))?;

        if self.is_initializer {
            return Environment::get_at(&self.closure, 0, "this", line);
        }

        match flow {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }

    /// Identity comparison: the same declaration closed over the same
    /// environment.  Two evaluations of one `fun` statement produce distinct
    /// function values.
    pub fn equals(&self, other: &LoxFunction<'a>) -> bool {
        std::ptr::eq(self.declaration, other.declaration)
            && Rc::ptr_eq(&self.closure, &other.closure)
    }
}

impl<'a> fmt::Display for LoxFunction<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

// Manual Debug: printing the closure would recurse through environment
// cycles (a function stored in the environment it captured).
impl<'a> fmt::Debug for LoxFunction<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxFunction")
            .field("name", &self.name())
            .field("arity", &self.arity())
            .field("is_initializer", &self.is_initializer)
            .finish()
    }
}
