//! Scope chain: name-to-value bindings plus a link to the enclosing scope.
//!
//! Environments are independently-owned heap nodes behind `Rc<RefCell<…>>`
//! handles.  A closure holds a handle to its defining environment, never a
//! copy, which is what lets several closures observe each other's mutations
//! of a shared enclosing scope.  The chain root is the global scope.

use crate::error::{LoxError, Result};
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug)]
pub struct Environment<'a> {
    values: HashMap<&'a str, Value<'a>>,
    enclosing: Option<Rc<RefCell<Environment<'a>>>>,
}

impl<'a> Environment<'a> {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment<'a>>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Bind `name` in this scope, shadowing any enclosing binding.
    pub fn define(&mut self, name: &'a str, value: Value<'a>) {
        self.values.insert(name, value);
    }

    /// Dynamic lookup walking the chain outward.  Used for globals, where no
    /// resolution distance is recorded.
    pub fn get(&self, name: &str, line: usize) -> Result<Value<'a>> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(LoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    /// Dynamic assignment walking the chain outward.  Assigning a name that
    /// was never declared is an error, not an implicit global definition.
    pub fn assign(&mut self, name: &str, value: Value<'a>, line: usize) -> Result<()> {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;

            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(LoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    /// The environment exactly `distance` links up the chain, if the chain is
    /// that long.
    fn ancestor(
        this: &Rc<RefCell<Environment<'a>>>,
        distance: usize,
    ) -> Option<Rc<RefCell<Environment<'a>>>> {
        let mut env = Rc::clone(this);

        for _ in 0..distance {
            let next = env.borrow().enclosing.as_ref().map(Rc::clone);

            match next {
                Some(enclosing) => env = enclosing,
                None => return None,
            }
        }

        Some(env)
    }

    /// Read `name` at exactly `distance` hops, as recorded by the resolver.
    pub fn get_at(
        this: &Rc<RefCell<Environment<'a>>>,
        distance: usize,
        name: &str,
        line: usize,
    ) -> Result<Value<'a>> {
        Self::ancestor(this, distance)
            .and_then(|env| env.borrow().values.get(name).cloned())
            .ok_or_else(|| LoxError::runtime(line, format!("Undefined variable '{}'.", name)))
    }

    /// Write `name` at exactly `distance` hops, as recorded by the resolver.
    pub fn assign_at(
        this: &Rc<RefCell<Environment<'a>>>,
        distance: usize,
        name: &str,
        value: Value<'a>,
        line: usize,
    ) -> Result<()> {
        if let Some(env) = Self::ancestor(this, distance) {
            if let Some(slot) = env.borrow_mut().values.get_mut(name) {
                *slot = value;

                return Ok(());
            }
        }

        Err(LoxError::runtime(
            line,
            format!("Undefined variable '{}'.", name),
        ))
    }
}

impl<'a> Default for Environment<'a> {
    fn default() -> Self {
        Self::new()
    }
}
