//! Class and instance runtime objects.
//!
//! Classes hold their method table and an optional superclass handle; method
//! lookup walks that chain linearly.  Instances hold a handle to their class
//! plus a field map populated lazily on first assignment.  Both are `Rc`
//! handles, so clones share state and equality is handle identity.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::callable::LoxFunction;
use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;

struct ClassData<'a> {
    name: &'a Token<'a>,
    superclass: Option<LoxClass<'a>>,
    methods: HashMap<&'a str, LoxFunction<'a>>,
}

#[derive(Clone)]
pub struct LoxClass<'a> {
    data: Rc<ClassData<'a>>,
}

impl<'a> LoxClass<'a> {
    pub fn new(
        name: &'a Token<'a>,
        superclass: Option<LoxClass<'a>>,
        methods: HashMap<&'a str, LoxFunction<'a>>,
    ) -> Self {
        LoxClass {
            data: Rc::new(ClassData {
                name,
                superclass,
                methods,
            }),
        }
    }

    pub fn name(&self) -> &'a str {
        self.data.name.lexeme
    }

    /// Look a method up on this class, then up the superclass chain.  A
    /// subclass method shadows a superclass method of the same name.
    pub fn find_method(&self, name: &str) -> Option<LoxFunction<'a>> {
        match self.data.methods.get(name) {
            Some(method) => Some(method.clone()),

            None => self
                .data
                .superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name)),
        }
    }

    /// Calling a class forwards its arguments to `init`; without one the
    /// class takes no arguments.
    pub fn arity(&self) -> usize {
        self.find_method("init")
            .map(|init| init.arity())
            .unwrap_or(0)
    }

    pub fn equals(&self, other: &LoxClass<'a>) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl<'a> fmt::Display for LoxClass<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl<'a> fmt::Debug for LoxClass<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxClass")
            .field("name", &self.name())
            .field(
                "superclass",
                &self.data.superclass.as_ref().map(|s| s.name()),
            )
            .finish()
    }
}

struct InstanceData<'a> {
    class: LoxClass<'a>,
    fields: HashMap<&'a str, Value<'a>>,
}

#[derive(Clone)]
pub struct LoxInstance<'a> {
    data: Rc<RefCell<InstanceData<'a>>>,
}

impl<'a> LoxInstance<'a> {
    pub fn new(class: LoxClass<'a>) -> Self {
        LoxInstance {
            data: Rc::new(RefCell::new(InstanceData {
                class,
                fields: HashMap::new(),
            })),
        }
    }

    /// Property read: fields shadow methods; a found method comes back bound
    /// to this instance.
    pub fn get(&self, name: &'a Token<'a>) -> Result<Value<'a>> {
        if let Some(value) = self.data.borrow().fields.get(name.lexeme) {
            return Ok(value.clone());
        }

        let method = self.data.borrow().class.find_method(name.lexeme);

        match method {
            Some(method) => Ok(Value::Function(method.bind(self.clone()))),

            None => Err(LoxError::runtime(
                name.line,
                format!("Undefined property '{}'.", name.lexeme),
            )),
        }
    }

    /// Property write: creates the field on first assignment.
    pub fn set(&self, name: &'a Token<'a>, value: Value<'a>) {
        self.data.borrow_mut().fields.insert(name.lexeme, value);
    }

    pub fn class_name(&self) -> &'a str {
        self.data.borrow().class.name()
    }

    pub fn equals(&self, other: &LoxInstance<'a>) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl<'a> fmt::Display for LoxInstance<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.class_name())
    }
}

impl<'a> fmt::Debug for LoxInstance<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxInstance")
            .field("class", &self.class_name())
            .finish()
    }
}
