//! Tree-walking evaluator.
//!
//! Executes a resolved statement list sequentially against an environment
//! chain rooted at a global scope seeded with the built-in `clock` function.
//! Variable occurrences recorded in the resolution table are read/written at
//! exactly the recorded hop count; everything else resolves dynamically
//! against the globals.
//!
//! `return` is modeled as explicit control flow, not an error: statement
//! execution yields a [`Flow`] and function calls are the only place a
//! `Flow::Return` stops unwinding.  A runtime error aborts the current run
//! immediately; there is no recovery within one program.
//!
//! `print` output goes to an injected `io::Write`, so callers (CLI, REPL,
//! tests) decide where program output lands.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use log::{debug, info};

use crate::ast::{Expr, FunctionDecl, LiteralValue, Stmt};
use crate::callable::LoxFunction;
use crate::class::{LoxClass, LoxInstance};
use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::resolver::{expr_key, Locals};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Outcome of executing a statement: either control falls through to the
/// next statement, or a `return` is unwinding toward the nearest enclosing
/// function call.
#[derive(Debug)]
pub enum Flow<'a> {
    Normal,
    Return(Value<'a>),
}

pub struct Interpreter<'a, W: Write> {
    globals: Rc<RefCell<Environment<'a>>>,
    environment: Rc<RefCell<Environment<'a>>>,
    locals: Locals,
    writer: W,
}

impl<'a, W: Write> Interpreter<'a, W> {
    /// Create an interpreter whose `print` statements write to `writer`.
    /// The global environment comes seeded with the native `clock` function.
    pub fn new(writer: W) -> Self {
        info!("Initializing interpreter");

        let mut globals = Environment::new();

        globals.define(
            "clock",
            Value::NativeFunction {
                name: "clock".to_string(),
                arity: 0,
                func: |_args: &[Value]| {
                    let timestamp: f64 = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .map_err(|e: SystemTimeError| format!("Clock error: {}", e))?
                        .as_secs_f64();

                    Ok(Value::Number(timestamp))
                },
            },
        );

        let globals = Rc::new(RefCell::new(globals));

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            writer,
        }
    }

    /// Merge a resolution table produced by the resolver.  A REPL session
    /// calls this once per submitted line, extending the table it already
    /// holds for earlier lines.
    pub fn apply_resolution(&mut self, locals: Locals) {
        self.locals.extend(locals);
    }

    /// The output sink, e.g. for a REPL shell that echoes expression values.
    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Interpret a program: execute statements in order until the end or the
    /// first runtime error.
    pub fn interpret(&mut self, statements: &'a [Stmt<'a>]) -> Result<()> {
        debug!("Interpreting {} statement(s)", statements.len());

        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Normal => {}

                // The resolver rejects top-level `return`; a stray one simply
                // ends the program rather than escaping the interpreter.
                Flow::Return(_) => break,
            }
        }

        info!("Interpretation completed");

        Ok(())
    }

    // ───────────────────────── statement execution ──────────────────────────

    pub fn execute(&mut self, stmt: &'a Stmt<'a>) -> Result<Flow<'a>> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;

                writeln!(self.writer, "{}", value)?;

                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}'", name.lexeme);

                self.environment.borrow_mut().define(name.lexeme, value);

                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let env = Environment::with_enclosing(Rc::clone(&self.environment));

                self.execute_block(statements, Rc::new(RefCell::new(env)))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);

                let function = LoxFunction::new(decl, Rc::clone(&self.environment), false);

                self.environment
                    .borrow_mut()
                    .define(decl.name.lexeme, Value::Function(function));

                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Ok(Flow::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    /// Execute statements inside `environment`, restoring the previous
    /// environment on every exit path (completion, `return`, error).
    pub fn execute_block(
        &mut self,
        statements: &'a [Stmt<'a>],
        environment: Rc<RefCell<Environment<'a>>>,
    ) -> Result<Flow<'a>> {
        let previous = std::mem::replace(&mut self.environment, environment);

        let mut flow = Flow::Normal;

        for stmt in statements {
            match self.execute(stmt) {
                Ok(Flow::Normal) => {}

                Ok(returning @ Flow::Return(_)) => {
                    flow = returning;

                    break;
                }

                Err(e) => {
                    self.environment = previous;

                    return Err(e);
                }
            }
        }

        self.environment = previous;

        Ok(flow)
    }

    /// Class declaration: evaluate the superclass (when present), build the
    /// method table, and bind the class value to its name.
    ///
    /// The `super` environment is created only when a superclass exists —
    /// this must match the resolver's scope nesting exactly, otherwise every
    /// recorded `super` distance would be off by one.
    fn execute_class(
        &mut self,
        name: &'a Token<'a>,
        superclass: Option<&'a Expr<'a>>,
        methods: &'a [FunctionDecl<'a>],
    ) -> Result<Flow<'a>> {
        let superclass_value = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),

                _ => {
                    let line = match expr {
                        Expr::Variable(token) => token.line,
                        _ => name.line,
                    };

                    return Err(LoxError::runtime(line, "Superclass must be a class."));
                }
            },

            None => None,
        };

        // declare first so methods can close over the class's own name
        self.environment.borrow_mut().define(name.lexeme, Value::Nil);

        let previous = Rc::clone(&self.environment);

        if let Some(ref class) = superclass_value {
            let mut env = Environment::with_enclosing(Rc::clone(&self.environment));

            env.define("super", Value::Class(class.clone()));

            self.environment = Rc::new(RefCell::new(env));
        }

        let mut method_table: HashMap<&'a str, LoxFunction<'a>> = HashMap::new();

        for method in methods {
            let is_initializer = method.name.lexeme == "init";

            method_table.insert(
                method.name.lexeme,
                LoxFunction::new(method, Rc::clone(&self.environment), is_initializer),
            );
        }

        let class = LoxClass::new(name, superclass_value, method_table);

        self.environment = previous;

        self.environment
            .borrow_mut()
            .assign(name.lexeme, Value::Class(class), name.line)?;

        debug!("Defined class '{}'", name.lexeme);

        Ok(Flow::Normal)
    }

    // ───────────────────────── expression evaluation ────────────────────────

    pub fn evaluate(&mut self, expr: &'a Expr<'a>) -> Result<Value<'a>> {
        match expr {
            Expr::Literal(literal) => Ok(literal_value(literal)),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => self.evaluate_logical(left, operator, right),

            Expr::Variable(token) => self.look_up_variable(token, expr),

            Expr::Assign { name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(&expr_key(expr)) {
                    Some(&distance) => Environment::assign_at(
                        &self.environment,
                        distance,
                        name.lexeme,
                        value.clone(),
                        name.line,
                    )?,

                    None => self.globals.borrow_mut().assign(
                        name.lexeme,
                        value.clone(),
                        name.line,
                    )?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_value = self.evaluate(callee)?;

                let mut argument_values = Vec::with_capacity(arguments.len());

                for argument in arguments {
                    argument_values.push(self.evaluate(argument)?);
                }

                self.invoke_callable(callee_value, paren, argument_values)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => instance.get(name),

                _ => Err(LoxError::runtime(
                    name.line,
                    "Only instances have properties.",
                )),
            },

            Expr::Set {
                object,
                name,
                value,
            } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value = self.evaluate(value)?;

                    instance.set(name, value.clone());

                    Ok(value)
                }

                _ => Err(LoxError::runtime(name.line, "Only instances have fields.")),
            },

            Expr::This(keyword) => self.look_up_variable(keyword, expr),

            Expr::Super { keyword, method } => self.evaluate_super(expr, keyword, method),
        }
    }

    fn look_up_variable(&self, name: &'a Token<'a>, expr: &'a Expr<'a>) -> Result<Value<'a>> {
        match self.locals.get(&expr_key(expr)) {
            Some(&distance) => {
                Environment::get_at(&self.environment, distance, name.lexeme, name.line)
            }

            None => self.globals.borrow().get(name.lexeme, name.line),
        }
    }

    fn evaluate_unary(&mut self, operator: &'a Token<'a>, right: &'a Expr<'a>) -> Result<Value<'a>> {
        let right_value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right_value {
                Value::Number(n) => Ok(Value::Number(-n)),

                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operand must be a number.",
                )),
            },

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&right_value))),

            _ => Err(LoxError::runtime(operator.line, "Invalid unary operator.")),
        }
    }

    fn evaluate_logical(
        &mut self,
        left: &'a Expr<'a>,
        operator: &'a Token<'a>,
        right: &'a Expr<'a>,
    ) -> Result<Value<'a>> {
        let left_value = self.evaluate(left)?;

        // short-circuit: yield the deciding operand itself, uncoerced
        match operator.token_type {
            TokenType::OR if is_truthy(&left_value) => Ok(left_value),
            TokenType::AND if !is_truthy(&left_value) => Ok(left_value),
            _ => self.evaluate(right),
        }
    }

    fn evaluate_binary(
        &mut self,
        left: &'a Expr<'a>,
        operator: &'a Token<'a>,
        right: &'a Expr<'a>,
    ) -> Result<Value<'a>> {
        let left_value = self.evaluate(left)?;
        let right_value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

                // one string operand coerces the other to its display form
                (Value::String(a), b) => Ok(Value::String(format!("{}{}", a, b))),
                (a, Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),

                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                )),
            },

            TokenType::MINUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),

                _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::STAR => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),

                _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::SLASH => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => {
                    if b == 0.0 {
                        Err(LoxError::runtime(operator.line, "Division by zero."))
                    } else {
                        Ok(Value::Number(a / b))
                    }
                }

                _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::GREATER => numeric_comparison(left_value, right_value, operator, |a, b| {
                a > b
            }),

            TokenType::GREATER_EQUAL => {
                numeric_comparison(left_value, right_value, operator, |a, b| a >= b)
            }

            TokenType::LESS => numeric_comparison(left_value, right_value, operator, |a, b| a < b),

            TokenType::LESS_EQUAL => {
                numeric_comparison(left_value, right_value, operator, |a, b| a <= b)
            }

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_value.equals(&right_value))),

            TokenType::BANG_EQUAL => Ok(Value::Bool(!left_value.equals(&right_value))),

            _ => Err(LoxError::runtime(operator.line, "Invalid binary operator.")),
        }
    }

    fn evaluate_super(
        &mut self,
        expr: &'a Expr<'a>,
        keyword: &'a Token<'a>,
        method: &'a Token<'a>,
    ) -> Result<Value<'a>> {
        let distance = self
            .locals
            .get(&expr_key(expr))
            .copied()
            .ok_or_else(|| LoxError::runtime(keyword.line, "Can't use 'super' here."))?;

        let superclass = match Environment::get_at(
            &self.environment,
            distance,
            "super",
            keyword.line,
        )? {
            Value::Class(class) => class,

            _ => {
                return Err(LoxError::runtime(
                    keyword.line,
                    "Superclass must be a class.",
                ))
            }
        };

        // `this` sits one environment closer than `super`
        let object = match Environment::get_at(&self.environment, distance - 1, "this", keyword.line)?
        {
            Value::Instance(instance) => instance,

            _ => return Err(LoxError::runtime(keyword.line, "Can't use 'super' here.")),
        };

        let found = superclass.find_method(method.lexeme).ok_or_else(|| {
            LoxError::runtime(
                method.line,
                format!("Undefined property '{}'.", method.lexeme),
            )
        })?;

        Ok(Value::Function(found.bind(object)))
    }

    // ───────────────────────── call dispatch ────────────────────────────────

    fn invoke_callable(
        &mut self,
        callee: Value<'a>,
        paren: &'a Token<'a>,
        arguments: Vec<Value<'a>>,
    ) -> Result<Value<'a>> {
        match callee {
            Value::NativeFunction { name, arity, func } => {
                debug!("Calling native function '{}'", name);

                check_arity(arity, arguments.len(), paren.line)?;

                func(&arguments).map_err(|msg| LoxError::runtime(paren.line, msg))
            }

            Value::Function(function) => {
                check_arity(function.arity(), arguments.len(), paren.line)?;

                function.call(self, arguments, paren.line)
            }

            Value::Class(class) => {
                debug!("Instantiating class '{}'", class.name());

                check_arity(class.arity(), arguments.len(), paren.line)?;

                let instance = LoxInstance::new(class.clone());

                if let Some(initializer) = class.find_method("init") {
                    initializer
                        .bind(instance.clone())
                        .call(self, arguments, paren.line)?;
                }

                Ok(Value::Instance(instance))
            }

            _ => Err(LoxError::runtime(
                paren.line,
                "Can only call functions and classes.",
            )),
        }
    }
}

// ───────────────────────── free helpers ─────────────────────────────────────

/// `nil` and `false` are falsy; every other value (including `0` and `""`)
/// is truthy.
fn is_truthy(value: &Value<'_>) -> bool {
    match value {
        Value::Nil => false,
        Value::Bool(b) => *b,
        _ => true,
    }
}

fn literal_value<'a>(literal: &LiteralValue) -> Value<'a> {
    match literal {
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::Str(s) => Value::String(s.clone()),
        LiteralValue::True => Value::Bool(true),
        LiteralValue::False => Value::Bool(false),
        LiteralValue::Nil => Value::Nil,
    }
}

fn numeric_comparison<'a>(
    left: Value<'a>,
    right: Value<'a>,
    operator: &Token<'a>,
    cmp: fn(f64, f64) -> bool,
) -> Result<Value<'a>> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(cmp(a, b))),

        _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
    }
}

fn check_arity(expected: usize, got: usize, line: usize) -> Result<()> {
    if expected != got {
        return Err(LoxError::runtime(
            line,
            format!("Expected {} arguments but got {}.", expected, got),
        ));
    }

    Ok(())
}
