//! Static resolver pass.
//!
//! One AST walk that does three things:
//! 1. Builds lexical scopes (a stack of `HashMap<&str, bool>` tracking
//!    declared/defined) mirroring the environment nesting the interpreter
//!    will create at runtime.
//! 2. Reports static errors: a variable read in its own initializer,
//!    redeclaration in the same scope, `return` at top level, `return` with a
//!    value from an initializer, `this`/`super` outside a class, `super` in a
//!    class without a superclass, and a class inheriting from itself.  Errors
//!    are accumulated — the walk continues after each so one pass surfaces
//!    them all — and any error blocks execution.
//! 3. Records, for each variable-ish occurrence (`Variable`, `Assign`,
//!    `this`, `super`), the number of environment hops between the use site
//!    and its binding.  Occurrences found in no local scope are left out of
//!    the table and resolve dynamically against the global environment.

use crate::ast::{Expr, FunctionDecl, Stmt};
use crate::error::LoxError;
use crate::token::Token;
use log::{debug, info};
use std::collections::HashMap;

/// The resolution table: AST node identity → environment hop count.
///
/// Keyed by node address, which is stable because the statement list is
/// neither mutated nor moved between the resolve and execute passes.
pub type Locals = HashMap<usize, usize>;

/// Identity key for a resolvable expression node.
#[inline]
pub fn expr_key(expr: &Expr<'_>) -> usize {
    expr as *const Expr<'_> as usize
}

/// What kind of function body are we inside?  Validates `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

/// What kind of class body are we inside?  Validates `this` and `super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

pub struct Resolver<'a> {
    scopes: Vec<HashMap<&'a str, bool>>, // false=declared, true=defined
    current_function: FunctionType,
    current_class: ClassType,
    locals: Locals,
    errors: Vec<LoxError>,
}

impl<'a> Resolver<'a> {
    pub fn new() -> Self {
        info!("Resolver instantiated");

        Resolver {
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            locals: Locals::new(),
            errors: Vec::new(),
        }
    }

    /// Walk all top-level statements.  Returns the resolution table and every
    /// static error found; an empty error list means execution may proceed.
    pub fn resolve(mut self, statements: &'a [Stmt<'a>]) -> (Locals, Vec<LoxError>) {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }

        (self.locals, self.errors)
    }

    fn error<S: Into<String>>(&mut self, line: usize, message: S) {
        self.errors.push(LoxError::resolve(line, message));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &'a Stmt<'a>) {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();

                for statement in statements {
                    self.resolve_stmt(statement);
                }

                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define, so that reading the
                // variable inside its own initializer is caught
                self.declare(name);

                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }

                self.define(name);
            }

            Stmt::Function(decl) => {
                // the name is visible inside its own body, enabling recursion
                self.declare(decl.name);
                self.define(decl.name);

                self.resolve_function(decl, FunctionType::Function);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);

                if let Some(else_branch) = else_branch.as_deref() {
                    self.resolve_stmt(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword.line, "Can't return from top-level code");
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword.line, "Can't return a value from an initializer");
                    }

                    self.resolve_expr(expr);
                }
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                self.resolve_class(name, superclass.as_ref(), methods);
            }
        }
    }

    /// Class bodies open a scope binding `super` (only when a superclass
    /// clause exists) enclosing a scope binding `this`, enclosing each method
    /// body.  The interpreter creates environments in exactly this nesting,
    /// so the recorded distances line up at runtime.
    fn resolve_class(
        &mut self,
        name: &'a Token<'a>,
        superclass: Option<&'a Expr<'a>>,
        methods: &'a [FunctionDecl<'a>],
    ) {
        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(name);
        self.define(name);

        if let Some(superclass) = superclass {
            if let Expr::Variable(superclass_name) = superclass {
                if superclass_name.lexeme == name.lexeme {
                    self.error(superclass_name.line, "A class can't inherit from itself");
                }
            }

            self.current_class = ClassType::Subclass;
            self.resolve_expr(superclass);

            self.begin_scope();
            self.scope_insert("super");
        }

        self.begin_scope();
        self.scope_insert("this");

        for method in methods {
            let declaration = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };

            self.resolve_function(method, declaration);
        }

        self.end_scope();

        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &'a Expr<'a>) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner);
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right);
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable(token) => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(token.lexeme) == Some(&false) {
                        self.error(
                            token.line,
                            "Can't read local variable in its own initializer",
                        );
                    }
                }

                self.resolve_local(expr, token);
            }

            Expr::Assign { name, value } => {
                // resolve the right-hand side first, then bind the target
                self.resolve_expr(value);
                self.resolve_local(expr, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);

                for argument in arguments {
                    self.resolve_expr(argument);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(value);
            }

            Expr::This(keyword) => {
                if self.current_class == ClassType::None {
                    self.error(keyword.line, "Can't use 'this' outside of a class");

                    return;
                }

                self.resolve_local(expr, keyword);
            }

            Expr::Super { keyword, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.error(keyword.line, "Can't use 'super' outside of a class");
                    }

                    ClassType::Class => {
                        self.error(
                            keyword.line,
                            "Can't use 'super' in a class with no superclass",
                        );
                    }

                    ClassType::Subclass => {}
                }

                self.resolve_local(expr, keyword);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body.
    fn resolve_function(&mut self, decl: &'a FunctionDecl<'a>, function_type: FunctionType) {
        let enclosing = self.current_function;
        self.current_function = function_type;

        self.begin_scope();

        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }

        for stmt in &decl.body {
            self.resolve_stmt(stmt);
        }

        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Insert an implicit binding (`this` / `super`) as fully defined.
    fn scope_insert(&mut self, name: &'a str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, true);
        }
    }

    fn declare(&mut self, name: &'a Token<'a>) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(name.lexeme) {
                self.errors.push(LoxError::resolve(
                    name.line,
                    "Variable already declared in this scope",
                ));

                return;
            }

            scope.insert(name.lexeme, false);
        }
    }

    fn define(&mut self, name: &'a Token<'a>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme, true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding-distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this occurrence as a local at the depth where the name is
    /// found, innermost scope first.  Not found in any scope ⇒ global, left
    /// out of the table.
    fn resolve_local(&mut self, expr: &'a Expr<'a>, name: &'a Token<'a>) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);

                self.locals.insert(expr_key(expr), depth);

                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}

impl<'a> Default for Resolver<'a> {
    fn default() -> Self {
        Self::new()
    }
}
