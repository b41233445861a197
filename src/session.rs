//! Pipeline drivers: source text in, diagnostics and program output out.
//!
//! [`run_source`] executes the whole pipeline once: scan, parse, and resolve
//! — accumulating every lexical, syntax, and resolution error so the caller
//! gets a complete report — then interprets only if that report is empty.
//! Interpretation stops at the first runtime error, which becomes the single
//! diagnostic for the run.
//!
//! [`Repl`] is the persistent variant: one interpreter (global environment
//! and resolution table) lives for the whole session, and each submitted
//! line runs through the same pipeline.  A failed line leaves the session
//! intact.

use std::io::Write;

use log::{debug, info};

use crate::ast::Stmt;
use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::token::Token;

/// Scan the whole source, partitioning the stream into tokens and lexical
/// errors.  The token list is best-effort: downstream stages may attempt it,
/// but execution must not proceed when any error was recorded.
pub fn scan(source: &[u8]) -> (Vec<Token<'_>>, Vec<LoxError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for result in Scanner::new(source) {
        match result {
            Ok(token) => tokens.push(token),
            Err(e) => errors.push(e),
        }
    }

    debug!(
        "Scanned {} token(s), {} lexical error(s)",
        tokens.len(),
        errors.len()
    );

    (tokens, errors)
}

/// Run a complete program from source.  On failure the returned list holds
/// either every static diagnostic found, or the single runtime error that
/// halted execution.
pub fn run_source<W: Write>(source: &[u8], out: W) -> Result<(), Vec<LoxError>> {
    let (tokens, mut errors) = scan(source);

    let mut parser = Parser::new(&tokens);
    let (statements, parse_errors) = parser.parse();
    errors.extend(parse_errors);

    let (locals, resolve_errors) = Resolver::new().resolve(&statements);
    errors.extend(resolve_errors);

    if !errors.is_empty() {
        info!("Not executing: {} static error(s)", errors.len());

        return Err(errors);
    }

    let mut interpreter = Interpreter::new(out);
    interpreter.apply_resolution(locals);

    interpreter.interpret(&statements).map_err(|e| vec![e])
}

/// A read-eval-print session with one persistent global environment.
pub struct Repl<W: Write> {
    interpreter: Interpreter<'static, W>,
}

impl<W: Write> Repl<W> {
    pub fn new(out: W) -> Self {
        info!("REPL session started");

        Repl {
            interpreter: Interpreter::new(out),
        }
    }

    /// Run one submitted line (which may contain several statements).
    ///
    /// The line's source, tokens, and syntax tree are given process lifetime:
    /// closures and classes defined on earlier lines keep referring to their
    /// declaration nodes, so per-line allocations live as long as the
    /// session's global environment — i.e. until process exit.
    pub fn run_line(&mut self, line: String) -> Result<(), Vec<LoxError>> {
        let source: &'static [u8] = Box::leak(line.into_bytes().into_boxed_slice());

        let (tokens, mut errors) = scan(source);
        let tokens: &'static [Token<'static>] = Box::leak(tokens.into_boxed_slice());

        let mut parser = Parser::new(tokens);
        let (statements, parse_errors) = parser.parse();
        errors.extend(parse_errors);

        let statements: &'static [Stmt<'static>] = Box::leak(statements.into_boxed_slice());

        let (locals, resolve_errors) = Resolver::new().resolve(statements);
        errors.extend(resolve_errors);

        if !errors.is_empty() {
            return Err(errors);
        }

        self.interpreter.apply_resolution(locals);

        // A lone bare expression gets its value echoed, shell-style.
        if let [Stmt::Expression(expr)] = statements {
            let value = self.interpreter.evaluate(expr).map_err(|e| vec![e])?;

            return writeln!(self.interpreter.writer_mut(), "{}", value)
                .map_err(|e| vec![LoxError::from(e)]);
        }

        self.interpreter.interpret(statements).map_err(|e| vec![e])
    }
}
