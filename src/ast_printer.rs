//! Converts an expression tree to a parenthesized prefix dump, e.g.
//! `1 + 2 * 3` → `(+ 1.0 (* 2.0 3.0))`.  Used by the `parse` subcommand and
//! handy in tests; execution never touches this.

use crate::ast::{Expr, LiteralValue};

pub struct AstPrinter;

impl AstPrinter {
    pub fn print(&self, expr: &Expr) -> String {
        match expr {
            Expr::Literal(literal) => match literal {
                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }

                LiteralValue::Str(s) => s.clone(),

                LiteralValue::True => "true".to_string(),

                LiteralValue::False => "false".to_string(),

                LiteralValue::Nil => "nil".to_string(),
            },

            Expr::Grouping(inner) => format!("(group {})", self.print(inner)),

            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, self.print(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                self.print(left),
                self.print(right)
            ),

            Expr::Variable(token) => token.lexeme.to_string(),

            Expr::Assign { name, value } => {
                format!("(= {} {})", name.lexeme, self.print(value))
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                let mut out = format!("(call {}", self.print(callee));

                for argument in arguments {
                    out.push(' ');
                    out.push_str(&self.print(argument));
                }

                out.push(')');

                out
            }

            Expr::Get { object, name } => {
                format!("(. {} {})", self.print(object), name.lexeme)
            }

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(= (. {} {}) {})",
                self.print(object),
                name.lexeme,
                self.print(value)
            ),

            Expr::This(_) => "this".to_string(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),
        }
    }
}
