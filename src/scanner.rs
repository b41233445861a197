//! One-pass, streaming lexer for the Lox language.
//!
//! Transforms a byte slice into a sequence of [`Token`]s, skipping whitespace
//! and `//` comments and emitting exactly one `EOF` token at the end.  The
//! scanner is an iterator of `Result<Token, LoxError>`: lexical errors
//! (unexpected character, unterminated string) are yielded in-stream and the
//! scan continues afterwards, so a single pass surfaces every lexical error
//! in the source.  Implemented as a `FusedIterator` so it chains safely with
//! other adapters.
//!
//! Implementation notes:
//! - Lexemes are zero-allocation slices of the original buffer; the lifetime
//!   `'a` ties every emitted token back to it.
//! - Keywords resolve through a compile-time perfect-hash `phf` map.
//! - Line comments are skipped in bulk with `memchr`.

use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile-time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"    => TokenType::AND,
    b"class"  => TokenType::CLASS,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"fun"    => TokenType::FUN,
    b"for"    => TokenType::FOR,
    b"if"     => TokenType::IF,
    b"nil"    => TokenType::NIL,
    b"or"     => TokenType::OR,
    b"print"  => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super"  => TokenType::SUPER,
    b"this"   => TokenType::THIS,
    b"true"   => TokenType::TRUE,
    b"var"    => TokenType::VAR,
    b"while"  => TokenType::WHILE,
};

/// Single-pass scanner over a raw source buffer.
pub struct Scanner<'a> {
    src: &'a [u8],
    start: usize, // index of the first byte of the current lexeme
    curr: usize,  // index one past the last byte examined
    line: usize,  // 1-based line counter (\n increments)
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `src`.
    #[inline]
    pub fn new(src: &'a [u8]) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            start: 0,
            curr: 0,
            line: 1,
        }
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    const fn len(&self) -> usize {
        self.src.len()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.len()
    }

    /// Advance one byte and return it.  Callers guard with [`is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.src[self.curr];
        self.curr += 1;
        b
    }

    /// Peek at the current byte without consuming it.  Returns `0` past EOF
    /// to avoid branching at call-site.
    #[inline(always)]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.src[self.curr]
        }
    }

    /// Peek one byte beyond [`peek`].  Safe at EOF.
    #[inline(always)]
    fn peek_next(&self) -> u8 {
        if self.curr + 1 >= self.len() {
            0
        } else {
            self.src[self.curr + 1]
        }
    }

    /// Conditionally consume a byte **iff** it matches `expected`.
    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    /// The source slice of the current lexeme.
    #[inline(always)]
    fn lexeme(&self) -> &'a str {
        // Lexeme boundaries always fall on ASCII bytes the scanner matched.
        std::str::from_utf8(&self.src[self.start..self.curr]).unwrap_or("")
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a single lexeme starting at `self.start`.  Returns `Ok(None)` for
    /// whitespace and comments, `Ok(Some(kind))` for a recognized token.
    fn scan_token(&mut self) -> Result<Option<TokenType>> {
        let b = self.advance();

        let kind = match b {
            // ── single-character punctuators ──────────────────────────────
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,

            // ── one- or two-character operators ──────────────────────────
            b'!' => {
                if self.match_byte(b'=') {
                    TokenType::BANG_EQUAL
                } else {
                    TokenType::BANG
                }
            }

            b'=' => {
                if self.match_byte(b'=') {
                    TokenType::EQUAL_EQUAL
                } else {
                    TokenType::EQUAL
                }
            }

            b'<' => {
                if self.match_byte(b'=') {
                    TokenType::LESS_EQUAL
                } else {
                    TokenType::LESS
                }
            }

            b'>' => {
                if self.match_byte(b'=') {
                    TokenType::GREATER_EQUAL
                } else {
                    TokenType::GREATER
                }
            }

            // ── whitespace / newline ─────────────────────────────────────
            b' ' | b'\r' | b'\t' => return Ok(None),

            b'\n' => {
                self.line += 1;

                return Ok(None);
            }

            // ── comments (// … until newline) ────────────────────────────
            b'/' => {
                if self.match_byte(b'/') {
                    // Fast-forward to the next newline; memchr beats a
                    // byte-by-byte loop on long comment lines.
                    if let Some(pos) = memchr(b'\n', &self.src[self.curr..]) {
                        self.curr += pos;
                    } else {
                        self.curr = self.len();
                    }

                    return Ok(None);
                }

                TokenType::SLASH
            }

            // ── string literal " … " ─────────────────────────────────────
            b'"' => return self.scan_string().map(Some),

            // ── number literal (digit-leading) ───────────────────────────
            b'0'..=b'9' => self.scan_number(),

            // ── identifiers / keywords (alpha or underscore-leading) ─────
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.scan_identifier(),

            // ── unexpected character ─────────────────────────────────────
            _ => {
                return Err(LoxError::lex(
                    self.line,
                    format!("Unexpected character: {}", b as char),
                ));
            }
        };

        Ok(Some(kind))
    }

    /// Scan a double-quoted string literal.  Strings may span multiple lines;
    /// embedded newlines bump the line counter.
    fn scan_string(&mut self) -> Result<TokenType> {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.advance() == b'\n' {
                self.line += 1;
            }
        }

        if self.is_at_end() {
            return Err(LoxError::lex(self.line, "Unterminated string."));
        }

        self.advance(); // closing quote

        // Slice excluding the surrounding quotes.
        let slice: &[u8] = &self.src[self.start + 1..self.curr - 1];
        let s: &str = std::str::from_utf8(slice).unwrap_or("");

        Ok(TokenType::STRING(s.to_owned()))
    }

    /// Scan a numeric literal (`123`, `3.14`).  The fractional part is
    /// optional and requires a digit after the dot.
    fn scan_number(&mut self) -> TokenType {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance(); // consume "."

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        // parse never fails: the lexeme is digits with at most one dot
        let n: f64 = self.lexeme().parse::<f64>().unwrap_or(0.0);

        TokenType::NUMBER(n)
    }

    /// Scan an identifier and decide whether it is a reserved word.
    fn scan_identifier(&mut self) -> TokenType {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        KEYWORDS
            .get(&self.src[self.start..self.curr])
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        // Loop until we either emit a token, hit EOF, or see an error.
        while self.curr <= self.len() {
            // EOF guard: emit exactly one EOF then terminate.
            if self.curr == self.len() {
                self.curr += 1; // fused semantics
                return Some(Ok(Token::new(TokenType::EOF, "", self.line)));
            }

            self.start = self.curr;

            match self.scan_token() {
                Err(e) => return Some(Err(e)),

                Ok(Some(kind)) => {
                    debug!("Scanned token ({:?}) on line {}", kind, self.line);

                    return Some(Ok(Token::new(kind, self.lexeme(), self.line)));
                }

                // Whitespace or comment: keep scanning.
                Ok(None) => {}
            }
        }

        None // already yielded EOF
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
