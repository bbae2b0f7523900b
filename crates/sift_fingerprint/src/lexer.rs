//! Structural lexer for test-module source text.
//!
//! Flattens a module into the sequence of tokens that carry its meaning:
//! comments and intra-line spacing are discarded, string literals are kept
//! verbatim, and statement separators survive — newlines (runs collapse, and
//! newlines inside brackets or after a `\` continuation are swallowed) and
//! top-level semicolons. Leading indentation is block structure in this
//! syntax, not formatting: the structural dump records each statement's
//! indentation width, so dedenting a statement out of a body changes the
//! dump even though the tokens are unchanged.

use std::fmt;

/// Kind of a structural token.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TokenKind {
    /// Identifier or keyword.
    Ident,
    /// Numeric literal.
    Number,
    /// String literal, quotes included.
    Str,
    /// Operator or punctuation.
    Op,
    /// Statement separator.
    Newline,
}

/// One structural token.
///
/// `line` and `col` locate the token in the original source for diagnostics;
/// they are not part of the structural dump, so reformatting a module does
/// not change its fingerprint.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Token {
    /// Token kind.
    pub kind: TokenKind,
    /// Token text as it appeared in the source.
    pub text: String,
    /// One-based source line.
    pub line: usize,
    /// Zero-based column of the first byte.
    pub col: usize,
}

/// Error produced when a module cannot be lexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    /// One-based line of the failure.
    pub line: usize,
    /// Description of the problem.
    pub reason: String,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason)
    }
}

impl std::error::Error for LexError {}

/// Lexes source text into structural tokens.
pub fn lex(source: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer {
        source: source.as_bytes(),
        pos: 0,
        line: 1,
        line_start: 0,
        depth: 0,
    };
    lexer.lex_all()
}

/// Renders a token stream as the canonical flattened text that gets hashed.
///
/// Tokens on the same statement are joined with single spaces; statement
/// separators become `\n`. Each statement is prefixed with its indentation
/// width (the column of its first token), which is what carries block
/// structure. Statements split off by a semicolon inherit the indentation
/// of their line, so `x = 1; y = 2` and `x = 1` / `y = 2` dump identically.
pub fn structural_dump(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut at_start = true;
    let mut from_semicolon = false;
    let mut indent = 0;
    for token in tokens {
        if token.kind == TokenKind::Newline {
            out.push('\n');
            at_start = true;
            from_semicolon = token.text == ";";
            continue;
        }
        if at_start {
            if !from_semicolon {
                indent = token.col;
            }
            out.push_str(&format!("{indent}:"));
            at_start = false;
        } else {
            out.push(' ');
        }
        out.push_str(&token.text);
    }
    out
}

struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    line: usize,
    line_start: usize,
    depth: usize,
}

impl<'a> Lexer<'a> {
    fn lex_all(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens: Vec<Token> = Vec::new();
        while self.pos < self.source.len() {
            let b = self.peek();

            // Inter-token whitespace (indentation included).
            if b == b' ' || b == b'\t' || b == b'\r' {
                self.pos += 1;
                continue;
            }

            // Comment: runs to end of line.
            if b == b'#' {
                while self.pos < self.source.len() && self.peek() != b'\n' {
                    self.pos += 1;
                }
                continue;
            }

            if b == b'\n' {
                self.pos += 1;
                self.line += 1;
                self.line_start = self.pos;
                // Inside brackets a newline is just whitespace; blank and
                // comment-only lines collapse into the previous separator.
                if self.depth == 0 && matches!(tokens.last(), Some(t) if t.kind != TokenKind::Newline)
                {
                    tokens.push(Token {
                        kind: TokenKind::Newline,
                        text: "\n".to_string(),
                        line: self.line - 1,
                        col: 0,
                    });
                }
                continue;
            }

            // A top-level semicolon separates statements just like a newline.
            if b == b';' && self.depth == 0 {
                self.pos += 1;
                if matches!(tokens.last(), Some(t) if t.kind != TokenKind::Newline) {
                    tokens.push(Token {
                        kind: TokenKind::Newline,
                        text: ";".to_string(),
                        line: self.line,
                        col: 0,
                    });
                }
                continue;
            }

            // Explicit line continuation.
            if b == b'\\' && self.peek_at(1) == b'\n' {
                self.pos += 2;
                self.line += 1;
                self.line_start = self.pos;
                continue;
            }
            if b == b'\\' && self.peek_at(1) == b'\r' && self.peek_at(2) == b'\n' {
                self.pos += 3;
                self.line += 1;
                self.line_start = self.pos;
                continue;
            }

            tokens.push(self.next_token()?);
        }
        Ok(tokens)
    }

    fn peek(&self) -> u8 {
        if self.pos < self.source.len() {
            self.source[self.pos]
        } else {
            0
        }
    }

    fn peek_at(&self, offset: usize) -> u8 {
        let idx = self.pos + offset;
        if idx < self.source.len() {
            self.source[idx]
        } else {
            0
        }
    }

    fn col(&self, start: usize) -> usize {
        start.saturating_sub(self.line_start)
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        let start = self.pos;
        let b = self.peek();

        if b == b'\'' || b == b'"' {
            return self.lex_string(start);
        }
        if is_ident_start(b) {
            while self.pos < self.source.len() && is_ident_char(self.peek()) {
                self.pos += 1;
            }
            return Ok(self.token(TokenKind::Ident, start));
        }
        if b.is_ascii_digit() {
            // Greedy over digits, letters, '_' and '.' covers ints, floats,
            // hex and underscore separators in one token.
            while self.pos < self.source.len() && (is_ident_char(self.peek()) || self.peek() == b'.')
            {
                self.pos += 1;
            }
            return Ok(self.token(TokenKind::Number, start));
        }
        if b == b'(' || b == b'[' || b == b'{' {
            self.depth += 1;
            self.pos += 1;
            return Ok(self.token(TokenKind::Op, start));
        }
        if b == b')' || b == b']' || b == b'}' {
            self.depth = self.depth.saturating_sub(1);
            self.pos += 1;
            return Ok(self.token(TokenKind::Op, start));
        }
        if is_operator_char(b) {
            // Maximal run, so `==` and `= =` dump differently.
            while self.pos < self.source.len() && is_operator_char(self.peek()) {
                self.pos += 1;
            }
            return Ok(self.token(TokenKind::Op, start));
        }

        // Single-character punctuation (`,`, `:`, `;`, `.`, and anything else).
        self.pos += 1;
        Ok(self.token(TokenKind::Op, start))
    }

    fn lex_string(&mut self, start: usize) -> Result<Token, LexError> {
        let quote = self.peek();
        if self.peek_at(1) == quote && self.peek_at(2) == quote {
            return self.lex_triple_string(start, quote);
        }
        self.pos += 1;
        while self.pos < self.source.len() {
            let b = self.peek();
            if b == b'\\' {
                self.pos += 2;
                continue;
            }
            if b == b'\n' {
                break;
            }
            self.pos += 1;
            if b == quote {
                return Ok(self.token(TokenKind::Str, start));
            }
        }
        Err(LexError {
            line: self.line,
            reason: "unterminated string literal".to_string(),
        })
    }

    fn lex_triple_string(&mut self, start: usize, quote: u8) -> Result<Token, LexError> {
        self.pos += 3;
        while self.pos < self.source.len() {
            let b = self.peek();
            if b == b'\\' {
                self.pos += 2;
                continue;
            }
            if b == quote && self.peek_at(1) == quote && self.peek_at(2) == quote {
                self.pos += 3;
                return Ok(self.token(TokenKind::Str, start));
            }
            if b == b'\n' {
                self.line += 1;
                self.line_start = self.pos + 1;
            }
            self.pos += 1;
        }
        Err(LexError {
            line: self.line,
            reason: "unterminated string literal".to_string(),
        })
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token {
            kind,
            text: String::from_utf8_lossy(&self.source[start..self.pos]).into_owned(),
            line: self.line,
            col: self.col(start),
        }
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

fn is_operator_char(b: u8) -> bool {
    matches!(
        b,
        b'+' | b'-' | b'*' | b'/' | b'%' | b'=' | b'<' | b'>' | b'!' | b'&' | b'|' | b'^' | b'~'
            | b'@'
    )
}
