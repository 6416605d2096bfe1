//! Lexical analyzer

use std::rc::Rc;
use std::str::Chars;

use crate::ctx::Context;
use crate::diag::{Diagnostic, Position};
use crate::token::{Literal, Token, TokenKind};

/// Turn source text into a sequence of tokens.
///
/// Errors never stop the scan: a bad character or an unterminated string is recorded and the
/// scanner carries on with the rest of the input.
#[derive(Debug)]
pub struct Scanner<'a> {
    source: &'a str,
    input: Chars<'a>,
    // Byte offset of the first character of the token being scanned.
    start: usize,
    line: Position,
    ctx: Rc<Context>,
    diagnostics: Vec<Diagnostic>,
    done: bool,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner operating on `source`.
    pub fn new(source: &'a str, ctx: Rc<Context>) -> Scanner<'a> {
        Scanner {
            source,
            input: source.chars(),
            start: 0,
            line: 1,
            ctx,
            diagnostics: vec![],
            done: false,
        }
    }

    /// Scan the whole input.  The returned tokens always end with an `Eof` token carrying the
    /// last line.
    pub fn scan_tokens(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut tokens = vec![];
        loop {
            let token = self.get_token();
            let at_end = token.is(TokenKind::Eof);
            tokens.push(token);
            if at_end {
                break;
            }
        }
        tracing::debug!(
            tokens = tokens.len(),
            errors = self.diagnostics.len(),
            "scanned source"
        );
        (tokens, self.diagnostics)
    }

    /// Scan next token and return it.
    pub fn get_token(&mut self) -> Token {
        loop {
            self.start = self.offset();
            let ch = match self.input.next() {
                None => return self.make_token(TokenKind::Eof),
                Some(ch) => ch,
            };
            let kind = match ch {
                '\n' => {
                    self.line += 1;
                    continue;
                }
                ' ' | '\t' | '\r' => continue,
                '(' => TokenKind::LeftParen,
                ')' => TokenKind::RightParen,
                '{' => TokenKind::LeftBrace,
                '}' => TokenKind::RightBrace,
                ',' => TokenKind::Comma,
                '.' => TokenKind::Dot,
                '-' => TokenKind::Minus,
                '+' => TokenKind::Plus,
                ';' => TokenKind::Semicolon,
                '*' => TokenKind::Star,
                '/' => {
                    if self.matches('/') {
                        self.skip_comment();
                        continue;
                    }
                    TokenKind::Slash
                }
                '!' => self.either('=', TokenKind::BangEqual, TokenKind::Bang),
                '=' => self.either('=', TokenKind::EqualEqual, TokenKind::Equal),
                '<' => self.either('=', TokenKind::LessEqual, TokenKind::Less),
                '>' => self.either('=', TokenKind::GreaterEqual, TokenKind::Greater),
                '"' => match self.scan_string() {
                    Some(token) => return token,
                    None => continue,
                },
                '0'..='9' => match self.scan_number() {
                    Some(token) => return token,
                    None => continue,
                },
                'a'..='z' | 'A'..='Z' | '_' => return self.scan_identifier(),
                _ => {
                    self.diagnostics
                        .push(Diagnostic::at_line(self.line, "Unexpected character."));
                    continue;
                }
            };
            return self.make_token(kind);
        }
    }

    /// Consumes the string body and closing quote.  The opening quote is already consumed.
    fn scan_string(&mut self) -> Option<Token> {
        loop {
            match self.input.next() {
                Some('"') => break,
                Some('\n') => self.line += 1,
                Some(_) => (),
                None => {
                    self.diagnostics
                        .push(Diagnostic::at_line(self.line, "Unterminated string."));
                    return None;
                }
            }
        }
        let content = &self.source[self.start + 1..self.offset() - 1];
        let literal = Literal::Str(self.ctx.symbol(content));
        Some(self.make_literal_token(TokenKind::String, literal))
    }

    fn scan_number(&mut self) -> Option<Token> {
        self.skip_digits();
        if self.peek() == Some('.') && self.peek_next().map_or(false, |c| c.is_ascii_digit()) {
            self.input.next();
            self.skip_digits();
        }

        let text = &self.source[self.start..self.offset()];
        match text.parse::<f64>() {
            Ok(n) => Some(self.make_literal_token(TokenKind::Number, Literal::Number(n))),
            Err(_) => {
                self.diagnostics
                    .push(Diagnostic::at_line(self.line, "Invalid number literal."));
                None
            }
        }
    }

    fn scan_identifier(&mut self) -> Token {
        while let Some(ch) = self.peek() {
            if !(ch.is_ascii_alphanumeric() || ch == '_') {
                break;
            }
            self.input.next();
        }

        let sym = self.ctx.symbol(&self.source[self.start..self.offset()]);
        let kind = self.ctx.keyword(&sym).unwrap_or(TokenKind::Identifier);
        Token::new(kind, sym, None, self.line)
    }

    fn skip_digits(&mut self) {
        while self.peek().map_or(false, |c| c.is_ascii_digit()) {
            self.input.next();
        }
    }

    fn skip_comment(&mut self) {
        while self.peek().map_or(false, |c| c != '\n') {
            self.input.next();
        }
    }

    fn either(&mut self, second: char, matched: TokenKind, single: TokenKind) -> TokenKind {
        if self.matches(second) {
            matched
        } else {
            single
        }
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.input.next();
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.clone().next()
    }

    fn peek_next(&self) -> Option<char> {
        self.input.clone().nth(1)
    }

    fn offset(&self) -> usize {
        self.source.len() - self.input.as_str().len()
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        let lexeme = self.ctx.symbol(&self.source[self.start..self.offset()]);
        Token::new(kind, lexeme, None, self.line)
    }

    fn make_literal_token(&self, kind: TokenKind, literal: Literal) -> Token {
        let mut token = self.make_token(kind);
        token.literal = Some(literal);
        token
    }
}

impl Iterator for Scanner<'_> {
    type Item = Token;

    /// Yields every token up to, but excluding, the end of input.
    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let token = self.get_token();
        if token.is(TokenKind::Eof) {
            self.done = true;
            None
        } else {
            Some(token)
        }
    }
}
