//! Static diagnostics reported by the scanner, the parser and the resolver.
//!
//! Nothing in here prints: each stage returns the diagnostics it collected and the caller decides
//! what to do with them.

use std::fmt;

use thiserror::Error;

use crate::token::{Token, TokenKind};

/// Line number (starting at one).
pub type Position = u32;

/// Where on its line a diagnostic points.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Location {
    /// Scanner errors only know the line.
    Line,
    /// The offending token was the end of input.
    AtEnd,
    /// The offending token, by lexeme.
    At(String),
}

impl Location {
    pub fn of(token: &Token) -> Location {
        match token.kind {
            TokenKind::Eof => Location::AtEnd,
            _ => Location::At(token.lexeme.name().to_owned()),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Line => Ok(()),
            Location::AtEnd => write!(f, " at end"),
            Location::At(lexeme) => write!(f, " at '{}'", lexeme),
        }
    }
}

/// A single lexical, syntax or resolution error.
#[derive(Debug, PartialEq, Eq, Clone, Error)]
#[error("[line {line}] Error{location}: {message}")]
pub struct Diagnostic {
    pub line: Position,
    pub location: Location,
    pub message: String,
}

impl Diagnostic {
    pub fn at_line(line: Position, message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            line,
            location: Location::Line,
            message: message.into(),
        }
    }

    pub fn at_token(token: &Token, message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            line: token.line,
            location: Location::of(token),
            message: message.into(),
        }
    }
}

/// All static errors gathered for one parse unit, in reporting order.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Diagnostics(pub Vec<Diagnostic>);

impl Diagnostics {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn messages(&self) -> Vec<&str> {
        self.0.iter().map(|d| d.message.as_str()).collect()
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(diags: Vec<Diagnostic>) -> Diagnostics {
        Diagnostics(diags)
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diag) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", diag)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}
