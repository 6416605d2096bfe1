//! A tree-walking interpreter for the Lox scripting language.
//!
//! Source text goes through four stages:
//!
//! 1. the scanner turns it into tokens,
//! 2. the recursive-descent parser builds statements and expressions,
//! 3. the resolver computes, for every local variable reference, how many scopes separate it
//!    from its declaration,
//! 4. the evaluator runs the statements over a chain of shared environments.
//!
//! Static errors (scan, parse, resolve) are collected and returned together; a program that has
//! any is never run.  See [`crate::interpreter::Interpreter`] for the entry point.
//!
//! # Limitations
//!
//! - `class`, `this` and `super` are reserved words but classes are not implemented.
//! - The only native function is `clock()`.

#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]

pub mod diag;
pub mod interpreter;

mod ast;
mod ctx;
mod environment;
mod eval;
mod interner;
mod parser;
mod resolver;
mod scanner;
mod token;
mod value;

pub use crate::diag::{Diagnostic, Diagnostics, Location, Position};
pub use crate::eval::RuntimeError;
pub use crate::interpreter::{Interpreter, LoxError};
