//! API to control the interpreter.

use std::io::prelude::*;
use std::rc::Rc;

use thiserror::Error;

use crate::ctx::Context;
use crate::diag::Diagnostics;
use crate::eval::{Evaluator, RuntimeError};
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;

/// Tree-walk interpreter session.
///
/// Global definitions persist from one call of [`Interpreter::eval`] to the next.
///
/// # Example
///
/// Invoke the interpreter a first time to define a function then additional times to call this
/// function:
///
/// ```
/// # use treelox::interpreter::{Interpreter, LoxError};
///
/// let mut output: Vec<u8> = Vec::new();
/// let mut interp = Interpreter::new(&mut output);
///
/// let func_def = r#"
///     fun max(x, y) {
///         if (x > y) {
///             return x;
///         } else {
///             return y;
///         }
///     }
/// "#;
/// interp.eval(func_def)?;
///
/// interp.eval("print max(10, 20);")?;
/// interp.eval("print max(5, 4);")?;
///
/// assert_eq!(output, b"20\n5\n");
/// # Ok::<(), LoxError>(())
/// ```
#[derive(Debug)]
pub struct Interpreter<'t, W: Write> {
    ctx: Rc<Context>,
    evaluator: Evaluator<'t, W>,
}

/// Errors the interpreter can raise.
#[derive(Debug, Error)]
pub enum LoxError {
    /// Lexical, syntax or resolution errors.  Nothing was executed.
    #[error(transparent)]
    Static(#[from] Diagnostics),

    /// Error occurring during evaluation.  Statements before the failing one ran.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl LoxError {
    /// Process exit status conventionally associated with the error.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoxError::Static(_) => 65,
            LoxError::Runtime(_) => 70,
        }
    }
}

impl<W: Write> Interpreter<'_, W> {
    pub fn new(output: &mut W) -> Interpreter<'_, W> {
        let ctx = Context::new();
        let evaluator = Evaluator::new(output, &ctx);
        Interpreter { ctx, evaluator }
    }

    /// Scan, parse, resolve and run one parse unit.
    ///
    /// Static errors of every stage before execution are reported together; the program only
    /// runs when there are none.
    #[tracing::instrument(level = "debug", skip_all, fields(bytes = source.len()))]
    pub fn eval(&mut self, source: &str) -> Result<(), LoxError> {
        let (tokens, mut diags) = Scanner::new(source, self.ctx.clone()).scan_tokens();
        let (prg, parse_diags) = Parser::new(tokens, self.ctx.clone()).parse_program();
        diags.extend(parse_diags);
        if !diags.is_empty() {
            return Err(Diagnostics(diags).into());
        }

        let (locals, diags) = Resolver::new().resolve_program(&prg);
        if !diags.is_empty() {
            return Err(Diagnostics(diags).into());
        }

        self.evaluator.add_locals(locals);
        self.evaluator.eval_stmts_in_global_env(&prg)?;
        Ok(())
    }
}
