//! Lox interpreter command-line.
//!
//! When called without argument it drops into an interactive read-evaluate-print loop.
//!
//! When called with arguments, it interprets the corresponding files in a single interpreter
//! session (so code and data sharing is possible).
//!
//! Set `RUST_LOG` (e.g. `RUST_LOG=treelox=debug`) to trace the pipeline on stderr.

use std::env;
use std::fs;
use std::io;
use std::io::prelude::*;
use std::process;

use anyhow::{self, Context};

use treelox::interpreter::{Interpreter, LoxError};

const EXIT_USAGE: i32 = 64;

fn main() {
    init_tracing();

    let args = env::args().skip(1).collect::<Vec<_>>();
    let status = if !args.is_empty() {
        run_all_files(&args)
    } else {
        run_prompt()
    };

    match status {
        Ok(0) => (),
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("treelox: {:#}", e);
            process::exit(EXIT_USAGE);
        }
    }
}

/// Runs every file in turn and stops at the first failing one.  Returns the exit status.
fn run_all_files(paths: &[String]) -> Result<i32, anyhow::Error> {
    let mut interp_stdout = io::stdout();
    let mut interp = Interpreter::new(&mut interp_stdout);

    for p in paths {
        let source = fs::read_to_string(p).with_context(|| format!("failed to read {}", p))?;
        if let Err(e) = interp.eval(&source) {
            report(&e);
            return Ok(e.exit_code());
        }
    }

    Ok(0)
}

/// Errors are reported and the session goes on with its globals intact.
fn run_prompt() -> Result<i32, anyhow::Error> {
    let stdin = io::stdin();
    let mut repl_stdout = io::stdout();
    let mut interp_stdout = io::stdout();

    let mut interp = Interpreter::new(&mut interp_stdout);

    let mut input = String::new();
    loop {
        repl_stdout.write_all(b"> ")?;
        repl_stdout.flush()?;

        input.clear();
        let nbytes = stdin
            .read_line(&mut input)
            .context("failed to read from stdin")?;
        if nbytes == 0 {
            break;
        }

        if let Err(e) = interp.eval(&input) {
            report(&e);
        }
    }

    Ok(0)
}

fn report(err: &LoxError) {
    match err {
        LoxError::Static(diags) => eprintln!("{}", diags),
        LoxError::Runtime(e) => match e.line() {
            Some(line) => eprintln!("{}\n[line {}]", e, line),
            None => eprintln!("{}", e),
        },
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}
