use std::io;
use std::io::prelude::*;
use std::rc::Rc;
use std::sync::OnceLock;
use std::time::Instant;

use thiserror::Error;

use crate::ast::{Expr, ExprId, LiteralValue, Stmt};
use crate::ctx::Context;
use crate::diag::Position;
use crate::environment::Env;
use crate::resolver::Locals;
use crate::token::{Token, TokenKind};
use crate::value::{Function, FunctionBody, Value};

/// Errors raised while a program runs.  Each one aborts the rest of the program.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Operand must be a number.")]
    OperandMustBeNumber { operator: String, line: Position },

    #[error("Operands must be numbers.")]
    OperandsMustBeNumbers { operator: String, line: Position },

    #[error("Operands must be two numbers or two strings.")]
    OperandsMustBeNumbersOrStrings { operator: String, line: Position },

    #[error("Undefined variable '{name}'.")]
    UndefinedVariable { name: String, line: Position },

    #[error("Can only call functions and classes.")]
    NotCallable { line: Position },

    #[error("Expected {expected} arguments but got {got}.")]
    ArityMismatch {
        expected: usize,
        got: usize,
        line: Position,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RuntimeError {
    /// Source line the error is attributed to, if any.
    pub fn line(&self) -> Option<Position> {
        match self {
            RuntimeError::OperandMustBeNumber { line, .. }
            | RuntimeError::OperandsMustBeNumbers { line, .. }
            | RuntimeError::OperandsMustBeNumbersOrStrings { line, .. }
            | RuntimeError::UndefinedVariable { line, .. }
            | RuntimeError::NotCallable { line }
            | RuntimeError::ArityMismatch { line, .. } => Some(*line),
            RuntimeError::Io(_) => None,
        }
    }

    fn undefined(name: &Token) -> RuntimeError {
        RuntimeError::UndefinedVariable {
            name: name.lexeme.to_string(),
            line: name.line,
        }
    }
}

/// How a statement finished.
///
/// `return` is ordinary control flow: it travels up through the enclosing statements as a value
/// until the call that runs the function body consumes it.
#[derive(Debug, PartialEq)]
enum Flow {
    Normal,
    Return(Value),
}

/// Tree-walk evaluator.  Owns the global environment and the hop distances of every program
/// resolved so far in the session.
#[derive(Debug)]
pub struct Evaluator<'t, W: Write> {
    output: &'t mut W,
    globals: Rc<Env>,
    locals: Locals,
}

impl<'a, W: Write> Evaluator<'a, W> {
    pub fn new(output: &'a mut W, ctx: &Context) -> Evaluator<'a, W> {
        let globals = Env::new();
        let clock = ctx.symbol("clock");
        globals.define(
            &clock,
            Value::Function(Rc::new(Function::builtin(clock.clone(), 0, builtin_clock))),
        );
        Evaluator {
            output,
            globals,
            locals: Locals::new(),
        }
    }

    /// Register the hop distances of a freshly resolved program.  Distances of earlier programs
    /// are kept: functions they declared may still be called.
    pub fn add_locals(&mut self, locals: Locals) {
        self.locals.extend(locals);
    }

    pub fn eval_stmts_in_global_env(&mut self, stmts: &[Stmt]) -> Result<(), RuntimeError> {
        let globals = self.globals.clone();
        for stmt in stmts {
            // Top-level return is rejected by the resolver.
            self.eval_stmt(stmt, &globals)?;
        }
        Ok(())
    }

    /// Run `stmts` in `env`, stopping early on `return`.
    fn eval_block(&mut self, stmts: &[Stmt], env: &Rc<Env>) -> Result<Flow, RuntimeError> {
        for stmt in stmts {
            if let Flow::Return(value) = self.eval_stmt(stmt, env)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn eval_stmt(&mut self, stmt: &Stmt, env: &Rc<Env>) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::Expression(e) => {
                self.eval_expr(e, env)?;
            }
            Stmt::Print(e) => {
                let v = self.eval_expr(e, env)?;
                writeln!(self.output, "{}", v)?;
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(init) => self.eval_expr(init, env)?,
                    None => Value::Nil,
                };
                env.define(&name.lexeme, value);
            }
            Stmt::Block(stmts) => {
                return self.eval_block(stmts, &Env::with_parent(env.clone()));
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval_expr(condition, env)?.is_truthy() {
                    return self.eval_stmt(then_branch, env);
                } else if let Some(else_branch) = else_branch {
                    return self.eval_stmt(else_branch, env);
                }
            }
            Stmt::While { condition, body } => {
                while self.eval_expr(condition, env)?.is_truthy() {
                    if let Flow::Return(value) = self.eval_stmt(body, env)? {
                        return Ok(Flow::Return(value));
                    }
                }
            }
            Stmt::Function(decl) => {
                let func = Function::user(decl.clone(), env.clone());
                env.define(&decl.name.lexeme, Value::Function(Rc::new(func)));
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(e) => self.eval_expr(e, env)?,
                    None => Value::Nil,
                };
                return Ok(Flow::Return(value));
            }
        };
        Ok(Flow::Normal)
    }

    fn eval_expr(&mut self, expr: &Expr, env: &Rc<Env>) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(lit) => Ok(match lit {
                LiteralValue::Nil => Value::Nil,
                LiteralValue::Bool(b) => Value::Bool(*b),
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::Str(Rc::from(s.name())),
            }),
            Expr::Grouping(e) => self.eval_expr(e, env),
            Expr::Unary { operator, right } => {
                let right = self.eval_expr(right, env)?;
                match (operator.kind, right) {
                    (TokenKind::Bang, v) => Ok(Value::Bool(!v.is_truthy())),
                    (TokenKind::Minus, Value::Number(n)) => Ok(Value::Number(-n)),
                    _ => Err(RuntimeError::OperandMustBeNumber {
                        operator: operator.lexeme.to_string(),
                        line: operator.line,
                    }),
                }
            }
            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let l = self.eval_expr(left, env)?;
                let r = self.eval_expr(right, env)?;
                binary(operator, l, r)
            }
            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let l = self.eval_expr(left, env)?;
                let short_circuits = match operator.kind {
                    TokenKind::Or => l.is_truthy(),
                    _ => !l.is_truthy(),
                };
                if short_circuits {
                    Ok(l)
                } else {
                    self.eval_expr(right, env)
                }
            }
            Expr::Variable { id, name } => self.look_up_variable(*id, name, env),
            Expr::Assign { id, name, value } => {
                let value = self.eval_expr(value, env)?;
                let assigned = match self.locals.get(id) {
                    Some(&distance) => env.assign_at(distance, &name.lexeme, value.clone()),
                    None => self.globals.assign(&name.lexeme, value.clone()),
                };
                assigned.map_err(|_| RuntimeError::undefined(name))?;
                Ok(value)
            }
            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.eval_expr(callee, env)?;
                let args = arguments
                    .iter()
                    .map(|a| self.eval_expr(a, env))
                    .collect::<Result<Vec<Value>, RuntimeError>>()?;
                let Value::Function(func) = callee else {
                    return Err(RuntimeError::NotCallable { line: paren.line });
                };
                if args.len() != func.arity() {
                    return Err(RuntimeError::ArityMismatch {
                        expected: func.arity(),
                        got: args.len(),
                        line: paren.line,
                    });
                }
                self.call(&func, args)
            }
        }
    }

    fn look_up_variable(
        &self,
        id: ExprId,
        name: &Token,
        env: &Rc<Env>,
    ) -> Result<Value, RuntimeError> {
        let found = match self.locals.get(&id) {
            Some(&distance) => env.get_at(distance, &name.lexeme),
            None => self.globals.get(&name.lexeme),
        };
        found.ok_or_else(|| RuntimeError::undefined(name))
    }

    fn call(&mut self, func: &Function, args: Vec<Value>) -> Result<Value, RuntimeError> {
        tracing::trace!(function = %func.name(), args = args.len(), "call");
        match func.body() {
            FunctionBody::Builtin(native) => Ok(native(&args)),
            FunctionBody::User { decl, closure } => {
                // Chained to the declaration scope, not the caller's.
                let env = Env::with_parent(closure.clone());
                for (param, arg) in decl.params.iter().zip(args) {
                    env.define(&param.lexeme, arg);
                }
                match self.eval_block(&decl.body, &env)? {
                    Flow::Return(value) => Ok(value),
                    Flow::Normal => Ok(Value::Nil),
                }
            }
        }
    }
}

fn binary(operator: &Token, l: Value, r: Value) -> Result<Value, RuntimeError> {
    let kind = operator.kind;
    match kind {
        TokenKind::EqualEqual => return Ok(Value::Bool(l == r)),
        TokenKind::BangEqual => return Ok(Value::Bool(l != r)),
        TokenKind::Plus => {
            return match (l, r) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(Rc::from(format!("{}{}", a, b)))),
                _ => Err(RuntimeError::OperandsMustBeNumbersOrStrings {
                    operator: operator.lexeme.to_string(),
                    line: operator.line,
                }),
            }
        }
        _ => (),
    }

    let (Value::Number(a), Value::Number(b)) = (l, r) else {
        return Err(RuntimeError::OperandsMustBeNumbers {
            operator: operator.lexeme.to_string(),
            line: operator.line,
        });
    };
    Ok(match kind {
        TokenKind::Minus => Value::Number(a - b),
        TokenKind::Star => Value::Number(a * b),
        TokenKind::Slash => Value::Number(a / b),
        TokenKind::Greater => Value::Bool(a > b),
        TokenKind::GreaterEqual => Value::Bool(a >= b),
        TokenKind::Less => Value::Bool(a < b),
        TokenKind::LessEqual => Value::Bool(a <= b),
        _ => unreachable!("parser built a binary expression from {:?}", kind),
    })
}

/// Seconds elapsed since the first call in this process.  Monotonic, not wall-clock.
fn builtin_clock(_args: &[Value]) -> Value {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    Value::Number(EPOCH.get_or_init(Instant::now).elapsed().as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::resolver::Resolver;
    use crate::scanner::Scanner;
    use pretty_assertions::assert_eq;

    fn parse_and_resolve(ctx: &Rc<Context>, input: &str) -> (Vec<Stmt>, Locals) {
        let (tokens, scan_diags) = Scanner::new(input, ctx.clone()).scan_tokens();
        let (prg, parse_diags) = Parser::new(tokens, ctx.clone()).parse_program();
        assert!(scan_diags.is_empty() && parse_diags.is_empty());
        let (locals, diags) = Resolver::new().resolve_program(&prg);
        assert!(diags.is_empty(), "resolve errors: {:?}", diags);
        (prg, locals)
    }

    fn eval_prg_with_ctx(
        ctx: &Rc<Context>,
        prg: &[Stmt],
        locals: &Locals,
    ) -> Result<String, RuntimeError> {
        let mut out: Vec<u8> = Vec::new();
        let mut e = Evaluator::new(&mut out, ctx);
        e.add_locals(locals.clone());
        e.eval_stmts_in_global_env(prg)?;
        Ok(String::from_utf8(out).expect("error while converting output"))
    }

    fn eval_prg(input: &str) -> Result<String, RuntimeError> {
        let ctx = Context::new();
        let (prg, locals) = parse_and_resolve(&ctx, input);
        eval_prg_with_ctx(&ctx, &prg, &locals)
    }

    fn eval_expr(input: &str) -> Result<Value, RuntimeError> {
        let ctx = Context::new();
        let (prg, locals) = parse_and_resolve(&ctx, &format!("{};", input));
        let mut out: Vec<u8> = Vec::new();
        let mut evaluator = Evaluator::new(&mut out, &ctx);
        evaluator.add_locals(locals);
        let globals = evaluator.globals.clone();
        let val = match &prg[..] {
            [Stmt::Expression(expr)] => evaluator.eval_expr(expr, &globals)?,
            other => panic!("not a single expression: {:?}", other),
        };
        assert!(out.is_empty());
        Ok(val)
    }

    #[test]
    fn arithmetic_follows_precedence() -> Result<(), RuntimeError> {
        assert_eq!(eval_expr("2 + 3 * 4")?, Value::Number(14.0));
        assert_eq!(eval_expr("(2 + 3) * 4")?, Value::Number(20.0));
        assert_eq!(eval_expr("10 - 4 - 3")?, Value::Number(3.0));
        assert_eq!(eval_expr("-2 * -3")?, Value::Number(6.0));
        Ok(())
    }

    #[test]
    fn division_follows_ieee() -> Result<(), RuntimeError> {
        assert_eq!(eval_expr("6 / 4")?, Value::Number(1.5));
        assert_eq!(eval_expr("1 / 0")?, Value::Number(f64::INFINITY));
        Ok(())
    }

    #[test]
    fn comparisons() -> Result<(), RuntimeError> {
        assert_eq!(eval_expr("1 < 2")?, Value::Bool(true));
        assert_eq!(eval_expr("2 <= 2")?, Value::Bool(true));
        assert_eq!(eval_expr("2 > 2")?, Value::Bool(false));
        assert_eq!(eval_expr("3 >= 2")?, Value::Bool(true));
        Ok(())
    }

    #[test]
    fn equality_never_coerces() -> Result<(), RuntimeError> {
        assert_eq!(eval_expr("nil == nil")?, Value::Bool(true));
        assert_eq!(eval_expr("nil == false")?, Value::Bool(false));
        assert_eq!(eval_expr("1 == \"1\"")?, Value::Bool(false));
        assert_eq!(eval_expr("\"a\" != \"a\"")?, Value::Bool(false));
        assert_eq!(eval_expr("true == true")?, Value::Bool(true));
        Ok(())
    }

    #[test]
    fn string_concatenation() -> Result<(), RuntimeError> {
        assert_eq!(eval_expr("\"a\" + \"b\"")?, Value::Str(Rc::from("ab")));
        Ok(())
    }

    #[test]
    fn number_plus_string_is_an_error() {
        match eval_expr("1 + \"b\"") {
            Err(RuntimeError::OperandsMustBeNumbersOrStrings { operator, line: 1 })
                if operator == "+" => {}
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn comparison_of_strings_is_an_error() {
        match eval_expr("\"a\" < \"b\"") {
            Err(RuntimeError::OperandsMustBeNumbers { operator, .. }) if operator == "<" => {}
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn negating_a_bool_is_an_error() {
        match eval_expr("-true") {
            Err(RuntimeError::OperandMustBeNumber { operator, .. }) if operator == "-" => {}
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn logical_not_uses_truthiness() -> Result<(), RuntimeError> {
        assert_eq!(eval_expr("!nil")?, Value::Bool(true));
        assert_eq!(eval_expr("!0")?, Value::Bool(false));
        Ok(())
    }

    #[test]
    fn logical_operators_return_an_operand() -> Result<(), RuntimeError> {
        assert_eq!(eval_expr("nil or \"yes\"")?, Value::Str(Rc::from("yes")));
        assert_eq!(eval_expr("1 or 2")?, Value::Number(1.0));
        assert_eq!(eval_expr("nil and 2")?, Value::Nil);
        assert_eq!(eval_expr("1 and 2")?, Value::Number(2.0));
        Ok(())
    }

    #[test]
    fn short_circuit_skips_right_operand() -> Result<(), RuntimeError> {
        let prg = r#"
            var called = false;
            fun sideEffect() { called = true; return true; }
            false and sideEffect();
            print called;
            true or sideEffect();
            print called;
            true and sideEffect();
            print called;
        "#;
        assert_eq!(eval_prg(prg)?, "false\nfalse\ntrue\n");
        Ok(())
    }

    #[test]
    fn print_stmt() -> Result<(), RuntimeError> {
        assert_eq!(eval_prg("print 42; print 4.5; print nil; print \"s\";")?, "42\n4.5\nnil\ns\n");
        Ok(())
    }

    #[test]
    fn get_unknown_var() {
        match eval_prg("print nope;") {
            Err(RuntimeError::UndefinedVariable { name, line: 1 }) if name == "nope" => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn set_unknown_var() {
        match eval_prg("nope = 1;") {
            Err(RuntimeError::UndefinedVariable { name, .. }) if name == "nope" => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn global_redeclaration_replaces_value() -> Result<(), RuntimeError> {
        assert_eq!(eval_prg("var a = 1; var a = 2; print a;")?, "2\n");
        Ok(())
    }

    #[test]
    fn uninitialized_var_is_nil() -> Result<(), RuntimeError> {
        assert_eq!(eval_prg("var a; print a;")?, "nil\n");
        Ok(())
    }

    #[test]
    fn call_builtin_clock() -> Result<(), RuntimeError> {
        let first = eval_expr("clock()")?;
        let second = eval_expr("clock()")?;
        match (first, second) {
            (Value::Number(a), Value::Number(b)) => assert!(a <= b),
            other => panic!("clock returned {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn native_function_prints_marker() -> Result<(), RuntimeError> {
        assert_eq!(eval_prg("print clock;")?, "<native fn>\n");
        Ok(())
    }

    #[test]
    fn user_function_prints_its_name() -> Result<(), RuntimeError> {
        assert_eq!(eval_prg("fun add(a, b) {} print add;")?, "<fn add>\n");
        Ok(())
    }

    #[test]
    fn call_function_with_bad_number_of_arguments() {
        match eval_prg("fun f() {}\nf(1);") {
            Err(RuntimeError::ArityMismatch {
                expected: 0,
                got: 1,
                line: 2,
            }) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn calling_a_number_is_an_error() {
        match eval_prg("var x = 3; x();") {
            Err(RuntimeError::NotCallable { line: 1 }) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn arguments_are_evaluated_before_arity_check() {
        match eval_prg("fun f() {} f(nope);") {
            Err(RuntimeError::UndefinedVariable { name, .. }) if name == "nope" => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn return_unwinds_loops_and_blocks() -> Result<(), RuntimeError> {
        let prg = r#"
            fun first_above(limit) {
                for (var i = 0; ; i = i + 1) {
                    {
                        if (i > limit) return i;
                    }
                }
            }
            print first_above(3);
        "#;
        assert_eq!(eval_prg(prg)?, "4\n");
        Ok(())
    }

    #[test]
    fn recursion() -> Result<(), RuntimeError> {
        let prg = r#"
            fun fib(n) {
                if (n < 2) return n;
                return fib(n - 1) + fib(n - 2);
            }
            print fib(10);
        "#;
        assert_eq!(eval_prg(prg)?, "55\n");
        Ok(())
    }

    #[test]
    fn closures_capture_definition_scope() -> Result<(), RuntimeError> {
        let prg = r#"
            var x = "global";
            fun outer() {
                var x = "outer";
                fun inner() { print x; }
                return inner;
            }
            var f = outer();
            f();
        "#;
        assert_eq!(eval_prg(prg)?, "outer\n");
        Ok(())
    }

    #[test]
    fn resolution_is_static_not_dynamic() -> Result<(), RuntimeError> {
        let prg = r#"
            var a = "global";
            {
                fun show() { print a; }
                show();
                var a = "block";
                show();
            }
        "#;
        assert_eq!(eval_prg(prg)?, "global\nglobal\n");
        Ok(())
    }

    #[test]
    fn same_ast_runs_identically_twice() -> Result<(), RuntimeError> {
        let ctx = Context::new();
        let (prg, locals) = parse_and_resolve(
            &ctx,
            r#"
                fun makeCounter() {
                    var i = 0;
                    fun count() { i = i + 1; return i; }
                    return count;
                }
                var c = makeCounter();
                print c();
                print c();
            "#,
        );
        let first = eval_prg_with_ctx(&ctx, &prg, &locals)?;
        let (relocals, _) = Resolver::new().resolve_program(&prg);
        let second = eval_prg_with_ctx(&ctx, &prg, &relocals)?;
        assert_eq!(first, "1\n2\n");
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn write_failure_is_a_runtime_error() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "sink closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let ctx = Context::new();
        let (prg, locals) = parse_and_resolve(&ctx, "print 1;");
        let mut sink = Broken;
        let mut e = Evaluator::new(&mut sink, &ctx);
        e.add_locals(locals);
        match e.eval_stmts_in_global_env(&prg) {
            Err(err @ RuntimeError::Io(_)) => assert_eq!(err.line(), None),
            out => panic!("unexpected output: {:?}", out),
        }
    }
}
