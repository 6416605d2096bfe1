use std::fmt;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::environment::Env;
use crate::interner::Symbol;

/// Runtime value.  No implicit conversion ever happens between variants.
#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Function(Rc<Function>),
}

impl Value {
    /// `nil` and `false` are falsy, everything else (including `0` and `""`) is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            _ => true,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            // Shortest round-trip form: never a trailing ".0".
            Value::Number(n) if n.is_infinite() => {
                write!(f, "{}Infinity", if *n < 0.0 { "-" } else { "" })
            }
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => f.write_str(s),
            Value::Function(func) => write!(f, "{}", func),
        }
    }
}

/// Host-provided computation behind a native function.
pub type NativeFn = fn(&[Value]) -> Value;

/// A callable value.
pub struct Function {
    name: Symbol,
    arity: usize,
    body: FunctionBody,
}

pub enum FunctionBody {
    Builtin(NativeFn),
    /// A closure: the declaration plus the environment active where it was declared.
    User {
        decl: Rc<FunctionDecl>,
        closure: Rc<Env>,
    },
}

impl Function {
    pub fn builtin(name: Symbol, arity: usize, body: NativeFn) -> Function {
        Function {
            name,
            arity,
            body: FunctionBody::Builtin(body),
        }
    }

    pub fn user(decl: Rc<FunctionDecl>, closure: Rc<Env>) -> Function {
        Function {
            name: decl.name.lexeme.clone(),
            arity: decl.params.len(),
            body: FunctionBody::User { decl, closure },
        }
    }

    pub fn name(&self) -> &Symbol {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn body(&self) -> &FunctionBody {
        &self.body
    }
}

// Does not print the closure: a function usually lives in the very environment it captured.
impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.body {
            FunctionBody::Builtin(_) => "builtin",
            FunctionBody::User { .. } => "user",
        };
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("kind", &kind)
            .finish()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.body {
            FunctionBody::Builtin(_) => write!(f, "<native fn>"),
            FunctionBody::User { .. } => write!(f, "<fn {}>", self.name),
        }
    }
}

/// Functions are only equal to themselves.
impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}
