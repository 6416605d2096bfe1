//! Static scope resolution.
//!
//! Walks the program once, before it runs, and records for every local variable reference how
//! many scopes separate it from the scope that declares it.  References that no enclosing scope
//! declares are left out and looked up in the globals at run time.

use std::collections::HashMap;

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::diag::Diagnostic;
use crate::interner::Symbol;
use crate::token::Token;

/// Hop distance of every resolved variable reference and assignment.
pub type Locals = HashMap<ExprId, usize>;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum FunctionKind {
    None,
    Function,
}

#[derive(Debug)]
pub struct Resolver {
    // Innermost scope last.  `false` while a variable is declared but its initializer is still
    // being resolved.
    scopes: Vec<HashMap<Symbol, bool>>,
    current_function: FunctionKind,
    locals: Locals,
    diagnostics: Vec<Diagnostic>,
}

impl Default for Resolver {
    fn default() -> Self {
        Resolver::new()
    }
}

impl Resolver {
    pub fn new() -> Resolver {
        Resolver {
            scopes: vec![],
            current_function: FunctionKind::None,
            locals: Locals::new(),
            diagnostics: vec![],
        }
    }

    pub fn resolve_program(mut self, stmts: &[Stmt]) -> (Locals, Vec<Diagnostic>) {
        self.resolve_stmts(stmts);
        tracing::debug!(
            locals = self.locals.len(),
            errors = self.diagnostics.len(),
            "resolved program"
        );
        (self.locals, self.diagnostics)
    }

    fn resolve_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr),
            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(init) = initializer {
                    self.resolve_expr(init);
                }
                self.define(name);
            }
            Stmt::Block(stmts) => {
                self.scopes.push(HashMap::new());
                self.resolve_stmts(stmts);
                self.scopes.pop();
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }
            Stmt::Function(decl) => {
                // Defined before the body is resolved so the function can call itself.
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_function(decl, FunctionKind::Function);
            }
            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionKind::None {
                    self.error(keyword, "Cannot return from top-level code.");
                }
                if let Some(value) = value {
                    self.resolve_expr(value);
                }
            }
        }
    }

    fn resolve_function(&mut self, decl: &FunctionDecl, kind: FunctionKind) {
        let enclosing = std::mem::replace(&mut self.current_function, kind);

        self.scopes.push(HashMap::new());
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmts(&decl.body);
        self.scopes.pop();

        self.current_function = enclosing;
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => (),
            Expr::Grouping(inner) => self.resolve_expr(inner),
            Expr::Unary { right, .. } => self.resolve_expr(right),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Variable { id, name } => {
                let declared_but_undefined = self
                    .scopes
                    .last()
                    .and_then(|scope| scope.get(&name.lexeme))
                    == Some(&false);
                if declared_but_undefined {
                    self.error(name, "Cannot read local variable in its own initializer.");
                }
                self.resolve_local(*id, name);
            }
            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }
            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }
        }
    }

    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        let found = self
            .scopes
            .iter()
            .rev()
            .position(|scope| scope.contains_key(&name.lexeme));
        if let Some(distance) = found {
            tracing::trace!(name = %name.lexeme, line = name.line, distance, "resolved local");
            self.locals.insert(id, distance);
        }
    }

    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        if scope.insert(name.lexeme.clone(), false).is_some() {
            self.error(name, "Variable with this name already declared in this scope.");
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    fn error(&mut self, token: &Token, message: &str) {
        self.diagnostics.push(Diagnostic::at_token(token, message));
    }
}
