//! Runtime scopes.
//!
//! Environments are shared through `Rc`: a closure keeps the environment of its declaration
//! alive after the block or call that created it has finished, and every closure declared in the
//! same scope sees the others' assignments.

use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::rc::Rc;

use crate::interner::Symbol;
use crate::value::Value;

/// The name is not bound in any scope of the chain.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Undefined;

#[derive(Debug, Default)]
pub struct Env {
    parent: Option<Rc<Env>>,
    bindings: RefCell<HashMap<Symbol, Value>>,
}

impl Env {
    /// Creates an outermost (global) environment.
    pub fn new() -> Rc<Env> {
        Rc::new(Env::default())
    }

    pub fn with_parent(parent: Rc<Env>) -> Rc<Env> {
        Rc::new(Env {
            parent: Some(parent),
            bindings: RefCell::new(HashMap::new()),
        })
    }

    /// Bind `name` in this very scope, shadowing outer bindings and replacing a previous binding
    /// of the same scope.
    pub fn define(&self, name: &Symbol, val: Value) {
        self.bindings.borrow_mut().insert(name.clone(), val);
    }

    /// Look `name` up, walking outward until a scope binds it.
    pub fn get(&self, name: &Symbol) -> Option<Value> {
        match self.bindings.borrow().get(name) {
            Some(v) => Some(v.clone()),
            None => self.parent.as_ref().and_then(|p| p.get(name)),
        }
    }

    /// Overwrite the nearest existing binding of `name`.  Never creates a binding.
    pub fn assign(&self, name: &Symbol, val: Value) -> Result<(), Undefined> {
        if let Entry::Occupied(mut entry) = self.bindings.borrow_mut().entry(name.clone()) {
            entry.insert(val);
            return Ok(());
        }
        match self.parent.as_ref() {
            Some(parent) => parent.assign(name, val),
            None => Err(Undefined),
        }
    }

    /// Read `name` from the scope exactly `distance` parent links away, ignoring every other
    /// scope.
    pub fn get_at(self: &Rc<Self>, distance: usize, name: &Symbol) -> Option<Value> {
        self.ancestor(distance)?.bindings.borrow().get(name).cloned()
    }

    /// Assign `name` in the scope exactly `distance` parent links away.
    pub fn assign_at(
        self: &Rc<Self>,
        distance: usize,
        name: &Symbol,
        val: Value,
    ) -> Result<(), Undefined> {
        let env = self.ancestor(distance).ok_or(Undefined)?;
        let mut bindings = env.bindings.borrow_mut();
        match bindings.get_mut(name) {
            Some(slot) => {
                *slot = val;
                Ok(())
            }
            None => Err(Undefined),
        }
    }

    fn ancestor(self: &Rc<Self>, distance: usize) -> Option<Rc<Env>> {
        let mut env = self.clone();
        for _ in 0..distance {
            env = env.parent.clone()?;
        }
        Some(env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctx::Context;
    use pretty_assertions::assert_eq;

    #[test]
    fn define_then_get() {
        let ctx = Context::new();
        let env = Env::new();
        env.define(&ctx.symbol("a"), Value::Number(1.0));
        assert_eq!(env.get(&ctx.symbol("a")), Some(Value::Number(1.0)));
        assert_eq!(env.get(&ctx.symbol("b")), None);
    }

    #[test]
    fn redefinition_replaces_value() {
        let ctx = Context::new();
        let env = Env::new();
        env.define(&ctx.symbol("a"), Value::Number(1.0));
        env.define(&ctx.symbol("a"), Value::Number(2.0));
        assert_eq!(env.get(&ctx.symbol("a")), Some(Value::Number(2.0)));
    }

    #[test]
    fn lookup_delegates_to_parent() {
        let ctx = Context::new();
        let global = Env::new();
        global.define(&ctx.symbol("a"), Value::Bool(true));
        let inner = Env::with_parent(Env::with_parent(global));
        assert_eq!(inner.get(&ctx.symbol("a")), Some(Value::Bool(true)));
    }

    #[test]
    fn assign_updates_nearest_binding_only() {
        let ctx = Context::new();
        let a = ctx.symbol("a");
        let global = Env::new();
        global.define(&a, Value::Number(1.0));
        let inner = Env::with_parent(global.clone());
        inner.define(&a, Value::Number(10.0));

        assert_eq!(inner.assign(&a, Value::Number(11.0)), Ok(()));
        assert_eq!(inner.get(&a), Some(Value::Number(11.0)));
        assert_eq!(global.get(&a), Some(Value::Number(1.0)));
    }

    #[test]
    fn assign_never_creates_a_binding() {
        let ctx = Context::new();
        let env = Env::with_parent(Env::new());
        assert_eq!(env.assign(&ctx.symbol("a"), Value::Nil), Err(Undefined));
        assert_eq!(env.get(&ctx.symbol("a")), None);
    }

    #[test]
    fn get_at_looks_in_exactly_one_scope() {
        let ctx = Context::new();
        let a = ctx.symbol("a");
        let global = Env::new();
        global.define(&a, Value::Number(1.0));
        let middle = Env::with_parent(global);
        let inner = Env::with_parent(middle);

        assert_eq!(inner.get_at(2, &a), Some(Value::Number(1.0)));
        assert_eq!(inner.get_at(1, &a), None);
        assert_eq!(inner.get_at(3, &a), None);
    }

    #[test]
    fn assign_at_targets_the_given_scope() {
        let ctx = Context::new();
        let a = ctx.symbol("a");
        let outer = Env::new();
        outer.define(&a, Value::Number(1.0));
        let inner = Env::with_parent(outer.clone());
        inner.define(&a, Value::Number(2.0));

        assert_eq!(inner.assign_at(1, &a, Value::Number(3.0)), Ok(()));
        assert_eq!(outer.get(&a), Some(Value::Number(3.0)));
        assert_eq!(inner.get(&a), Some(Value::Number(2.0)));
        assert_eq!(inner.assign_at(0, &ctx.symbol("b"), Value::Nil), Err(Undefined));
    }

    #[test]
    fn shared_scope_sees_mutations_through_every_handle() {
        let ctx = Context::new();
        let n = ctx.symbol("n");
        let scope = Env::new();
        scope.define(&n, Value::Number(0.0));
        let first = Env::with_parent(scope.clone());
        let second = Env::with_parent(scope);

        first.assign(&n, Value::Number(5.0)).expect("n is bound");
        assert_eq!(second.get(&n), Some(Value::Number(5.0)));
    }
}
