use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::runtime::value::Value;

/// One link in a scope chain. Shared: closures keep their defining scope
/// alive after the block that created it has finished.
#[derive(Clone)]
pub struct Env(Rc<RefCell<Scope>>);

struct Scope {
    vars: HashMap<String, Value>,
    parent: Option<Env>,
}

impl Env {
    pub fn global() -> Self {
        Env(Rc::new(RefCell::new(Scope { vars: HashMap::new(), parent: None })))
    }

    pub fn child(parent: &Env) -> Self {
        Env(Rc::new(RefCell::new(Scope { vars: HashMap::new(), parent: Some(parent.clone()) })))
    }

    /// Binds `name` in this scope, replacing any existing binding here.
    pub fn define(&self, name: &str, value: Value) {
        self.0.borrow_mut().vars.insert(name.to_string(), value);
    }

    /// Overwrites the nearest existing binding of `name`. Returns `false`
    /// when no scope in the chain holds it; nothing is created.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        let mut scope = self.clone();
        loop {
            let parent = {
                let mut s = scope.0.borrow_mut();
                if let Some(slot) = s.vars.get_mut(name) {
                    *slot = value;
                    return true;
                }
                s.parent.clone()
            };
            match parent {
                Some(p) => scope = p,
                None => return false,
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut scope = self.clone();
        loop {
            let parent = {
                let s = scope.0.borrow();
                if let Some(v) = s.vars.get(name) {
                    return Some(v.clone());
                }
                s.parent.clone()
            };
            scope = parent?;
        }
    }

    pub fn has_local(&self, name: &str) -> bool {
        self.0.borrow().vars.contains_key(name)
    }

    pub fn ptr_eq(&self, other: &Env) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Functions bound here that captured this scope and are referenced
    /// from nowhere else.
    pub(crate) fn unshared_functions(&self) -> usize {
        self.0.borrow().vars.values()
            .filter(|v| matches!(v, Value::Function(c) if c.env.ptr_eq(self) && Rc::strong_count(c) == 1))
            .count()
    }

    /// Drops every binding in this scope. Breaks closure reference cycles
    /// when a run ends.
    pub(crate) fn clear(&self) {
        let vars = std::mem::take(&mut self.0.borrow_mut().vars);
        drop(vars);
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0.borrow();
        let mut names: Vec<&String> = s.vars.keys().collect();
        names.sort();
        f.debug_struct("Env")
            .field("vars", &names)
            .field("has_parent", &s.parent.is_some())
            .finish()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn num(v: Option<Value>) -> f64 {
        match v {
            Some(Value::Number(n)) => n,
            other => panic!("expected number, got {other:?}"),
        }
    }

    #[test]
    fn define_and_lookup() {
        let g = Env::global();
        g.define("x", Value::Number(1.0));
        assert_eq!(num(g.lookup("x")), 1.0);
        assert!(g.lookup("y").is_none());
    }

    #[test]
    fn define_overwrites_in_current_scope() {
        let g = Env::global();
        g.define("x", Value::Number(1.0));
        g.define("x", Value::Number(2.0));
        assert_eq!(num(g.lookup("x")), 2.0);
    }

    #[test]
    fn child_shadows_parent() {
        let g = Env::global();
        g.define("x", Value::Number(1.0));
        let c = Env::child(&g);
        c.define("x", Value::Number(2.0));
        assert_eq!(num(c.lookup("x")), 2.0);
        assert_eq!(num(g.lookup("x")), 1.0);
    }

    #[test]
    fn assign_updates_nearest_holder() {
        let g = Env::global();
        g.define("x", Value::Number(1.0));
        let c = Env::child(&Env::child(&g));
        assert!(c.assign("x", Value::Number(5.0)));
        assert_eq!(num(g.lookup("x")), 5.0);
        assert!(!c.has_local("x"));
    }

    #[test]
    fn assign_to_undefined_never_creates_binding() {
        let g = Env::global();
        let c = Env::child(&g);
        assert!(!c.assign("ghost", Value::Number(1.0)));
        assert!(c.lookup("ghost").is_none());
        assert!(g.lookup("ghost").is_none());
    }

    #[test]
    fn clear_drops_bindings() {
        let g = Env::global();
        g.define("x", Value::Null);
        g.clear();
        assert!(!g.has_local("x"));
    }
}
