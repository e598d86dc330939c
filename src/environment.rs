//! Lexical scopes.
//!
//! Scopes form a parent‑linked chain shared through `Rc<RefCell<_>>`: a
//! closure keeps its defining scope alive, and every closure over the same
//! scope sees the same bindings.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{LoxError, Result, RuntimeError};
use crate::token::Token;
use crate::value::Value;

/// Shared handle to a scope.
pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    /// A root (global) scope.
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Wrap into a shared handle.
    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    /// Bind `name` in this scope, replacing any previous binding here.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Does this scope itself (not its parents) bind `name`?
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Dynamic lookup along the chain.
    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(LoxError::runtime(
                name.line,
                RuntimeError::UndefinedVariable(name.lexeme.clone()),
            ))
        }
    }

    /// Dynamic assignment to the nearest scope that binds `name`.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(LoxError::runtime(
                name.line,
                RuntimeError::UndefinedVariable(name.lexeme.clone()),
            ))
        }
    }

    /// The scope exactly `distance` hops up from `env`.
    pub fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
        let mut current: EnvRef = Rc::clone(env);

        for _ in 0..distance {
            let next: EnvRef = current.borrow().enclosing.clone()?;
            current = next;
        }

        Some(current)
    }

    /// Statically addressed read.  `None` means the resolver and the runtime
    /// disagree about the scope layout.
    pub fn get_at(env: &EnvRef, distance: usize, name: &str) -> Option<Value> {
        let scope: EnvRef = Self::ancestor(env, distance)?;
        let value: Option<Value> = scope.borrow().values.get(name).cloned();
        value
    }

    /// Statically addressed write.  Returns `false` if the slot does not exist.
    pub fn assign_at(env: &EnvRef, distance: usize, name: &str, value: Value) -> bool {
        let Some(scope) = Self::ancestor(env, distance) else {
            return false;
        };

        let mut scope = scope.borrow_mut();

        match scope.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for Environment {
    // Values may point back at this scope through closures, so only the
    // names are printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.values.keys().collect();
        names.sort();

        f.debug_struct("Environment")
            .field("names", &names)
            .field("has_enclosing", &self.enclosing.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Token {
        Token::identifier(name, 1)
    }

    #[test]
    fn get_walks_enclosing_scopes() {
        let globals = Environment::new().into_ref();
        globals.borrow_mut().define("a", Value::Number(1.0));

        let inner = Environment::with_enclosing(Rc::clone(&globals));

        assert_eq!(inner.get(&ident("a")).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn get_missing_name_is_undefined_variable() {
        let env = Environment::new();

        let err = env.get(&ident("nope")).unwrap_err();

        assert!(matches!(
            err,
            LoxError::Runtime {
                kind: RuntimeError::UndefinedVariable(ref n),
                ..
            } if n == "nope"
        ));
    }

    #[test]
    fn assign_updates_nearest_binding_only() {
        let outer = Environment::new().into_ref();
        outer.borrow_mut().define("x", Value::Number(1.0));

        let inner = Environment::with_enclosing(Rc::clone(&outer)).into_ref();
        inner
            .borrow_mut()
            .assign(&ident("x"), Value::Number(2.0))
            .unwrap();

        assert!(!inner.borrow().contains("x"));
        assert_eq!(
            Environment::get_at(&outer, 0, "x"),
            Some(Value::Number(2.0))
        );
    }

    #[test]
    fn distance_addressing_skips_shadowing_bindings() {
        let outer = Environment::new().into_ref();
        outer.borrow_mut().define("a", Value::from("outer"));

        let inner = Environment::with_enclosing(Rc::clone(&outer)).into_ref();
        inner.borrow_mut().define("a", Value::from("inner"));

        assert_eq!(Environment::get_at(&inner, 0, "a"), Some(Value::from("inner")));
        assert_eq!(Environment::get_at(&inner, 1, "a"), Some(Value::from("outer")));

        assert!(Environment::assign_at(&inner, 1, "a", Value::from("changed")));
        assert_eq!(Environment::get_at(&outer, 0, "a"), Some(Value::from("changed")));
    }

    #[test]
    fn distance_past_the_root_is_a_miss() {
        let root = Environment::new().into_ref();

        assert!(Environment::ancestor(&root, 1).is_none());
        assert_eq!(Environment::get_at(&root, 0, "missing"), None);
        assert!(!Environment::assign_at(&root, 3, "missing", Value::Nil));
    }
}
