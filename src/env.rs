// ABOUTME: Environment frames for lexically scoped variable bindings

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;

/// `{values: map name->value, enclosing?: frame}` (§3). Frames form a
/// singly-linked chain rooted at a distinguished `globals` frame;
/// multiple closures may share the same frame and mutate it in place.
#[derive(Debug)]
pub struct Environment {
    values: RefCell<HashMap<String, Value>>,
    enclosing: Option<Rc<Environment>>,
}

impl Environment {
    /// Creates the root `globals` frame.
    pub fn new() -> Rc<Self> {
        Rc::new(Environment {
            values: RefCell::new(HashMap::new()),
            enclosing: None,
        })
    }

    /// Creates a new child frame.
    pub fn with_parent(parent: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            values: RefCell::new(HashMap::new()),
            enclosing: Some(parent),
        })
    }

    /// Defines a binding in this frame, shadowing any binding of the
    /// same name in an enclosing frame.
    pub fn define(&self, name: String, value: Value) {
        self.values.borrow_mut().insert(name, value);
    }

    fn ancestor(self: &Rc<Self>, distance: usize) -> Rc<Environment> {
        let mut env = Rc::clone(self);
        for _ in 0..distance {
            let next = env
                .enclosing
                .clone()
                .expect("resolver promised this many enclosing frames");
            env = next;
        }
        env
    }

    /// Reads a name the resolver proved lives exactly `distance`
    /// frames up. Absence there is a resolver bug, not a runtime
    /// condition (§4.4).
    pub fn get_at(self: &Rc<Self>, distance: usize, name: &str) -> Value {
        self.ancestor(distance)
            .values
            .borrow()
            .get(name)
            .cloned()
            .expect("resolver promised this binding exists")
    }

    pub fn assign_at(self: &Rc<Self>, distance: usize, name: &str, value: Value) {
        self.ancestor(distance)
            .values
            .borrow_mut()
            .insert(name.to_string(), value);
    }

    /// Looks up an unresolved (global) name. Missing is a runtime
    /// error: "Undefined variable '<name>'."
    pub fn get_global(&self, name: &Token) -> Result<Value, RuntimeError> {
        self.values.borrow().get(&name.lexeme).cloned().ok_or_else(|| {
            RuntimeError::at(name, format!("Undefined variable '{}'.", name.lexeme))
        })
    }

    /// Assigns an unresolved (global) name. Writing an undefined
    /// global is a runtime error.
    pub fn assign_global(&self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        let mut values = self.values.borrow_mut();
        if values.contains_key(&name.lexeme) {
            values.insert(name.lexeme.clone(), value);
            Ok(())
        } else {
            Err(RuntimeError::at(
                name,
                format!("Undefined variable '{}'.", name.lexeme),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn ident(name: &str) -> Token {
        Token::new(TokenType::Identifier, name.to_string(), None, 1)
    }

    #[test]
    fn define_and_read_global() {
        let env = Environment::new();
        env.define("x".to_string(), Value::Number(42.0));
        match env.get_global(&ident("x")) {
            Ok(Value::Number(n)) => assert_eq!(n, 42.0),
            other => panic!("expected Number(42.0), got {other:?}"),
        }
    }

    #[test]
    fn undefined_global_is_runtime_error() {
        let env = Environment::new();
        assert!(env.get_global(&ident("missing")).is_err());
    }

    #[test]
    fn child_shadows_parent_without_mutating_it() {
        let parent = Environment::new();
        parent.define("x".to_string(), Value::Number(1.0));
        let child = Environment::with_parent(Rc::clone(&parent));
        child.define("x".to_string(), Value::Number(2.0));

        assert_eq!(child.get_at(0, "x").to_string(), "2");
        assert_eq!(parent.get_at(0, "x").to_string(), "1");
    }

    #[test]
    fn get_at_climbs_exactly_distance_frames() {
        let grandparent = Environment::new();
        grandparent.define("a".to_string(), Value::Number(1.0));
        let parent = Environment::with_parent(Rc::clone(&grandparent));
        parent.define("b".to_string(), Value::Number(2.0));
        let child = Environment::with_parent(Rc::clone(&parent));
        child.define("c".to_string(), Value::Number(3.0));

        assert_eq!(child.get_at(0, "c").to_string(), "3");
        assert_eq!(child.get_at(1, "b").to_string(), "2");
        assert_eq!(child.get_at(2, "a").to_string(), "1");
    }

    #[test]
    fn assign_at_mutates_the_shared_frame() {
        let outer = Environment::new();
        outer.define("x".to_string(), Value::Number(0.0));
        let inner = Environment::with_parent(Rc::clone(&outer));

        inner.assign_at(1, "x", Value::Number(9.0));
        assert_eq!(outer.get_at(0, "x").to_string(), "9");
    }
}
