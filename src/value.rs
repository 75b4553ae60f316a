// ABOUTME: Runtime value types and the Callable trait

use std::fmt;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::class::{LoxClass, LoxInstance};
use crate::env::Environment;
use crate::error::RuntimeError;
use crate::eval::Interpreter;

/// Runtime value tagged union (spec §3): `nil`, `boolean`, `number`,
/// `string`, `callable`, `class`, `instance`. `Class` and `Instance`
/// are split out from `Callable` because a superclass expression must
/// evaluate specifically to a class value (§4.4's "Superclass must be
/// a class." check), not merely to something callable.
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Callable(Rc<dyn Callable>),
    Class(Rc<LoxClass>),
    Instance(Rc<LoxInstance>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(Rc::from(s.into()))
    }

    /// Lox truthiness: everything but `nil` and `false` is truthy,
    /// including `0` and `""`.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Value-equality within the same variant; cross-variant
    /// comparisons (other than the N/A case of two `nil`s) are false.
    pub fn lox_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Callable(a), Value::Callable(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Callable(_) => "callable",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
        }
    }
}

impl fmt::Display for Value {
    /// Printable form (§4.4), distinct from the lexer's forced-`.0`
    /// token literal format in `token.rs`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Str(s) => write!(f, "{s}"),
            Value::Callable(c) => write!(f, "{c}"),
            Value::Class(c) => write!(f, "{}", c.name),
            Value::Instance(i) => write!(f, "{} instance", i.class.name),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({self})")
    }
}

fn format_number(n: f64) -> String {
    // Rust's float Display already omits the trailing ".0" for whole
    // values (`42.0` prints as "42"), matching the runtime print rule;
    // only the lexer's token literal form (token.rs) forces it back.
    format!("{n}")
}

/// Anything answering `arity()` and `call(interpreter, args)` (§3).
pub trait Callable: fmt::Display {
    fn arity(&self) -> usize;
    fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError>;
}

/// The single native builtin, `clock` (§6).
pub struct NativeFunction {
    pub arity: usize,
    pub func: fn(&[Value]) -> Result<Value, RuntimeError>,
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(&self, _interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
        (self.func)(&args)
    }
}

impl fmt::Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn>")
    }
}

/// A user-defined function or method: its declaration plus the frame
/// active when it was defined (its closure). `is_initializer` marks a
/// class's `init` method so falling off the end (or a bare `return;`)
/// yields `this` instead of `nil`.
pub struct LoxFunction {
    pub declaration: Rc<FunctionDecl>,
    pub closure: Rc<Environment>,
    pub is_initializer: bool,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: Rc<Environment>, is_initializer: bool) -> Self {
        LoxFunction {
            declaration,
            closure,
            is_initializer,
        }
    }

    /// Produces a new callable whose closure wraps this function's
    /// closure with an extra `this -> instance` binding (§4.4 "Bound
    /// methods").
    pub fn bind(&self, instance: Rc<LoxInstance>) -> LoxFunction {
        let env = Environment::with_parent(Rc::clone(&self.closure));
        env.define("this".to_string(), Value::Instance(instance));
        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: env,
            is_initializer: self.is_initializer,
        }
    }
}

impl Callable for LoxFunction {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
        interpreter.call_function(self, args)
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.declaration.name.lexeme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_lox_rules() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::string("").is_truthy());
    }

    #[test]
    fn equality_is_value_equality_within_variant() {
        assert!(Value::Nil.lox_eq(&Value::Nil));
        assert!(Value::Number(1.0).lox_eq(&Value::Number(1.0)));
        assert!(!Value::Number(1.0).lox_eq(&Value::string("1")));
        assert!(!Value::Nil.lox_eq(&Value::Bool(false)));
    }

    #[test]
    fn number_display_has_no_trailing_zero() {
        assert_eq!(Value::Number(42.0).to_string(), "42");
        assert_eq!(Value::Number(3.5).to_string(), "3.5");
    }
}
