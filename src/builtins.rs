// ABOUTME: Registers the native clock builtin into the global environment

use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::env::Environment;
use crate::error::RuntimeError;
use crate::value::{NativeFunction, Value};

/// Installs the single native global, `clock` (§6): arity 0, returns
/// the current Unix time in seconds as a floating-point number.
pub fn register_globals(globals: &Rc<Environment>) {
    globals.define(
        "clock".to_string(),
        Value::Callable(Rc::new(NativeFunction {
            arity: 0,
            func: clock,
        })),
    );
}

fn clock(_args: &[Value]) -> Result<Value, RuntimeError> {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    Ok(Value::Number(since_epoch.as_secs_f64()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Token, TokenType};

    #[test]
    fn clock_is_registered_with_zero_arity() {
        let globals = Environment::new();
        register_globals(&globals);
        let name = Token::new(TokenType::Identifier, "clock".to_string(), None, 1);
        match globals.get_global(&name) {
            Ok(Value::Callable(c)) => assert_eq!(c.arity(), 0),
            other => panic!("expected a registered callable, got {other:?}"),
        }
    }

    #[test]
    fn clock_returns_a_positive_number() {
        match clock(&[]) {
            Ok(Value::Number(n)) => assert!(n > 0.0),
            other => panic!("expected Number, got {other:?}"),
        }
    }
}
