// ABOUTME: Tree-walking evaluator executing statements and expressions

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::mem;
use std::rc::Rc;

use crate::ast::{Expr, ExprId, LitValue, Stmt};
use crate::builtins::register_globals;
use crate::class::{LoxClass, LoxInstance};
use crate::env::Environment;
use crate::error::{RuntimeError, Unwind};
use crate::token::{Token, TokenType};
use crate::value::{Callable, LoxFunction, Value};

/// Tree-walking evaluator (§4.4). Holds the resolver's `ExprId -> depth`
/// map, the `globals` frame, and the currently active frame; a block or
/// call installs a fresh child frame for its duration and unconditionally
/// restores the previous one on exit, including when an error or a
/// `Return` unwind is propagating (§5).
pub struct Interpreter {
    pub globals: Rc<Environment>,
    environment: Rc<Environment>,
    locals: HashMap<ExprId, usize>,
    out: Box<dyn Write>,
}

impl Interpreter {
    /// Creates an interpreter that writes `print` output to stdout.
    pub fn new(locals: HashMap<ExprId, usize>) -> Self {
        Interpreter::with_writer(locals, Box::new(std::io::stdout()))
    }

    /// Creates an interpreter writing `print` output to an arbitrary
    /// sink, used by tests to capture output in memory.
    pub fn with_writer(locals: HashMap<ExprId, usize>, out: Box<dyn Write>) -> Self {
        let globals = Environment::new();
        register_globals(&globals);
        Interpreter {
            environment: Rc::clone(&globals),
            globals,
            locals,
            out,
        }
    }

    /// Merges in depths resolved from a later program fragment, used by
    /// the REPL to keep one interpreter alive across input lines.
    pub fn load_locals(&mut self, locals: HashMap<ExprId, usize>) {
        self.locals.extend(locals);
    }

    /// Executes a full statement program for its side effects (`run`
    /// mode). A runtime error unwinds immediately; statements after the
    /// failing one are not executed (§7).
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        for stmt in statements {
            match self.execute(stmt) {
                Ok(()) => {}
                Err(Unwind::Error(err)) => return Err(err),
                Err(Unwind::Return(_)) => return Ok(()),
            }
        }
        Ok(())
    }

    /// Evaluates a single expression (`evaluate` mode).
    pub fn evaluate_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        self.evaluate(expr)
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<(), Unwind> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(())
            }
            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                let _ = writeln!(self.out, "{value}");
                Ok(())
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(init) => self.evaluate(init)?,
                    None => Value::Nil,
                };
                self.environment.define(name.lexeme.clone(), value);
                Ok(())
            }
            Stmt::Block(statements) => {
                let block_env = Environment::with_parent(Rc::clone(&self.environment));
                self.execute_block(statements, block_env)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(())
                }
            }
            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    self.execute(body)?;
                }
                Ok(())
            }
            Stmt::Function(decl) => {
                let function = LoxFunction::new(Rc::clone(decl), Rc::clone(&self.environment), false);
                self.environment
                    .define(decl.name.lexeme.clone(), Value::Callable(Rc::new(function)));
                Ok(())
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Err(Unwind::Return(value))
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass, methods),
        }
    }

    /// Installs `env` as the active frame for the duration of
    /// `statements`, restoring the previous frame unconditionally on
    /// return — including when `Err` is propagating.
    fn execute_block(&mut self, statements: &[Stmt], env: Rc<Environment>) -> Result<(), Unwind> {
        let previous = mem::replace(&mut self.environment, env);
        let result = statements.iter().try_for_each(|stmt| self.execute(stmt));
        self.environment = previous;
        result
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass_expr: &Option<Expr>,
        methods: &[Rc<crate::ast::FunctionDecl>],
    ) -> Result<(), Unwind> {
        let superclass = match superclass_expr {
            Some(expr @ Expr::Variable { name: super_name, .. }) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => return Err(RuntimeError::at(super_name, "Superclass must be a class.").into()),
            },
            Some(_) => unreachable!("parser only builds a Variable node for a superclass"),
            None => None,
        };

        self.environment.define(name.lexeme.clone(), Value::Nil);

        let method_env = match &superclass {
            Some(sup) => {
                let env = Environment::with_parent(Rc::clone(&self.environment));
                env.define("super".to_string(), Value::Class(Rc::clone(sup)));
                env
            }
            None => Rc::clone(&self.environment),
        };

        let mut method_table = HashMap::new();
        for method in methods {
            let is_initializer = method.name.lexeme == "init";
            let function = LoxFunction::new(Rc::clone(method), Rc::clone(&method_env), is_initializer);
            method_table.insert(method.name.lexeme.clone(), Rc::new(function));
        }

        let class = LoxClass::new(name.lexeme.clone(), superclass, method_table);
        self.environment.define(name.lexeme.clone(), Value::Class(Rc::new(class)));
        Ok(())
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal { value, .. } => Ok(literal_value(value)),
            Expr::Grouping { expression, .. } => self.evaluate(expression),
            Expr::Unary { operator, right, .. } => {
                let right = self.evaluate(right)?;
                match operator.kind {
                    TokenType::Minus => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(RuntimeError::at(operator, "Operand must be a number.")),
                    },
                    TokenType::Bang => Ok(Value::Bool(!right.is_truthy())),
                    _ => unreachable!("parser only builds Unary nodes with ! or -"),
                }
            }
            Expr::Binary { left, operator, right, .. } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary_op(operator, left, right)
            }
            Expr::Logical { left, operator, right, .. } => {
                let left = self.evaluate(left)?;
                let left_truthy = left.is_truthy();
                if operator.kind == TokenType::Or {
                    if left_truthy {
                        return Ok(left);
                    }
                } else if !left_truthy {
                    return Ok(left);
                }
                self.evaluate(right)
            }
            Expr::Variable { id, name } => self.lookup_variable(*id, name),
            Expr::This { id, keyword } => self.lookup_variable(*id, keyword),
            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;
                match self.locals.get(id) {
                    Some(&depth) => self.environment.assign_at(depth, &name.lexeme, value.clone()),
                    None => self.globals.assign_global(name, value.clone())?,
                }
                Ok(value)
            }
            Expr::Call {
                callee,
                paren,
                arguments,
                ..
            } => {
                let callee = self.evaluate(callee)?;
                let mut args = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate(arg)?);
                }
                self.call_value(callee, paren, args)
            }
            Expr::Get { object, name, .. } => match self.evaluate(object)? {
                Value::Instance(instance) => instance.get(name),
                _ => Err(RuntimeError::at(name, "Only instances have properties.")),
            },
            Expr::Set { object, name, value, .. } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value = self.evaluate(value)?;
                    instance.set(name, value.clone());
                    Ok(value)
                }
                _ => Err(RuntimeError::at(name, "Only instances have fields.")),
            },
            Expr::Super { id, keyword, method } => self.eval_super(*id, keyword, method),
        }
    }

    fn lookup_variable(&self, id: ExprId, name: &Token) -> Result<Value, RuntimeError> {
        match self.locals.get(&id) {
            Some(&depth) => Ok(self.environment.get_at(depth, &name.lexeme)),
            None => self.globals.get_global(name),
        }
    }

    fn eval_super(&self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value, RuntimeError> {
        let depth = *self
            .locals
            .get(&id)
            .expect("resolver always assigns super a depth inside a subclass method");
        let superclass = match self.environment.get_at(depth, "super") {
            Value::Class(class) => class,
            _ => unreachable!("'super' always binds to a class value"),
        };
        let instance = match self.environment.get_at(depth - 1, "this") {
            Value::Instance(instance) => instance,
            _ => unreachable!("'this' always binds one frame inside 'super'"),
        };
        let method = superclass.find_method(&method.lexeme).ok_or_else(|| {
            RuntimeError::at(keyword, format!("Undefined property '{}'.", method.lexeme))
        })?;
        let bound = method.bind(instance);
        Ok(Value::Callable(Rc::new(bound)))
    }

    fn call_value(&mut self, callee: Value, paren: &Token, args: Vec<Value>) -> Result<Value, RuntimeError> {
        match callee {
            Value::Callable(callable) => {
                check_arity(paren, callable.arity(), args.len())?;
                callable.call(self, args)
            }
            Value::Class(class) => {
                check_arity(paren, class.arity(), args.len())?;
                let instance = LoxInstance::new(Rc::clone(&class));
                if let Some(init) = class.find_method("init") {
                    init.bind(Rc::clone(&instance)).call(self, args)?;
                }
                Ok(Value::Instance(instance))
            }
            _ => Err(RuntimeError::at(paren, "Can only call functions and classes.")),
        }
    }

    /// Runs a user function or bound method's body in a fresh frame
    /// child of its closure, decoding the `Return` unwind back into a
    /// plain value. An initializer always yields the bound `this`
    /// regardless of what it returns (I4).
    pub fn call_function(&mut self, function: &LoxFunction, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let call_env = Environment::with_parent(Rc::clone(&function.closure));
        for (param, arg) in function.declaration.params.iter().zip(args) {
            call_env.define(param.lexeme.clone(), arg);
        }

        match self.execute_block(&function.declaration.body, call_env) {
            Ok(()) => Ok(self.initializer_result(function).unwrap_or(Value::Nil)),
            Err(Unwind::Return(value)) => Ok(self.initializer_result(function).unwrap_or(value)),
            Err(Unwind::Error(err)) => Err(err),
        }
    }

    fn initializer_result(&self, function: &LoxFunction) -> Option<Value> {
        if function.is_initializer {
            Some(function.closure.get_at(0, "this"))
        } else {
            None
        }
    }
}

fn literal_value(value: &LitValue) -> Value {
    match value {
        LitValue::Nil => Value::Nil,
        LitValue::Bool(b) => Value::Bool(*b),
        LitValue::Number(n) => Value::Number(*n),
        LitValue::Str(s) => Value::string(s.clone()),
    }
}

fn check_arity(paren: &Token, expected: usize, got: usize) -> Result<(), RuntimeError> {
    if expected != got {
        Err(RuntimeError::at(
            paren,
            format!("Expected {expected} arguments but got {got}."),
        ))
    } else {
        Ok(())
    }
}

fn as_numbers(operator: &Token, left: &Value, right: &Value) -> Result<(f64, f64), RuntimeError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::at(operator, "Operands must be numbers.")),
    }
}

/// Both operands are evaluated before this type check runs, so a
/// reported error always carries the operator token (§4.4).
fn binary_op(operator: &Token, left: Value, right: Value) -> Result<Value, RuntimeError> {
    use TokenType::*;
    match operator.kind {
        Minus => as_numbers(operator, &left, &right).map(|(a, b)| Value::Number(a - b)),
        Slash => as_numbers(operator, &left, &right).map(|(a, b)| Value::Number(a / b)),
        Star => as_numbers(operator, &left, &right).map(|(a, b)| Value::Number(a * b)),
        Greater => as_numbers(operator, &left, &right).map(|(a, b)| Value::Bool(a > b)),
        GreaterEqual => as_numbers(operator, &left, &right).map(|(a, b)| Value::Bool(a >= b)),
        Less => as_numbers(operator, &left, &right).map(|(a, b)| Value::Bool(a < b)),
        LessEqual => as_numbers(operator, &left, &right).map(|(a, b)| Value::Bool(a <= b)),
        Plus => match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::Str(a), Value::Str(b)) => Ok(Value::string(format!("{a}{b}"))),
            _ => Err(RuntimeError::at(
                operator,
                "Operands must be two numbers or two strings.",
            )),
        },
        BangEqual => Ok(Value::Bool(!left.lox_eq(&right))),
        EqualEqual => Ok(Value::Bool(left.lox_eq(&right))),
        _ => unreachable!("parser only builds Binary nodes with these operators"),
    }
}

/// A `Write` sink backed by a shared buffer, so a test harness can hold
/// a handle to output captured while an `Interpreter` runs.
#[derive(Clone, Default)]
pub struct SharedOutput(Rc<RefCell<Vec<u8>>>);

impl SharedOutput {
    pub fn new() -> Self {
        SharedOutput(Rc::new(RefCell::new(Vec::new())))
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use crate::resolver::Resolver;

    fn run(source: &str) -> Result<String, RuntimeError> {
        let (tokens, lex_errors) = Lexer::new(source).scan();
        assert!(lex_errors.is_empty(), "unexpected lex errors: {lex_errors:?}");
        let (statements, parse_errors) = Parser::new(tokens).parse_program();
        assert!(parse_errors.is_empty(), "unexpected parse errors: {parse_errors:?}");
        let (locals, resolve_errors) = Resolver::new().resolve(&statements);
        assert!(resolve_errors.is_empty(), "unexpected resolve errors: {resolve_errors:?}");

        let out = SharedOutput::new();
        let mut interpreter = Interpreter::with_writer(locals, Box::new(out.clone()));
        interpreter.interpret(&statements)?;
        Ok(out.contents())
    }

    #[test]
    fn arithmetic_and_variables() {
        let output = run("var a = 1; var b = 2; print a + b;").unwrap();
        assert_eq!(output, "3\n");
    }

    #[test]
    fn string_concatenation() {
        let output = run("var s = \"foo\"; print s + \"bar\";").unwrap();
        assert_eq!(output, "foobar\n");
    }

    #[test]
    fn for_loop_desugars_and_runs() {
        let output = run("for (var i = 0; i < 3; i = i + 1) print i;").unwrap();
        assert_eq!(output, "0\n1\n2\n");
    }

    #[test]
    fn closures_capture_shared_mutable_frame() {
        let output =
            run("fun make(n){ fun inner(){ print n; } return inner; } var f = make(42); f(); f();").unwrap();
        assert_eq!(output, "42\n42\n");
    }

    #[test]
    fn single_inheritance_dispatches_to_parent_method() {
        let output =
            run("class A { greet(){ return \"hi\"; } } class B < A {} print B().greet();").unwrap();
        assert_eq!(output, "hi\n");
    }

    #[test]
    fn initializer_sets_fields_on_the_constructed_instance() {
        let output = run("class C { init(x){ this.x = x; } } var c = C(7); print c.x;").unwrap();
        assert_eq!(output, "7\n");
    }

    #[test]
    fn subtracting_a_string_from_a_number_is_a_runtime_error() {
        let err = run("\"a\" - 1;").unwrap_err();
        assert_eq!(err.message, "Operands must be numbers.");
    }

    #[test]
    fn logical_operators_short_circuit_on_value_not_boolean() {
        assert_eq!(run("print nil or \"default\";").unwrap(), "default\n");
        assert_eq!(run("print 0 and 99;").unwrap(), "99\n");
    }

    #[test]
    fn super_call_chains_into_subclass_method() {
        let output = run(
            "class A{ f(){ return \"A\"; } } class B<A{ f(){ return super.f() + \"B\"; } } print B().f();",
        )
        .unwrap();
        assert_eq!(output, "AB\n");
    }

    #[test]
    fn shared_closure_frame_is_mutated_across_calls() {
        let output = run("var x = 0; fun inc(){ x = x + 1; } inc(); inc(); print x;").unwrap();
        assert_eq!(output, "2\n");
    }

    #[test]
    fn block_scope_shadows_without_mutating_outer_binding() {
        let output = run("var x = \"outer\"; { var x = \"inner\"; print x; } print x;").unwrap();
        assert_eq!(output, "inner\nouter\n");
    }

    #[test]
    fn calling_a_non_callable_value_is_a_runtime_error() {
        let err = run("var x = 1; x();").unwrap_err();
        assert_eq!(err.message, "Can only call functions and classes.");
    }

    #[test]
    fn wrong_arity_is_a_runtime_error() {
        let err = run("fun f(a, b) { return a + b; } f(1);").unwrap_err();
        assert_eq!(err.message, "Expected 2 arguments but got 1.");
    }

    #[test]
    fn field_read_on_non_instance_is_a_runtime_error() {
        let err = run("var x = 1; print x.y;").unwrap_err();
        assert_eq!(err.message, "Only instances have properties.");
    }

    #[test]
    fn undefined_global_read_is_a_runtime_error() {
        let err = run("print undeclared;").unwrap_err();
        assert_eq!(err.message, "Undefined variable 'undeclared'.");
    }

    #[test]
    fn a_runtime_error_stops_subsequent_statements() {
        let output_err = run("print 1; \"a\" - 1; print 2;");
        assert!(output_err.is_err());
    }
}
