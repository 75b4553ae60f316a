// ABOUTME: Static resolver assigning lexical scope depths to variable references

use std::collections::HashMap;

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::error::ResolveError;
use crate::token::Token;

#[derive(Clone, Copy, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// A single pre-evaluation pass over the statement list whose only
/// side effect is populating `locals: ExprId -> depth` (§4.3). The
/// scope stack mirrors the Go original's `[]map[string]bool` exactly;
/// an index-vec rib tree (as `faxc-sem::ScopeTree` uses for module
/// resolution) solves a different problem and doesn't fit this
/// distance-from-here lookup.
pub struct Resolver {
    scopes: Vec<HashMap<String, bool>>,
    locals: HashMap<ExprId, usize>,
    errors: Vec<ResolveError>,
    current_function: FunctionType,
    current_class: ClassType,
}

impl Resolver {
    pub fn new() -> Self {
        Resolver {
            scopes: Vec::new(),
            locals: HashMap::new(),
            errors: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    pub fn resolve(mut self, statements: &[Stmt]) -> (HashMap<ExprId, usize>, Vec<ResolveError>) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
        (self.locals, self.errors)
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.lexeme) {
                self.errors.push(ResolveError::at(
                    name,
                    "Already a variable with this name in this scope.",
                ));
            }
            scope.insert(name.lexeme.clone(), false);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    fn resolve_local(&mut self, id: ExprId, name: &str) {
        for (i, scope) in self.scopes.iter().enumerate().rev() {
            if scope.contains_key(name) {
                self.locals.insert(id, self.scopes.len() - 1 - i);
                return;
            }
        }
        // absent from every scope: a global, no error at resolve time
    }

    fn resolve_function(&mut self, decl: &FunctionDecl, ftype: FunctionType) {
        let enclosing_function = self.current_function;
        self.current_function = ftype;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        for stmt in &decl.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.current_function = enclosing_function;
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(expr) => self.resolve_expr(expr),
            Stmt::Print(expr) => self.resolve_expr(expr),
            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(init) = initializer {
                    self.resolve_expr(init);
                }
                self.define(name);
            }
            Stmt::Block(statements) => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
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
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_function(decl, FunctionType::Function);
            }
            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.errors
                        .push(ResolveError::at(keyword, "Can't return from top-level code."));
                }
                if let Some(value) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.errors.push(ResolveError::at(
                            keyword,
                            "Can't return a value from an initializer.",
                        ));
                    }
                    self.resolve_expr(value);
                }
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let enclosing_class = self.current_class;
                self.current_class = ClassType::Class;

                self.declare(name);
                self.define(name);

                if let Some(Expr::Variable { name: super_name, .. }) = superclass {
                    if super_name.lexeme == name.lexeme {
                        self.errors.push(ResolveError::at(
                            super_name,
                            "A class can't inherit from itself.",
                        ));
                    }
                    self.current_class = ClassType::Subclass;
                    self.resolve_expr(superclass.as_ref().unwrap());
                }

                if superclass.is_some() {
                    self.begin_scope();
                    self.scopes.last_mut().unwrap().insert("super".to_string(), true);
                }

                self.begin_scope();
                self.scopes.last_mut().unwrap().insert("this".to_string(), true);

                for method in methods {
                    let ftype = if method.name.lexeme == "init" {
                        FunctionType::Initializer
                    } else {
                        FunctionType::Method
                    };
                    self.resolve_function(method, ftype);
                }

                self.end_scope();

                if superclass.is_some() {
                    self.end_scope();
                }

                self.current_class = enclosing_class;
            }
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal { .. } => {}
            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.errors.push(ResolveError::at(
                            name,
                            "Can't read local variable in its own initializer.",
                        ));
                    }
                }
                self.resolve_local(*id, &name.lexeme);
            }
            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, &name.lexeme);
            }
            Expr::Unary { right, .. } => self.resolve_expr(right),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Grouping { expression, .. } => self.resolve_expr(expression),
            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }
            Expr::Get { object, .. } => self.resolve_expr(object),
            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }
            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.errors
                        .push(ResolveError::at(keyword, "Can't use 'this' outside of a class."));
                    return;
                }
                self.resolve_local(*id, &keyword.lexeme);
            }
            Expr::Super { id, keyword, .. } => {
                if self.current_class == ClassType::None {
                    self.errors.push(ResolveError::at(
                        keyword,
                        "Can't use 'super' outside of a class.",
                    ));
                    return;
                }
                if self.current_class != ClassType::Subclass {
                    self.errors.push(ResolveError::at(
                        keyword,
                        "Can't use 'super' in a class with no superclass.",
                    ));
                    return;
                }
                self.resolve_local(*id, &keyword.lexeme);
            }
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Resolver::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn resolve_source(source: &str) -> (HashMap<ExprId, usize>, Vec<ResolveError>) {
        let (tokens, _) = Lexer::new(source).scan();
        let (stmts, _) = Parser::new(tokens).parse_program();
        Resolver::new().resolve(&stmts)
    }

    #[test]
    fn reading_local_in_its_own_initializer_is_an_error() {
        let (_, errors) = resolve_source("var a = 1; { var a = a; }");
        assert!(errors
            .iter()
            .any(|e| e.message.contains("Can't read local variable in its own initializer.")));
    }

    #[test]
    fn return_at_top_level_is_an_error() {
        let (_, errors) = resolve_source("return 1;");
        assert!(errors
            .iter()
            .any(|e| e.message.contains("Can't return from top-level code.")));
    }

    #[test]
    fn duplicate_local_declaration_is_an_error() {
        let (_, errors) = resolve_source("{ var a = 1; var a = 2; }");
        assert!(errors
            .iter()
            .any(|e| e.message.contains("Already a variable with this name in this scope.")));
    }

    #[test]
    fn this_outside_class_is_an_error() {
        let (_, errors) = resolve_source("print this;");
        assert!(errors
            .iter()
            .any(|e| e.message.contains("Can't use 'this' outside of a class.")));
    }

    #[test]
    fn class_inheriting_itself_is_an_error() {
        let (_, errors) = resolve_source("class A < A {}");
        assert!(errors
            .iter()
            .any(|e| e.message.contains("A class can't inherit from itself.")));
    }

    #[test]
    fn nested_function_parameter_resolves_one_frame_up() {
        let (locals, errors) =
            resolve_source("fun make(n){ fun inner(){ print n; } return inner; }");
        assert!(errors.is_empty());
        assert!(locals.values().any(|&d| d == 1));
    }
}
