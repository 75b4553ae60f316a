// ABOUTME: Recursive-descent parser building the AST from tokens

use std::rc::Rc;

use crate::ast::{Expr, ExprId, FunctionDecl, LitValue, Stmt};
use crate::error::ParseError;
use crate::token::{Literal, Token, TokenType};

/// Recursive-descent parser over the grammar in spec §4.2. One rule
/// per precedence level, grounded on `original_source/parser/parser.go`'s
/// primitives (`peek`/`previous`/`advance`/`check`/`match`/`consume`);
/// the statement/class/call layer that Go snapshot predates is built
/// directly from the grammar.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    errors: Vec<ParseError>,
}

type PResult<T> = Result<T, ParseError>;

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            current: 0,
            errors: Vec::new(),
        }
    }

    /// `program -> declaration* EOF`. `synchronize` runs after every
    /// caught parse error so the parser accumulates every diagnostic
    /// in one pass instead of stopping at the first (spec §9 open
    /// question, resolved in DESIGN.md).
    pub fn parse_program(mut self) -> (Vec<Stmt>, Vec<ParseError>) {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }
        (statements, self.errors)
    }

    /// Parses a single expression for the `parse`/`evaluate` CLI modes
    /// (§6), which operate on one expression rather than a full
    /// program.
    pub fn parse_expression(mut self) -> (Option<Expr>, Vec<ParseError>) {
        match self.expression() {
            Ok(expr) => (Some(expr), self.errors),
            Err(err) => {
                self.errors.push(err);
                (None, self.errors)
            }
        }
    }

    // ---- declarations ----

    fn declaration(&mut self) -> PResult<Stmt> {
        if self.match_any(&[TokenType::Class]) {
            return self.class_declaration();
        }
        if self.match_any(&[TokenType::Fun]) {
            return Ok(Stmt::Function(self.function_decl("function")?));
        }
        if self.match_any(&[TokenType::Var]) {
            return self.var_declaration();
        }
        self.statement()
    }

    fn class_declaration(&mut self) -> PResult<Stmt> {
        let name = self.consume(TokenType::Identifier, "Expect class name.")?;

        let superclass = if self.match_any(&[TokenType::Less]) {
            let super_name = self.consume(TokenType::Identifier, "Expect superclass name.")?;
            Some(Expr::Variable {
                id: ExprId::next(),
                name: super_name,
            })
        } else {
            None
        };

        self.consume(TokenType::LeftBrace, "Expect '{' before class body.")?;
        let mut methods = Vec::new();
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            methods.push(self.function_decl("method")?);
        }
        self.consume(TokenType::RightBrace, "Expect '}' after class body.")?;

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    fn function_decl(&mut self, kind: &str) -> PResult<Rc<FunctionDecl>> {
        let name = self.consume(TokenType::Identifier, &format!("Expect {kind} name."))?;
        self.consume(TokenType::LeftParen, &format!("Expect '(' after {kind} name."))?;
        let mut params = Vec::new();
        if !self.check(TokenType::RightParen) {
            loop {
                if params.len() >= 255 {
                    self.errors.push(ParseError::at(
                        self.peek(),
                        "Can't have more than 255 parameters.",
                    ));
                }
                params.push(self.consume(TokenType::Identifier, "Expect parameter name.")?);
                if !self.match_any(&[TokenType::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expect ')' after parameters.")?;
        self.consume(
            TokenType::LeftBrace,
            &format!("Expect '{{' before {kind} body."),
        )?;
        let body = self.block()?;
        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    fn var_declaration(&mut self) -> PResult<Stmt> {
        let name = self.consume(TokenType::Identifier, "Expect variable name.")?;
        let initializer = if self.match_any(&[TokenType::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::Semicolon, "Expect ';' after variable declaration.")?;
        Ok(Stmt::Var { name, initializer })
    }

    // ---- statements ----

    fn statement(&mut self) -> PResult<Stmt> {
        if self.match_any(&[TokenType::For]) {
            return self.for_statement();
        }
        if self.match_any(&[TokenType::If]) {
            return self.if_statement();
        }
        if self.match_any(&[TokenType::Print]) {
            return self.print_statement();
        }
        if self.match_any(&[TokenType::Return]) {
            return self.return_statement();
        }
        if self.match_any(&[TokenType::While]) {
            return self.while_statement();
        }
        if self.match_any(&[TokenType::LeftBrace]) {
            return Ok(Stmt::Block(self.block()?));
        }
        self.expression_statement()
    }

    fn block(&mut self) -> PResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }
        self.consume(TokenType::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    /// Desugars `for (init; cond; inc) body` into
    /// `{ init; while (cond) { body; inc; } }` (§4.2), the only
    /// grammar rule that desugars.
    fn for_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_any(&[TokenType::Semicolon]) {
            None
        } else if self.match_any(&[TokenType::Var]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(TokenType::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if !self.check(TokenType::RightParen) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        let condition = condition.unwrap_or(Expr::Literal {
            id: ExprId::next(),
            value: LitValue::Bool(true),
        });
        body = Stmt::While {
            condition,
            body: Box::new(body),
        };

        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }

        Ok(body)
    }

    fn if_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after if condition.")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_any(&[TokenType::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn print_statement(&mut self) -> PResult<Stmt> {
        let value = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after value.")?;
        Ok(Stmt::Print(value))
    }

    fn return_statement(&mut self) -> PResult<Stmt> {
        let keyword = self.previous().clone();
        let value = if !self.check(TokenType::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::Semicolon, "Expect ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn while_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after condition.")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body })
    }

    fn expression_statement(&mut self) -> PResult<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    // ---- expressions, low to high precedence ----

    fn expression(&mut self) -> PResult<Expr> {
        self.assignment()
    }

    /// `assignment -> (call ".")? IDENT "=" assignment | logic_or`.
    /// Parses the left side as a normal expression first, then
    /// rewrites it if `=` follows (`Variable`->`Assign`, `Get`->`Set`);
    /// any other left side is an "Invalid assignment target." error
    /// that does not abort parsing (§4.2).
    fn assignment(&mut self) -> PResult<Expr> {
        let expr = self.or_expr()?;

        if self.match_any(&[TokenType::Equal]) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            return match expr {
                Expr::Variable { name, .. } => Ok(Expr::Assign {
                    id: ExprId::next(),
                    name,
                    value: Box::new(value),
                }),
                Expr::Get { object, name, .. } => Ok(Expr::Set {
                    id: ExprId::next(),
                    object,
                    name,
                    value: Box::new(value),
                }),
                other => {
                    self.errors
                        .push(ParseError::at(&equals, "Invalid assignment target."));
                    Ok(other)
                }
            };
        }

        Ok(expr)
    }

    fn or_expr(&mut self) -> PResult<Expr> {
        let mut expr = self.and_expr()?;
        while self.match_any(&[TokenType::Or]) {
            let operator = self.previous().clone();
            let right = self.and_expr()?;
            expr = Expr::Logical {
                id: ExprId::next(),
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn and_expr(&mut self) -> PResult<Expr> {
        let mut expr = self.equality()?;
        while self.match_any(&[TokenType::And]) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical {
                id: ExprId::next(),
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn equality(&mut self) -> PResult<Expr> {
        let mut expr = self.comparison()?;
        while self.match_any(&[TokenType::BangEqual, TokenType::EqualEqual]) {
            let operator = self.previous().clone();
            let right = self.comparison()?;
            expr = self.binary(expr, operator, right);
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> PResult<Expr> {
        let mut expr = self.term()?;
        while self.match_any(&[
            TokenType::Greater,
            TokenType::GreaterEqual,
            TokenType::Less,
            TokenType::LessEqual,
        ]) {
            let operator = self.previous().clone();
            let right = self.term()?;
            expr = self.binary(expr, operator, right);
        }
        Ok(expr)
    }

    fn term(&mut self) -> PResult<Expr> {
        let mut expr = self.factor()?;
        while self.match_any(&[TokenType::Minus, TokenType::Plus]) {
            let operator = self.previous().clone();
            let right = self.factor()?;
            expr = self.binary(expr, operator, right);
        }
        Ok(expr)
    }

    fn factor(&mut self) -> PResult<Expr> {
        let mut expr = self.unary()?;
        while self.match_any(&[TokenType::Slash, TokenType::Star]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            expr = self.binary(expr, operator, right);
        }
        Ok(expr)
    }

    fn binary(&self, left: Expr, operator: Token, right: Expr) -> Expr {
        Expr::Binary {
            id: ExprId::next(),
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    fn unary(&mut self) -> PResult<Expr> {
        if self.match_any(&[TokenType::Bang, TokenType::Minus]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            return Ok(Expr::Unary {
                id: ExprId::next(),
                operator,
                right: Box::new(right),
            });
        }
        self.call()
    }

    fn call(&mut self) -> PResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.match_any(&[TokenType::LeftParen]) {
                expr = self.finish_call(expr)?;
            } else if self.match_any(&[TokenType::Dot]) {
                let name = self.consume(TokenType::Identifier, "Expect property name after '.'.")?;
                expr = Expr::Get {
                    id: ExprId::next(),
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> PResult<Expr> {
        let mut arguments = Vec::new();
        if !self.check(TokenType::RightParen) {
            loop {
                if arguments.len() >= 255 {
                    self.errors.push(ParseError::at(
                        self.peek(),
                        "Can't have more than 255 arguments.",
                    ));
                }
                arguments.push(self.expression()?);
                if !self.match_any(&[TokenType::Comma]) {
                    break;
                }
            }
        }
        let paren = self.consume(TokenType::RightParen, "Expect ')' after arguments.")?;
        Ok(Expr::Call {
            id: ExprId::next(),
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> PResult<Expr> {
        if self.match_any(&[TokenType::False]) {
            return Ok(Expr::Literal {
                id: ExprId::next(),
                value: LitValue::Bool(false),
            });
        }
        if self.match_any(&[TokenType::True]) {
            return Ok(Expr::Literal {
                id: ExprId::next(),
                value: LitValue::Bool(true),
            });
        }
        if self.match_any(&[TokenType::Nil]) {
            return Ok(Expr::Literal {
                id: ExprId::next(),
                value: LitValue::Nil,
            });
        }
        if self.match_any(&[TokenType::Number, TokenType::String]) {
            let token = self.previous().clone();
            let value = match token.literal {
                Some(Literal::Number(n)) => LitValue::Number(n),
                Some(Literal::Str(s)) => LitValue::Str(s),
                None => unreachable!("NUMBER/STRING tokens always carry a literal"),
            };
            return Ok(Expr::Literal {
                id: ExprId::next(),
                value,
            });
        }
        if self.match_any(&[TokenType::Super]) {
            let keyword = self.previous().clone();
            self.consume(TokenType::Dot, "Expect '.' after 'super'.")?;
            let method = self.consume(TokenType::Identifier, "Expect superclass method name.")?;
            return Ok(Expr::Super {
                id: ExprId::next(),
                keyword,
                method,
            });
        }
        if self.match_any(&[TokenType::This]) {
            let keyword = self.previous().clone();
            return Ok(Expr::This {
                id: ExprId::next(),
                keyword,
            });
        }
        if self.match_any(&[TokenType::Identifier]) {
            let name = self.previous().clone();
            return Ok(Expr::Variable {
                id: ExprId::next(),
                name,
            });
        }
        if self.match_any(&[TokenType::LeftParen]) {
            let inner = self.expression()?;
            self.consume(TokenType::RightParen, "Expect ')' after expression.")?;
            return Ok(Expr::Grouping {
                id: ExprId::next(),
                expression: Box::new(inner),
            });
        }

        Err(ParseError::at(self.peek(), "Expect expression."))
    }

    // ---- token-stream primitives ----

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenType::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous().clone()
    }

    fn check(&self, kind: TokenType) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn match_any(&mut self, kinds: &[TokenType]) -> bool {
        for &kind in kinds {
            if self.check(kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn consume(&mut self, kind: TokenType, message: &str) -> PResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::at(self.peek(), message))
        }
    }

    /// Discards tokens until after the next `;` or until the next
    /// token starts a new statement (§4.2).
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().kind == TokenType::Semicolon {
                return;
            }
            match self.peek().kind {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> (Vec<Stmt>, Vec<ParseError>) {
        let (tokens, _) = Lexer::new(source).scan();
        Parser::new(tokens).parse_program()
    }

    #[test]
    fn parses_var_declaration_with_initializer() {
        let (stmts, errors) = parse("var a = 1 + 2;");
        assert!(errors.is_empty());
        assert_eq!(stmts.len(), 1);
        assert!(matches!(stmts[0], Stmt::Var { .. }));
    }

    #[test]
    fn for_loop_desugars_to_block_with_while() {
        let (stmts, errors) = parse("for (var i = 0; i < 3; i = i + 1) print i;");
        assert!(errors.is_empty());
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Stmt::Block(inner) => {
                assert_eq!(inner.len(), 2);
                assert!(matches!(inner[1], Stmt::While { .. }));
            }
            other => panic!("expected desugared block, got {other:?}"),
        }
    }

    #[test]
    fn invalid_assignment_target_is_non_fatal() {
        let (stmts, errors) = parse("1 = 2;");
        assert_eq!(stmts.len(), 1);
        assert!(errors
            .iter()
            .any(|e| e.message.contains("Invalid assignment target.")));
    }

    #[test]
    fn missing_semicolon_reports_error_and_synchronizes_to_next_statement() {
        let (stmts, errors) = parse("print 1 print 2;");
        assert_eq!(errors.len(), 1);
        // the first statement is discarded by synchronize; the second
        // still parses, proving recovery continues past the error.
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn class_with_superclass_parses_methods() {
        let (stmts, errors) =
            parse("class A { greet(){ return \"hi\"; } } class B < A {} print B().greet();");
        assert!(errors.is_empty());
        assert_eq!(stmts.len(), 3);
    }
}
