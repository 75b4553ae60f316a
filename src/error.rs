// ABOUTME: Error types and the return-unwind carrier for lex/parse/resolve/runtime failures

use thiserror::Error;

use crate::token::{Token, TokenType};
use crate::value::Value;

/// Unexpected character or unterminated string. Accumulated by the
/// lexer; scanning continues past each one.
#[derive(Debug, Clone, Error)]
#[error("[line {line}] Error: {message}")]
pub struct LexError {
    pub line: usize,
    pub message: String,
}

/// Unexpected or missing token. Aborts the current grammar rule;
/// `synchronize` resumes parsing at the next declaration boundary.
#[derive(Debug, Clone, Error)]
#[error("[line {line}] Error: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn at(token: &Token, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if token.kind == TokenType::Eof {
            format!("{message} at end")
        } else {
            format!("{message} at '{}'", token.lexeme)
        };
        ParseError {
            line: token.line,
            message,
        }
    }
}

/// A scope-discipline violation caught by the static resolver. Every
/// condition in the resolver's error list (§4.3) is reported this way;
/// resolution continues so one pass can surface every issue.
#[derive(Debug, Clone, Error)]
#[error("[line {line}] Error: {message}")]
pub struct ResolveError {
    pub line: usize,
    pub message: String,
}

impl ResolveError {
    pub fn at(token: &Token, message: impl Into<String>) -> Self {
        ResolveError {
            line: token.line,
            message: message.into(),
        }
    }
}

/// A contract violation caught at evaluation time: unwinds the call
/// stack and terminates the current top-level statement.
#[derive(Debug, Clone, Error)]
#[error("[line {line}] Error: {message}")]
pub struct RuntimeError {
    pub line: usize,
    pub message: String,
}

impl RuntimeError {
    pub fn at(token: &Token, message: impl Into<String>) -> Self {
        RuntimeError {
            line: token.line,
            message: message.into(),
        }
    }
}

/// The carrier a statement's execution result travels in. `Return` is
/// not an error: it is how a function body's `return` statement
/// unwinds to its call site without running intervening statements.
/// Only a call site decodes this back into a plain `Result<Value,
/// RuntimeError>`.
#[derive(Debug)]
pub enum Unwind {
    Return(Value),
    Error(RuntimeError),
}

impl From<RuntimeError> for Unwind {
    fn from(err: RuntimeError) -> Self {
        Unwind::Error(err)
    }
}
