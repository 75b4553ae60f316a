// ABOUTME: Parenthesized AST printer used by the parse subcommand

use crate::ast::{Expr, LitValue};

/// Parenthesized single-expression printer for `parse` mode (§6),
/// grounded on `original_source/ast/printer.go`'s `parenthesize` helper.
pub fn print(expr: &Expr) -> String {
    match expr {
        Expr::Literal { value, .. } => match value {
            LitValue::Nil => "nil".to_string(),
            LitValue::Bool(b) => b.to_string(),
            LitValue::Number(n) => n.to_string(),
            LitValue::Str(s) => s.clone(),
        },
        Expr::Grouping { expression, .. } => parenthesize("group", &[expression]),
        Expr::Unary { operator, right, .. } => parenthesize(&operator.lexeme, &[right]),
        Expr::Binary { left, operator, right, .. } => {
            parenthesize(&operator.lexeme, &[left, right])
        }
        Expr::Logical { left, operator, right, .. } => {
            parenthesize(&operator.lexeme, &[left, right])
        }
        Expr::Variable { name, .. } => name.lexeme.clone(),
        Expr::Assign { name, value, .. } => parenthesize(&format!("= {}", name.lexeme), &[value]),
        Expr::Call { callee, arguments, .. } => {
            let mut exprs = vec![callee.as_ref()];
            exprs.extend(arguments.iter());
            parenthesize("call", &exprs)
        }
        Expr::Get { object, name, .. } => parenthesize(&format!(". {}", name.lexeme), &[object]),
        Expr::Set { object, name, value, .. } => {
            parenthesize(&format!("= {}", name.lexeme), &[object, value])
        }
        Expr::This { .. } => "this".to_string(),
        Expr::Super { method, .. } => format!("(super.{})", method.lexeme),
    }
}

fn parenthesize(name: &str, exprs: &[&Expr]) -> String {
    let mut out = String::from("(");
    out.push_str(name);
    for expr in exprs {
        out.push(' ');
        out.push_str(&print(expr));
    }
    out.push(')');
    out
}
