use std::collections::HashMap;

use rlox::eval::{Interpreter, SharedOutput};
use rlox::lexer::Lexer;
use rlox::parser::Parser;
use rlox::resolver::Resolver;

// The REPL's readline loop itself isn't exercised here (no terminal to
// drive); these tests cover the per-line pipeline it calls, the same
// way `main.rs`'s `run_source` does for each line typed at the prompt.

fn feed_lines(lines: &[&str]) -> String {
    let out = SharedOutput::new();
    let mut interpreter = Interpreter::with_writer(HashMap::new(), Box::new(out.clone()));

    for line in lines {
        let (tokens, lex_errors) = Lexer::new(line).scan();
        assert!(lex_errors.is_empty(), "unexpected lex errors on {line:?}: {lex_errors:?}");
        let (statements, parse_errors) = Parser::new(tokens).parse_program();
        assert!(parse_errors.is_empty(), "unexpected parse errors on {line:?}: {parse_errors:?}");
        let (locals, resolve_errors) = Resolver::new().resolve(&statements);
        assert!(resolve_errors.is_empty(), "unexpected resolve errors on {line:?}: {resolve_errors:?}");
        interpreter.load_locals(locals);
        interpreter.interpret(&statements).expect("unexpected runtime error");
    }

    out.contents()
}

#[test]
fn a_variable_defined_on_one_line_is_visible_on_the_next() {
    let output = feed_lines(&["var x = 10;", "print x;"]);
    assert_eq!(output, "10\n");
}

#[test]
fn a_function_defined_on_one_line_closes_over_a_later_assignment() {
    let output = feed_lines(&[
        "var total = 0;",
        "fun add(n) { total = total + n; }",
        "add(3); add(4);",
        "print total;",
    ]);
    assert_eq!(output, "7\n");
}

#[test]
fn a_class_defined_on_one_line_can_be_instantiated_on_the_next() {
    let output = feed_lines(&[
        "class Greeter { greet(name) { return \"hi \" + name; } }",
        "var g = Greeter();",
        "print g.greet(\"there\");",
    ]);
    assert_eq!(output, "hi there\n");
}

#[test]
fn each_line_gets_a_fresh_expression_id_space_with_no_depth_collisions() {
    // Two unrelated lines each close over a local of the same name at
    // the same lexical depth; the global ExprId counter guarantees
    // their resolver-produced depths never collide when merged.
    let output = feed_lines(&[
        "fun first() { var n = 1; return n; }",
        "fun second() { var n = 2; return n; }",
        "print first(); print second();",
    ]);
    assert_eq!(output, "1\n2\n");
}
