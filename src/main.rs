// ABOUTME: CLI entry point dispatching the tokenize/parse/evaluate/run subcommands

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};

use rlox::error::{LexError, ParseError, ResolveError};
use rlox::eval::Interpreter;
use rlox::lexer::Lexer;
use rlox::parser::Parser as LoxParser;
use rlox::printer;
use rlox::resolver::Resolver;

/// A tree-walking interpreter for a small dynamically-typed scripting
/// language
#[derive(Parser, Debug)]
#[command(name = "rlox")]
#[command(version)]
#[command(about = "A tree-walking interpreter for a small dynamically-typed scripting language")]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Print every token the lexer produces, one per line
    Tokenize { file: Option<PathBuf> },
    /// Parse a single expression and print its parenthesized form
    Parse { file: Option<PathBuf> },
    /// Parse and evaluate a single expression, printing its value
    Evaluate { file: Option<PathBuf> },
    /// Run a full program, or start a REPL if no file is given
    Run { file: Option<PathBuf> },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.mode {
        Mode::Tokenize { file } => tokenize(source_for(file)),
        Mode::Parse { file } => parse_mode(source_for(file)),
        Mode::Evaluate { file } => evaluate_mode(source_for(file)),
        Mode::Run { file } => match file {
            Some(path) => run_file(&path),
            None => repl(),
        },
    }
}

/// Reads a whole file, or a single line from stdin when no file is
/// given (the diagnostic subcommands only ever process one line
/// interactively).
fn source_for(file: Option<PathBuf>) -> String {
    match file {
        Some(path) => std::fs::read_to_string(&path).unwrap_or_else(|e| {
            eprintln!("Cannot read file {}: {e}", path.display());
            std::process::exit(1);
        }),
        None => {
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line).ok();
            line
        }
    }
}

fn tokenize(source: String) -> ExitCode {
    let (tokens, errors) = Lexer::new(&source).scan();
    for token in &tokens {
        println!("{token}");
    }
    print_lex_errors(&errors);
    if errors.is_empty() {
        ExitCode::from(0)
    } else {
        ExitCode::from(65)
    }
}

fn parse_mode(source: String) -> ExitCode {
    let (tokens, lex_errors) = Lexer::new(&source).scan();
    if !lex_errors.is_empty() {
        print_lex_errors(&lex_errors);
        return ExitCode::from(65);
    }

    let (expr, parse_errors) = LoxParser::new(tokens).parse_expression();
    if !parse_errors.is_empty() {
        print_parse_errors(&parse_errors);
        return ExitCode::from(65);
    }

    if let Some(expr) = expr {
        println!("{}", printer::print(&expr));
    }
    ExitCode::from(0)
}

fn evaluate_mode(source: String) -> ExitCode {
    let (tokens, lex_errors) = Lexer::new(&source).scan();
    if !lex_errors.is_empty() {
        print_lex_errors(&lex_errors);
        return ExitCode::from(65);
    }

    let (expr, parse_errors) = LoxParser::new(tokens).parse_expression();
    if !parse_errors.is_empty() {
        print_parse_errors(&parse_errors);
        return ExitCode::from(65);
    }

    let Some(expr) = expr else {
        return ExitCode::from(0);
    };

    let mut interpreter = Interpreter::new(Default::default());
    match interpreter.evaluate_expr(&expr) {
        Ok(value) => {
            println!("{value}");
            ExitCode::from(0)
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(70)
        }
    }
}

fn run_file(path: &PathBuf) -> ExitCode {
    let source = std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Cannot read file {}: {e}", path.display());
        std::process::exit(1);
    });
    run_source(&source, &mut Interpreter::new(Default::default()))
}

/// Runs a full program through lex, parse, resolve and evaluate,
/// short-circuiting before evaluation once any earlier phase recorded
/// an error (§6).
fn run_source(source: &str, interpreter: &mut Interpreter) -> ExitCode {
    let (tokens, lex_errors) = Lexer::new(source).scan();
    let (statements, parse_errors) = LoxParser::new(tokens).parse_program();

    if !lex_errors.is_empty() || !parse_errors.is_empty() {
        print_lex_errors(&lex_errors);
        print_parse_errors(&parse_errors);
        return ExitCode::from(65);
    }

    let (locals, resolve_errors) = Resolver::new().resolve(&statements);
    if !resolve_errors.is_empty() {
        print_resolve_errors(&resolve_errors);
        return ExitCode::from(65);
    }

    interpreter.load_locals(locals);
    match interpreter.interpret(&statements) {
        Ok(()) => ExitCode::from(0),
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(70)
        }
    }
}

/// Interactive prompt persisting one interpreter (and its `globals`
/// frame) across lines. `Ctrl-C` cancels the current line; `Ctrl-D`
/// exits cleanly.
fn repl() -> ExitCode {
    let config = Config::builder().auto_add_history(true).build();
    let mut rl = match DefaultEditor::with_config(config) {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Failed to initialize REPL: {e}");
            return ExitCode::from(1);
        }
    };

    let history_file = ".rlox_history";
    let _ = rl.load_history(history_file);

    let mut interpreter = Interpreter::new(Default::default());

    loop {
        match rl.readline("rlox> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                run_source(&line, &mut interpreter);
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                break;
            }
            Err(err) => {
                eprintln!("Error: {err}");
                break;
            }
        }
    }

    let _ = rl.save_history(history_file);
    ExitCode::from(0)
}

fn print_lex_errors(errors: &[LexError]) {
    for err in errors {
        eprintln!("{err}");
    }
}

fn print_parse_errors(errors: &[ParseError]) {
    for err in errors {
        eprintln!("{err}");
    }
}

fn print_resolve_errors(errors: &[ResolveError]) {
    for err in errors {
        eprintln!("{err}");
    }
}
