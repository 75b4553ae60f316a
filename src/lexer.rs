// ABOUTME: Lexer scanning source text into a token stream

use crate::error::LexError;
use crate::token::{Literal, Token, TokenType};

/// Scans source text into a token stream, accumulating errors rather
/// than aborting on the first bad character.
pub struct Lexer<'a> {
    source: &'a [u8],
    start: usize,
    current: usize,
    line: usize,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source: source.as_bytes(),
            start: 0,
            current: 0,
            line: 1,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn scan(mut self) -> (Vec<Token>, Vec<LexError>) {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }
        self.tokens
            .push(Token::new(TokenType::Eof, String::new(), None, self.line));
        (self.tokens, self.errors)
    }

    fn scan_token(&mut self) {
        let ch = self.advance();
        match ch {
            b'(' => self.add_token(TokenType::LeftParen),
            b')' => self.add_token(TokenType::RightParen),
            b'{' => self.add_token(TokenType::LeftBrace),
            b'}' => self.add_token(TokenType::RightBrace),
            b',' => self.add_token(TokenType::Comma),
            b'.' => self.add_token(TokenType::Dot),
            b'-' => self.add_token(TokenType::Minus),
            b'+' => self.add_token(TokenType::Plus),
            b';' => self.add_token(TokenType::Semicolon),
            b'*' => self.add_token(TokenType::Star),
            b'!' => {
                let kind = if self.match_char(b'=') {
                    TokenType::BangEqual
                } else {
                    TokenType::Bang
                };
                self.add_token(kind);
            }
            b'=' => {
                let kind = if self.match_char(b'=') {
                    TokenType::EqualEqual
                } else {
                    TokenType::Equal
                };
                self.add_token(kind);
            }
            b'<' => {
                let kind = if self.match_char(b'=') {
                    TokenType::LessEqual
                } else {
                    TokenType::Less
                };
                self.add_token(kind);
            }
            b'>' => {
                let kind = if self.match_char(b'=') {
                    TokenType::GreaterEqual
                } else {
                    TokenType::Greater
                };
                self.add_token(kind);
            }
            b'/' => {
                if self.match_char(b'/') {
                    while self.peek() != b'\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenType::Slash);
                }
            }
            b' ' | b'\r' | b'\t' => {}
            b'\n' => self.line += 1,
            b'"' => self.lex_string(),
            c if c.is_ascii_digit() => self.lex_number(),
            c if is_identifier_start(c) => self.lex_identifier(),
            c => self.errors.push(LexError {
                line: self.line,
                message: format!("Unexpected character: {}", c as char),
            }),
        }
    }

    fn lex_string(&mut self) {
        while self.peek() != b'"' && !self.is_at_end() {
            if self.peek() == b'\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            self.errors.push(LexError {
                line: self.line,
                message: "Unterminated string.".to_string(),
            });
            return;
        }

        // closing quote
        self.advance();
        let value = self.slice(self.start + 1, self.current - 1).to_string();
        self.add_token_with_literal(TokenType::String, Some(Literal::Str(value)));
    }

    fn lex_number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text = self.slice(self.start, self.current);
        let value: f64 = text.parse().expect("lexer only admits digit/dot runs");
        self.add_token_with_literal(TokenType::Number, Some(Literal::Number(value)));
    }

    fn lex_identifier(&mut self) {
        while is_identifier_part(self.peek()) {
            self.advance();
        }
        let text = self.slice(self.start, self.current);
        let kind = TokenType::keyword(text).unwrap_or(TokenType::Identifier);
        self.add_token(kind);
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> u8 {
        let ch = self.source[self.current];
        self.current += 1;
        ch
    }

    fn match_char(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.source[self.current]
        }
    }

    fn peek_next(&self) -> u8 {
        if self.current + 1 >= self.source.len() {
            0
        } else {
            self.source[self.current + 1]
        }
    }

    fn slice(&self, start: usize, end: usize) -> &str {
        std::str::from_utf8(&self.source[start..end]).unwrap_or("")
    }

    fn add_token(&mut self, kind: TokenType) {
        self.add_token_with_literal(kind, None);
    }

    fn add_token_with_literal(&mut self, kind: TokenType, literal: Option<Literal>) {
        let text = self.slice(self.start, self.current).to_string();
        self.tokens.push(Token::new(kind, text, literal, self.line));
    }
}

fn is_identifier_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_identifier_part(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &str) -> (Vec<Token>, Vec<LexError>) {
        Lexer::new(source).scan()
    }

    #[test]
    fn punctuation_and_operators() {
        let (tokens, errors) = scan("(){},.-+;*!= == <= >=");
        assert!(errors.is_empty());
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        use TokenType::*;
        assert_eq!(
            kinds,
            vec![
                LeftParen, RightParen, LeftBrace, RightBrace, Comma, Dot, Minus, Plus,
                Semicolon, Star, BangEqual, EqualEqual, LessEqual, GreaterEqual, Eof
            ]
        );
    }

    #[test]
    fn trailing_dot_without_digit_does_not_consume_dot() {
        let (tokens, _) = scan("42.");
        assert_eq!(tokens[0].kind, TokenType::Number);
        assert_eq!(tokens[0].lexeme, "42");
        assert_eq!(tokens[1].kind, TokenType::Dot);
    }

    #[test]
    fn number_with_fraction() {
        let (tokens, _) = scan("3.14");
        assert_eq!(tokens[0].literal, Some(Literal::Number(3.14)));
    }

    #[test]
    fn unterminated_string_is_reported() {
        let (_, errors) = scan("\"abc");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Unterminated string.");
    }

    #[test]
    fn unknown_character_is_reported_and_scanning_continues() {
        let (tokens, errors) = scan("@ 1");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.starts_with("Unexpected character:"));
        assert_eq!(tokens[0].kind, TokenType::Number);
    }

    #[test]
    fn keywords_and_identifiers() {
        let (tokens, _) = scan("var class foo");
        assert_eq!(tokens[0].kind, TokenType::Var);
        assert_eq!(tokens[1].kind, TokenType::Class);
        assert_eq!(tokens[2].kind, TokenType::Identifier);
    }

    #[test]
    fn line_counter_tracks_newlines_including_inside_strings() {
        let (tokens, _) = scan("\"a\nb\"\nfoo");
        let foo = tokens.iter().find(|t| t.kind == TokenType::Identifier).unwrap();
        assert_eq!(foo.line, 3);
    }

    #[test]
    fn round_trip_lexemes_cover_every_non_whitespace_run() {
        let source = "var x = 1; // comment\nprint x;";
        let (tokens, _) = scan(source);
        let joined: String = tokens
            .iter()
            .filter(|t| t.kind != TokenType::Eof)
            .map(|t| t.lexeme.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(joined, "var x = 1 ; print x ;");
    }
}
