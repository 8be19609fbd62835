//! Tokenizer for the NASM-like source syntax (`section .text`/`.data`,
//! `label:`, `db`/`dd`/`qword`, `r0`..`r31`, `[expr]`, `'str'`, `;` comments).
//!
//! Shaped after a classic char-at-a-time lexer: a `Lexer` wraps a `Chars`
//! iterator with one token of lookahead, tracks the current line number for
//! error messages, and exposes `eat_while`-style helpers to the few callers
//! that need them (mainly string literals).

use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Number(i64),
    Str(String),
    Comma,
    Colon,
    LBracket,
    RBracket,
    Newline,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { chars: input.chars().peekable(), line: 1 }
    }

    fn first(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        self.chars.next()
    }

    fn eat_while(&mut self, mut pred: impl FnMut(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.first() {
            if !pred(c) {
                break;
            }
            out.push(c);
            self.bump();
        }
        out
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.first() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn read_string(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.bump() {
            match c {
                '\'' => break,
                '\\' => {
                    if let Some(escaped) = self.bump() {
                        out.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            other => other,
                        });
                    }
                }
                other => out.push(other),
            }
        }
        out
    }

    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let c = match self.first() {
                Some(c) => c,
                None => break,
            };
            match c {
                '\n' => {
                    self.bump();
                    tokens.push(Token { kind: TokenKind::Newline, line: self.line });
                    self.line += 1;
                }
                c if c.is_whitespace() => {
                    self.bump();
                }
                ';' => self.skip_line_comment(),
                ',' => {
                    self.bump();
                    tokens.push(Token { kind: TokenKind::Comma, line: self.line });
                }
                ':' => {
                    self.bump();
                    tokens.push(Token { kind: TokenKind::Colon, line: self.line });
                }
                '[' => {
                    self.bump();
                    tokens.push(Token { kind: TokenKind::LBracket, line: self.line });
                }
                ']' => {
                    self.bump();
                    tokens.push(Token { kind: TokenKind::RBracket, line: self.line });
                }
                '\'' => {
                    self.bump();
                    let s = self.read_string();
                    tokens.push(Token { kind: TokenKind::Str(s), line: self.line });
                }
                c if c.is_ascii_digit() || (c == '-' && self.is_negative_number()) => {
                    let neg = c == '-';
                    if neg {
                        self.bump();
                    }
                    let digits = self.eat_while(|c| c.is_ascii_digit());
                    let magnitude: i64 = digits.parse().unwrap_or(0);
                    let value = if neg { -magnitude } else { magnitude };
                    tokens.push(Token { kind: TokenKind::Number(value), line: self.line });
                }
                c if is_ident_start(c) => {
                    let ident = self.eat_while(is_ident_continue);
                    tokens.push(Token { kind: TokenKind::Ident(ident), line: self.line });
                }
                _ => {
                    // An unrecognized character is folded into an identifier
                    // token so the line-classifier can flag the whole line as
                    // `Unknown` rather than the lexer silently losing text.
                    self.bump();
                }
            }
        }
        tokens
    }

    fn is_negative_number(&mut self) -> bool {
        let mut clone = self.chars.clone();
        matches!(clone.next(), Some(c) if c.is_ascii_digit())
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '.'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn section_and_label() {
        let tokens = Lexer::new("section .data\nmsg:").tokenize();
        assert_eq!(
            tokens
                .iter()
                .map(|t| t.kind.clone())
                .collect::<Vec<_>>(),
            vec![
                TokenKind::Ident("section".into()),
                TokenKind::Ident(".data".into()),
                TokenKind::Newline,
                TokenKind::Ident("msg".into()),
                TokenKind::Colon,
            ]
        );
    }

    #[test]
    fn string_with_escape() {
        let tokens = Lexer::new("db 'hi',0").tokenize();
        assert_eq!(tokens[2].kind, TokenKind::Str("hi".into()));
        assert_eq!(tokens[4].kind, TokenKind::Number(0));
    }

    #[test]
    fn negative_number_in_instruction() {
        let tokens = Lexer::new("mov r0, -1").tokenize();
        assert_eq!(tokens[3].kind, TokenKind::Number(-1));
    }

    #[test]
    fn comment_is_dropped() {
        let tokens = Lexer::new("nop ; does nothing\nhlt").tokenize();
        let idents: Vec<_> = tokens
            .iter()
            .filter_map(|t| match &t.kind {
                TokenKind::Ident(s) => Some(s.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(idents, vec!["nop", "hlt"]);
    }
}
