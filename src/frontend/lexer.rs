//! Lexer for the mixalc source language
//!
//! Converts source code into a stream of tokens, each tagged with its
//! 1-based line and column.

use crate::frontend::token::{Token, TokenKind};
use crate::utils::{Error, Result, Span};

/// The lexer state
pub struct Lexer {
    /// Source code as characters
    source: Vec<char>,
    /// Current position in source
    pos: usize,
    /// Start position of current token
    start: usize,
    /// Current line (1-based)
    line: usize,
    /// Current column (1-based)
    column: usize,
    /// Position of the current token
    start_span: Span,
}

impl Lexer {
    /// Create a new lexer for the given source code
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            start: 0,
            line: 1,
            column: 1,
            start_span: Span::new(1, 1),
        }
    }

    /// Get the current character without advancing
    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    /// Get the next character without advancing
    fn peek_next(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    /// Advance to the next character, keeping line and column in step
    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c == Some('\n') {
            self.line += 1;
            self.column = 1;
        } else if c.is_some() {
            self.column += 1;
        }
        self.pos += 1;
        c
    }

    fn current_span(&self) -> Span {
        Span::new(self.line, self.column)
    }

    /// Source text of the current token
    fn lexeme(&self) -> String {
        self.source[self.start..self.pos].iter().collect()
    }

    /// Create a token spanning from the token start to the current position
    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.lexeme(), self.start_span)
    }

    fn error(&self, message: String) -> Error {
        Error::Lex {
            message,
            span: self.start_span,
        }
    }

    /// Skip whitespace and line comments
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                c if c.is_whitespace() => {
                    self.advance();
                }
                '/' if self.peek_next() == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let kind = TokenKind::keyword_from_str(&self.lexeme()).unwrap_or(TokenKind::Ident);
        self.make_token(kind)
    }

    /// Read an integer literal; leading zeros are rejected
    fn read_number(&mut self) -> Result<Token> {
        if self.peek() == Some('0') && self.peek_next().map_or(false, |c| c.is_ascii_digit()) {
            return Err(self.error(format!(
                "invalid number format at {} (numbers cannot have leading zeros)",
                self.start_span
            )));
        }

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        let text = self.lexeme();
        if text.parse::<i64>().is_err() {
            return Err(self.error(format!(
                "invalid number format '{}' at {} (out of range)",
                text, self.start_span
            )));
        }

        Ok(self.make_token(TokenKind::IntLit))
    }

    /// `kind_eq` if the next character is '=', `kind` otherwise
    fn with_eq(&mut self, kind: TokenKind, kind_eq: TokenKind) -> TokenKind {
        if self.peek() == Some('=') {
            self.advance();
            kind_eq
        } else {
            kind
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();
        self.start = self.pos;
        self.start_span = self.current_span();

        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Token::eof(self.start_span)),
        };

        // Identifiers and keywords
        if c.is_ascii_alphabetic() {
            return Ok(self.read_identifier());
        }

        // Numbers
        if c.is_ascii_digit() {
            return self.read_number();
        }

        self.advance();

        // Operators and punctuation
        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '=' => self.with_eq(TokenKind::Assign, TokenKind::EqEq),
            '<' => self.with_eq(TokenKind::Lt, TokenKind::Le),
            '>' => self.with_eq(TokenKind::Gt, TokenKind::Ge),
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::Ne
                } else {
                    return Err(self.error(format!(
                        "unexpected character '!' at {} (did you mean '!='?)",
                        self.start_span
                    )));
                }
            }
            _ => {
                return Err(self.error(format!(
                    "unexpected character '{}' at {}",
                    c, self.start_span
                )))
            }
        };

        Ok(self.make_token(kind))
    }

    /// Tokenize the entire source; the result always ends with exactly one EOF token
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_tokens() {
        assert_eq!(
            kinds("int main() { }"),
            vec![
                TokenKind::Int,
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("int return if else while break true false"),
            vec![
                TokenKind::Int,
                TokenKind::Return,
                TokenKind::If,
                TokenKind::Else,
                TokenKind::While,
                TokenKind::Break,
                TokenKind::True,
                TokenKind::False,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("= == != < <= > >= + - * /"),
            vec![
                TokenKind::Assign,
                TokenKind::EqEq,
                TokenKind::Ne,
                TokenKind::Lt,
                TokenKind::Le,
                TokenKind::Gt,
                TokenKind::Ge,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_positions_and_text() {
        let tokens = Lexer::new("int x;\n  x = 42; // done\n").tokenize().unwrap();
        assert_eq!(tokens[1].text, "x");
        assert_eq!(tokens[1].span, Span::new(1, 5));
        assert_eq!(tokens[3].text, "x");
        assert_eq!(tokens[3].span, Span::new(2, 3));
        assert_eq!(tokens[5].kind, TokenKind::IntLit);
        assert_eq!(tokens[5].text, "42");
        assert_eq!(tokens[5].span, Span::new(2, 7));
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
        assert_eq!(tokens.iter().filter(|t| t.kind == TokenKind::Eof).count(), 1);
    }

    #[test]
    fn test_minus_is_an_operator() {
        assert_eq!(
            kinds("-5"),
            vec![TokenKind::Minus, TokenKind::IntLit, TokenKind::Eof]
        );
    }

    #[test]
    fn test_zero_is_valid() {
        let tokens = Lexer::new("0").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::IntLit);
        assert_eq!(tokens[0].text, "0");
    }

    #[test]
    fn test_leading_zero_rejected() {
        let err = Lexer::new("int x = 007;").tokenize().unwrap_err();
        assert!(matches!(err, Error::Lex { span, .. } if span == Span::new(1, 9)));
        assert!(err.to_string().contains("leading zeros"));
    }

    #[test]
    fn test_out_of_range_literal_rejected() {
        let err = Lexer::new("99999999999999999999").tokenize().unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_bare_bang_rejected() {
        let err = Lexer::new("x = !y;").tokenize().unwrap_err();
        assert!(err.to_string().contains("did you mean '!='?"));
    }

    #[test]
    fn test_unknown_character() {
        let err = Lexer::new("int x;\nx = 1 % 2;").tokenize().unwrap_err();
        assert_eq!(
            err,
            Error::Lex {
                message: "unexpected character '%' at line 2, column 7".to_string(),
                span: Span::new(2, 7),
            }
        );
    }

    #[test]
    fn test_identifier_cannot_start_with_underscore() {
        assert!(Lexer::new("_x").tokenize().is_err());
        let tokens = Lexer::new("a_1").tokenize().unwrap();
        assert_eq!(tokens[0].text, "a_1");
    }

    #[test]
    fn test_token_display() {
        let tokens = Lexer::new("main").tokenize().unwrap();
        assert_eq!(tokens[0].to_string(), "<ID: 'main' at 1:1>");
    }
}
