//! Token definitions for the mixalc source language

use std::fmt;

use crate::utils::Span;

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Literal source text (empty for end of input)
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }

    pub fn eof(span: Span) -> Self {
        Self {
            kind: TokenKind::Eof,
            text: String::new(),
            span,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{}: '{}' at {}:{}>",
            self.kind.name(),
            self.text,
            self.span.line,
            self.span.column
        )
    }
}

/// Token kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // ============ Identifiers and Literals ============
    /// Identifier (variable or method name)
    Ident,
    /// Integer literal
    IntLit,
    /// true
    True,
    /// false
    False,

    // ============ Keywords ============
    /// int
    Int,
    /// return
    Return,
    /// if
    If,
    /// else
    Else,
    /// while
    While,
    /// break
    Break,

    // ============ Operators ============
    /// =
    Assign,
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// <
    Lt,
    /// <=
    Le,
    /// >
    Gt,
    /// >=
    Ge,
    /// ==
    EqEq,
    /// !=
    Ne,

    // ============ Delimiters ============
    /// (
    LParen,
    /// )
    RParen,
    /// {
    LBrace,
    /// }
    RBrace,
    /// ,
    Comma,
    /// ;
    Semicolon,

    // ============ Special ============
    /// End of input
    Eof,
}

impl TokenKind {
    /// Try to convert an identifier to a keyword
    pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
        match s {
            "int" => Some(TokenKind::Int),
            "return" => Some(TokenKind::Return),
            "if" => Some(TokenKind::If),
            "else" => Some(TokenKind::Else),
            "while" => Some(TokenKind::While),
            "break" => Some(TokenKind::Break),
            "true" => Some(TokenKind::True),
            "false" => Some(TokenKind::False),
            _ => None,
        }
    }

    /// Upper-case tag used by the token dump
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Ident => "ID",
            TokenKind::IntLit => "NUM",
            TokenKind::True => "TRUE",
            TokenKind::False => "FALSE",
            TokenKind::Int => "INT",
            TokenKind::Return => "RETURN",
            TokenKind::If => "IF",
            TokenKind::Else => "ELSE",
            TokenKind::While => "WHILE",
            TokenKind::Break => "BREAK",
            TokenKind::Assign => "ASSIGN",
            TokenKind::Plus => "PLUS",
            TokenKind::Minus => "MINUS",
            TokenKind::Star => "MULTIPLY",
            TokenKind::Slash => "DIVIDE",
            TokenKind::Lt => "LT",
            TokenKind::Le => "LE",
            TokenKind::Gt => "GT",
            TokenKind::Ge => "GE",
            TokenKind::EqEq => "EQ",
            TokenKind::Ne => "NE",
            TokenKind::LParen => "LPAREN",
            TokenKind::RParen => "RPAREN",
            TokenKind::LBrace => "LBRACE",
            TokenKind::RBrace => "RBRACE",
            TokenKind::Comma => "COMMA",
            TokenKind::Semicolon => "SEMICOLON",
            TokenKind::Eof => "EOF",
        }
    }
}

/// Spelling used in "expected ..." parser messages
impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Ident => "identifier",
            TokenKind::IntLit => "number",
            TokenKind::True => "'true'",
            TokenKind::False => "'false'",
            TokenKind::Int => "'int'",
            TokenKind::Return => "'return'",
            TokenKind::If => "'if'",
            TokenKind::Else => "'else'",
            TokenKind::While => "'while'",
            TokenKind::Break => "'break'",
            TokenKind::Assign => "'='",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Lt => "'<'",
            TokenKind::Le => "'<='",
            TokenKind::Gt => "'>'",
            TokenKind::Ge => "'>='",
            TokenKind::EqEq => "'=='",
            TokenKind::Ne => "'!='",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::Comma => "','",
            TokenKind::Semicolon => "';'",
            TokenKind::Eof => "end of input",
        };
        f.write_str(s)
    }
}
