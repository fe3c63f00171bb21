//! Error handling for mixalc

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::Span;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Compiler error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // ==================== Lexer Errors ====================

    #[error("lexical error at {span}: {message}")]
    Lex { message: String, span: Span },

    // ==================== Parser Errors ====================

    #[error("syntax error at {span}: expected {expected}, got '{got}'")]
    UnexpectedToken {
        expected: String,
        got: String,
        span: Span,
    },

    // ==================== Semantic Errors ====================

    #[error("{}", render_semantic(.0))]
    Semantic(Vec<SemanticError>),

    // ==================== Code Generation Errors ====================

    #[error("main method not found")]
    MissingMain,

    #[error("symbol table for method '{0}' not found")]
    MissingSymbolTable(String),

    #[error("undefined variable or parameter '{name}' in method '{method}'")]
    UnresolvedSymbol { name: String, method: String },

    #[error("no storage allocated for '{0}'")]
    UnallocatedSlot(String),

    #[error("call to unknown method '{0}'")]
    UnknownMethod(String),

    #[error("break statement outside of loop")]
    BreakOutsideLoop,
}

impl Error {
    /// Get the span associated with this error
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Lex { span, .. } => Some(*span),
            Self::UnexpectedToken { span, .. } => Some(*span),
            Self::Semantic(errors) => errors.iter().find_map(SemanticError::span),
            Self::MissingMain
            | Self::MissingSymbolTable(_)
            | Self::UnresolvedSymbol { .. }
            | Self::UnallocatedSlot(_)
            | Self::UnknownMethod(_)
            | Self::BreakOutsideLoop => None,
        }
    }

    /// The pipeline stage that produced this error
    pub fn stage(&self) -> Stage {
        match self {
            Self::Lex { .. } => Stage::Lexing,
            Self::UnexpectedToken { .. } => Stage::Parsing,
            Self::Semantic(_) => Stage::Semantic,
            Self::MissingMain
            | Self::MissingSymbolTable(_)
            | Self::UnresolvedSymbol { .. }
            | Self::UnallocatedSlot(_)
            | Self::UnknownMethod(_)
            | Self::BreakOutsideLoop => Stage::CodeGen,
        }
    }
}

/// A single type or scope error found by the semantic analyzer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SemanticError {
    #[error("symbol '{name}' already exists in scope '{scope}'")]
    DuplicateSymbol {
        name: String,
        scope: String,
        span: Span,
    },

    #[error("no 'main' method found")]
    MissingMain,

    #[error("undefined identifier '{name}' at {span}")]
    UndefinedIdentifier { name: String, span: Span },

    #[error("undefined variable '{name}' at {span}")]
    UndefinedVariable { name: String, span: Span },

    #[error("undefined method '{name}' at {span}")]
    UndefinedMethod { name: String, span: Span },

    #[error("cannot assign to method '{name}' at {span}")]
    AssignToMethod { name: String, span: Span },

    #[error("method '{method}' called with wrong number of arguments at {span}: expected {expected}, got {got}")]
    ArgCountMismatch {
        method: String,
        expected: usize,
        got: usize,
        span: Span,
    },

    #[error("type mismatch in argument {position} of method '{method}' at {span}: expected {expected}, got {got}")]
    ArgTypeMismatch {
        method: String,
        position: usize,
        expected: String,
        got: String,
        span: Span,
    },

    #[error("type mismatch in {context} at {span}: expected {expected}, got {got}")]
    TypeMismatch {
        context: String,
        expected: String,
        got: String,
        span: Span,
    },

    #[error("break statement outside of loop at {span}")]
    BreakOutsideLoop { span: Span },
}

impl SemanticError {
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::MissingMain => None,
            Self::DuplicateSymbol { span, .. }
            | Self::UndefinedIdentifier { span, .. }
            | Self::UndefinedVariable { span, .. }
            | Self::UndefinedMethod { span, .. }
            | Self::AssignToMethod { span, .. }
            | Self::ArgCountMismatch { span, .. }
            | Self::ArgTypeMismatch { span, .. }
            | Self::TypeMismatch { span, .. }
            | Self::BreakOutsideLoop { span } => Some(*span),
        }
    }
}

fn render_semantic(errors: &[SemanticError]) -> String {
    let mut message = String::from("Semantic errors found:\n");
    for error in errors {
        message.push_str(&format!("- {}\n", error));
    }
    message
}

/// Compilation stage, used when reporting failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Lexing,
    Parsing,
    Semantic,
    CodeGen,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Lexing => "lexical analysis",
            Stage::Parsing => "parsing",
            Stage::Semantic => "semantic analysis",
            Stage::CodeGen => "code generation",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_errors_are_joined() {
        let err = Error::Semantic(vec![
            SemanticError::MissingMain,
            SemanticError::BreakOutsideLoop { span: Span::new(3, 5) },
        ]);
        assert_eq!(
            err.to_string(),
            "Semantic errors found:\n- no 'main' method found\n- break statement outside of loop at line 3, column 5\n"
        );
        assert_eq!(err.span(), Some(Span::new(3, 5)));
        assert_eq!(err.stage(), Stage::Semantic);
    }

    #[test]
    fn test_syntax_error_display() {
        let err = Error::UnexpectedToken {
            expected: "';'".to_string(),
            got: "}".to_string(),
            span: Span::new(1, 22),
        };
        assert_eq!(err.to_string(), "syntax error at line 1, column 22: expected ';', got '}'");
        assert_eq!(err.stage().to_string(), "parsing");
    }
}
