//! Abstract Syntax Tree definitions for the mixalc source language

use std::fmt;

use crate::utils::Span;

/// A complete program (compilation unit)
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub methods: Vec<Method>,
}

/// Method definition
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub ret_type: Type,
    pub name: Ident,
    pub params: Vec<Param>,
    pub body: Block,
}

/// Method parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub ty: Type,
    pub name: Ident,
}

/// Code block: declarations are hoisted before the statements
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub decls: Vec<Decl>,
    pub stmts: Vec<Stmt>,
}

impl Block {
    pub fn empty() -> Self {
        Self {
            decls: Vec::new(),
            stmts: Vec::new(),
        }
    }
}

/// `int a, b = expr;`
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub ty: Type,
    pub vars: Vec<VarDecl>,
}

/// A single declared variable with an optional initializer
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: Ident,
    pub init: Option<Expr>,
}

/// Statement
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// name = expr
    Assign {
        target: Ident,
        value: Expr,
        span: Span,
    },
    /// return expr
    Return { value: Expr, span: Span },
    /// if (cond) stmt [else stmt]
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    /// while (cond) stmt
    While { cond: Expr, body: Box<Stmt> },
    /// break
    Break { span: Span },
    /// { decls stmts }
    Block(Block),
}

/// Expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Binary operation
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    /// Unary operation
    Unary {
        op: UnOp,
        expr: Box<Expr>,
        span: Span,
    },
    /// Identifier
    Ident(Ident),
    /// Integer literal
    Number(i64, Span),
    /// true / false
    Bool(bool, Span),
    /// Method call
    Call {
        name: Ident,
        args: Vec<Expr>,
        span: Span,
    },
}

impl Expr {
    /// Position of the expression: its operator, literal or name
    pub fn span(&self) -> Span {
        match self {
            Expr::Binary { span, .. } => *span,
            Expr::Unary { span, .. } => *span,
            Expr::Ident(ident) => ident.span,
            Expr::Number(_, span) => *span,
            Expr::Bool(_, span) => *span,
            Expr::Call { span, .. } => *span,
        }
    }
}

/// Identifier
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    /// Negation (-)
    Neg,
    /// Logical not; the lexer has no bare `!`, so only trees built in
    /// code contain it
    #[allow(dead_code)]
    Not,
}

/// The only type of the language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => f.write_str("int"),
        }
    }
}
