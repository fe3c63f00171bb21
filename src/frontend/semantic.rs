//! Semantic Analysis for the mixalc source language
//!
//! Performs:
//! - Method signature collection (global table, enables forward calls)
//! - Per-method symbol tables with storage offsets
//! - Type checking and `break` placement
//!
//! Every method has exactly one flat table: nested blocks share it, so a
//! name may be declared only once per method regardless of block depth.
//! Errors are collected rather than returned eagerly so that a single run
//! reports all of them.

use std::collections::HashMap;

use log::{debug, trace};

use crate::frontend::ast::*;
use crate::utils::{Error, Result, SemanticError, Span};

// ==================== Symbol Table ====================

/// Kind of symbol
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    Variable,
    Parameter,
    Method { params: Vec<Type> },
}

/// Symbol information
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub ty: Type,
    pub kind: SymbolKind,
    /// Position among the parameters and locals of the owning table;
    /// methods do not consume an offset and keep 0
    pub offset: usize,
    pub span: Span,
}

impl Symbol {
    pub fn variable(name: impl Into<String>, ty: Type, span: Span) -> Self {
        Self {
            name: name.into(),
            ty,
            kind: SymbolKind::Variable,
            offset: 0,
            span,
        }
    }

    pub fn parameter(name: impl Into<String>, ty: Type, span: Span) -> Self {
        Self {
            kind: SymbolKind::Parameter,
            ..Self::variable(name, ty, span)
        }
    }

    pub fn method(name: impl Into<String>, ret: Type, params: Vec<Type>, span: Span) -> Self {
        Self {
            kind: SymbolKind::Method { params },
            ..Self::variable(name, ret, span)
        }
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self.kind, SymbolKind::Parameter)
    }

    pub fn is_variable(&self) -> bool {
        matches!(self.kind, SymbolKind::Variable)
    }

}

/// A flat scope: the global method table or the table of one method
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    name: String,
    symbols: Vec<Symbol>,
    index: HashMap<String, usize>,
    /// Offsets handed out so far to parameters and variables
    slot_count: usize,
}

impl SymbolTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Name of the scope (method name, or "global")
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Define a symbol; parameters and variables receive the next offset
    pub fn define(&mut self, mut symbol: Symbol) -> std::result::Result<&Symbol, SemanticError> {
        if self.index.contains_key(&symbol.name) {
            return Err(SemanticError::DuplicateSymbol {
                name: symbol.name,
                scope: self.name.clone(),
                span: symbol.span,
            });
        }

        if symbol.is_parameter() || symbol.is_variable() {
            symbol.offset = self.slot_count;
            self.slot_count += 1;
        }

        let position = self.symbols.len();
        self.index.insert(symbol.name.clone(), position);
        self.symbols.push(symbol);
        Ok(&self.symbols[position])
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.index.get(name).map(|&i| &self.symbols[i])
    }

    /// All symbols in definition order
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn parameters(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(|s| s.is_parameter())
    }

    pub fn variables(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(|s| s.is_variable())
    }
}

/// Output of a successful analysis
#[derive(Debug, Clone)]
pub struct SymbolTables {
    /// Method signatures
    pub global: SymbolTable,
    /// One table per method, in source order
    pub methods: Vec<SymbolTable>,
}

impl SymbolTables {
    /// Table of the named method
    pub fn method(&self, name: &str) -> Option<&SymbolTable> {
        self.methods.iter().find(|table| table.name() == name)
    }
}

// ==================== Semantic Analyzer ====================

type Check<T> = std::result::Result<T, SemanticError>;

/// Semantic analyzer
pub struct SemanticAnalyzer {
    globals: SymbolTable,
    methods: Vec<SymbolTable>,
    errors: Vec<SemanticError>,
    /// Table of the method being analyzed
    current: SymbolTable,
    ret_type: Type,
    loop_depth: usize,
}

impl SemanticAnalyzer {
    pub fn new() -> Self {
        Self {
            globals: SymbolTable::new("global"),
            methods: Vec::new(),
            errors: Vec::new(),
            current: SymbolTable::default(),
            ret_type: Type::Int,
            loop_depth: 0,
        }
    }

    /// Analyze a program, returning the symbol tables or every error found
    pub fn analyze(&mut self, program: &Program) -> Result<SymbolTables> {
        // Pass 1: collect method signatures
        for method in &program.methods {
            self.collect_signature(method);
        }

        if self.globals.lookup("main").is_none() {
            self.errors.push(SemanticError::MissingMain);
        }

        // Pass 2: check method bodies
        for method in &program.methods {
            self.check_method(method);
        }

        if !self.errors.is_empty() {
            debug!("semantic analysis found {} error(s)", self.errors.len());
            return Err(Error::Semantic(std::mem::take(&mut self.errors)));
        }

        Ok(SymbolTables {
            global: std::mem::take(&mut self.globals),
            methods: std::mem::take(&mut self.methods),
        })
    }

    fn collect_signature(&mut self, method: &Method) {
        let params = method.params.iter().map(|p| p.ty).collect();
        let symbol = Symbol::method(&method.name.name, method.ret_type, params, method.name.span);
        if let Err(e) = self.globals.define(symbol) {
            self.errors.push(e);
        }
    }

    fn check_method(&mut self, method: &Method) {
        debug!("analyzing method '{}'", method.name.name);

        self.current = SymbolTable::new(&method.name.name);
        self.ret_type = method.ret_type;
        self.loop_depth = 0;

        for param in &method.params {
            let symbol = Symbol::parameter(&param.name.name, param.ty, param.name.span);
            if let Err(e) = self.current.define(symbol) {
                self.errors.push(e);
            }
        }

        self.check_block(&method.body);

        trace!(
            "'{}' has {} symbol(s)",
            method.name.name,
            self.current.symbols().count()
        );
        let table = std::mem::take(&mut self.current);
        self.methods.push(table);
    }

    fn check_block(&mut self, block: &Block) {
        for decl in &block.decls {
            self.check_decl(decl);
        }
        for stmt in &block.stmts {
            self.check_stmt(stmt);
        }
    }

    fn check_decl(&mut self, decl: &Decl) {
        for var in &decl.vars {
            let symbol = Symbol::variable(&var.name.name, decl.ty, var.name.span);
            if let Err(e) = self.current.define(symbol) {
                self.errors.push(e);
            }

            if let Some(init) = &var.init {
                let result = self.check_expr(init).and_then(|ty| {
                    Self::expect_type("variable initialization", decl.ty, ty, init.span())
                });
                if let Err(e) = result {
                    self.errors.push(e);
                }
            }
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Assign { target, value, span } => {
                if let Err(e) = self.check_assign(target, value, *span) {
                    self.errors.push(e);
                }
            }
            Stmt::Return { value, span } => {
                let result = self
                    .check_expr(value)
                    .and_then(|ty| Self::expect_type("return statement", self.ret_type, ty, *span));
                if let Err(e) = result {
                    self.errors.push(e);
                }
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                if let Err(e) = self.check_expr(cond) {
                    self.errors.push(e);
                }
                self.check_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.check_stmt(else_branch);
                }
            }
            Stmt::While { cond, body, .. } => {
                if let Err(e) = self.check_expr(cond) {
                    self.errors.push(e);
                }
                self.loop_depth += 1;
                self.check_stmt(body);
                self.loop_depth -= 1;
            }
            Stmt::Break { span } => {
                if self.loop_depth == 0 {
                    self.errors.push(SemanticError::BreakOutsideLoop { span: *span });
                }
            }
            Stmt::Block(block) => self.check_block(block),
        }
    }

    fn check_assign(&self, target: &Ident, value: &Expr, span: Span) -> Check<()> {
        let symbol = match self.current.lookup(&target.name) {
            Some(symbol) => symbol,
            None if self.globals.lookup(&target.name).is_some() => {
                return Err(SemanticError::AssignToMethod {
                    name: target.name.clone(),
                    span,
                })
            }
            None => {
                return Err(SemanticError::UndefinedVariable {
                    name: target.name.clone(),
                    span,
                })
            }
        };

        if matches!(symbol.kind, SymbolKind::Method { .. }) {
            return Err(SemanticError::AssignToMethod {
                name: target.name.clone(),
                span,
            });
        }

        let ty = self.check_expr(value)?;
        Self::expect_type(
            &format!("assignment to '{}'", symbol.name),
            symbol.ty,
            ty,
            span,
        )
    }

    fn check_expr(&self, expr: &Expr) -> Check<Type> {
        match expr {
            Expr::Number(..) => Ok(Type::Int),
            // true and false are represented as 1 and 0
            Expr::Bool(..) => Ok(Type::Int),
            Expr::Ident(ident) => self
                .current
                .lookup(&ident.name)
                .map(|symbol| symbol.ty)
                .ok_or_else(|| SemanticError::UndefinedIdentifier {
                    name: ident.name.clone(),
                    span: ident.span,
                }),
            Expr::Binary {
                left, right, span, ..
            } => {
                let left = self.check_expr(left)?;
                let right = self.check_expr(right)?;
                if left != Type::Int || right != Type::Int {
                    return Err(SemanticError::TypeMismatch {
                        context: "binary expression".to_string(),
                        expected: Type::Int.to_string(),
                        got: format!("{} and {}", left, right),
                        span: *span,
                    });
                }
                Ok(Type::Int)
            }
            Expr::Unary { expr, span, .. } => {
                let ty = self.check_expr(expr)?;
                Self::expect_type("unary expression", Type::Int, ty, *span)?;
                Ok(Type::Int)
            }
            Expr::Call { name, args, span } => self.check_call(name, args, *span),
        }
    }

    fn check_call(&self, name: &Ident, args: &[Expr], span: Span) -> Check<Type> {
        let (ret, params) = match self.globals.lookup(&name.name) {
            Some(Symbol {
                ty,
                kind: SymbolKind::Method { params },
                ..
            }) => (*ty, params),
            _ => {
                return Err(SemanticError::UndefinedMethod {
                    name: name.name.clone(),
                    span,
                })
            }
        };

        if args.len() != params.len() {
            return Err(SemanticError::ArgCountMismatch {
                method: name.name.clone(),
                expected: params.len(),
                got: args.len(),
                span,
            });
        }

        for (i, (arg, expected)) in args.iter().zip(params).enumerate() {
            let got = self.check_expr(arg)?;
            if got != *expected {
                return Err(SemanticError::ArgTypeMismatch {
                    method: name.name.clone(),
                    position: i + 1,
                    expected: expected.to_string(),
                    got: got.to_string(),
                    span,
                });
            }
        }

        Ok(ret)
    }

    fn expect_type(context: &str, expected: Type, got: Type, span: Span) -> Check<()> {
        if expected == got {
            Ok(())
        } else {
            Err(SemanticError::TypeMismatch {
                context: context.to_string(),
                expected: expected.to_string(),
                got: got.to_string(),
                span,
            })
        }
    }
}

impl Default for SemanticAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
