//! Parser for the mixalc source language
//!
//! Recursive descent with one token of lookahead. Operator precedence is
//! encoded in the grammar levels: relational (non-chaining), additive,
//! multiplicative, then factors. The first malformed construct aborts the
//! parse; there is no recovery.

use crate::frontend::ast::*;
use crate::frontend::token::{Token, TokenKind};
use crate::utils::{Error, Result};

/// The parser
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Create a parser from a token sequence
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let span = tokens.last().map(|t| t.span).unwrap_or_default();
            tokens.push(Token::eof(span));
        }
        Self { tokens, pos: 0 }
    }

    // ==================== Helper Methods ====================

    fn current(&self) -> &Token {
        // `new` guarantees a trailing EOF and `advance` never moves past it
        &self.tokens[self.pos]
    }

    fn current_kind(&self) -> TokenKind {
        self.current().kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current_kind() == kind
    }

    fn is_at_end(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    fn unexpected(&self, expected: impl Into<String>) -> Error {
        let token = self.current();
        let got = if token.kind == TokenKind::Eof {
            "end of input".to_string()
        } else {
            token.text.clone()
        };
        Error::UnexpectedToken {
            expected: expected.into(),
            got,
            span: token.span,
        }
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token> {
        if self.check(expected) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected.to_string()))
        }
    }

    fn consume(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    // ==================== Parsing Methods ====================

    /// Parse a complete program
    pub fn parse_program(&mut self) -> Result<Program> {
        let mut methods = Vec::new();

        while !self.is_at_end() {
            methods.push(self.parse_method()?);
        }

        Ok(Program { methods })
    }

    /// Parse a method definition
    fn parse_method(&mut self) -> Result<Method> {
        let ret_type = self.parse_type()?;
        let name = self.parse_ident()?;

        self.expect(TokenKind::LParen)?;
        let params = self.parse_params()?;
        self.expect(TokenKind::RParen)?;

        let body = self.parse_block()?;

        Ok(Method {
            ret_type,
            name,
            params,
            body,
        })
    }

    fn parse_params(&mut self) -> Result<Vec<Param>> {
        let mut params = Vec::new();

        if self.check(TokenKind::RParen) {
            return Ok(params);
        }

        loop {
            params.push(self.parse_param()?);
            if !self.consume(TokenKind::Comma) {
                break;
            }
        }

        Ok(params)
    }

    fn parse_param(&mut self) -> Result<Param> {
        let ty = self.parse_type()?;
        let name = self.parse_ident()?;
        Ok(Param { ty, name })
    }

    fn parse_type(&mut self) -> Result<Type> {
        self.expect(TokenKind::Int)?;
        Ok(Type::Int)
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        if self.check(TokenKind::Ident) {
            let token = self.advance();
            Ok(Ident::new(token.text, token.span))
        } else {
            Err(self.unexpected("identifier"))
        }
    }

    /// `{ decl* stmt* }`, used for method bodies and nested blocks alike
    fn parse_block(&mut self) -> Result<Block> {
        self.expect(TokenKind::LBrace)?;

        let mut decls = Vec::new();
        while self.check(TokenKind::Int) {
            decls.push(self.parse_decl()?);
        }

        let mut stmts = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            if let Some(stmt) = self.parse_stmt()? {
                stmts.push(stmt);
            }
        }

        self.expect(TokenKind::RBrace)?;

        Ok(Block { decls, stmts })
    }

    fn parse_decl(&mut self) -> Result<Decl> {
        let ty = self.parse_type()?;

        let mut vars = vec![self.parse_var()?];
        while self.consume(TokenKind::Comma) {
            vars.push(self.parse_var()?);
        }
        self.expect(TokenKind::Semicolon)?;

        Ok(Decl { ty, vars })
    }

    fn parse_var(&mut self) -> Result<VarDecl> {
        let name = self.parse_ident()?;
        let init = if self.consume(TokenKind::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(VarDecl { name, init })
    }

    /// Parse a statement; a lone `;` yields `None`
    fn parse_stmt(&mut self) -> Result<Option<Stmt>> {
        let span = self.current().span;

        let stmt = match self.current_kind() {
            TokenKind::Return => {
                self.advance();
                let value = self.parse_expr()?;
                self.expect(TokenKind::Semicolon)?;
                Stmt::Return { value, span }
            }
            TokenKind::If => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let cond = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                let then_branch = Box::new(self.parse_sub_stmt()?);
                let else_branch = if self.consume(TokenKind::Else) {
                    Some(Box::new(self.parse_sub_stmt()?))
                } else {
                    None
                };
                Stmt::If {
                    cond,
                    then_branch,
                    else_branch,
                }
            }
            TokenKind::While => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let cond = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                let body = Box::new(self.parse_sub_stmt()?);
                Stmt::While { cond, body }
            }
            TokenKind::Break => {
                self.advance();
                self.expect(TokenKind::Semicolon)?;
                Stmt::Break { span }
            }
            TokenKind::LBrace => Stmt::Block(self.parse_block()?),
            TokenKind::Semicolon => {
                self.advance();
                return Ok(None);
            }
            TokenKind::Ident => {
                let target = self.parse_ident()?;
                self.expect(TokenKind::Assign)?;
                let value = self.parse_expr()?;
                self.expect(TokenKind::Semicolon)?;
                Stmt::Assign {
                    target,
                    value,
                    span,
                }
            }
            _ => return Err(self.unexpected("statement")),
        };

        Ok(Some(stmt))
    }

    /// Body of `if`/`else`/`while`: an empty statement becomes an empty block
    fn parse_sub_stmt(&mut self) -> Result<Stmt> {
        Ok(self
            .parse_stmt()?
            .unwrap_or_else(|| Stmt::Block(Block::empty())))
    }

    // ==================== Expressions ====================

    /// `add (relop add)?`; relational operators do not chain
    fn parse_expr(&mut self) -> Result<Expr> {
        let left = self.parse_additive()?;

        if let Some(op) = Self::relational_op(self.current_kind()) {
            let span = self.advance().span;
            let right = self.parse_additive()?;
            return Ok(Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span,
            });
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            let span = self.advance().span;
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_factor()?;

        loop {
            let op = match self.current_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                _ => break,
            };
            let span = self.advance().span;
            let right = self.parse_factor()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }

        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr> {
        let token = self.current().clone();

        match token.kind {
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::IntLit => {
                let value = token.text.parse::<i64>().map_err(|_| self.unexpected("number"))?;
                self.advance();
                Ok(Expr::Number(value, token.span))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Bool(true, token.span))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Bool(false, token.span))
            }
            TokenKind::Ident => {
                let name = self.parse_ident()?;
                if self.consume(TokenKind::LParen) {
                    let args = self.parse_actuals()?;
                    self.expect(TokenKind::RParen)?;
                    Ok(Expr::Call {
                        name,
                        args,
                        span: token.span,
                    })
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            TokenKind::Minus => {
                self.advance();
                let expr = self.parse_factor()?;
                Ok(Expr::Unary {
                    op: UnOp::Neg,
                    expr: Box::new(expr),
                    span: token.span,
                })
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_actuals(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();

        if self.check(TokenKind::RParen) {
            return Ok(args);
        }

        loop {
            args.push(self.parse_expr()?);
            if !self.consume(TokenKind::Comma) {
                break;
            }
        }

        Ok(args)
    }

    fn relational_op(kind: TokenKind) -> Option<BinOp> {
        match kind {
            TokenKind::EqEq => Some(BinOp::Eq),
            TokenKind::Ne => Some(BinOp::Ne),
            TokenKind::Lt => Some(BinOp::Lt),
            TokenKind::Le => Some(BinOp::Le),
            TokenKind::Gt => Some(BinOp::Gt),
            TokenKind::Ge => Some(BinOp::Ge),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;
    use crate::utils::Span;

    fn parse(source: &str) -> Result<Program> {
        let tokens = Lexer::new(source).tokenize()?;
        Parser::new(tokens).parse_program()
    }

    fn return_expr(source: &str) -> Expr {
        let program = parse(source).unwrap();
        match program.methods[0].body.stmts.last() {
            Some(Stmt::Return { value, .. }) => value.clone(),
            other => panic!("expected return, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_program() {
        let program = parse("").unwrap();
        assert!(program.methods.is_empty());
    }

    #[test]
    fn test_method_with_params() {
        let program = parse("int add(int a, int b) { return a + b; }").unwrap();
        assert_eq!(program.methods.len(), 1);
        let method = &program.methods[0];
        assert_eq!(method.name.name, "add");
        assert_eq!(method.ret_type, Type::Int);
        let names: Vec<_> = method.params.iter().map(|p| p.name.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(method.name.span, Span::new(1, 5));
        assert_eq!(method.params[1].name.span, Span::new(1, 20));
    }

    #[test]
    fn test_declarations_with_initializers() {
        let program = parse("int main() { int x, y = 2; int z; return y; }").unwrap();
        let body = &program.methods[0].body;
        assert_eq!(body.decls.len(), 2);
        assert_eq!(body.decls[0].vars.len(), 2);
        assert!(body.decls[0].vars[0].init.is_none());
        assert!(matches!(body.decls[0].vars[1].init, Some(Expr::Number(2, _))));
        assert_eq!(body.decls[1].vars[0].name.name, "z");
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        let expr = return_expr("int main() { return 1 + 2 * 3; }");
        match expr {
            Expr::Binary { op: BinOp::Add, left, right, .. } => {
                assert!(matches!(*left, Expr::Number(1, _)));
                assert!(matches!(*right, Expr::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_expression_spans() {
        let expr = return_expr("int main() { return f(x) + -2; }");
        assert_eq!(expr.span(), Span::new(1, 26));
        match expr {
            Expr::Binary { left, right, .. } => {
                assert_eq!(left.span(), Span::new(1, 21));
                assert_eq!(right.span(), Span::new(1, 28));
                match *left {
                    Expr::Call { args, .. } => assert_eq!(args[0].span(), Span::new(1, 23)),
                    other => panic!("unexpected tree {:?}", other),
                }
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_additive_is_left_associative() {
        let expr = return_expr("int main() { return 8 - 4 - 2; }");
        match expr {
            Expr::Binary { op: BinOp::Sub, left, right, .. } => {
                assert!(matches!(*left, Expr::Binary { op: BinOp::Sub, .. }));
                assert!(matches!(*right, Expr::Number(2, _)));
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_unary_minus_binds_tighter_than_binary() {
        let expr = return_expr("int main() { return -a * b; }");
        match expr {
            Expr::Binary { op: BinOp::Mul, left, .. } => {
                assert!(matches!(*left, Expr::Unary { op: UnOp::Neg, .. }));
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_relational_operators_do_not_chain() {
        let err = parse("int main() { return a < b < c; }").unwrap_err();
        assert_eq!(
            err,
            Error::UnexpectedToken {
                expected: "';'".to_string(),
                got: "<".to_string(),
                span: Span::new(1, 27),
            }
        );
    }

    #[test]
    fn test_parenthesized_relational() {
        let expr = return_expr("int main() { return (a < b) == c; }");
        assert!(matches!(expr, Expr::Binary { op: BinOp::Eq, .. }));
    }

    #[test]
    fn test_method_call() {
        let expr = return_expr("int main() { return f(1, x + 2, g()); }");
        match expr {
            Expr::Call { name, args, .. } => {
                assert_eq!(name.name, "f");
                assert_eq!(args.len(), 3);
                assert!(matches!(&args[2], Expr::Call { args, .. } if args.is_empty()));
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_if_else_and_while() {
        let program = parse(
            "int main() { int i; while (i < 10) { if (i == 5) break; else i = i + 1; } return i; }",
        )
        .unwrap();
        let stmts = &program.methods[0].body.stmts;
        assert_eq!(stmts.len(), 2);
        match &stmts[0] {
            Stmt::While { body, .. } => match body.as_ref() {
                Stmt::Block(block) => {
                    assert!(matches!(
                        &block.stmts[0],
                        Stmt::If { else_branch: Some(_), .. }
                    ));
                }
                other => panic!("unexpected body {:?}", other),
            },
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_dangling_else_binds_to_nearest_if() {
        let program = parse("int main() { if (a) if (b) a = 1; else a = 2; return a; }").unwrap();
        match &program.methods[0].body.stmts[0] {
            Stmt::If { then_branch, else_branch, .. } => {
                assert!(else_branch.is_none());
                assert!(matches!(then_branch.as_ref(), Stmt::If { else_branch: Some(_), .. }));
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_empty_statements() {
        let program = parse("int main() { ; ; while (1) ; return 0; }").unwrap();
        let stmts = &program.methods[0].body.stmts;
        assert_eq!(stmts.len(), 2);
        match &stmts[0] {
            Stmt::While { body, .. } => {
                assert!(matches!(body.as_ref(), Stmt::Block(b) if b.decls.is_empty() && b.stmts.is_empty()));
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_nested_block_declarations() {
        let program = parse("int main() { { int y = 1; y = 2; } return 0; }").unwrap();
        match &program.methods[0].body.stmts[0] {
            Stmt::Block(block) => {
                assert_eq!(block.decls.len(), 1);
                assert_eq!(block.stmts.len(), 1);
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_declaration_after_statement_is_rejected() {
        let err = parse("int main() { x = 1; int y; }").unwrap_err();
        assert!(matches!(err, Error::UnexpectedToken { ref expected, .. } if expected == "statement"));
    }

    #[test]
    fn test_missing_semicolon_reports_position() {
        let err = parse("int main() {\n  return 1\n}").unwrap_err();
        assert_eq!(
            err.to_string(),
            "syntax error at line 3, column 1: expected ';', got '}'"
        );
    }

    #[test]
    fn test_unterminated_body() {
        let err = parse("int main() { return 1;").unwrap_err();
        assert!(matches!(err, Error::UnexpectedToken { ref got, .. } if got == "end of input"));
    }

    #[test]
    fn test_method_requires_int_return_type() {
        let err = parse("main() { return 1; }").unwrap_err();
        assert!(matches!(err, Error::UnexpectedToken { ref expected, .. } if expected == "'int'"));
    }

    #[test]
    fn test_boolean_literals() {
        let expr = return_expr("int main() { return true == false; }");
        match expr {
            Expr::Binary { left, right, .. } => {
                assert!(matches!(*left, Expr::Bool(true, _)));
                assert!(matches!(*right, Expr::Bool(false, _)));
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }
}
