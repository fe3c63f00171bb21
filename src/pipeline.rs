//! Compilation pipeline
//!
//! Source text flows through four stages, each of which either succeeds
//! completely or fails with a single error:
//!
//! 1. lexical analysis ([`tokenize`])
//! 2. parsing ([`parse`])
//! 3. semantic analysis ([`analyze`])
//! 4. code generation ([`generate`])

use log::{debug, info};

use crate::backend::{CodeGen, MixalCodeGen};
use crate::frontend::ast::Program;
use crate::frontend::lexer::Lexer;
use crate::frontend::parser::Parser;
use crate::frontend::semantic::{SemanticAnalyzer, SymbolTables};
use crate::frontend::token::Token;
use crate::utils::Result;

/// Result of a full compilation
#[derive(Debug, Clone)]
pub struct Compilation {
    pub token_count: usize,
    pub method_count: usize,
    pub assembly: String,
}

/// Result of the front half of the pipeline
#[derive(Debug, Clone)]
pub struct Checked {
    pub token_count: usize,
    pub program: Program,
    pub symbols: SymbolTables,
}

pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let tokens = Lexer::new(source).tokenize()?;
    info!("tokenized {} tokens", tokens.len());
    Ok(tokens)
}

pub fn parse(tokens: Vec<Token>) -> Result<Program> {
    let program = Parser::new(tokens).parse_program()?;
    info!("parsed {} method(s)", program.methods.len());
    Ok(program)
}

pub fn analyze(program: &Program) -> Result<SymbolTables> {
    let symbols = SemanticAnalyzer::new().analyze(program)?;
    info!("semantic analysis passed");
    debug!("{} method signature(s)", symbols.global.symbols().count());
    for table in &symbols.methods {
        debug!("method '{}': {} symbol(s)", table.name(), table.symbols().count());
    }
    Ok(symbols)
}

pub fn generate(program: &Program, symbols: &SymbolTables) -> Result<String> {
    let mut codegen = MixalCodeGen::new();
    let assembly = codegen.generate(program, symbols)?;
    info!(
        "{} backend emitted {} line(s)",
        codegen.name(),
        assembly.lines().count()
    );
    Ok(assembly)
}

/// Lex, parse and analyze without generating code
pub fn check(source: &str) -> Result<Checked> {
    let tokens = tokenize(source)?;
    let token_count = tokens.len();
    let program = parse(tokens)?;
    let symbols = analyze(&program)?;
    Ok(Checked {
        token_count,
        program,
        symbols,
    })
}

/// Run every stage and return the assembly listing
pub fn compile(source: &str) -> Result<Compilation> {
    let checked = check(source)?;
    let assembly = generate(&checked.program, &checked.symbols)?;
    Ok(Compilation {
        token_count: checked.token_count,
        method_count: checked.program.methods.len(),
        assembly,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{Error, Stage};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_compile_minimal_program() {
        let compilation = compile("int main() { return 1; }").unwrap();
        assert_eq!(compilation.method_count, 1);
        // int main ( ) { return 1 ; } EOF
        assert_eq!(compilation.token_count, 10);
        assert_eq!(
            compilation.assembly,
            "        ORIG  1000\nMAIN    NOP\n        LDA   =1=\n        HLT\n        END   MAIN"
        );
    }

    #[test]
    fn test_compile_factorial_loop() {
        let source = "
            // iterative factorial
            int main() {
                int n = 5, acc = 1;
                while (n > 1) {
                    acc = acc * n;
                    n = n - 1;
                }
                return acc;
            }
        ";
        let compilation = compile(source).unwrap();
        assert!(compilation.assembly.contains("LOOP1    NOP\n"));
        assert!(compilation.assembly.contains("        LDA   2001\n        MUL   2000\n"));
        assert!(compilation.assembly.ends_with("        END   MAIN"));
    }

    #[test]
    fn test_each_stage_reports_itself() {
        let cases = [
            ("int main() { return 01; }", Stage::Lexing),
            ("int main() { return 1 }", Stage::Parsing),
            ("int main() { return x; }", Stage::Semantic),
            ("int f() { return 1; }", Stage::Semantic),
        ];
        for (source, stage) in cases {
            let err = compile(source).unwrap_err();
            assert_eq!(err.stage(), stage, "{}", source);
        }
    }

    #[test]
    fn test_semantic_errors_are_reported_together() {
        let err = compile("int f() { int a; int a; break; return b; }").unwrap_err();
        match err {
            Error::Semantic(errors) => assert_eq!(errors.len(), 4),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_check_stops_before_codegen() {
        let checked = check("int main() { return 0; } int g(int a) { return a; }").unwrap();
        assert_eq!(checked.program.methods.len(), 2);
        assert_eq!(checked.symbols.methods.len(), 2);
        assert!(checked.symbols.method("g").is_some());
    }
}
