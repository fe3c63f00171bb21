//! Code Generation trait - Backend abstraction

use crate::frontend::ast::Program;
use crate::frontend::semantic::SymbolTables;
use crate::utils::Result;

/// Code generation backend trait
pub trait CodeGen {
    /// Generate assembly text from a checked program and its symbol tables
    fn generate(&mut self, program: &Program, symbols: &SymbolTables) -> Result<String>;

    /// Get the backend name
    fn name(&self) -> &str;
}
