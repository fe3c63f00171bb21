//! Backend module - Code generation

pub mod codegen;
pub mod mixal;

pub use codegen::CodeGen;
pub use mixal::MixalCodeGen;
