//! MIXAL Backend - Generate MIX assembly from the checked AST
//!
//! Storage is static: every parameter and variable of the program owns one
//! memory cell, and intermediate values live in temporaries above 3000.

mod instr;
mod mixal_codegen;

pub use mixal_codegen::MixalCodeGen;
