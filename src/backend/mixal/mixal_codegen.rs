//! MIXAL Code Generator
//!
//! Translates the checked AST to MIX assembly. Each parameter and variable is
//! given one static cell; a call stores its arguments straight into the
//! callee's parameter cells and jumps to the callee's label.

use std::collections::HashMap;
use std::fmt;

use log::{debug, trace};

use super::instr::{format_line, Lowered, Op, Operand};
use crate::backend::codegen::CodeGen;
use crate::frontend::ast::*;
use crate::frontend::semantic::{SymbolTable, SymbolTables};
use crate::utils::{Error, Result};

/// Load address of the program
const ORIGIN: u32 = 1000;
/// First cell handed out to parameters and variables
const STORAGE_BASE: u32 = 2000;
/// Temporaries live at `TEMP_BASE + n`
const TEMP_BASE: u32 = 3000;

const MAIN_LABEL: &str = "MAIN";

/// A storage cell owned by a method
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Slot {
    /// Parameter by position
    Param { method: String, index: usize },
    /// Local variable by name
    Var { method: String, name: String },
}

impl Slot {
    fn param(method: &str, index: usize) -> Self {
        Slot::Param {
            method: method.to_string(),
            index,
        }
    }

    fn var(method: &str, name: &str) -> Self {
        Slot::Var {
            method: method.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Param { method, index } => write!(f, "{}_param_{}", method, index),
            Slot::Var { method, name } => write!(f, "{}_{}", method, name),
        }
    }
}

/// MIXAL code generator
pub struct MixalCodeGen {
    output: String,
    /// Shared by every label prefix
    label_counter: usize,
    temp_counter: u32,
    addresses: HashMap<Slot, u32>,
    /// Map from method name to entry label
    method_labels: HashMap<String, String>,
    /// End labels of the enclosing loops, innermost last
    break_labels: Vec<String>,
}

impl MixalCodeGen {
    pub fn new() -> Self {
        Self {
            output: String::new(),
            label_counter: 1,
            temp_counter: 0,
            addresses: HashMap::new(),
            method_labels: HashMap::new(),
            break_labels: Vec::new(),
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    /// Generate a unique label
    fn new_label(&mut self, prefix: &str) -> String {
        let label = format!("{}{}", prefix, self.label_counter);
        self.label_counter += 1;
        label
    }

    /// Address of a fresh temporary
    fn new_temp(&mut self) -> u32 {
        self.temp_counter += 1;
        TEMP_BASE + self.temp_counter
    }

    fn push_line(&mut self, line: String) {
        trace!("emit {}", line.trim_start());
        self.output.push_str(&line);
        self.output.push('\n');
    }

    fn emit(&mut self, op: Op, operand: Operand) {
        self.push_line(format_line(None, op, Some(&operand)));
    }

    fn emit_bare(&mut self, op: Op) {
        self.push_line(format_line(None, op, None));
    }

    fn emit_labeled(&mut self, label: &str, op: Op, operand: Option<Operand>) {
        self.push_line(format_line(Some(label), op, operand.as_ref()));
    }

    /// Assign cells: every parameter of every method first, then every variable
    fn allocate(&mut self, symbols: &SymbolTables) {
        let mut next = STORAGE_BASE;

        for table in &symbols.methods {
            for param in table.parameters() {
                self.addresses.insert(Slot::param(table.name(), param.offset), next);
                next += 1;
            }
        }

        for table in &symbols.methods {
            let mut vars: Vec<_> = table.variables().collect();
            vars.sort_by_key(|s| s.offset);
            for var in vars {
                self.addresses.insert(Slot::var(table.name(), &var.name), next);
                next += 1;
            }
        }

        debug!("allocated {} storage cell(s)", next - STORAGE_BASE);
    }

    fn param_address(&self, table: &SymbolTable, name: &str) -> Option<u32> {
        let symbol = table.lookup(name).filter(|s| s.is_parameter())?;
        self.addresses
            .get(&Slot::param(table.name(), symbol.offset))
            .copied()
    }

    fn var_address(&self, table: &SymbolTable, name: &str) -> Option<u32> {
        self.addresses.get(&Slot::var(table.name(), name)).copied()
    }

    fn unresolved(table: &SymbolTable, name: &str) -> Error {
        Error::UnresolvedSymbol {
            name: name.to_string(),
            method: table.name().to_string(),
        }
    }

    fn table<'a>(symbols: &'a SymbolTables, method: &str) -> Result<&'a SymbolTable> {
        symbols
            .method(method)
            .ok_or_else(|| Error::MissingSymbolTable(method.to_string()))
    }

    /// Generate the complete assembly listing
    pub fn generate_source(&mut self, program: &Program, symbols: &SymbolTables) -> Result<String> {
        self.reset();

        let main = program
            .methods
            .iter()
            .find(|m| m.name.name == "main")
            .ok_or(Error::MissingMain)?;

        self.allocate(symbols);

        for method in &program.methods {
            self.method_labels
                .insert(method.name.name.clone(), method.name.name.to_uppercase());
        }

        // Entry point
        self.emit(Op::Orig, Operand::Address(ORIGIN));
        self.emit_labeled(MAIN_LABEL, Op::Nop, None);
        let table = Self::table(symbols, "main")?;
        self.gen_block(table, &main.body)?;
        self.emit_bare(Op::Hlt);

        for method in program.methods.iter().filter(|m| m.name.name != "main") {
            self.gen_method(symbols, method)?;
        }

        self.output.push_str(&format_line(
            None,
            Op::End,
            Some(&Operand::Label(MAIN_LABEL.to_string())),
        ));

        Ok(std::mem::take(&mut self.output))
    }

    fn gen_method(&mut self, symbols: &SymbolTables, method: &Method) -> Result<()> {
        debug!("generating method '{}'", method.name.name);

        let table = Self::table(symbols, &method.name.name)?;
        let label = method.name.name.to_uppercase();
        let exit = format!("{}X", label);

        self.emit_labeled(&label, Op::Nop, None);
        self.emit(Op::Stj, Operand::Label(exit.clone()));
        self.gen_block(table, &method.body)?;
        self.emit_labeled(&exit, Op::Jmp, Some(Operand::Here));
        Ok(())
    }

    fn gen_block(&mut self, table: &SymbolTable, block: &Block) -> Result<()> {
        for decl in &block.decls {
            self.gen_decl(table, decl)?;
        }
        for stmt in &block.stmts {
            self.gen_stmt(table, stmt)?;
        }
        Ok(())
    }

    fn gen_decl(&mut self, table: &SymbolTable, decl: &Decl) -> Result<()> {
        for var in &decl.vars {
            if let Some(init) = &var.init {
                self.gen_expr(table, init)?;
                let addr = self.var_address(table, &var.name.name).ok_or_else(|| {
                    Error::UnallocatedSlot(Slot::var(table.name(), &var.name.name).to_string())
                })?;
                self.emit(Op::Sta, Operand::Address(addr));
            }
        }
        Ok(())
    }

    fn gen_stmt(&mut self, table: &SymbolTable, stmt: &Stmt) -> Result<()> {
        match stmt {
            // The result is left in rA
            Stmt::Return { value, .. } => self.gen_expr(table, value),

            Stmt::Assign { target, value, .. } => {
                self.gen_expr(table, value)?;
                let addr = self
                    .var_address(table, &target.name)
                    .or_else(|| self.param_address(table, &target.name))
                    .ok_or_else(|| Self::unresolved(table, &target.name))?;
                self.emit(Op::Sta, Operand::Address(addr));
                Ok(())
            }

            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                let else_label = self.new_label("ELSE");
                let end_label = self.new_label("ENDIF");

                self.gen_expr(table, cond)?;
                self.emit(Op::Cmpa, Operand::Immediate(0));
                let target = if else_branch.is_some() {
                    &else_label
                } else {
                    &end_label
                };
                self.emit(Op::Je, Operand::Label(target.clone()));

                self.gen_stmt(table, then_branch)?;

                if let Some(else_branch) = else_branch {
                    self.emit(Op::Jmp, Operand::Label(end_label.clone()));
                    self.emit_labeled(&else_label, Op::Nop, None);
                    self.gen_stmt(table, else_branch)?;
                }

                self.emit_labeled(&end_label, Op::Nop, None);
                Ok(())
            }

            Stmt::While { cond, body, .. } => {
                let loop_label = self.new_label("LOOP");
                let end_label = self.new_label("ENDLOOP");

                self.emit_labeled(&loop_label, Op::Nop, None);
                self.gen_expr(table, cond)?;
                self.emit(Op::Cmpa, Operand::Immediate(0));
                self.emit(Op::Je, Operand::Label(end_label.clone()));

                self.break_labels.push(end_label.clone());
                let body = self.gen_stmt(table, body);
                self.break_labels.pop();
                body?;

                self.emit(Op::Jmp, Operand::Label(loop_label));
                self.emit_labeled(&end_label, Op::Nop, None);
                Ok(())
            }

            Stmt::Break { .. } => {
                let target = self
                    .break_labels
                    .last()
                    .cloned()
                    .ok_or(Error::BreakOutsideLoop)?;
                self.emit(Op::Jmp, Operand::Label(target));
                Ok(())
            }

            Stmt::Block(block) => self.gen_block(table, block),
        }
    }

    /// Evaluate an expression into rA
    fn gen_expr(&mut self, table: &SymbolTable, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Number(n, _) => {
                self.emit(Op::Lda, Operand::Immediate(*n));
                Ok(())
            }
            Expr::Bool(b, _) => {
                self.emit(Op::Lda, Operand::Immediate(i64::from(*b)));
                Ok(())
            }
            Expr::Ident(ident) => {
                let addr = self
                    .var_address(table, &ident.name)
                    .or_else(|| self.param_address(table, &ident.name))
                    .ok_or_else(|| Self::unresolved(table, &ident.name))?;
                self.emit(Op::Lda, Operand::Address(addr));
                Ok(())
            }
            Expr::Binary {
                op, left, right, ..
            } => self.gen_binary(table, *op, left, right),
            Expr::Unary { op, expr, .. } => self.gen_unary(table, *op, expr),
            Expr::Call { name, args, .. } => self.gen_call(table, name, args),
        }
    }

    /// Address of a bare identifier operand, parameters first
    fn operand_address(&self, table: &SymbolTable, expr: &Expr) -> Option<u32> {
        match expr {
            Expr::Ident(ident) => self
                .param_address(table, &ident.name)
                .or_else(|| self.var_address(table, &ident.name)),
            _ => None,
        }
    }

    fn gen_binary(&mut self, table: &SymbolTable, op: BinOp, left: &Expr, right: &Expr) -> Result<()> {
        // Two named operands need no temporaries
        if let (Some(l), Some(r)) = (
            self.operand_address(table, left),
            self.operand_address(table, right),
        ) {
            self.emit(Op::Lda, Operand::Address(l));
            self.apply(op, r);
            return Ok(());
        }

        self.gen_expr(table, left)?;
        let left_temp = self.new_temp();
        self.emit(Op::Sta, Operand::Address(left_temp));

        self.gen_expr(table, right)?;
        let right_temp = self.new_temp();
        self.emit(Op::Sta, Operand::Address(right_temp));

        self.emit(Op::Lda, Operand::Address(left_temp));
        self.apply(op, right_temp);
        Ok(())
    }

    /// Combine rA with the cell at `addr`
    fn apply(&mut self, op: BinOp, addr: u32) {
        match Lowered::from_binop(op) {
            Lowered::Arithmetic(instr) => self.emit(instr, Operand::Address(addr)),
            Lowered::Compare(jump) => self.gen_comparison(jump, addr),
        }
    }

    /// Leave 1 in rA when the comparison holds, 0 otherwise
    fn gen_comparison(&mut self, jump: Op, addr: u32) {
        let true_label = self.new_label("TRUE");
        let end_label = self.new_label("ENDCMP");

        self.emit(Op::Cmpa, Operand::Address(addr));
        self.emit(jump, Operand::Label(true_label.clone()));
        self.emit(Op::Lda, Operand::Immediate(0));
        self.emit(Op::Jmp, Operand::Label(end_label.clone()));
        self.emit_labeled(&true_label, Op::Lda, Some(Operand::Immediate(1)));
        self.emit_labeled(&end_label, Op::Nop, None);
    }

    fn gen_unary(&mut self, table: &SymbolTable, op: UnOp, expr: &Expr) -> Result<()> {
        self.gen_expr(table, expr)?;

        match op {
            // -x is computed as 0 - x
            UnOp::Neg => {
                let temp = self.new_temp();
                self.emit(Op::Sta, Operand::Address(temp));
                self.emit(Op::Lda, Operand::Immediate(0));
                self.emit(Op::Sub, Operand::Address(temp));
            }
            UnOp::Not => {
                let true_label = self.new_label("TRUE");
                let end_label = self.new_label("ENDNOT");

                self.emit(Op::Cmpa, Operand::Immediate(0));
                self.emit(Op::Je, Operand::Label(true_label.clone()));
                self.emit(Op::Lda, Operand::Immediate(0));
                self.emit(Op::Jmp, Operand::Label(end_label.clone()));
                self.emit_labeled(&true_label, Op::Lda, Some(Operand::Immediate(1)));
                self.emit_labeled(&end_label, Op::Nop, None);
            }
        }
        Ok(())
    }

    fn gen_call(&mut self, table: &SymbolTable, name: &Ident, args: &[Expr]) -> Result<()> {
        for (i, arg) in args.iter().enumerate() {
            self.gen_expr(table, arg)?;
            let slot = Slot::param(&name.name, i);
            let addr = *self
                .addresses
                .get(&slot)
                .ok_or_else(|| Error::UnallocatedSlot(slot.to_string()))?;
            self.emit(Op::Sta, Operand::Address(addr));
        }

        let label = self
            .method_labels
            .get(&name.name)
            .cloned()
            .ok_or_else(|| Error::UnknownMethod(name.name.clone()))?;
        self.emit(Op::Jmp, Operand::Label(label));
        Ok(())
    }
}

impl Default for MixalCodeGen {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGen for MixalCodeGen {
    fn generate(&mut self, program: &Program, symbols: &SymbolTables) -> Result<String> {
        self.generate_source(program, symbols)
    }

    fn name(&self) -> &str {
        "MIXAL"
    }
}
