//! MIXAL instruction lines
//!
//! Every emitted line has one of two shapes:
//!
//! ```text
//!         LDA   2000          unlabeled: 8 spaces, opcode field, operand
//! LOOP1    NOP                labeled: label, 4 spaces, opcode field
//! ```

use std::fmt;

use crate::frontend::ast::BinOp;

/// MIX operations used by the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Lda,
    Sta,
    Add,
    Sub,
    Mul,
    Div,
    Cmpa,
    Je,
    Jne,
    Jl,
    Jle,
    Jg,
    Jge,
    Jmp,
    Stj,
    Nop,
    Hlt,
    Orig,
    End,
}

impl Op {
    /// Mnemonic padded to the operand column
    pub fn field(self) -> &'static str {
        match self {
            Op::Lda => "LDA   ",
            Op::Sta => "STA   ",
            Op::Add => "ADD   ",
            Op::Sub => "SUB   ",
            Op::Mul => "MUL   ",
            Op::Div => "DIV   ",
            Op::Cmpa => "CMPA   ",
            Op::Je => "JE    ",
            Op::Jne => "JNE   ",
            Op::Jl => "JL    ",
            Op::Jle => "JLE   ",
            Op::Jg => "JG    ",
            Op::Jge => "JGE   ",
            Op::Jmp => "JMP   ",
            Op::Stj => "STJ   ",
            Op::Nop => "NOP",
            Op::Hlt => "HLT",
            Op::Orig => "ORIG  ",
            Op::End => "END   ",
        }
    }
}

/// How a binary operator combines rA with its right operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lowered {
    /// Apply the instruction to rA
    Arithmetic(Op),
    /// Compare, then take the jump when the relation holds
    Compare(Op),
}

impl Lowered {
    pub fn from_binop(op: BinOp) -> Self {
        match op {
            BinOp::Add => Lowered::Arithmetic(Op::Add),
            BinOp::Sub => Lowered::Arithmetic(Op::Sub),
            BinOp::Mul => Lowered::Arithmetic(Op::Mul),
            BinOp::Div => Lowered::Arithmetic(Op::Div),
            BinOp::Eq => Lowered::Compare(Op::Je),
            BinOp::Ne => Lowered::Compare(Op::Jne),
            BinOp::Lt => Lowered::Compare(Op::Jl),
            BinOp::Le => Lowered::Compare(Op::Jle),
            BinOp::Gt => Lowered::Compare(Op::Jg),
            BinOp::Ge => Lowered::Compare(Op::Jge),
        }
    }
}

/// Address field of an instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// `=N=` literal constant
    Immediate(i64),
    /// Direct memory address
    Address(u32),
    /// Symbolic location
    Label(String),
    /// `*`, the current location
    Here,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Immediate(n) => write!(f, "={}=", n),
            Operand::Address(addr) => write!(f, "{}", addr),
            Operand::Label(label) => f.write_str(label),
            Operand::Here => f.write_str("*"),
        }
    }
}

/// Render one line of assembly, without the trailing newline
pub fn format_line(label: Option<&str>, op: Op, operand: Option<&Operand>) -> String {
    let mut line = match label {
        Some(label) => format!("{}    ", label),
        None => " ".repeat(8),
    };
    line.push_str(op.field());
    if let Some(operand) = operand {
        line.push_str(&operand.to_string());
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlabeled_lines() {
        assert_eq!(
            format_line(None, Op::Orig, Some(&Operand::Address(1000))),
            "        ORIG  1000"
        );
        assert_eq!(
            format_line(None, Op::Lda, Some(&Operand::Immediate(1))),
            "        LDA   =1="
        );
        assert_eq!(
            format_line(None, Op::Cmpa, Some(&Operand::Immediate(0))),
            "        CMPA   =0="
        );
        assert_eq!(format_line(None, Op::Hlt, None), "        HLT");
    }

    #[test]
    fn test_labeled_lines() {
        assert_eq!(format_line(Some("MAIN"), Op::Nop, None), "MAIN    NOP");
        assert_eq!(
            format_line(Some("FX"), Op::Jmp, Some(&Operand::Here)),
            "FX    JMP   *"
        );
        assert_eq!(
            format_line(Some("TRUE3"), Op::Lda, Some(&Operand::Immediate(1))),
            "TRUE3    LDA   =1="
        );
    }

    #[test]
    fn test_negative_immediate() {
        assert_eq!(Operand::Immediate(-4).to_string(), "=-4=");
    }

    #[test]
    fn test_operator_mapping() {
        assert_eq!(Lowered::from_binop(BinOp::Div), Lowered::Arithmetic(Op::Div));
        assert_eq!(Lowered::from_binop(BinOp::Ge), Lowered::Compare(Op::Jge));
        assert_eq!(Lowered::from_binop(BinOp::Ne), Lowered::Compare(Op::Jne));
    }
}
