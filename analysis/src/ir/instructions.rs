//! IR Instructions
//!
//! Defines the instruction set for the intermediate representation.
//! Instructions are low-level operations that map directly to machine operations.

use super::{IrId, IrType, IrValue};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// IR instruction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IrInstruction {
    // === Value Operations ===

    /// Load constant value
    Const {
        dest: IrId,
        value: IrValue,
    },

    /// Copy value from one register to another
    Copy {
        dest: IrId,
        src: IrId,
    },

    /// Load value from memory
    Load {
        dest: IrId,
        ptr: IrId,
        ty: IrType,
    },

    /// Store value to memory
    Store {
        ptr: IrId,
        value: IrId,
    },

    // === Arithmetic Operations ===

    /// Binary arithmetic operation
    BinOp {
        dest: IrId,
        op: BinaryOp,
        left: IrId,
        right: IrId,
    },

    /// Unary operation
    UnOp {
        dest: IrId,
        op: UnaryOp,
        operand: IrId,
    },

    /// Compare operation
    Cmp {
        dest: IrId,
        op: CompareOp,
        left: IrId,
        right: IrId,
    },

    /// Function call
    Call {
        dest: Option<IrId>,
        callee: String,
        args: Vec<IrId>,
    },

    // === Memory Operations ===

    /// Allocate a named storage location (stack slot)
    Alloc {
        dest: IrId,
        ty: IrType,
    },

    /// Get element pointer (GEP)
    GetElementPtr {
        dest: IrId,
        ptr: IrId,
        indices: Vec<IrId>,
        ty: IrType,
    },

    // === Type Operations ===

    /// Type cast (sign extension, truncation, ...)
    Cast {
        dest: IrId,
        src: IrId,
        from_ty: IrType,
        to_ty: IrType,
    },
}

/// Binary operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    /// Signed division
    Div,
    Rem,

    // Bitwise
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

impl BinaryOp {
    /// The four opcodes both analyses understand: add, sub, mul and signed div.
    pub fn is_arithmetic(&self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div)
    }

    pub fn is_commutative(&self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Mul | BinaryOp::And | BinaryOp::Or | BinaryOp::Xor
        )
    }

    /// Infix symbol used in reports.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "sdiv",
            BinaryOp::Rem => "srem",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::Shl => "shl",
            BinaryOp::Shr => "ashr",
        };
        write!(f, "{}", name)
    }
}

/// Unary operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Comparison operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl IrInstruction {
    /// Get the destination register if this instruction produces a value
    pub fn dest(&self) -> Option<IrId> {
        match self {
            IrInstruction::Const { dest, .. }
            | IrInstruction::Copy { dest, .. }
            | IrInstruction::Load { dest, .. }
            | IrInstruction::BinOp { dest, .. }
            | IrInstruction::UnOp { dest, .. }
            | IrInstruction::Cmp { dest, .. }
            | IrInstruction::Alloc { dest, .. }
            | IrInstruction::GetElementPtr { dest, .. }
            | IrInstruction::Cast { dest, .. } => Some(*dest),

            IrInstruction::Call { dest, .. } => *dest,

            IrInstruction::Store { .. } => None,
        }
    }

    /// Get all registers used by this instruction
    pub fn uses(&self) -> SmallVec<[IrId; 3]> {
        let mut uses = SmallVec::new();
        match self {
            IrInstruction::Copy { src, .. } | IrInstruction::Cast { src, .. } => uses.push(*src),
            IrInstruction::Load { ptr, .. } => uses.push(*ptr),
            IrInstruction::Store { ptr, value } => {
                uses.push(*ptr);
                uses.push(*value);
            }
            IrInstruction::BinOp { left, right, .. } | IrInstruction::Cmp { left, right, .. } => {
                uses.push(*left);
                uses.push(*right);
            }
            IrInstruction::UnOp { operand, .. } => uses.push(*operand),
            IrInstruction::Call { args, .. } => uses.extend(args.iter().copied()),
            IrInstruction::GetElementPtr { ptr, indices, .. } => {
                uses.push(*ptr);
                uses.extend(indices.iter().copied());
            }
            IrInstruction::Const { .. } | IrInstruction::Alloc { .. } => {}
        }
        uses
    }

    /// Check if this instruction writes memory (an assignment)
    pub fn is_store(&self) -> bool {
        matches!(self, IrInstruction::Store { .. })
    }

    /// Check if this instruction has side effects
    pub fn has_side_effects(&self) -> bool {
        matches!(self, IrInstruction::Store { .. } | IrInstruction::Call { .. })
    }
}
