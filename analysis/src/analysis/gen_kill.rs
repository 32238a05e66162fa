//! GEN/KILL extraction for assignments
//!
//! An assignment is a `Store`; its target is the stored-to location. Loaded
//! operands are resolved to the location they were loaded from, so
//! `x = a + b` and `y = b + a` produce the same expression.

use super::expr_set::ExpressionSet;
use super::expression::{Expression, Operand};
use crate::ir::{DefTable, InstRef, IrId, IrInstruction};

/// Right-hand side of an assignment as the analysis sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignedValue {
    /// An add/sub/mul/sdiv of two operands
    Expression(Expression),
    /// Anything else (constant, copied scalar, opaque value)
    Operand(Operand),
}

/// A `Store` instruction viewed as `target = value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub at: InstRef,
    pub target: IrId,
    pub value: AssignedValue,
}

/// Resolve a register to the operand expressions compare by.
pub fn resolve_operand(defs: &DefTable<'_>, id: IrId) -> Operand {
    match defs.instruction(id) {
        Some(IrInstruction::Const { value, .. }) => match value.as_i64() {
            Some(v) => Operand::Const(v),
            None => Operand::Value(id),
        },
        Some(IrInstruction::Load { ptr, .. }) => Operand::Value(*ptr),
        _ => Operand::Value(id),
    }
}

/// View `inst` as an assignment; `None` unless it is a `Store`.
pub fn assignment(defs: &DefTable<'_>, at: InstRef, inst: &IrInstruction) -> Option<Assignment> {
    let IrInstruction::Store { ptr, value } = inst else {
        return None;
    };

    let assigned = match defs.instruction(*value) {
        Some(IrInstruction::BinOp {
            op, left, right, ..
        }) if op.is_arithmetic() => AssignedValue::Expression(Expression::new(
            resolve_operand(defs, *left),
            resolve_operand(defs, *right),
            *op,
        )),
        _ => AssignedValue::Operand(resolve_operand(defs, *value)),
    };

    Some(Assignment {
        at,
        target: *ptr,
        value: assigned,
    })
}

/// Expressions generated by the assignment.
///
/// `x = x + y` generates nothing: the expression names the old `x`, which
/// the assignment itself overwrites.
pub fn gen_set(assignment: &Assignment) -> ExpressionSet {
    let mut gen = ExpressionSet::new();
    if let AssignedValue::Expression(expr) = assignment.value {
        if !expr.references(assignment.target) {
            gen.insert(expr);
        }
    }
    gen
}

/// Expressions of `in_set` invalidated by writing `target`.
pub fn kill_set(in_set: &ExpressionSet, target: IrId) -> ExpressionSet {
    in_set.referencing(target)
}

/// `GEN ∪ (IN − KILL)`
pub fn transfer(gen: &ExpressionSet, in_set: &ExpressionSet, kill: &ExpressionSet) -> ExpressionSet {
    let mut survivors = in_set.clone();
    survivors.difference_with(kill);
    let mut out = gen.clone();
    out.union_with(&survivors);
    out
}
