//! Symbolic expressions compared by operand identity

use crate::ir::{BinaryOp, IrFunction, IrId};
use std::fmt;

/// One side of an [`Expression`].
///
/// Values compare by register identity, never by computed value. Integer
/// constants are uniqued by value, so `Const(4) == Const(4)` wherever the
/// constants were materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operand {
    Value(IrId),
    Const(i64),
}

impl Operand {
    pub fn is_const(&self) -> bool {
        matches!(self, Operand::Const(_))
    }

    pub fn as_value(&self) -> Option<IrId> {
        match self {
            Operand::Value(id) => Some(*id),
            Operand::Const(_) => None,
        }
    }

    /// Render with local names resolved against `function`.
    pub fn display<'a>(&'a self, function: &'a IrFunction) -> OperandDisplay<'a> {
        OperandDisplay {
            operand: self,
            function,
        }
    }
}

pub struct OperandDisplay<'a> {
    operand: &'a Operand,
    function: &'a IrFunction,
}

impl fmt::Display for OperandDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operand {
            Operand::Value(id) => write!(f, "{}", self.function.value_name(*id)),
            Operand::Const(value) => write!(f, "{}", value),
        }
    }
}

/// `(left, right, op)` with `op` one of add, sub, mul, sdiv.
///
/// The operand order fixed by [`Expression::new`] only makes textually
/// swapped forms of the same computation compare equal. It is not a
/// normal form: nothing is folded or reassociated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Expression {
    pub left: Operand,
    pub right: Operand,
    pub op: BinaryOp,
}

impl Expression {
    /// Build an expression with operands reordered for matching: the lower
    /// operand first for commutative opcodes, then a constant always to the
    /// right.
    pub fn new(left: Operand, right: Operand, op: BinaryOp) -> Self {
        let (mut left, mut right) = (left, right);
        if op.is_commutative() && right < left {
            std::mem::swap(&mut left, &mut right);
        }
        // sub and sdiv included
        if left.is_const() && !right.is_const() {
            std::mem::swap(&mut left, &mut right);
        }
        Self { left, right, op }
    }

    /// Whether either operand is `location`.
    pub fn references(&self, location: IrId) -> bool {
        self.left == Operand::Value(location) || self.right == Operand::Value(location)
    }

    pub fn display<'a>(&'a self, function: &'a IrFunction) -> ExpressionDisplay<'a> {
        ExpressionDisplay {
            expr: self,
            function,
        }
    }
}

/// `<name> <op> <name-or-constant>`
pub struct ExpressionDisplay<'a> {
    expr: &'a Expression,
    function: &'a IrFunction,
}

impl fmt::Display for ExpressionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.expr.left.display(self.function),
            self.expr.op.symbol(),
            self.expr.right.display(self.function)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(n: u32) -> Operand {
        Operand::Value(IrId::new(n))
    }

    #[test]
    fn test_commutative_operands_sorted() {
        let ab = Expression::new(v(1), v(2), BinaryOp::Add);
        let ba = Expression::new(v(2), v(1), BinaryOp::Add);
        assert_eq!(ab, ba);
        assert_eq!(ab.left, v(1));

        let sub_ab = Expression::new(v(1), v(2), BinaryOp::Sub);
        let sub_ba = Expression::new(v(2), v(1), BinaryOp::Sub);
        assert_ne!(sub_ab, sub_ba);
    }

    #[test]
    fn test_constant_moves_right() {
        let e = Expression::new(Operand::Const(4), v(3), BinaryOp::Mul);
        assert_eq!(e.left, v(3));
        assert_eq!(e.right, Operand::Const(4));

        let d = Expression::new(Operand::Const(8), v(3), BinaryOp::Div);
        assert_eq!(d.left, v(3));
        assert_eq!(d, Expression::new(v(3), Operand::Const(8), BinaryOp::Div));
    }

    #[test]
    fn test_constants_compare_by_value() {
        let a = Expression::new(v(1), Operand::Const(2), BinaryOp::Add);
        let b = Expression::new(v(1), Operand::Const(2), BinaryOp::Add);
        let c = Expression::new(v(1), Operand::Const(3), BinaryOp::Add);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, Expression::new(v(1), Operand::Const(2), BinaryOp::Sub));
    }

    #[test]
    fn test_references() {
        let e = Expression::new(v(1), v(2), BinaryOp::Add);
        assert!(e.references(IrId::new(2)));
        assert!(!e.references(IrId::new(3)));
    }

    #[test]
    fn test_display_uses_local_names() {
        use crate::ir::{IrBuilder, IrType};

        let mut builder = IrBuilder::new("t".to_string(), "t.ir".to_string());
        let id = builder.start_function("f".to_string());
        let a = builder.build_alloc("a", IrType::I32).unwrap();
        let b = builder.build_alloc("b", IrType::I32).unwrap();
        let func = builder.into_function(id).unwrap();

        let e = Expression::new(Operand::Value(b), Operand::Value(a), BinaryOp::Add);
        assert_eq!(e.display(&func).to_string(), "a + b");
        let c = Expression::new(Operand::Const(1), Operand::Value(a), BinaryOp::Sub);
        assert_eq!(c.display(&func).to_string(), "a - 1");
    }
}
