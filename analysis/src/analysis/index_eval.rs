//! Folding array indices to integers
//!
//! Casts and copies are transparent, add/sub/mul/sdiv fold with wrapping
//! 64-bit arithmetic, integer constants are their value and a load of a
//! scalar location reads the [`SymbolTable`]. Everything else is an
//! [`IndexError`].

use super::config::UnknownIndexPolicy;
use super::symbol_table::SymbolTable;
use crate::ir::{BinaryOp, DefTable, Definition, IrFunction, IrId, IrInstruction};
use thiserror::Error;
use tracing::trace;

/// Deepest index expression the evaluator follows.
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("unsupported `{0}` in index expression")]
    UnsupportedOpcode(String),

    #[error("'{0}' has no known constant value")]
    UnboundSymbol(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("constant {0} is not an integer")]
    NonInteger(String),

    #[error("register {0} has no definition")]
    DanglingRegister(IrId),

    #[error("index expression nests deeper than {0} levels")]
    TooDeep(usize),
}

pub struct IndexEvaluator<'a> {
    function: &'a IrFunction,
    defs: &'a DefTable<'a>,
    symbols: &'a SymbolTable,
    policy: UnknownIndexPolicy,
}

impl<'a> IndexEvaluator<'a> {
    pub fn new(
        function: &'a IrFunction,
        defs: &'a DefTable<'a>,
        symbols: &'a SymbolTable,
        policy: UnknownIndexPolicy,
    ) -> Self {
        Self {
            function,
            defs,
            symbols,
            policy,
        }
    }

    pub fn eval(&self, id: IrId) -> Result<i64, IndexError> {
        self.eval_at(id, 0)
    }

    fn eval_at(&self, id: IrId, depth: usize) -> Result<i64, IndexError> {
        if depth > MAX_DEPTH {
            return Err(IndexError::TooDeep(MAX_DEPTH));
        }

        let inst = match self.defs.get(id) {
            Some(Definition::Instruction(_, inst)) => inst,
            Some(Definition::Parameter(param)) => return self.unbound(&param.name),
            None => return Err(IndexError::DanglingRegister(id)),
        };

        let value = match inst {
            IrInstruction::Cast { src, .. } | IrInstruction::Copy { src, .. } => {
                self.eval_at(*src, depth + 1)?
            }
            IrInstruction::BinOp {
                op, left, right, ..
            } if op.is_arithmetic() => {
                let l = self.eval_at(*left, depth + 1)?;
                let r = self.eval_at(*right, depth + 1)?;
                fold(*op, l, r)?
            }
            IrInstruction::BinOp { op, .. } => {
                return Err(IndexError::UnsupportedOpcode(op.to_string()));
            }
            IrInstruction::Const { value, .. } => value
                .as_i64()
                .ok_or_else(|| IndexError::NonInteger(value.to_string()))?,
            IrInstruction::Load { ptr, .. } if self.defs.is_alloc(*ptr) => {
                match self.symbols.get(*ptr) {
                    Some(v) => v,
                    None => self.unbound(&self.function.value_name(*ptr))?,
                }
            }
            IrInstruction::Load { .. } => {
                return Err(IndexError::UnsupportedOpcode("load through pointer".to_string()));
            }
            other => return Err(IndexError::UnsupportedOpcode(opcode_name(other).to_string())),
        };

        trace!("index {} = {}", id, value);
        Ok(value)
    }

    fn unbound(&self, name: &str) -> Result<i64, IndexError> {
        match self.policy {
            UnknownIndexPolicy::AssumeZero => Ok(0),
            UnknownIndexPolicy::Conservative => Err(IndexError::UnboundSymbol(name.to_string())),
        }
    }
}

fn fold(op: BinaryOp, l: i64, r: i64) -> Result<i64, IndexError> {
    Ok(match op {
        BinaryOp::Add => l.wrapping_add(r),
        BinaryOp::Sub => l.wrapping_sub(r),
        BinaryOp::Mul => l.wrapping_mul(r),
        BinaryOp::Div if r == 0 => return Err(IndexError::DivisionByZero),
        BinaryOp::Div => l.wrapping_div(r),
        other => return Err(IndexError::UnsupportedOpcode(other.to_string())),
    })
}

fn opcode_name(inst: &IrInstruction) -> &'static str {
    match inst {
        IrInstruction::Const { .. } => "const",
        IrInstruction::Copy { .. } => "copy",
        IrInstruction::Load { .. } => "load",
        IrInstruction::Store { .. } => "store",
        IrInstruction::BinOp { .. } => "binop",
        IrInstruction::UnOp { .. } => "unop",
        IrInstruction::Cmp { .. } => "cmp",
        IrInstruction::Call { .. } => "call",
        IrInstruction::Alloc { .. } => "alloc",
        IrInstruction::GetElementPtr { .. } => "gep",
        IrInstruction::Cast { .. } => "cast",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{CompareOp, IrBuilder, IrFunctionId, IrType, IrValue, UnaryOp};

    fn eval_in(func: &IrFunction, table: &SymbolTable, policy: UnknownIndexPolicy, id: IrId) -> Result<i64, IndexError> {
        let defs = func.def_table();
        IndexEvaluator::new(func, &defs, table, policy).eval(id)
    }

    #[test]
    fn test_folds_nested_arithmetic() {
        // add(3, mul(2, 4)) == 11
        let mut builder = IrBuilder::new("t".to_string(), "t.ir".to_string());
        let fid = builder.start_function("f".to_string());
        let three = builder.build_int(3, IrType::I32).unwrap();
        let two = builder.build_int(2, IrType::I32).unwrap();
        let four = builder.build_int(4, IrType::I32).unwrap();
        let mul = builder.build_binop(BinaryOp::Mul, two, four).unwrap();
        let add = builder.build_binop(BinaryOp::Add, three, mul).unwrap();
        let func = builder.into_function(fid).unwrap();

        let table = SymbolTable::new();
        assert_eq!(eval_in(&func, &table, UnknownIndexPolicy::AssumeZero, add), Ok(11));
    }

    #[test]
    fn test_cast_of_load_reads_symbol_table() {
        let mut builder = IrBuilder::new("t".to_string(), "t.ir".to_string());
        let fid = builder.start_function("f".to_string());
        let x = builder.build_alloc("x", IrType::I32).unwrap();
        let lx = builder.build_load(x, IrType::I32).unwrap();
        let idx = builder.build_cast(lx, IrType::I32, IrType::I64).unwrap();
        let func = builder.into_function(fid).unwrap();

        let mut table = SymbolTable::new();
        assert_eq!(eval_in(&func, &table, UnknownIndexPolicy::AssumeZero, idx), Ok(0));
        assert_eq!(
            eval_in(&func, &table, UnknownIndexPolicy::Conservative, idx),
            Err(IndexError::UnboundSymbol("x".to_string()))
        );

        table.bind(x, 6);
        assert_eq!(eval_in(&func, &table, UnknownIndexPolicy::Conservative, idx), Ok(6));
    }

    #[test]
    fn test_errors_are_explicit() {
        let mut builder = IrBuilder::new("t".to_string(), "t.ir".to_string());
        let fid = builder.start_function("f".to_string());
        let n = builder.add_parameter("n", IrType::I32).unwrap();
        let one = builder.build_int(1, IrType::I32).unwrap();
        let zero = builder.build_int(0, IrType::I32).unwrap();
        let shl = builder.build_binop(BinaryOp::Shl, one, one).unwrap();
        let div = builder.build_binop(BinaryOp::Div, one, zero).unwrap();
        let float = builder.build_const(IrValue::F64(1.5)).unwrap();
        let func = builder.into_function(fid).unwrap();
        let table = SymbolTable::new();
        let policy = UnknownIndexPolicy::AssumeZero;

        assert_eq!(
            eval_in(&func, &table, policy, shl),
            Err(IndexError::UnsupportedOpcode("shl".to_string()))
        );
        assert_eq!(eval_in(&func, &table, policy, div), Err(IndexError::DivisionByZero));
        assert!(matches!(eval_in(&func, &table, policy, float), Err(IndexError::NonInteger(_))));
        assert_eq!(
            eval_in(&func, &table, policy, IrId::new(999)),
            Err(IndexError::DanglingRegister(IrId::new(999)))
        );
        assert_eq!(eval_in(&func, &table, policy, n), Ok(0));
        assert!(eval_in(&func, &table, UnknownIndexPolicy::Conservative, n).is_err());
    }

    #[test]
    fn test_arithmetic_wraps() {
        let mut func = IrFunction::new(IrFunctionId(0), "f".to_string());
        let max = func.alloc_reg();
        let one = func.alloc_reg();
        let sum = func.alloc_reg();
        let entry = func.entry_block();
        let block = func.cfg.get_block_mut(entry).unwrap();
        block.add_instruction(IrInstruction::Const { dest: max, value: IrValue::I64(i64::MAX) });
        block.add_instruction(IrInstruction::Const { dest: one, value: IrValue::I64(1) });
        block.add_instruction(IrInstruction::BinOp { dest: sum, op: BinaryOp::Add, left: max, right: one });

        let table = SymbolTable::new();
        assert_eq!(eval_in(&func, &table, UnknownIndexPolicy::AssumeZero, sum), Ok(i64::MIN));
    }

    #[test]
    fn test_copies_are_transparent() {
        // copy(cast(x)) + copy(5) with x = 3
        let mut builder = IrBuilder::new("t".to_string(), "t.ir".to_string());
        let fid = builder.start_function("f".to_string());
        let x = builder.build_alloc("x", IrType::I32).unwrap();
        let lx = builder.build_load(x, IrType::I32).unwrap();
        let wide = builder.build_cast(lx, IrType::I32, IrType::I64).unwrap();
        let cx = builder.build_copy(wide).unwrap();
        let five = builder.build_int(5, IrType::I64).unwrap();
        let c5 = builder.build_copy(five).unwrap();
        let sum = builder.build_binop(BinaryOp::Add, cx, c5).unwrap();
        let neg = builder.build_unop(UnaryOp::Neg, five).unwrap();
        let cmp = builder.build_cmp(CompareOp::Lt, cx, c5).unwrap();
        let func = builder.into_function(fid).unwrap();

        let mut table = SymbolTable::new();
        table.bind(x, 3);
        let policy = UnknownIndexPolicy::Conservative;
        assert_eq!(eval_in(&func, &table, policy, cx), Ok(3));
        assert_eq!(eval_in(&func, &table, policy, sum), Ok(8));
        assert_eq!(
            eval_in(&func, &table, policy, neg),
            Err(IndexError::UnsupportedOpcode("unop".to_string()))
        );
        assert_eq!(
            eval_in(&func, &table, policy, cmp),
            Err(IndexError::UnsupportedOpcode("cmp".to_string()))
        );
    }
}
