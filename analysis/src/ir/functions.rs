//! IR Functions
//!
//! This module defines function representation in the IR: parameters, named
//! storage locations (allocation sites) and the function body, plus the
//! definition table the analyses use to chase an operand to the instruction
//! that produced it.

use super::{InstRef, IrBlockId, IrControlFlowGraph, IrId, IrInstruction, IrType};
use fxhash::FxHashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// IR function representation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrFunction {
    /// Unique identifier for this function
    pub id: IrFunctionId,

    /// Function name
    pub name: String,

    /// Parameters, in declaration order
    #[serde(default)]
    pub parameters: Vec<IrParameter>,

    /// Control flow graph (function body)
    pub cfg: IrControlFlowGraph,

    /// Named storage locations, keyed by the `Alloc` destination
    #[serde(default)]
    pub locals: IndexMap<IrId, IrLocal>,

    /// Next available register ID
    pub next_reg_id: u32,
}

/// Unique identifier for functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IrFunctionId(pub u32);

impl std::fmt::Display for IrFunctionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fn{}", self.0)
    }
}

/// Function parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrParameter {
    /// Parameter name
    pub name: String,

    /// Parameter type
    pub ty: IrType,

    /// Register assigned to this parameter
    pub reg: IrId,
}

/// Local variable declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrLocal {
    /// Variable name as written in the source
    pub name: String,

    /// Variable type
    pub ty: IrType,
}

/// Where a register comes from.
#[derive(Debug, Clone, Copy)]
pub enum Definition<'a> {
    /// Defined by an instruction in the body
    Instruction(InstRef, &'a IrInstruction),
    /// A function parameter
    Parameter(&'a IrParameter),
}

/// Register -> definition lookup for one function
#[derive(Debug)]
pub struct DefTable<'a> {
    defs: FxHashMap<IrId, Definition<'a>>,
}

impl<'a> DefTable<'a> {
    /// Build the table by scanning every block once.
    pub fn build(function: &'a IrFunction) -> Self {
        let mut defs = FxHashMap::default();

        for param in &function.parameters {
            defs.insert(param.reg, Definition::Parameter(param));
        }

        for (at, inst) in function.instructions() {
            if let Some(dest) = inst.dest() {
                defs.insert(dest, Definition::Instruction(at, inst));
            }
        }

        Self { defs }
    }

    pub fn get(&self, id: IrId) -> Option<Definition<'a>> {
        self.defs.get(&id).copied()
    }

    /// The defining instruction, if the register is defined in the body.
    pub fn instruction(&self, id: IrId) -> Option<&'a IrInstruction> {
        match self.defs.get(&id)? {
            Definition::Instruction(_, inst) => Some(inst),
            Definition::Parameter(_) => None,
        }
    }

    /// Integer value of a register defined by an integer `Const`.
    pub fn int_constant(&self, id: IrId) -> Option<i64> {
        match self.instruction(id)? {
            IrInstruction::Const { value, .. } => value.as_i64(),
            _ => None,
        }
    }

    pub fn is_alloc(&self, id: IrId) -> bool {
        matches!(self.instruction(id), Some(IrInstruction::Alloc { .. }))
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

impl IrFunction {
    /// Create a new function with an empty entry block
    pub fn new(id: IrFunctionId, name: String) -> Self {
        Self {
            id,
            name,
            parameters: Vec::new(),
            cfg: IrControlFlowGraph::new(),
            locals: IndexMap::new(),
            next_reg_id: 0,
        }
    }

    /// Get the entry block ID
    pub fn entry_block(&self) -> IrBlockId {
        self.cfg.entry_block
    }

    /// Allocate a new register
    pub fn alloc_reg(&mut self) -> IrId {
        let id = IrId::new(self.next_reg_id);
        self.next_reg_id += 1;
        id
    }

    /// Add a parameter and return its register
    pub fn add_parameter(&mut self, name: String, ty: IrType) -> IrId {
        let reg = self.alloc_reg();
        self.parameters.push(IrParameter { name, ty, reg });
        reg
    }

    /// Every instruction in program order: blocks in CFG order, then block order.
    pub fn instructions(&self) -> impl Iterator<Item = (InstRef, &IrInstruction)> + '_ {
        self.cfg.blocks.values().flat_map(|block| {
            block
                .instructions
                .iter()
                .enumerate()
                .map(move |(index, inst)| (InstRef::new(block.id, index), inst))
        })
    }

    /// Human-readable name of a register: the local or parameter name when
    /// it has one, `$N` otherwise.
    pub fn value_name(&self, id: IrId) -> String {
        if let Some(local) = self.locals.get(&id) {
            return local.name.clone();
        }
        if let Some(param) = self.parameters.iter().find(|p| p.reg == id) {
            return param.name.clone();
        }
        id.to_string()
    }

    /// Build the register -> definition table
    pub fn def_table(&self) -> DefTable<'_> {
        DefTable::build(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::IrValue;

    #[test]
    fn test_def_table_and_names() {
        let mut func = IrFunction::new(IrFunctionId(0), "f".to_string());
        let n = func.add_parameter("n".to_string(), IrType::I32);
        let x = func.alloc_reg();
        let c = func.alloc_reg();
        func.locals.insert(
            x,
            IrLocal {
                name: "x".to_string(),
                ty: IrType::I32,
            },
        );
        let entry = func.entry_block();
        let block = func.cfg.get_block_mut(entry).unwrap();
        block.add_instruction(IrInstruction::Alloc { dest: x, ty: IrType::I32 });
        block.add_instruction(IrInstruction::Const {
            dest: c,
            value: IrValue::I32(5),
        });

        let defs = func.def_table();
        assert_eq!(defs.len(), 3);
        assert!(defs.is_alloc(x));
        assert_eq!(defs.int_constant(c), Some(5));
        assert!(matches!(defs.get(n), Some(Definition::Parameter(_))));

        assert_eq!(func.value_name(x), "x");
        assert_eq!(func.value_name(n), "n");
        assert_eq!(func.value_name(c), c.to_string());

        let order: Vec<_> = func.instructions().map(|(at, _)| at.index).collect();
        assert_eq!(order, vec![0, 1]);
    }
}
