//! Constant values of scalar locations on entry to a loop
//!
//! Built from the straight-line code that dominates the loop header. Under
//! [`UnknownIndexPolicy::AssumeZero`] an allocation site starts at 0; under
//! `Conservative` it starts unbound. A store of an integer constant binds the
//! location and any other store forgets it. The latest write wins.

use super::config::UnknownIndexPolicy;
use crate::ir::loop_analysis::{DominatorTree, NaturalLoop};
use crate::ir::{DefTable, IrBlockId, IrFunction, IrId, IrInstruction};
use indexmap::IndexMap;
use log::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    values: IndexMap<IrId, i64>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, location: IrId, value: i64) {
        self.values.insert(location, value);
    }

    pub fn unbind(&mut self, location: IrId) {
        self.values.shift_remove(&location);
    }

    pub fn get(&self, location: IrId) -> Option<i64> {
        self.values.get(&location).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (IrId, i64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    /// Replay the allocations and scalar stores of `blocks`, in order.
    pub fn from_blocks(
        function: &IrFunction,
        defs: &DefTable<'_>,
        blocks: impl IntoIterator<Item = IrBlockId>,
        policy: UnknownIndexPolicy,
    ) -> Self {
        let mut table = SymbolTable::new();
        for block in blocks {
            let Some(bb) = function.cfg.get_block(block) else {
                continue;
            };
            for inst in &bb.instructions {
                table.apply(defs, inst, policy);
            }
        }
        table
    }

    /// Table for the code that runs before `natural_loop`: the dominators of
    /// its header, outermost first, excluding blocks of the loop itself.
    pub fn for_loop(
        function: &IrFunction,
        defs: &DefTable<'_>,
        domtree: &DominatorTree,
        natural_loop: &NaturalLoop,
        policy: UnknownIndexPolicy,
    ) -> Self {
        let prefix: Vec<IrBlockId> = domtree
            .dominator_chain(natural_loop.header)
            .into_iter()
            .filter(|b| !natural_loop.contains(*b))
            .collect();
        debug!(
            "symbol table for loop at {} from {:?}",
            natural_loop.header, prefix
        );
        Self::from_blocks(function, defs, prefix, policy)
    }

    fn apply(&mut self, defs: &DefTable<'_>, inst: &IrInstruction, policy: UnknownIndexPolicy) {
        match inst {
            IrInstruction::Alloc { dest, .. } => match policy {
                UnknownIndexPolicy::AssumeZero => self.bind(*dest, 0),
                UnknownIndexPolicy::Conservative => self.unbind(*dest),
            },
            IrInstruction::Store { ptr, value } if defs.is_alloc(*ptr) => {
                match defs.int_constant(*value) {
                    Some(v) => self.bind(*ptr, v),
                    None => self.unbind(*ptr),
                }
            }
            _ => {}
        }
    }
}
