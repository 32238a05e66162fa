//! IR Basic Blocks
//!
//! This module defines basic blocks, which are sequences of instructions
//! with a single entry point and single exit point. Basic blocks form the nodes
//! of the control flow graph the analyses walk.

use super::{IrId, IrInstruction};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A basic block in the IR
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrBasicBlock {
    /// Unique identifier for this block
    pub id: IrBlockId,

    /// Human-readable label (for debugging)
    pub label: Option<String>,

    /// Instructions in this block (executed sequentially)
    pub instructions: Vec<IrInstruction>,

    /// Terminator instruction (branch, return, etc.)
    pub terminator: IrTerminator,

    /// Predecessors in the CFG
    #[serde(default)]
    pub predecessors: Vec<IrBlockId>,

    /// Analysis annotations
    #[serde(default)]
    pub metadata: BlockMetadata,
}

/// Unique identifier for basic blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IrBlockId(pub u32);

impl IrBlockId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn entry() -> Self {
        Self(0)
    }

    pub fn is_entry(&self) -> bool {
        self.0 == 0
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for IrBlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// Position of an instruction: block plus index inside the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstRef {
    pub block: IrBlockId,
    pub index: usize,
}

impl InstRef {
    pub fn new(block: IrBlockId, index: usize) -> Self {
        Self { block, index }
    }
}

impl std::fmt::Display for InstRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.block, self.index)
    }
}

/// Terminator instructions that end a basic block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IrTerminator {
    /// Unconditional branch to another block
    Branch { target: IrBlockId },

    /// Conditional branch based on a boolean value
    CondBranch {
        condition: IrId,
        true_target: IrBlockId,
        false_target: IrBlockId,
    },

    /// Switch/jump table
    Switch {
        value: IrId,
        cases: Vec<(i64, IrBlockId)>,
        default: IrBlockId,
    },

    /// Return from function
    Return { value: Option<IrId> },

    /// Not yet terminated
    Unreachable,
}

/// Metadata attached by analyses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockMetadata {
    /// Whether this block is a loop header
    pub is_loop_header: bool,
}

impl IrBasicBlock {
    /// Create a new basic block
    pub fn new(id: IrBlockId) -> Self {
        Self {
            id,
            label: None,
            instructions: Vec::new(),
            terminator: IrTerminator::Unreachable,
            predecessors: Vec::new(),
            metadata: BlockMetadata::default(),
        }
    }

    /// Add an instruction to this block
    pub fn add_instruction(&mut self, inst: IrInstruction) {
        self.instructions.push(inst);
    }

    /// Set the terminator for this block
    pub fn set_terminator(&mut self, term: IrTerminator) {
        self.terminator = term;
    }

    /// Get all successor blocks based on the terminator, in branch order
    pub fn successors(&self) -> SmallVec<[IrBlockId; 2]> {
        match &self.terminator {
            IrTerminator::Branch { target } => smallvec::smallvec![*target],
            IrTerminator::CondBranch {
                true_target,
                false_target,
                ..
            } => smallvec::smallvec![*true_target, *false_target],
            IrTerminator::Switch { cases, default, .. } => {
                let mut succs: SmallVec<[IrBlockId; 2]> =
                    cases.iter().map(|(_, target)| *target).collect();
                succs.push(*default);
                succs
            }
            IrTerminator::Return { .. } | IrTerminator::Unreachable => SmallVec::new(),
        }
    }

    /// Check if this block is terminated properly
    pub fn is_terminated(&self) -> bool {
        !matches!(self.terminator, IrTerminator::Unreachable)
    }
}

/// Control flow graph of one function
///
/// Blocks are kept in insertion order, which is also the program order the
/// analyses use to number instructions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrControlFlowGraph {
    /// All basic blocks in the function
    pub blocks: IndexMap<IrBlockId, IrBasicBlock>,

    /// Entry block ID
    pub entry_block: IrBlockId,

    /// Next available block ID
    pub next_block_id: u32,
}

impl Default for IrControlFlowGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl IrControlFlowGraph {
    /// Create a new CFG with an entry block
    pub fn new() -> Self {
        let mut blocks = IndexMap::new();
        let entry_block = IrBlockId::entry();
        blocks.insert(entry_block, IrBasicBlock::new(entry_block));

        Self {
            blocks,
            entry_block,
            next_block_id: 1,
        }
    }

    /// Create a new basic block
    pub fn create_block(&mut self) -> IrBlockId {
        let id = IrBlockId::new(self.next_block_id);
        self.next_block_id += 1;
        self.blocks.insert(id, IrBasicBlock::new(id));
        id
    }

    /// Get a block by ID
    pub fn get_block(&self, id: IrBlockId) -> Option<&IrBasicBlock> {
        self.blocks.get(&id)
    }

    /// Get a mutable block by ID
    pub fn get_block_mut(&mut self, id: IrBlockId) -> Option<&mut IrBasicBlock> {
        self.blocks.get_mut(&id)
    }

    /// Get an instruction by position
    pub fn instruction(&self, at: InstRef) -> Option<&IrInstruction> {
        self.blocks.get(&at.block)?.instructions.get(at.index)
    }

    /// Connect two blocks (update predecessors)
    pub fn connect_blocks(&mut self, from: IrBlockId, to: IrBlockId) {
        if let Some(to_block) = self.blocks.get_mut(&to) {
            if !to_block.predecessors.contains(&from) {
                to_block.predecessors.push(from);
            }
        }
    }

    /// Rebuild every predecessor list from the terminators.
    ///
    /// Deserialized graphs may omit predecessor lists.
    pub fn recompute_predecessors(&mut self) {
        let edges: Vec<(IrBlockId, IrBlockId)> = self
            .blocks
            .values()
            .flat_map(|b| b.successors().into_iter().map(move |s| (b.id, s)))
            .collect();

        for block in self.blocks.values_mut() {
            block.predecessors.clear();
        }
        for (from, to) in edges {
            self.connect_blocks(from, to);
        }
    }

    /// Verify CFG integrity
    pub fn verify(&self) -> Result<(), String> {
        if !self.blocks.contains_key(&self.entry_block) {
            return Err("Entry block not found".to_string());
        }

        for (id, block) in &self.blocks {
            if block.id != *id {
                return Err(format!("Block {} is stored under key {}", block.id, id));
            }

            if !block.is_terminated() {
                return Err(format!("Block {} is not properly terminated", id));
            }

            for succ in block.successors() {
                if !self.blocks.contains_key(&succ) {
                    return Err(format!(
                        "Block {} references non-existent successor {}",
                        id, succ
                    ));
                }
            }
        }

        Ok(())
    }
}
