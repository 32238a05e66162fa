//! IR Builder
//!
//! This module provides a builder interface for constructing IR in a convenient way.
//! The builder maintains context and provides helper methods for common patterns.

use tracing::trace;

use super::{
    BinaryOp, CompareOp, IrBlockId, IrFunction, IrFunctionId, IrId, IrInstruction, IrLocal,
    IrModule, IrTerminator, IrType, IrValue, UnaryOp,
};

/// IR builder for constructing IR modules
pub struct IrBuilder {
    /// The module being built
    pub module: IrModule,

    /// Current function being built
    pub(crate) current_function: Option<IrFunctionId>,

    /// Current basic block being built
    pub(crate) current_block: Option<IrBlockId>,
}

impl IrBuilder {
    /// Create a new IR builder
    pub fn new(module_name: String, source_file: String) -> Self {
        Self {
            module: IrModule::new(module_name, source_file),
            current_function: None,
            current_block: None,
        }
    }

    // === Module Building ===

    /// Start building a new function
    pub fn start_function(&mut self, name: String) -> IrFunctionId {
        let id = self.module.alloc_function_id();
        let function = IrFunction::new(id, name);
        self.current_function = Some(id);
        self.current_block = Some(function.entry_block());
        self.module.add_function(function);
        id
    }

    /// Finish building the current function
    pub fn finish_function(&mut self) {
        self.current_function = None;
        self.current_block = None;
    }

    /// Get the current function
    pub fn current_function(&self) -> Option<&IrFunction> {
        self.current_function
            .and_then(|id| self.module.functions.get(&id))
    }

    /// Get the current function mutably
    pub fn current_function_mut(&mut self) -> Option<&mut IrFunction> {
        self.current_function
            .and_then(move |id| self.module.functions.get_mut(&id))
    }

    /// Take the most recently built function out of the builder.
    pub fn into_function(self, id: IrFunctionId) -> Option<IrFunction> {
        let mut module = self.module;
        module.functions.shift_remove(&id)
    }

    // === Block Building ===

    /// Create a new basic block in the current function
    pub fn create_block(&mut self) -> Option<IrBlockId> {
        self.current_function_mut().map(|f| f.cfg.create_block())
    }

    /// Create a new basic block with a label
    pub fn create_block_with_label(&mut self, label: &str) -> Option<IrBlockId> {
        let block_id = self.create_block()?;
        self.current_function_mut()
            .and_then(|f| f.cfg.get_block_mut(block_id))
            .map(|b| b.label = Some(label.to_string()));
        Some(block_id)
    }

    /// Switch to building in a different block
    pub fn switch_to_block(&mut self, block: IrBlockId) {
        self.current_block = Some(block);
    }

    /// Get the current block
    pub fn current_block(&self) -> Option<IrBlockId> {
        self.current_block
    }

    // === Register Management ===

    /// Allocate a new register in the current function
    pub fn alloc_reg(&mut self) -> Option<IrId> {
        self.current_function_mut().map(|f| f.alloc_reg())
    }

    /// Add a named parameter to the current function
    pub fn add_parameter(&mut self, name: &str, ty: IrType) -> Option<IrId> {
        self.current_function_mut()
            .map(|f| f.add_parameter(name.to_string(), ty))
    }

    // === Instruction Building ===

    /// Add an instruction to the current block
    fn add_instruction(&mut self, inst: IrInstruction) -> Option<()> {
        let block_id = self.current_block?;
        trace!("append to {}: {:?}", block_id, inst);
        self.current_function_mut()
            .and_then(|f| f.cfg.get_block_mut(block_id))
            .map(|b| b.add_instruction(inst))
    }

    /// Build a named storage location
    pub fn build_alloc(&mut self, name: &str, ty: IrType) -> Option<IrId> {
        let dest = self.alloc_reg()?;
        self.add_instruction(IrInstruction::Alloc { dest, ty: ty.clone() })?;
        self.current_function_mut()?.locals.insert(
            dest,
            IrLocal {
                name: name.to_string(),
                ty,
            },
        );
        Some(dest)
    }

    /// Build a constant instruction
    pub fn build_const(&mut self, value: IrValue) -> Option<IrId> {
        let dest = self.alloc_reg()?;
        self.add_instruction(IrInstruction::Const { dest, value })?;
        Some(dest)
    }

    /// Build an integer constant of the given width
    pub fn build_int(&mut self, value: i64, ty: IrType) -> Option<IrId> {
        let ir_value = match ty {
            IrType::I8 => IrValue::I8(value as i8),
            IrType::I16 => IrValue::I16(value as i16),
            IrType::I32 => IrValue::I32(value as i32),
            IrType::I64 => IrValue::I64(value),
            _ => return None,
        };
        self.build_const(ir_value)
    }

    /// Build a boolean constant
    pub fn build_bool(&mut self, value: bool) -> Option<IrId> {
        self.build_const(IrValue::Bool(value))
    }

    /// Build a copy instruction
    pub fn build_copy(&mut self, src: IrId) -> Option<IrId> {
        let dest = self.alloc_reg()?;
        self.add_instruction(IrInstruction::Copy { dest, src })?;
        Some(dest)
    }

    /// Build a load instruction
    pub fn build_load(&mut self, ptr: IrId, ty: IrType) -> Option<IrId> {
        let dest = self.alloc_reg()?;
        self.add_instruction(IrInstruction::Load { dest, ptr, ty })?;
        Some(dest)
    }

    /// Build a store instruction
    pub fn build_store(&mut self, ptr: IrId, value: IrId) -> Option<()> {
        self.add_instruction(IrInstruction::Store { ptr, value })
    }

    /// Build a binary operation
    pub fn build_binop(&mut self, op: BinaryOp, left: IrId, right: IrId) -> Option<IrId> {
        let dest = self.alloc_reg()?;
        self.add_instruction(IrInstruction::BinOp { dest, op, left, right })?;
        Some(dest)
    }

    /// Build a unary operation
    pub fn build_unop(&mut self, op: UnaryOp, operand: IrId) -> Option<IrId> {
        let dest = self.alloc_reg()?;
        self.add_instruction(IrInstruction::UnOp { dest, op, operand })?;
        Some(dest)
    }

    /// Build a comparison operation
    pub fn build_cmp(&mut self, op: CompareOp, left: IrId, right: IrId) -> Option<IrId> {
        let dest = self.alloc_reg()?;
        self.add_instruction(IrInstruction::Cmp { dest, op, left, right })?;
        Some(dest)
    }

    /// Build a cast
    pub fn build_cast(&mut self, src: IrId, from_ty: IrType, to_ty: IrType) -> Option<IrId> {
        let dest = self.alloc_reg()?;
        self.add_instruction(IrInstruction::Cast {
            dest,
            src,
            from_ty,
            to_ty,
        })?;
        Some(dest)
    }

    /// Build an element address computation
    pub fn build_gep(&mut self, ptr: IrId, indices: Vec<IrId>, ty: IrType) -> Option<IrId> {
        let dest = self.alloc_reg()?;
        self.add_instruction(IrInstruction::GetElementPtr {
            dest,
            ptr,
            indices,
            ty,
        })?;
        Some(dest)
    }

    // === Terminators ===

    /// Set the current block's terminator and record the new edges
    fn set_terminator(&mut self, term: IrTerminator) -> Option<()> {
        let block_id = self.current_block?;
        let func = self.current_function_mut()?;
        let block = func.cfg.get_block_mut(block_id)?;
        block.set_terminator(term);
        let successors = block.successors();
        for succ in successors {
            func.cfg.connect_blocks(block_id, succ);
        }
        Some(())
    }

    /// Build an unconditional branch
    pub fn build_branch(&mut self, target: IrBlockId) -> Option<()> {
        self.set_terminator(IrTerminator::Branch { target })
    }

    /// Build a conditional branch
    pub fn build_cond_branch(
        &mut self,
        condition: IrId,
        true_target: IrBlockId,
        false_target: IrBlockId,
    ) -> Option<()> {
        self.set_terminator(IrTerminator::CondBranch {
            condition,
            true_target,
            false_target,
        })
    }

    /// Build a return instruction
    pub fn build_return(&mut self, value: Option<IrId>) -> Option<()> {
        self.set_terminator(IrTerminator::Return { value })
    }

    // === Convenience Methods ===

    /// `*ptr = value` where `value` is an integer literal
    pub fn build_store_int(&mut self, ptr: IrId, value: i64) -> Option<()> {
        let constant = self.build_int(value, IrType::I32)?;
        self.build_store(ptr, constant)
    }

    /// Address of `array[index]` for a local array, with the leading zero index
    /// a frontend emits for arrays held in a stack slot.
    pub fn build_element_ptr(&mut self, array: IrId, index: IrId) -> Option<IrId> {
        let zero = self.build_int(0, IrType::I64)?;
        self.build_gep(array, vec![zero, index], IrType::Ptr(Box::new(IrType::I32)))
    }
}
