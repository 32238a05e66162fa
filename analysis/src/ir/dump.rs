//! IR Dump Utility
//!
//! Pretty-prints IR in a human-readable format similar to LLVM IR.
//! Used by the `dump` command and for debugging the analyses.

use super::{
    CompareOp, IrBasicBlock, IrControlFlowGraph, IrFunction, IrInstruction, IrModule,
    IrTerminator, UnaryOp,
};
use std::fmt::Write;

/// Dump an entire module to a string.
pub fn dump_module(module: &IrModule) -> String {
    let mut out = String::new();
    writeln!(out, "; Module: {}", module.name).unwrap();
    if !module.source_file.is_empty() {
        writeln!(out, "; Source: {}", module.source_file).unwrap();
    }
    writeln!(out, "; Functions: {}", module.functions.len()).unwrap();
    out.push('\n');

    for func in module.functions.values() {
        out.push_str(&dump_function(func));
        out.push('\n');
    }

    out
}

/// Dump a single function to a string.
pub fn dump_function(func: &IrFunction) -> String {
    let mut out = String::new();

    let params: Vec<String> = func
        .parameters
        .iter()
        .map(|p| format!("{} {}: {}", p.reg, p.name, p.ty))
        .collect();
    writeln!(out, "fn @{}({}) {{", func.name, params.join(", ")).unwrap();

    for (id, local) in &func.locals {
        writeln!(out, "  ; local {} = {}: {}", id, local.name, local.ty).unwrap();
    }

    out.push_str(&dump_cfg(&func.cfg));
    out.push_str("}\n");
    out
}

/// Dump a CFG to a string, blocks in program order.
pub fn dump_cfg(cfg: &IrControlFlowGraph) -> String {
    cfg.blocks.values().map(dump_block).collect()
}

/// Dump a basic block to a string.
pub fn dump_block(block: &IrBasicBlock) -> String {
    let mut out = String::new();

    let label = block
        .label
        .as_ref()
        .map(|l| format!(" ; {}", l))
        .unwrap_or_default();
    let header = if block.metadata.is_loop_header { " ; loop header" } else { "" };
    writeln!(out, "  {}:{}{}", block.id, label, header).unwrap();

    if !block.predecessors.is_empty() {
        let preds: Vec<String> = block.predecessors.iter().map(|p| p.to_string()).collect();
        writeln!(out, "    ; preds: {}", preds.join(", ")).unwrap();
    }

    for inst in &block.instructions {
        writeln!(out, "    {}", dump_instruction(inst)).unwrap();
    }

    writeln!(out, "    {}", dump_terminator(&block.terminator)).unwrap();
    out.push('\n');

    out
}

/// Dump an instruction to a string.
pub fn dump_instruction(inst: &IrInstruction) -> String {
    match inst {
        IrInstruction::Const { dest, value } => {
            format!("{} = const {} {}", dest, value.ty(), value)
        }
        IrInstruction::Copy { dest, src } => format!("{} = copy {}", dest, src),
        IrInstruction::Load { dest, ptr, ty } => format!("{} = load {} {}", dest, ty, ptr),
        IrInstruction::Store { ptr, value } => format!("store {}, {}", ptr, value),
        IrInstruction::BinOp {
            dest,
            op,
            left,
            right,
        } => format!("{} = {} {}, {}", dest, op, left, right),
        IrInstruction::UnOp { dest, op, operand } => {
            format!("{} = {} {}", dest, dump_unaryop(op), operand)
        }
        IrInstruction::Cmp {
            dest,
            op,
            left,
            right,
        } => format!("{} = cmp {} {}, {}", dest, dump_cmpop(op), left, right),
        IrInstruction::Call { dest, callee, args } => {
            let args_str: Vec<String> = args.iter().map(|a| a.to_string()).collect();
            match dest {
                Some(d) => format!("{} = call @{}({})", d, callee, args_str.join(", ")),
                None => format!("call @{}({})", callee, args_str.join(", ")),
            }
        }
        IrInstruction::Alloc { dest, ty } => format!("{} = alloc {}", dest, ty),
        IrInstruction::GetElementPtr {
            dest,
            ptr,
            indices,
            ty,
        } => {
            let idx_str: Vec<String> = indices.iter().map(|i| i.to_string()).collect();
            format!("{} = gep {} {}, [{}]", dest, ty, ptr, idx_str.join(", "))
        }
        IrInstruction::Cast {
            dest,
            src,
            from_ty,
            to_ty,
        } => format!("{} = cast {} {} to {}", dest, from_ty, src, to_ty),
    }
}

/// Dump a terminator to a string.
pub fn dump_terminator(term: &IrTerminator) -> String {
    match term {
        IrTerminator::Branch { target } => format!("br {}", target),
        IrTerminator::CondBranch {
            condition,
            true_target,
            false_target,
        } => format!("br_if {}, {}, {}", condition, true_target, false_target),
        IrTerminator::Switch {
            value,
            cases,
            default,
        } => {
            let cases_str: Vec<String> = cases
                .iter()
                .map(|(val, target)| format!("{} => {}", val, target))
                .collect();
            format!("switch {} [{}] default {}", value, cases_str.join(", "), default)
        }
        IrTerminator::Return { value: Some(v) } => format!("ret {}", v),
        IrTerminator::Return { value: None } => "ret void".to_string(),
        IrTerminator::Unreachable => "unreachable".to_string(),
    }
}

fn dump_unaryop(op: &UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => "neg",
        UnaryOp::Not => "not",
    }
}

fn dump_cmpop(op: &CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "eq",
        CompareOp::Ne => "ne",
        CompareOp::Lt => "slt",
        CompareOp::Le => "sle",
        CompareOp::Gt => "sgt",
        CompareOp::Ge => "sge",
    }
}
