//! Array-access records of a loop body
//!
//! Every store in the loop becomes one record when it writes an array element
//! or reads any array element on its right-hand side:
//!
//! ```text
//! a[i] = b[j]          lhs a[i]   rhs [b[j]]
//! t = a[i] + a[i + 1]  lhs t      rhs [a[i], a[i + 1]]
//! a[i] = t             lhs a[i]   rhs [t]
//! ```
//!
//! Records are ordered by the reverse postorder of the loop blocks, which is
//! the order dependence direction is decided by.

use super::config::UnknownIndexPolicy;
use super::index_eval::IndexEvaluator;
use super::program_point;
use super::symbol_table::SymbolTable;
use crate::ir::loop_analysis::{DominatorTree, NaturalLoop};
use crate::ir::{DefTable, Definition, InstRef, IrFunction, IrId, IrInstruction};
use diagnostics::dataflow::DataflowDiagnostics;
use diagnostics::Diagnostics;
use log::{debug, warn};
use serde::Serialize;
use std::fmt;

/// How deep the right-hand side is searched for array reads.
const MAX_RHS_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexValue {
    Known(i64),
    Unknown,
}

impl Serialize for IndexValue {
    /// Known indices as numbers, unknown as `null`
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            IndexValue::Known(v) => serializer.serialize_i64(*v),
            IndexValue::Unknown => serializer.serialize_none(),
        }
    }
}

impl fmt::Display for IndexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexValue::Known(v) => write!(f, "{}", v),
            IndexValue::Unknown => write!(f, "?"),
        }
    }
}

/// One array element `name[index]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArraySlot {
    /// Storage identity of the array
    #[serde(skip)]
    pub array: IrId,
    pub name: String,
    pub index: IndexValue,
}

/// One side of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Element(ArraySlot),
    /// Kept for reporting only; never takes part in a dependence
    Scalar(String),
}

impl Access {
    pub fn as_element(&self) -> Option<&ArraySlot> {
        match self {
            Access::Element(slot) => Some(slot),
            Access::Scalar(_) => None,
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Element(slot) => write!(f, "{}[{}]", slot.name, slot.index),
            Access::Scalar(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrayAccessRecord {
    #[serde(skip)]
    pub at: InstRef,
    pub lhs: Access,
    /// Array reads of the stored value, left to right; a single scalar
    /// entry when there are none
    pub rhs: Vec<Access>,
}

impl ArrayAccessRecord {
    pub fn lhs_element(&self) -> Option<&ArraySlot> {
        self.lhs.as_element()
    }

    pub fn rhs_elements(&self) -> impl Iterator<Item = &ArraySlot> {
        self.rhs.iter().filter_map(Access::as_element)
    }
}

impl fmt::Display for ArrayAccessRecord {
    /// `<lhs> = <rhs>[, <rhs>...]`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} =", self.lhs)?;
        for (i, access) in self.rhs.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{}{}", sep, access)?;
        }
        Ok(())
    }
}

/// Builds the records of one loop body.
pub struct RecordBuilder<'a> {
    function: &'a IrFunction,
    defs: &'a DefTable<'a>,
    evaluator: IndexEvaluator<'a>,
    diagnostics: Diagnostics,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(
        function: &'a IrFunction,
        defs: &'a DefTable<'a>,
        symbols: &'a SymbolTable,
        policy: UnknownIndexPolicy,
    ) -> Self {
        Self {
            function,
            defs,
            evaluator: IndexEvaluator::new(function, defs, symbols, policy),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Records of every store in `natural_loop`, in loop RPO.
    pub fn collect_loop(
        mut self,
        natural_loop: &NaturalLoop,
        domtree: &DominatorTree,
    ) -> (Vec<ArrayAccessRecord>, Diagnostics) {
        let mut records = Vec::new();
        for block in natural_loop.blocks_in_rpo(domtree) {
            let Some(bb) = self.function.cfg.get_block(block) else {
                continue;
            };
            for (index, inst) in bb.instructions.iter().enumerate() {
                if let Some(record) = self.record(InstRef::new(block, index), inst) {
                    debug!("record at {}: {}", record.at, record);
                    records.push(record);
                }
            }
        }
        (records, self.diagnostics)
    }

    /// The record for one instruction; `None` for non-stores, stores with no
    /// array access and malformed stores (which leave a warning behind).
    pub fn record(&mut self, at: InstRef, inst: &IrInstruction) -> Option<ArrayAccessRecord> {
        let IrInstruction::Store { ptr, value } = inst else {
            return None;
        };

        let lhs = match self.lhs_access(at, *ptr) {
            Ok(lhs) => lhs,
            Err(reason) => {
                self.skip(at, &reason);
                return None;
            }
        };

        let mut rhs = Vec::new();
        if let Err(reason) = self.collect_reads(at, *value, 0, &mut rhs) {
            self.skip(at, &reason);
            return None;
        }

        if lhs.as_element().is_none() && rhs.is_empty() {
            return None;
        }
        if rhs.is_empty() {
            rhs.push(Access::Scalar(self.describe(*value, 0)));
        }

        Some(ArrayAccessRecord { at, lhs, rhs })
    }

    fn lhs_access(&mut self, at: InstRef, ptr: IrId) -> Result<Access, String> {
        match self.defs.get(ptr) {
            Some(Definition::Instruction(_, IrInstruction::GetElementPtr { ptr: base, indices, .. })) => {
                self.element(at, *base, indices).map(Access::Element)
            }
            Some(_) => Ok(Access::Scalar(self.function.value_name(ptr))),
            None => Err(format!("store target {} has no definition", ptr)),
        }
    }

    /// Array reads reachable from `value` through arithmetic and casts.
    fn collect_reads(
        &mut self,
        at: InstRef,
        value: IrId,
        depth: usize,
        out: &mut Vec<Access>,
    ) -> Result<(), String> {
        if depth > MAX_RHS_DEPTH {
            return Ok(());
        }
        let Some(inst) = self.defs.instruction(value) else {
            return Ok(());
        };

        match inst {
            IrInstruction::Load { ptr, .. } => {
                if let Some(IrInstruction::GetElementPtr { ptr: base, indices, .. }) =
                    self.defs.instruction(*ptr)
                {
                    let slot = self.element(at, *base, indices)?;
                    out.push(Access::Element(slot));
                }
            }
            IrInstruction::BinOp { left, right, .. } => {
                self.collect_reads(at, *left, depth + 1, out)?;
                self.collect_reads(at, *right, depth + 1, out)?;
            }
            IrInstruction::Cast { src, .. }
            | IrInstruction::Copy { src, .. }
            | IrInstruction::UnOp { operand: src, .. } => {
                self.collect_reads(at, *src, depth + 1, out)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// `base[indices.last()]`, base resolved through a pointer load.
    fn element(&mut self, at: InstRef, base: IrId, indices: &[IrId]) -> Result<ArraySlot, String> {
        let array = self.array_base(base)?;
        let name = self.function.value_name(array);
        let Some(&index) = indices.last() else {
            return Err(format!("element address into '{}' has no index", name));
        };

        let index = match self.evaluator.eval(index) {
            Ok(v) => IndexValue::Known(v),
            Err(err) => {
                let reason = err.to_string();
                warn!("{}: index into '{}' unknown: {}", at, name, reason);
                self.diagnostics.push(DataflowDiagnostics::unresolved_index(
                    program_point(self.function, at),
                    &name,
                    &reason,
                ));
                IndexValue::Unknown
            }
        };

        Ok(ArraySlot { array, name, index })
    }

    fn array_base(&self, base: IrId) -> Result<IrId, String> {
        match self.defs.get(base) {
            Some(Definition::Instruction(_, IrInstruction::Alloc { .. })) => Ok(base),
            Some(Definition::Instruction(_, IrInstruction::Load { ptr, .. })) if self.defs.is_alloc(*ptr) => {
                Ok(*ptr)
            }
            Some(Definition::Parameter(_)) => Ok(base),
            Some(Definition::Instruction(_, other)) => {
                Err(format!("unsupported array base {}", crate::ir::dump::dump_instruction(other)))
            }
            None => Err(format!("array base {} has no definition", base)),
        }
    }

    /// Printable form of a scalar right-hand side.
    fn describe(&self, value: IrId, depth: usize) -> String {
        if depth > MAX_RHS_DEPTH {
            return "...".to_string();
        }
        match self.defs.instruction(value) {
            Some(IrInstruction::Const { value, .. }) => value.to_string(),
            Some(IrInstruction::Load { ptr, .. }) => self.function.value_name(*ptr),
            Some(IrInstruction::Cast { src, .. }) | Some(IrInstruction::Copy { src, .. }) => {
                self.describe(*src, depth + 1)
            }
            Some(IrInstruction::BinOp { op, left, right, .. }) => format!(
                "{} {} {}",
                self.describe(*left, depth + 1),
                op.symbol(),
                self.describe(*right, depth + 1)
            ),
            _ => self.function.value_name(value),
        }
    }

    fn skip(&mut self, at: InstRef, reason: &str) {
        warn!("{}: skipping store: {}", at, reason);
        self.diagnostics.push(DataflowDiagnostics::malformed_array_store(
            program_point(self.function, at),
            reason,
        ));
    }
}
