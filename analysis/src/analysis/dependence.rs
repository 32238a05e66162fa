//! Loop dependence classification
//!
//! Direct-pair test over the array-access records of one loop body. For
//! records `earlier` before `later`:
//!
//! ```text
//! flow    earlier.lhs ~ later.rhs  with  lhs.index >= rhs.index
//!      or earlier.rhs ~ later.lhs  with  rhs.index <  lhs.index
//! anti    earlier.lhs ~ later.rhs  with  lhs.index <  rhs.index
//!      or earlier.rhs ~ later.lhs  with  rhs.index >= lhs.index
//! output  earlier.lhs ~ later.lhs
//! ```
//!
//! where `x ~ y` means both are elements of the same array. Kinds are not
//! exclusive. No deduplication and no transitive closure.

use super::array_access::{ArrayAccessRecord, ArraySlot, IndexValue, RecordBuilder};
use super::config::{AnalysisConfig, UnknownIndexPolicy};
use super::symbol_table::SymbolTable;
use super::{verify_function, AnalysisError};
use crate::ir::loop_analysis::{DominatorTree, LoopNestInfo, NaturalLoop};
use crate::ir::{IrBlockId, IrFunction};
use diagnostics::Diagnostics;
use log::{debug, info};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DependenceKind {
    Flow,
    Anti,
    Output,
}

impl fmt::Display for DependenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DependenceKind::Flow => "FlowDependence",
            DependenceKind::Anti => "AntiDependence",
            DependenceKind::Output => "OutputDependence",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of one dependence test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Holds,
    Absent,
    /// Needed an unknown index and no known comparison settled it
    Undetermined,
}

impl Verdict {
    /// Disjunction: `Holds` wins, then `Undetermined`.
    fn or(self, other: Verdict) -> Verdict {
        match (self, other) {
            (Verdict::Holds, _) | (_, Verdict::Holds) => Verdict::Holds,
            (Verdict::Undetermined, _) | (_, Verdict::Undetermined) => Verdict::Undetermined,
            _ => Verdict::Absent,
        }
    }
}

/// Dependence from record `earlier` to record `later` (indices into the
/// report's record list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DependencePair {
    pub earlier: usize,
    pub later: usize,
    pub kind: DependenceKind,
}

/// Classified pairs of one record list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub flow: Vec<DependencePair>,
    pub anti: Vec<DependencePair>,
    pub output: Vec<DependencePair>,
    /// Pairs whose test could not be decided; `kind` says which test
    pub undetermined: Vec<DependencePair>,
}

impl Classification {
    pub fn pairs(&self, kind: DependenceKind) -> &[DependencePair] {
        match kind {
            DependenceKind::Flow => &self.flow,
            DependenceKind::Anti => &self.anti,
            DependenceKind::Output => &self.output,
        }
    }

    fn push(&mut self, verdict: Verdict, pair: DependencePair) {
        match verdict {
            Verdict::Holds => match pair.kind {
                DependenceKind::Flow => self.flow.push(pair),
                DependenceKind::Anti => self.anti.push(pair),
                DependenceKind::Output => self.output.push(pair),
            },
            Verdict::Undetermined => self.undetermined.push(pair),
            Verdict::Absent => {}
        }
    }
}

/// Compare two indices of the same array.
fn compare(a: IndexValue, b: IndexValue, holds: impl Fn(i64, i64) -> bool) -> Verdict {
    match (a, b) {
        (IndexValue::Known(a), IndexValue::Known(b)) if holds(a, b) => Verdict::Holds,
        (IndexValue::Known(_), IndexValue::Known(_)) => Verdict::Absent,
        _ => Verdict::Undetermined,
    }
}

/// Test `write ~ read` for every array read of `reads`.
fn write_vs_reads<'r>(
    write: Option<&ArraySlot>,
    reads: impl Iterator<Item = &'r ArraySlot>,
    holds: impl Fn(i64, i64) -> bool + Copy,
) -> Verdict {
    let Some(write) = write else {
        return Verdict::Absent;
    };
    reads
        .filter(|read| read.array == write.array)
        .fold(Verdict::Absent, |acc, read| acc.or(compare(write.index, read.index, holds)))
}

pub fn flow(earlier: &ArrayAccessRecord, later: &ArrayAccessRecord) -> Verdict {
    let write_read = write_vs_reads(earlier.lhs_element(), later.rhs_elements(), |w, r| w >= r);
    // earlier.rhs < later.lhs, i.e. later.lhs > earlier.rhs
    let read_write = write_vs_reads(later.lhs_element(), earlier.rhs_elements(), |w, r| r < w);
    write_read.or(read_write)
}

pub fn anti(earlier: &ArrayAccessRecord, later: &ArrayAccessRecord) -> Verdict {
    let write_read = write_vs_reads(earlier.lhs_element(), later.rhs_elements(), |w, r| w < r);
    let read_write = write_vs_reads(later.lhs_element(), earlier.rhs_elements(), |w, r| r >= w);
    write_read.or(read_write)
}

pub fn output(earlier: &ArrayAccessRecord, later: &ArrayAccessRecord) -> Verdict {
    match (earlier.lhs_element(), later.lhs_element()) {
        (Some(a), Some(b)) if a.array == b.array => Verdict::Holds,
        _ => Verdict::Absent,
    }
}

type PairTest = fn(&ArrayAccessRecord, &ArrayAccessRecord) -> Verdict;

const TESTS: [(DependenceKind, PairTest); 3] = [
    (DependenceKind::Flow, flow),
    (DependenceKind::Anti, anti),
    (DependenceKind::Output, output),
];

/// Classify every ordered pair of `records`, which must be in program order.
///
/// Pairs are visited later-major, nearest earlier record first.
pub fn classify(records: &[ArrayAccessRecord]) -> Classification {
    let mut result = Classification::default();

    for later in 1..records.len() {
        for earlier in (0..later).rev() {
            let (e, l) = (&records[earlier], &records[later]);
            for (kind, test) in TESTS {
                let verdict = test(e, l);
                if verdict != Verdict::Absent {
                    debug!("{} -> {}: {} {:?}", e, l, kind, verdict);
                }
                result.push(verdict, DependencePair { earlier, later, kind });
            }
        }
    }

    result
}

/// Dependences of one loop.
#[derive(Debug, Clone)]
pub struct DependenceReport {
    pub function: String,
    pub header: IrBlockId,
    pub records: Vec<ArrayAccessRecord>,
    pub dependences: Classification,
    pub symbols: SymbolTable,
    pub diagnostics: Diagnostics,
    /// Policy the indices were evaluated under
    pub policy: UnknownIndexPolicy,
}

impl DependenceReport {
    pub fn flow(&self) -> &[DependencePair] {
        &self.dependences.flow
    }

    pub fn anti(&self) -> &[DependencePair] {
        &self.dependences.anti
    }

    pub fn output(&self) -> &[DependencePair] {
        &self.dependences.output
    }

    pub fn undetermined(&self) -> &[DependencePair] {
        &self.dependences.undetermined
    }

    /// The two records of a pair.
    pub fn records_of(&self, pair: &DependencePair) -> (&ArrayAccessRecord, &ArrayAccessRecord) {
        (&self.records[pair.earlier], &self.records[pair.later])
    }
}

/// Classify the dependences of `natural_loop`.
pub fn analyze_loop(
    function: &IrFunction,
    natural_loop: &NaturalLoop,
    domtree: &DominatorTree,
    config: &AnalysisConfig,
) -> DependenceReport {
    info!("dependences: {} loop at {}", function.name, natural_loop.header);

    let defs = function.def_table();
    let symbols = SymbolTable::for_loop(function, &defs, domtree, natural_loop, config.unknown_index);
    let (records, diagnostics) = RecordBuilder::new(function, &defs, &symbols, config.unknown_index)
        .collect_loop(natural_loop, domtree);
    let dependences = classify(&records);

    debug!(
        "{} records: {} flow, {} anti, {} output, {} undetermined",
        records.len(),
        dependences.flow.len(),
        dependences.anti.len(),
        dependences.output.len(),
        dependences.undetermined.len()
    );

    DependenceReport {
        function: function.name.clone(),
        header: natural_loop.header,
        records,
        dependences,
        symbols,
        diagnostics,
        policy: config.unknown_index,
    }
}

/// Classify every loop of `function`, in CFG order of the loop headers.
pub fn analyze_loops(
    function: &IrFunction,
    config: &AnalysisConfig,
) -> Result<Vec<DependenceReport>, AnalysisError> {
    verify_function(function)?;

    let domtree = DominatorTree::compute(function);
    let loops = LoopNestInfo::analyze(function, &domtree);
    let mut headers: Vec<&NaturalLoop> = loops.loops.values().collect();
    headers.sort_by_key(|l| function.cfg.blocks.get_index_of(&l.header));

    Ok(headers
        .into_iter()
        .map(|natural_loop| analyze_loop(function, natural_loop, &domtree, config))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::array_access::Access;
    use crate::ir::{InstRef, IrId};

    fn slot(array: u32, name: &str, index: i64) -> Access {
        Access::Element(ArraySlot {
            array: IrId::new(array),
            name: name.to_string(),
            index: IndexValue::Known(index),
        })
    }

    const A: u32 = 1;
    const B: u32 = 2;
    const C: u32 = 3;

    /// `lhs[li] = rhs[ri]`
    fn rec(n: usize, lhs: (u32, &str, i64), rhs: (u32, &str, i64)) -> ArrayAccessRecord {
        ArrayAccessRecord {
            at: InstRef::new(IrBlockId::entry(), n),
            lhs: slot(lhs.0, lhs.1, lhs.2),
            rhs: vec![slot(rhs.0, rhs.1, rhs.2)],
        }
    }

    #[test]
    fn test_flow_literal_pair() {
        // A[5] = B[2]; C[1] = A[3]
        let e = rec(0, (A, "A", 5), (B, "B", 2));
        let l = rec(1, (C, "C", 1), (A, "A", 3));
        assert_eq!(flow(&e, &l), Verdict::Holds);
        assert_eq!(anti(&e, &l), Verdict::Absent);
        assert_eq!(output(&e, &l), Verdict::Absent);
    }

    #[test]
    fn test_anti_literal_pair() {
        // A[1] = B[2]; C[1] = A[3]
        let e = rec(0, (A, "A", 1), (B, "B", 2));
        let l = rec(1, (C, "C", 1), (A, "A", 3));
        assert_eq!(anti(&e, &l), Verdict::Holds);
        assert_eq!(flow(&e, &l), Verdict::Absent);
    }

    #[test]
    fn test_output_literal_pair() {
        // A[1] = B[1]; A[2] = C[1]
        let e = rec(0, (A, "A", 1), (B, "B", 1));
        let l = rec(1, (A, "A", 2), (C, "C", 1));
        assert_eq!(output(&e, &l), Verdict::Holds);
        assert_eq!(flow(&e, &l), Verdict::Absent);
        assert_eq!(anti(&e, &l), Verdict::Absent);
    }

    #[test]
    fn test_read_then_write_branches() {
        // B[0] = A[2]; A[4] = C[0]  -> earlier.rhs A[2] < later.lhs A[4]: flow
        let e = rec(0, (B, "B", 0), (A, "A", 2));
        let l = rec(1, (A, "A", 4), (C, "C", 0));
        assert_eq!(flow(&e, &l), Verdict::Holds);
        assert_eq!(anti(&e, &l), Verdict::Absent);

        // B[0] = A[4]; A[4] = C[0]  -> earlier.rhs A[4] >= later.lhs A[4]: anti
        let e = rec(0, (B, "B", 0), (A, "A", 4));
        assert_eq!(anti(&e, &l), Verdict::Holds);
        assert_eq!(flow(&e, &l), Verdict::Absent);
    }

    #[test]
    fn test_same_name_different_storage_never_matches() {
        let e = rec(0, (A, "x", 5), (B, "B", 2));
        let l = rec(1, (C, "C", 1), (9, "x", 3));
        assert_eq!(flow(&e, &l), Verdict::Absent);
    }

    #[test]
    fn test_unknown_index_is_undetermined() {
        let e = ArrayAccessRecord {
            at: InstRef::new(IrBlockId::entry(), 0),
            lhs: Access::Element(ArraySlot {
                array: IrId::new(A),
                name: "A".to_string(),
                index: IndexValue::Unknown,
            }),
            rhs: vec![Access::Scalar("t".to_string())],
        };
        let l = rec(1, (A, "A", 2), (A, "A", 3));
        assert_eq!(flow(&e, &l), Verdict::Undetermined);
        assert_eq!(anti(&e, &l), Verdict::Undetermined);
        assert_eq!(output(&e, &l), Verdict::Holds);

        let classified = classify(&[e, l]);
        assert_eq!(classified.output.len(), 1);
        assert!(classified.flow.is_empty());
        assert_eq!(classified.undetermined.len(), 2);
        assert_eq!(classified.undetermined[0].kind, DependenceKind::Flow);
    }

    #[test]
    fn test_classify_pair_order_and_multiplicity() {
        // A[1] = B[1]; A[2] = C[1]; A[3] = C[1]
        let records = vec![
            rec(0, (A, "A", 1), (B, "B", 1)),
            rec(1, (A, "A", 2), (C, "C", 1)),
            rec(2, (A, "A", 3), (C, "C", 1)),
        ];
        let classified = classify(&records);
        let order: Vec<(usize, usize)> = classified.output.iter().map(|p| (p.earlier, p.later)).collect();
        assert_eq!(order, vec![(0, 1), (1, 2), (0, 2)]);
        assert!(classified.pairs(DependenceKind::Flow).is_empty());
    }
}
