//! Available-expressions analysis
//!
//! Forward, must-analysis over the assignments of one function. The driver
//! walks the CFG depth first from the entry block, carrying the last
//! assignment seen on the current path (the anchor) whose OUT set flows into
//! the next assignment:
//!
//! ```text
//! first visit:  IN  := OUT(anchor)
//! revisit:      IN  := IN ∩ OUT(anchor)
//!               KILL := { e ∈ IN | e mentions target }
//!               OUT' := GEN ∪ (IN − KILL)
//! stop the path when the assignment was visited before and OUT' = OUT
//! ```
//!
//! The walk uses an explicit stack that visits successors in the same order
//! recursive descent would. A block re-entered with the same anchor whose OUT
//! has not changed since the last entry is skipped; that guard is what ends
//! cycles with no assignment on them.

use super::config::AnalysisConfig;
use super::expr_set::ExpressionSet;
use super::gen_kill::{self, AssignedValue, Assignment};
use super::{program_point, verify_function, AnalysisError};
use crate::ir::{InstRef, IrBlockId, IrFunction, IrId};
use diagnostics::dataflow::DataflowDiagnostics;
use diagnostics::Diagnostics;
use fxhash::FxHashSet;
use log::{debug, info};
use tracing::trace;

/// Dense id of an assignment, in program order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstId(pub u32);

impl InstId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for InstId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Propagation state of one assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    Unvisited,
    /// OUT changed on the latest visit; successors were queued
    Pending,
    /// Latest visit reproduced OUT; propagation stopped here
    Stable,
}

/// Per-assignment result.
#[derive(Debug, Clone)]
pub struct AssignmentFacts {
    pub id: InstId,
    pub assignment: Assignment,
    pub in_set: ExpressionSet,
    pub out_set: ExpressionSet,
    pub gen_set: ExpressionSet,
    pub kill_set: ExpressionSet,
    pub state: VisitState,
    pub visits: u32,
    /// |IN| after each visit; never grows after the first
    pub in_sizes: Vec<usize>,
}

impl AssignmentFacts {
    pub fn at(&self) -> InstRef {
        self.assignment.at
    }

    pub fn target(&self) -> IrId {
        self.assignment.target
    }

    pub fn value(&self) -> AssignedValue {
        self.assignment.value
    }

    /// Whether the propagation reached this assignment.
    pub fn is_reached(&self) -> bool {
        self.state != VisitState::Unvisited
    }
}

/// Result of [`analyze_function`]: reached assignments in program order.
#[derive(Debug, Clone)]
pub struct AvailableExpressionReport {
    pub function: String,
    pub assignments: Vec<AssignmentFacts>,
    pub diagnostics: Diagnostics,
}

impl AvailableExpressionReport {
    /// Facts for the assignment at `at`, if it was reached.
    pub fn facts_at(&self, at: InstRef) -> Option<&AssignmentFacts> {
        self.assignments.iter().find(|f| f.at() == at)
    }
}

enum BlockOutcome {
    /// An assignment reproduced its OUT; nothing downstream changes
    Converged,
    /// Block walked to the end; successors see this anchor
    Continue(Option<InstId>),
}

/// Analysis context; lives for one [`analyze_function`] call.
struct AvailableExpressions<'f> {
    function: &'f IrFunction,
    facts: Vec<AssignmentFacts>,
    /// Change counter of each OUT set, part of the re-entry guard key
    versions: Vec<u32>,
}

impl<'f> AvailableExpressions<'f> {
    fn new(function: &'f IrFunction) -> Self {
        let defs = function.def_table();
        let facts: Vec<AssignmentFacts> = function
            .instructions()
            .filter_map(|(at, inst)| gen_kill::assignment(&defs, at, inst))
            .enumerate()
            .map(|(i, assignment)| AssignmentFacts {
                id: InstId(i as u32),
                gen_set: gen_kill::gen_set(&assignment),
                assignment,
                in_set: ExpressionSet::new(),
                out_set: ExpressionSet::new(),
                kill_set: ExpressionSet::new(),
                state: VisitState::Unvisited,
                visits: 0,
                in_sizes: Vec::new(),
            })
            .collect();
        let versions = vec![0; facts.len()];

        Self {
            function,
            facts,
            versions,
        }
    }

    /// Assignment ids of `block`, in instruction order.
    fn assignments_in(&self, block: IrBlockId) -> Vec<InstId> {
        // facts are in program order, so one block's entries are contiguous
        self.facts
            .iter()
            .filter(|f| f.assignment.at.block == block)
            .map(|f| f.id)
            .collect()
    }

    fn run(&mut self) {
        let entry = self.function.entry_block();
        let mut stack: Vec<(IrBlockId, Option<InstId>)> = vec![(entry, None)];
        let mut entered: FxHashSet<(IrBlockId, Option<InstId>, u32)> = FxHashSet::default();

        while let Some((block, anchor)) = stack.pop() {
            let version = anchor.map_or(0, |a| self.versions[a.index()]);
            if !entered.insert((block, anchor, version)) {
                trace!("{} already entered from {:?} at version {}", block, anchor, version);
                continue;
            }

            debug!("enter {} with anchor {:?}", block, anchor);
            let anchor = match self.walk_block(block, anchor) {
                BlockOutcome::Converged => continue,
                BlockOutcome::Continue(anchor) => anchor,
            };

            let Some(bb) = self.function.cfg.get_block(block) else {
                continue;
            };
            for succ in bb.successors().into_iter().rev() {
                stack.push((succ, anchor));
            }
        }
    }

    fn walk_block(&mut self, block: IrBlockId, mut anchor: Option<InstId>) -> BlockOutcome {
        for id in self.assignments_in(block) {
            if !self.visit(id, anchor) {
                return BlockOutcome::Converged;
            }
            anchor = Some(id);
        }
        BlockOutcome::Continue(anchor)
    }

    /// Apply the transfer function to one assignment. Returns `false` when
    /// propagation along this path stops.
    fn visit(&mut self, id: InstId, anchor: Option<InstId>) -> bool {
        let incoming = anchor.map(|a| self.facts[a.index()].out_set.clone());
        let facts = &mut self.facts[id.index()];
        let first_visit = facts.state == VisitState::Unvisited;
        let in_before = facts.in_set.len();

        if let Some(incoming) = incoming {
            if first_visit {
                facts.in_set.union_with(&incoming);
            } else {
                facts.in_set.intersect_with(&incoming);
            }
        }
        debug_assert!(first_visit || facts.in_set.len() <= in_before);

        facts.kill_set = gen_kill::kill_set(&facts.in_set, facts.assignment.target);
        let out = gen_kill::transfer(&facts.gen_set, &facts.in_set, &facts.kill_set);
        facts.visits += 1;
        facts.in_sizes.push(facts.in_set.len());

        if !first_visit && out == facts.out_set {
            trace!("{} at {} is stable", id, facts.assignment.at);
            facts.state = VisitState::Stable;
            return false;
        }

        trace!(
            "{} at {}: |IN|={} |OUT|={}",
            id,
            facts.assignment.at,
            facts.in_set.len(),
            out.len()
        );
        facts.out_set = out;
        facts.state = VisitState::Pending;
        self.versions[id.index()] += 1;
        true
    }
}

/// Run available-expressions over `function`.
///
/// Assignments unreachable from the entry block get no entry in the report
/// (and an info diagnostic when `config.report_unreachable` is set).
pub fn analyze_function(
    function: &IrFunction,
    config: &AnalysisConfig,
) -> Result<AvailableExpressionReport, AnalysisError> {
    verify_function(function)?;
    info!("available expressions: {}", function.name);

    let mut ctx = AvailableExpressions::new(function);
    ctx.run();

    let mut diagnostics = Diagnostics::new();
    let (reached, unreached): (Vec<_>, Vec<_>) =
        ctx.facts.into_iter().partition(AssignmentFacts::is_reached);

    if config.report_unreachable {
        for facts in &unreached {
            diagnostics.push(DataflowDiagnostics::unreachable_assignment(
                program_point(function, facts.at()),
                &function.value_name(facts.target()),
            ));
        }
    }

    debug!(
        "{}: {} assignments reached, {} unreachable",
        function.name,
        reached.len(),
        unreached.len()
    );

    Ok(AvailableExpressionReport {
        function: function.name.clone(),
        assignments: reached,
        diagnostics,
    })
}
