//! Loop Analysis
//!
//! Locates the loop bodies the dependence classifier runs on:
//! - Dominator tree computation (iterative dataflow algorithm)
//! - Natural loop detection via back-edge identification
//! - Loop header annotation for the text dump

use super::{IrBlockId, IrControlFlowGraph, IrFunction};
use fxhash::{FxHashMap, FxHashSet};
use indexmap::IndexMap;
use std::collections::{BTreeSet, VecDeque};

/// Dominator tree for a function's control flow graph.
///
/// A block D dominates block B if every path from the entry to B goes through D.
/// The immediate dominator (idom) of B is the closest strict dominator.
#[derive(Debug, Clone)]
pub struct DominatorTree {
    /// Immediate dominator for each block (entry block has no idom)
    idom: FxHashMap<IrBlockId, IrBlockId>,

    /// Children in the dominator tree
    children: FxHashMap<IrBlockId, Vec<IrBlockId>>,

    /// Dominator tree depth for each block (entry = 0)
    depth: FxHashMap<IrBlockId, usize>,

    /// Reachable blocks in reverse postorder
    rpo: Vec<IrBlockId>,

    /// Position of each reachable block in `rpo`
    rpo_index: FxHashMap<IrBlockId, usize>,

    /// Entry block of the function
    entry: IrBlockId,
}

impl DominatorTree {
    /// Compute the dominator tree for a function using iterative dataflow.
    ///
    /// This uses Cooper, Harvey, and Kennedy's simple iterative algorithm.
    /// Blocks unreachable from the entry get no idom and are dominated by nothing.
    pub fn compute(function: &IrFunction) -> Self {
        let cfg = &function.cfg;
        let entry = cfg.entry_block;

        let rpo = reverse_postorder(cfg, entry);
        let rpo_index: FxHashMap<IrBlockId, usize> =
            rpo.iter().enumerate().map(|(i, &b)| (b, i)).collect();

        let mut idom: FxHashMap<IrBlockId, Option<IrBlockId>> =
            rpo.iter().map(|&b| (b, None)).collect();
        idom.insert(entry, Some(entry));

        let mut changed = true;
        while changed {
            changed = false;

            for &block in &rpo {
                if block == entry {
                    continue;
                }

                let predecessors = cfg
                    .get_block(block)
                    .map(|b| b.predecessors.as_slice())
                    .unwrap_or(&[]);

                let mut new_idom: Option<IrBlockId> = None;
                for &pred in predecessors {
                    if idom.get(&pred).copied().flatten().is_none() {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => pred,
                        Some(current) => intersect(current, pred, &idom, &rpo_index),
                    });
                }

                if new_idom != idom[&block] {
                    idom.insert(block, new_idom);
                    changed = true;
                }
            }
        }

        let final_idom: FxHashMap<IrBlockId, IrBlockId> = idom
            .into_iter()
            .filter_map(|(block, dom)| dom.filter(|_| block != entry).map(|d| (block, d)))
            .collect();

        // Children in RPO so tree walks are deterministic
        let mut children: FxHashMap<IrBlockId, Vec<IrBlockId>> = FxHashMap::default();
        for &block in &rpo {
            if let Some(&dom) = final_idom.get(&block) {
                children.entry(dom).or_default().push(block);
            }
        }

        let mut depth: FxHashMap<IrBlockId, usize> = FxHashMap::default();
        depth.insert(entry, 0);
        let mut queue: VecDeque<IrBlockId> = VecDeque::new();
        queue.push_back(entry);

        while let Some(block) = queue.pop_front() {
            let d = depth[&block];
            for &child in children.get(&block).map(Vec::as_slice).unwrap_or(&[]) {
                depth.insert(child, d + 1);
                queue.push_back(child);
            }
        }

        Self {
            idom: final_idom,
            children,
            depth,
            rpo,
            rpo_index,
            entry,
        }
    }

    /// Get the immediate dominator of a block.
    pub fn idom(&self, block: IrBlockId) -> Option<IrBlockId> {
        self.idom.get(&block).copied()
    }

    /// Get children of a block in the dominator tree.
    pub fn children(&self, block: IrBlockId) -> &[IrBlockId] {
        self.children.get(&block).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Get the depth of a block in the dominator tree.
    pub fn depth(&self, block: IrBlockId) -> usize {
        self.depth.get(&block).copied().unwrap_or(0)
    }

    /// Reachable blocks in reverse postorder.
    pub fn reverse_postorder(&self) -> &[IrBlockId] {
        &self.rpo
    }

    pub fn is_reachable(&self, block: IrBlockId) -> bool {
        self.rpo_index.contains_key(&block)
    }

    /// Check if block A dominates block B.
    pub fn dominates(&self, a: IrBlockId, b: IrBlockId) -> bool {
        if !self.is_reachable(b) {
            return false;
        }
        if a == b || a == self.entry {
            return true;
        }

        let mut current = b;
        while let Some(dom) = self.idom.get(&current) {
            if *dom == a {
                return true;
            }
            current = *dom;
        }
        false
    }

    /// Dominators of `block` from the entry down to `block` itself.
    pub fn dominator_chain(&self, block: IrBlockId) -> Vec<IrBlockId> {
        if !self.is_reachable(block) {
            return Vec::new();
        }
        let mut chain = vec![block];
        let mut current = block;
        while let Some(&dom) = self.idom.get(&current) {
            chain.push(dom);
            current = dom;
        }
        chain.reverse();
        chain
    }
}

/// Compute reverse postorder of the blocks reachable from `entry`.
///
/// Successors are explored in branch order; every block appears after all of
/// its forward-edge predecessors.
pub fn reverse_postorder(cfg: &IrControlFlowGraph, entry: IrBlockId) -> Vec<IrBlockId> {
    let mut visited = FxHashSet::default();
    let mut postorder = Vec::new();

    // (block, next successor to visit)
    let mut stack: Vec<(IrBlockId, usize)> = Vec::new();
    if cfg.get_block(entry).is_some() {
        visited.insert(entry);
        stack.push((entry, 0));
    }

    while let Some((block, next)) = stack.pop() {
        let succs = cfg
            .get_block(block)
            .map(|b| b.successors())
            .unwrap_or_default();

        if let Some(&succ) = succs.get(next) {
            stack.push((block, next + 1));
            if cfg.get_block(succ).is_some() && visited.insert(succ) {
                stack.push((succ, 0));
            }
        } else {
            postorder.push(block);
        }
    }

    postorder.reverse();
    postorder
}

/// Find intersection of two dominators in the dominator tree.
fn intersect(
    mut b1: IrBlockId,
    mut b2: IrBlockId,
    idom: &FxHashMap<IrBlockId, Option<IrBlockId>>,
    rpo_index: &FxHashMap<IrBlockId, usize>,
) -> IrBlockId {
    let index = |b: IrBlockId| rpo_index.get(&b).copied().unwrap_or(usize::MAX);

    while b1 != b2 {
        while index(b1) > index(b2) {
            match idom.get(&b1).copied().flatten() {
                Some(dom) => b1 = dom,
                None => return b1,
            }
        }
        while index(b2) > index(b1) {
            match idom.get(&b2).copied().flatten() {
                Some(dom) => b2 = dom,
                None => return b2,
            }
        }
    }
    b1
}

/// A natural loop in the control flow graph.
///
/// A natural loop is defined by a back edge (an edge from B to H where H dominates B).
/// The loop header is H, and the loop body contains all blocks from which H can be
/// reached without going through H.
#[derive(Debug, Clone)]
pub struct NaturalLoop {
    /// Loop header block (entry point of the loop)
    pub header: IrBlockId,

    /// Back edge sources (blocks with an edge back to the header)
    pub latches: Vec<IrBlockId>,

    /// All blocks in the loop body (including header)
    pub blocks: BTreeSet<IrBlockId>,
}

impl NaturalLoop {
    pub fn contains(&self, block: IrBlockId) -> bool {
        self.blocks.contains(&block)
    }

    /// Loop blocks in reverse postorder: the header first, then the body in
    /// the order one iteration executes it.
    pub fn blocks_in_rpo(&self, domtree: &DominatorTree) -> Vec<IrBlockId> {
        domtree
            .reverse_postorder()
            .iter()
            .copied()
            .filter(|b| self.blocks.contains(b))
            .collect()
    }
}

/// Loop nest information for a function.
#[derive(Debug, Clone)]
pub struct LoopNestInfo {
    /// All natural loops indexed by header block, in order of their first
    /// back edge. Back edges sharing a header are merged into one loop.
    pub loops: IndexMap<IrBlockId, NaturalLoop>,
}

impl LoopNestInfo {
    /// Analyze loops in a function.
    pub fn analyze(function: &IrFunction, domtree: &DominatorTree) -> Self {
        let cfg = &function.cfg;
        let mut loops: IndexMap<IrBlockId, NaturalLoop> = IndexMap::new();

        for (&block_id, block) in &cfg.blocks {
            for succ in block.successors() {
                // A back edge is an edge to a dominator
                if !domtree.dominates(succ, block_id) {
                    continue;
                }

                let body = find_loop_blocks(cfg, succ, block_id);
                match loops.get_mut(&succ) {
                    Some(existing) => {
                        existing.blocks.extend(body);
                        existing.latches.push(block_id);
                    }
                    None => {
                        loops.insert(
                            succ,
                            NaturalLoop {
                                header: succ,
                                latches: vec![block_id],
                                blocks: body,
                            },
                        );
                    }
                }
            }
        }

        Self { loops }
    }

    /// Check if a block is a loop header.
    pub fn is_loop_header(&self, block: IrBlockId) -> bool {
        self.loops.contains_key(&block)
    }
}

/// Find all blocks in a natural loop given header and back edge source.
fn find_loop_blocks(
    cfg: &IrControlFlowGraph,
    header: IrBlockId,
    back_edge_source: IrBlockId,
) -> BTreeSet<IrBlockId> {
    let mut loop_blocks = BTreeSet::new();
    loop_blocks.insert(header);

    if header == back_edge_source {
        return loop_blocks;
    }

    // Work backwards from back_edge_source to find all blocks that can reach header
    let mut worklist = vec![back_edge_source];
    loop_blocks.insert(back_edge_source);

    while let Some(block) = worklist.pop() {
        if let Some(b) = cfg.get_block(block) {
            for &pred in &b.predecessors {
                if loop_blocks.insert(pred) {
                    worklist.push(pred);
                }
            }
        }
    }

    loop_blocks
}

/// Mark loop headers in block metadata so the text dump can show them.
pub fn annotate_loop_headers(function: &mut IrFunction) {
    let domtree = DominatorTree::compute(function);
    let loop_info = LoopNestInfo::analyze(function, &domtree);
    for block in function.cfg.blocks.values_mut() {
        block.metadata.is_loop_header = loop_info.is_loop_header(block.id);
    }
}
