//! Trail-based backtracking over partial word graphs.
//!
//! The search owns a single partial word graph and a trail of edge
//! definitions. A [`PendingDef`] frame records a definition together with the
//! graph shape at the moment it was queued; installing a frame first rewinds
//! the trail to that shape, so frames taken in LIFO order walk the search
//! tree depth-first, and a frame handed to another thread along with a clone
//! of the state is self-contained.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::felsch::FelschIndex;
use crate::sims::two_sided::RuleTrail;
use crate::sims::Pruner;
use crate::word_graph::{Letter, Node, Word, WordGraph, UNDEFINED};

/// An edge definition waiting to be explored.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PendingDef {
    pub source: Node,
    pub letter: Letter,
    pub target: Node,
    /// Active nodes before this definition.
    pub num_nodes: u32,
    /// Trail length before this definition.
    pub num_edges: usize,
}

#[derive(Clone)]
pub(crate) struct SearchState {
    graph: WordGraph,
    /// Edge definitions in order of application.
    trail: Vec<(Node, Letter)>,
    /// `preds[t * out_degree + a]`: the sources of edges `_ -a-> t`, in
    /// trail order.
    preds: Vec<Vec<Node>>,
    /// `parent[n]`: the edge that created node `n`. Unused for the root.
    parent: Vec<(Node, Letter)>,
    /// Smallest permitted edge target. `1` for semigroup presentations,
    /// where node 0 stays the singleton class of the empty word.
    min_target: Node,
    index: Arc<FelschIndex>,
    pruners: Vec<Arc<dyn Pruner>>,
    /// Present on two-sided searches.
    dyn_rules: Option<RuleTrail>,
}

impl SearchState {
    pub fn new(
        index: Arc<FelschIndex>,
        pruners: Vec<Arc<dyn Pruner>>,
        capacity: u32,
        out_degree: u32,
        monoid: bool,
        two_sided: bool,
    ) -> Self {
        Self {
            graph: WordGraph::new(capacity, out_degree),
            trail: Vec::new(),
            preds: vec![Vec::new(); capacity as usize * out_degree as usize],
            parent: vec![(0, 0)],
            min_target: if monoid { 0 } else { 1 },
            index,
            pruners,
            dyn_rules: if two_sided {
                Some(RuleTrail::default())
            } else {
                None
            },
        }
    }

    pub fn graph(&self) -> &WordGraph {
        &self.graph
    }

    #[inline]
    fn pred_slot(&self, t: Node, a: Letter) -> usize {
        t as usize * self.graph.out_degree() as usize + a as usize
    }

    /// Rewinds to the frame's recorded shape, applies its definition, and
    /// propagates deductions. Returns false when the resulting branch is
    /// dead: a rule instance fails outright or a pruner rejects the graph.
    pub fn install(&mut self, pd: &PendingDef) -> bool {
        self.revert_to(pd.num_edges, pd.num_nodes);
        if pd.target == pd.num_nodes {
            match self.graph.new_node() {
                Some(n) => {
                    debug_assert_eq!(n, pd.target);
                    self.parent.push((pd.source, pd.letter));
                }
                None => return false,
            }
            self.push_definition(pd.source, pd.letter, pd.target, true);
        } else {
            self.push_definition(pd.source, pd.letter, pd.target, false);
        }
        self.propagate(pd.num_edges) && self.pruners.iter().all(|p| p.test(&self.graph))
    }

    fn revert_to(&mut self, num_edges: usize, num_nodes: u32) {
        while self.trail.len() > num_edges {
            let (s, a) = match self.trail.pop() {
                Some(def) => def,
                None => break,
            };
            let t = self.graph.raw_target(s, a);
            self.graph.undefine(s, a);
            let slot = self.pred_slot(t, a);
            let popped = self.preds[slot].pop();
            debug_assert_eq!(popped, Some(s));
        }
        if let Some(rules) = &mut self.dyn_rules {
            rules.revert_to(num_edges);
        }
        self.graph.shrink_to(num_nodes);
        self.parent.truncate(num_nodes as usize);
    }

    /// Records the edge `(s, a, t)` on the graph, trail, and predecessor
    /// lists. Non-tree edges of a two-sided search additionally yield the
    /// word pair `(w_s·a, w_t)` as a rule that must hold everywhere.
    fn push_definition(&mut self, s: Node, a: Letter, t: Node, tree: bool) {
        self.graph.define(s, a, t);
        let slot = self.pred_slot(t, a);
        self.preds[slot].push(s);
        self.trail.push((s, a));
        if !tree {
            if let Some(rules) = &mut self.dyn_rules {
                let mut lhs = tree_word(&self.parent, s);
                lhs.push(a);
                let rhs = tree_word(&self.parent, t);
                rules.push(lhs, rhs, self.trail.len() - 1);
            }
        }
    }

    /// Runs rule deductions to a fixed point starting from trail index
    /// `next`. Returns false on a collapse.
    fn propagate(&mut self, mut next: usize) -> bool {
        loop {
            while next < self.trail.len() {
                let (s, a) = self.trail[next];
                if !self.process_definition(s, a) {
                    return false;
                }
                next += 1;
            }
            if self.dyn_rules.is_some() && !self.sweep_dynamic_rules() {
                return false;
            }
            if next == self.trail.len() {
                return true;
            }
        }
    }

    /// Checks every short-rule instance that the edge out of `(s, a)` could
    /// have completed, forcing missing edges where an instance is one edge
    /// short.
    fn process_definition(&mut self, s: Node, a: Letter) -> bool {
        let index = Arc::clone(&self.index);
        let mut candidates = Vec::new();
        let mut scratch = Vec::new();
        for &occ in index.occurrences(a) {
            let (word, other) = index.instance(occ);
            self.candidates(s, &word[..occ.pos as usize], &mut candidates, &mut scratch);
            for i in 0..candidates.len() {
                let n = candidates[i];
                match check_instance(&self.graph, n, word, other) {
                    InstanceCheck::Collapse => return false,
                    InstanceCheck::Force(src, letter, tgt) => {
                        if !self.apply_force(src, letter, tgt) {
                            return false;
                        }
                    }
                    _ => {}
                }
            }
        }
        true
    }

    /// Checks every recorded two-sided rule at every node, forcing edges as
    /// for presentation rules. Newly forced definitions are left on the
    /// trail for [`propagate`](Self::propagate) to pick up, which also
    /// re-runs this sweep.
    fn sweep_dynamic_rules(&mut self) -> bool {
        let mut i = 0;
        while let Some((lhs, rhs)) = self.dyn_rules.as_ref().and_then(|r| r.get_cloned(i)) {
            for n in 0..self.graph.number_of_active_nodes() {
                match check_instance(&self.graph, n, &lhs, &rhs) {
                    InstanceCheck::Collapse => return false,
                    InstanceCheck::Force(src, letter, tgt) => {
                        if !self.apply_force(src, letter, tgt) {
                            return false;
                        }
                    }
                    _ => {}
                }
            }
            i += 1;
        }
        true
    }

    /// Applies a forced definition, or collapses if it conflicts with an
    /// edge defined since the force was computed.
    fn apply_force(&mut self, s: Node, a: Letter, t: Node) -> bool {
        if t < self.min_target {
            // Nothing may re-enter the class of the empty word.
            return false;
        }
        match self.graph.raw_target(s, a) {
            UNDEFINED => {
                self.push_definition(s, a, t, false);
                true
            }
            existing => existing == t,
        }
    }

    /// Collects into `out` every node `n` with `n -prefix-> s`, by walking
    /// the predecessor lists backwards along `prefix`.
    fn candidates(&self, s: Node, prefix: &[Letter], out: &mut Vec<Node>, scratch: &mut Vec<Node>) {
        out.clear();
        out.push(s);
        for &a in prefix.iter().rev() {
            scratch.clear();
            for &t in out.iter() {
                scratch.extend_from_slice(&self.preds[self.pred_slot(t, a)]);
            }
            std::mem::swap(out, scratch);
            if out.is_empty() {
                return;
            }
        }
    }

    /// Queues the child frames of the first undefined edge: existing targets
    /// in increasing order first off the stack, a fresh node last. Returns
    /// false when the graph is complete.
    pub fn expand(&self, frames: &mut VecDeque<PendingDef>) -> bool {
        let (source, letter) = match self.graph.first_undefined_edge() {
            Some(edge) => edge,
            None => return false,
        };
        let num_nodes = self.graph.number_of_active_nodes();
        let num_edges = self.trail.len();
        if num_nodes < self.graph.capacity() {
            frames.push_back(PendingDef {
                source,
                letter,
                target: num_nodes,
                num_nodes,
                num_edges,
            });
        }
        for target in (self.min_target..num_nodes).rev() {
            frames.push_back(PendingDef {
                source,
                letter,
                target,
                num_nodes,
                num_edges,
            });
        }
        true
    }

    /// Whether every long rule holds at every node. Only meaningful for
    /// complete graphs.
    pub fn long_rules_hold(&self) -> bool {
        self.index.long_rules().iter().all(|(lhs, rhs)| {
            self.graph
                .nodes()
                .all(|n| self.graph.follow(n, lhs) == self.graph.follow(n, rhs))
        })
    }
}

/// The word labelling the spanning-tree path from the root to `node`.
fn tree_word(parent: &[(Node, Letter)], node: Node) -> Word {
    let mut word = Vec::new();
    let mut n = node;
    while n != 0 {
        let (p, a) = parent[n as usize];
        word.push(a);
        n = p;
    }
    word.reverse();
    word
}

pub(crate) enum InstanceCheck {
    /// Both sides complete and agree, or too little is defined to tell.
    Ok,
    Incomplete,
    /// Both sides complete and disagree.
    Collapse,
    /// One side complete, the other exactly one edge short: the missing
    /// edge is forced.
    Force(Node, Letter, Node),
}

/// Examines the instance of the rule `lhs = rhs` anchored at `n`.
pub(crate) fn check_instance(
    graph: &WordGraph,
    n: Node,
    lhs: &[Letter],
    rhs: &[Letter],
) -> InstanceCheck {
    let (l_node, l_len) = follow_prefix(graph, n, lhs);
    let (r_node, r_len) = follow_prefix(graph, n, rhs);
    match (l_len == lhs.len(), r_len == rhs.len()) {
        (true, true) => {
            if l_node == r_node {
                InstanceCheck::Ok
            } else {
                InstanceCheck::Collapse
            }
        }
        (true, false) if r_len + 1 == rhs.len() => InstanceCheck::Force(r_node, rhs[r_len], l_node),
        (false, true) if l_len + 1 == lhs.len() => InstanceCheck::Force(l_node, lhs[l_len], r_node),
        _ => InstanceCheck::Incomplete,
    }
}

/// Follows `word` from `start` as far as the graph allows, returning the
/// last node reached and the number of letters consumed.
fn follow_prefix(graph: &WordGraph, start: Node, word: &[Letter]) -> (Node, usize) {
    let mut n = start;
    for (i, &a) in word.iter().enumerate() {
        match graph.target(n, a) {
            Some(t) => n = t,
            None => return (n, i),
        }
    }
    (n, word.len())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::presentation::Presentation;

    fn state_for(p: &Presentation, capacity: u32, two_sided: bool) -> SearchState {
        SearchState::new(
            Arc::new(FelschIndex::new(p, 0)),
            Vec::new(),
            capacity,
            p.alphabet_size(),
            p.contains_empty_word(),
            two_sided,
        )
    }

    #[test]
    fn forces_deductions_from_rules() {
        // <a | aa = a>: defining 0 -a-> 1 forces 1 -a-> 1.
        let mut p = Presentation::new(1);
        p.add_rule(&[0, 0], &[0]).unwrap();
        p.set_contains_empty_word(true);
        let mut state = state_for(&p, 2, false);

        let ok = state.install(&PendingDef {
            source: 0,
            letter: 0,
            target: 1,
            num_nodes: 1,
            num_edges: 0,
        });
        assert!(ok);
        assert_eq!(state.graph().target(1, 0), Some(1));
        assert!(state.graph().is_complete());
    }

    #[test]
    fn forces_two_cycle_from_involution_rule() {
        // <a | aa = empty>: defining 0 -a-> 1 forces 1 -a-> 0.
        let mut p = Presentation::new(1);
        p.set_contains_empty_word(true);
        p.add_rule(&[0, 0], &[]).unwrap();
        let mut state = state_for(&p, 2, false);

        assert!(state.install(&PendingDef {
            source: 0,
            letter: 0,
            target: 1,
            num_nodes: 1,
            num_edges: 0,
        }));
        // aa = empty at node 0 forces 1 -a-> 0.
        assert_eq!(state.graph().target(1, 0), Some(0));
        assert!(state.graph().is_complete());
    }

    #[test]
    fn revert_restores_previous_shape() {
        let mut p = Presentation::new(2);
        p.set_contains_empty_word(true);
        let mut state = state_for(&p, 3, false);

        let root_frame = PendingDef {
            source: 0,
            letter: 0,
            target: 1,
            num_nodes: 1,
            num_edges: 0,
        };
        assert!(state.install(&root_frame));
        assert!(state.install(&PendingDef {
            source: 0,
            letter: 1,
            target: 2,
            num_nodes: 2,
            num_edges: 1,
        }));
        assert_eq!(state.graph().number_of_active_nodes(), 3);

        // Installing a sibling of the first frame rewinds everything.
        assert!(state.install(&PendingDef {
            source: 0,
            letter: 0,
            target: 0,
            num_nodes: 1,
            num_edges: 0,
        }));
        assert_eq!(state.graph().number_of_active_nodes(), 1);
        assert_eq!(state.graph().target(0, 0), Some(0));
        assert_eq!(state.graph().target(0, 1), None);
    }

    #[test]
    fn expand_orders_targets_existing_first() {
        let p = Presentation::new(1);
        let mut monoid = p.clone();
        monoid.set_contains_empty_word(true);
        let state = state_for(&monoid, 3, false);
        let mut frames = VecDeque::new();
        assert!(state.expand(&mut frames));
        // Pop order: target 0, then the fresh node.
        assert_eq!(frames.pop_back().map(|f| f.target), Some(0));
        assert_eq!(frames.pop_back().map(|f| f.target), Some(1));
        assert!(frames.is_empty());

        // Semigroup presentations never target the root.
        let state = state_for(&p, 3, false);
        let mut frames = VecDeque::new();
        assert!(state.expand(&mut frames));
        assert_eq!(frames.pop_back().map(|f| f.target), Some(1));
        assert!(frames.is_empty());
    }

    #[test]
    fn two_sided_edges_record_rules() {
        let mut p = Presentation::new(2);
        p.set_contains_empty_word(true);
        let mut state = state_for(&p, 2, true);

        // Tree edge: no rule.
        assert!(state.install(&PendingDef {
            source: 0,
            letter: 0,
            target: 1,
            num_nodes: 1,
            num_edges: 0,
        }));
        // Non-tree edge 1 -b-> 0 records (ab, empty), which must hold at
        // node 1 too once the graph fills in.
        assert!(state.install(&PendingDef {
            source: 1,
            letter: 1,
            target: 0,
            num_nodes: 2,
            num_edges: 1,
        }));
        let rules = state.dyn_rules.as_ref().unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules.get_cloned(0), Some((vec![0, 1], vec![])));
    }
}
