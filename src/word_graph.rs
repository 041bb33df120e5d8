//! Complete and partial deterministic word graphs.

use serde::{Deserialize, Serialize};

use crate::Error;

/// A node of a [`WordGraph`].
pub type Node = u32;
/// A letter of a presentation alphabet, in the range `0..alphabet_size`.
pub type Letter = u32;
/// A word over a presentation alphabet.
pub type Word = Vec<Letter>;

/// Sentinel for an undefined edge target.
pub(crate) const UNDEFINED: u32 = u32::MAX;

/// A deterministic word graph with a fixed out-degree.
///
/// Nodes `0..number_of_active_nodes()` are active; every active node has
/// `out_degree()` edge slots, each of which is either undefined or points at
/// an active node. A complete word graph with root `0` describes a right
/// congruence of the monoid acting on its classes: the class of the empty
/// word is node `0`, and the edge `(s, a)` leads to the class of `w·a` where
/// `w` is any word whose class is `s`.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub struct WordGraph {
    out_degree: u32,
    active: u32,
    /// Row-major: the target of edge `(s, a)` is `targets[s * out_degree + a]`.
    targets: Vec<u32>,
}

impl WordGraph {
    /// A graph with a single active node (the root) and room for `capacity`
    /// nodes in total, all edges undefined.
    pub fn new(capacity: u32, out_degree: u32) -> Self {
        assert!(capacity >= 1);
        Self {
            out_degree,
            active: 1,
            targets: vec![UNDEFINED; capacity as usize * out_degree as usize],
        }
    }

    /// The graph with no nodes at all, returned by searches that find
    /// nothing.
    pub fn empty(out_degree: u32) -> Self {
        Self {
            out_degree,
            active: 0,
            targets: Vec::new(),
        }
    }

    pub fn out_degree(&self) -> u32 {
        self.out_degree
    }

    pub fn number_of_active_nodes(&self) -> u32 {
        self.active
    }

    /// Total number of nodes this graph has room for.
    pub fn capacity(&self) -> u32 {
        if self.out_degree == 0 {
            self.active
        } else {
            (self.targets.len() / self.out_degree as usize) as u32
        }
    }

    /// Iterator over the active nodes.
    pub fn nodes(&self) -> impl Iterator<Item = Node> {
        0..self.active
    }

    #[inline]
    fn slot(&self, s: Node, a: Letter) -> usize {
        debug_assert!(s < self.active);
        debug_assert!(a < self.out_degree);
        s as usize * self.out_degree as usize + a as usize
    }

    /// The target of edge `(s, a)`, or `None` if it is undefined.
    #[inline]
    pub fn target(&self, s: Node, a: Letter) -> Option<Node> {
        match self.targets[self.slot(s, a)] {
            UNDEFINED => None,
            t => Some(t),
        }
    }

    #[inline]
    pub(crate) fn raw_target(&self, s: Node, a: Letter) -> u32 {
        self.targets[self.slot(s, a)]
    }

    /// Defines edge `(s, a)` to point at `t`. The edge must currently be
    /// undefined and `t` must be active.
    pub fn define(&mut self, s: Node, a: Letter, t: Node) {
        debug_assert!(t < self.active);
        let slot = self.slot(s, a);
        debug_assert_eq!(self.targets[slot], UNDEFINED);
        self.targets[slot] = t;
    }

    pub(crate) fn undefine(&mut self, s: Node, a: Letter) {
        let slot = self.slot(s, a);
        debug_assert_ne!(self.targets[slot], UNDEFINED);
        self.targets[slot] = UNDEFINED;
    }

    /// Activates a fresh node with all edges undefined, returning it, or
    /// `None` if the graph is at capacity.
    pub fn new_node(&mut self) -> Option<Node> {
        if self.active == self.capacity() {
            return None;
        }
        let n = self.active;
        self.active += 1;
        Some(n)
    }

    /// Deactivates nodes `active..` down to `active`. Edges out of the
    /// deactivated rows must already be undefined, as must edges into them.
    pub(crate) fn shrink_to(&mut self, active: u32) {
        debug_assert!(active <= self.active);
        self.active = active;
    }

    /// Follows `word` from `start`, returning the node reached, or `None` if
    /// some edge along the way is undefined.
    pub fn follow(&self, start: Node, word: &[Letter]) -> Option<Node> {
        let mut n = start;
        for &a in word {
            n = self.target(n, a)?;
        }
        Some(n)
    }

    /// Whether every edge out of an active node is defined.
    pub fn is_complete(&self) -> bool {
        let live = self.active as usize * self.out_degree as usize;
        self.targets[..live].iter().all(|&t| t != UNDEFINED)
    }

    /// The first undefined edge in row-major order, if any.
    pub fn first_undefined_edge(&self) -> Option<(Node, Letter)> {
        let live = self.active as usize * self.out_degree as usize;
        self.targets[..live]
            .iter()
            .position(|&t| t == UNDEFINED)
            .map(|i| {
                (
                    (i / self.out_degree as usize) as Node,
                    (i % self.out_degree as usize) as Letter,
                )
            })
    }

    /// Iterator over the undefined edges of active nodes, row-major.
    pub fn undefined_edges(&self) -> impl Iterator<Item = (Node, Letter)> + '_ {
        let out_degree = self.out_degree as usize;
        let live = self.active as usize * out_degree;
        self.targets[..live]
            .iter()
            .enumerate()
            .filter(|(_, &t)| t == UNDEFINED)
            .map(move |(i, _)| ((i / out_degree) as Node, (i % out_degree) as Letter))
    }

    /// Relabels the active nodes according to `perm`: node `n` becomes
    /// `perm[n]`. `perm` must be a permutation of `0..active`.
    pub fn permute_nodes(&self, perm: &[Node]) -> WordGraph {
        debug_assert_eq!(perm.len(), self.active as usize);
        let mut out = self.clone();
        for s in self.nodes() {
            for a in 0..self.out_degree {
                let slot = out.slot(perm[s as usize], a);
                out.targets[slot] = match self.target(s, a) {
                    Some(t) => perm[t as usize],
                    None => UNDEFINED,
                };
            }
        }
        out
    }

    /// A copy with capacity shrunk to the number of active nodes.
    pub fn trimmed(&self) -> WordGraph {
        let live = self.active as usize * self.out_degree as usize;
        WordGraph {
            out_degree: self.out_degree,
            active: self.active,
            targets: self.targets[..live].to_vec(),
        }
    }

    /// Serialises as `active`, `out_degree`, then the row-major targets of
    /// the active nodes, each a little-endian `u32` with `0xFFFF_FFFF` for an
    /// undefined target.
    pub fn to_bytes(&self) -> Vec<u8> {
        let live = self.active as usize * self.out_degree as usize;
        let mut out = Vec::with_capacity(8 + 4 * live);
        out.extend_from_slice(&self.active.to_le_bytes());
        out.extend_from_slice(&self.out_degree.to_le_bytes());
        for &t in &self.targets[..live] {
            out.extend_from_slice(&t.to_le_bytes());
        }
        out
    }

    /// Inverse of [`WordGraph::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<WordGraph, Error> {
        let word = |i: usize| -> Result<u32, Error> {
            let chunk = bytes
                .get(4 * i..4 * i + 4)
                .ok_or_else(|| Error::InvalidWordGraph("truncated input".to_owned()))?;
            let mut buf = [0; 4];
            buf.copy_from_slice(chunk);
            Ok(u32::from_le_bytes(buf))
        };
        let active = word(0)?;
        let out_degree = word(1)?;
        // The product cannot overflow in u64, so crafted headers fail the
        // length check instead of wrapping.
        let live = u64::from(active) * u64::from(out_degree);
        let payload = bytes.len() - 8;
        if payload % 4 != 0 || payload as u64 / 4 != live {
            return Err(Error::InvalidWordGraph(format!(
                "expected {} edge targets, found {} bytes after the header",
                live, payload
            )));
        }
        let live = live as usize;
        let mut targets = Vec::with_capacity(live);
        for i in 0..live {
            let t = word(2 + i)?;
            if t != UNDEFINED && t >= active {
                return Err(Error::InvalidWordGraph(format!(
                    "target {} out of range for {} active nodes",
                    t, active
                )));
            }
            targets.push(t);
        }
        Ok(WordGraph {
            out_degree,
            active,
            targets,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // The two-node graph for <a, b | ...> with 0 -a-> 1, 0 -b-> 0, and both
    // edges of 1 looping at 1.
    fn two_node_graph() -> WordGraph {
        let mut g = WordGraph::new(2, 2);
        let n = g.new_node().unwrap();
        g.define(0, 0, n);
        g.define(0, 1, 0);
        g.define(n, 0, n);
        g.define(n, 1, n);
        g
    }

    #[test]
    fn follows_paths() {
        let g = two_node_graph();
        assert_eq!(g.follow(0, &[]), Some(0));
        assert_eq!(g.follow(0, &[1, 1, 0]), Some(1));
        assert_eq!(g.follow(0, &[0, 1]), Some(1));

        let mut partial = WordGraph::new(2, 2);
        partial.define(0, 0, 0);
        assert_eq!(partial.follow(0, &[0, 1]), None);
    }

    #[test]
    fn finds_undefined_edges() {
        let mut g = WordGraph::new(2, 2);
        assert_eq!(g.first_undefined_edge(), Some((0, 0)));
        g.define(0, 0, 0);
        assert_eq!(g.first_undefined_edge(), Some((0, 1)));
        assert!(!g.is_complete());
        assert_eq!(g.undefined_edges().collect::<Vec<_>>(), vec![(0, 1)]);
        g.define(0, 1, 0);
        assert!(g.is_complete());
        assert_eq!(g.first_undefined_edge(), None);

        // Capacity-2 graph with one active node: the inactive row does not
        // count as undefined edges.
        assert_eq!(g.capacity(), 2);
        assert_eq!(g.undefined_edges().count(), 0);
    }

    #[test]
    fn permutes_nodes() {
        let g = two_node_graph();
        let h = g.permute_nodes(&[1, 0]);
        assert_eq!(h.target(1, 0), Some(0));
        assert_eq!(h.target(1, 1), Some(1));
        assert_eq!(h.target(0, 0), Some(0));
        assert_eq!(h.target(0, 1), Some(0));
        assert_eq!(h.permute_nodes(&[1, 0]), g);
    }

    #[test]
    fn binary_round_trip() {
        let g = two_node_graph();
        let bytes = g.to_bytes();
        assert_eq!(
            bytes,
            vec![
                2, 0, 0, 0, // active
                2, 0, 0, 0, // out degree
                1, 0, 0, 0, // 0 -a-> 1
                0, 0, 0, 0, // 0 -b-> 0
                1, 0, 0, 0, // 1 -a-> 1
                1, 0, 0, 0, // 1 -b-> 1
            ]
        );
        assert_eq!(WordGraph::from_bytes(&bytes).unwrap(), g);

        let partial = WordGraph::new(1, 1);
        let bytes = partial.to_bytes();
        assert_eq!(bytes[8..12], [0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(WordGraph::from_bytes(&bytes).unwrap().target(0, 0), None);
    }

    #[test]
    fn rejects_malformed_bytes() {
        assert!(WordGraph::from_bytes(&[1, 2, 3]).is_err());
        // Target out of range.
        let mut bytes = two_node_graph().to_bytes();
        bytes[8] = 7;
        assert!(WordGraph::from_bytes(&bytes).is_err());
        // Trailing garbage.
        let mut bytes = two_node_graph().to_bytes();
        bytes.push(0);
        assert!(WordGraph::from_bytes(&bytes).is_err());
        // A header whose node count times out-degree exceeds usize must be
        // rejected, not allocated.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0x8000_0000u32.to_le_bytes());
        bytes.extend_from_slice(&0x8000_0000u32.to_le_bytes());
        assert!(WordGraph::from_bytes(&bytes).is_err());
    }

    #[test]
    fn serde_round_trip() {
        let g = two_node_graph();
        let json = serde_json::to_string(&g).unwrap();
        assert_eq!(serde_json::from_str::<WordGraph>(&json).unwrap(), g);
    }
}
