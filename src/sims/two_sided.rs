//! Rules discovered during two-sided searches.
//!
//! A complete word graph found by a right-congruence search also describes a
//! two-sided congruence exactly when, for every non-tree edge `s -a-> t`, the
//! word pair `(w_s·a, w_t)` built from spanning-tree words holds at every
//! node of the graph, the same way presentation rules must. These pairs are
//! recorded as the edges that give rise to them are defined, and discarded
//! again when the trail is rewound past their defining edge.

use crate::word_graph::{Letter, Word};

#[derive(Clone, Debug)]
struct DynamicRule {
    lhs: Word,
    rhs: Word,
    /// Trail index of the edge definition that produced this rule.
    created_at: usize,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct RuleTrail {
    /// In increasing `created_at` order.
    rules: Vec<DynamicRule>,
}

impl RuleTrail {
    pub fn push(&mut self, lhs: Word, rhs: Word, created_at: usize) {
        debug_assert!(self
            .rules
            .last()
            .map_or(true, |r| r.created_at <= created_at));
        self.rules.push(DynamicRule {
            lhs,
            rhs,
            created_at,
        });
    }

    /// Drops every rule whose defining edge is at trail index `trail_len` or
    /// beyond.
    pub fn revert_to(&mut self, trail_len: usize) {
        while self
            .rules
            .last()
            .map_or(false, |r| r.created_at >= trail_len)
        {
            self.rules.pop();
        }
    }

    pub fn get_cloned(&self, i: usize) -> Option<(Word, Word)> {
        self.rules.get(i).map(|r| (r.lhs.clone(), r.rhs.clone()))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn revert_drops_newer_rules() {
        let mut rules = RuleTrail::default();
        rules.push(vec![0], vec![1], 2);
        rules.push(vec![0, 0], vec![], 5);
        rules.push(vec![1], vec![0, 1], 5);
        rules.push(vec![1, 1], vec![1], 9);
        assert_eq!(rules.len(), 4);

        rules.revert_to(9);
        assert_eq!(rules.len(), 3);
        rules.revert_to(5);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules.get_cloned(0), Some((vec![0], vec![1])));
        rules.revert_to(0);
        assert_eq!(rules.len(), 0);
    }
}
