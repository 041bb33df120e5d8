//! Occurrence index over the short rules of a presentation.
//!
//! The backtracking search reacts to each new edge `(s, a, t)` by locating
//! every rule instance that the edge could complete. This index answers "in
//! which rule sides, and where, does the letter `a` occur" so that the search
//! only walks candidate instances instead of re-checking every rule at every
//! node.

use crate::presentation::Presentation;
use crate::word_graph::{Letter, Word};

/// A single occurrence of a letter inside a short rule side.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Occurrence {
    /// Index into [`FelschIndex::rules`].
    pub rule: u32,
    /// Which side of the rule the letter occurs in: 0 for lhs, 1 for rhs.
    pub side: u8,
    /// Offset of the letter within that side.
    pub pos: u32,
}

pub(crate) struct FelschIndex {
    /// Rules short enough to propagate during the search.
    rules: Vec<(Word, Word)>,
    /// Rules of combined length at least `long_rule_length`, only checked
    /// once a word graph is complete.
    long_rules: Vec<(Word, Word)>,
    /// Occurrence lists, one per letter.
    occurrences: Vec<Vec<Occurrence>>,
}

impl FelschIndex {
    /// Builds the index. `long_rule_length == 0` makes every rule short.
    pub fn new(presentation: &Presentation, long_rule_length: usize) -> Self {
        let mut rules = Vec::new();
        let mut long_rules = Vec::new();
        for (lhs, rhs) in presentation.rule_pairs() {
            let pair = (lhs.to_vec(), rhs.to_vec());
            if long_rule_length > 0 && lhs.len() + rhs.len() >= long_rule_length {
                long_rules.push(pair);
            } else {
                rules.push(pair);
            }
        }

        let mut occurrences = vec![Vec::new(); presentation.alphabet_size() as usize];
        for (r, (lhs, rhs)) in rules.iter().enumerate() {
            for (side, word) in [(0u8, lhs), (1u8, rhs)] {
                for (pos, &a) in word.iter().enumerate() {
                    occurrences[a as usize].push(Occurrence {
                        rule: r as u32,
                        side,
                        pos: pos as u32,
                    });
                }
            }
        }
        // Occurrences furthest from the end of their word first, so that
        // instances with the longest remaining suffix are walked first.
        for list in &mut occurrences {
            list.sort_by_key(|occ| {
                let (lhs, rhs) = &rules[occ.rule as usize];
                let len = if occ.side == 0 { lhs.len() } else { rhs.len() };
                std::cmp::Reverse(len - occ.pos as usize)
            });
        }

        Self {
            rules,
            long_rules,
            occurrences,
        }
    }

    pub fn occurrences(&self, a: Letter) -> &[Occurrence] {
        &self.occurrences[a as usize]
    }

    /// The rule of an occurrence, as `(containing side, other side)`.
    pub fn instance(&self, occ: Occurrence) -> (&[Letter], &[Letter]) {
        let (lhs, rhs) = &self.rules[occ.rule as usize];
        if occ.side == 0 {
            (lhs, rhs)
        } else {
            (rhs, lhs)
        }
    }

    pub fn long_rules(&self) -> &[(Word, Word)] {
        &self.long_rules
    }
}
