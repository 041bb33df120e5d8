//! Finite monoid and semigroup presentations.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::word_graph::{Letter, Word};
use crate::Error;

/// A finite presentation: an alphabet `0..alphabet_size` and a list of
/// defining rules, each a pair of words.
///
/// When [`contains_empty_word`](Presentation::contains_empty_word) is true
/// the presentation defines a monoid and rule sides may be empty; otherwise
/// it defines a semigroup and every rule side must be non-empty.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct Presentation {
    alphabet_size: u32,
    /// Flat list of rule sides; `rules[2 * i]` and `rules[2 * i + 1]` are the
    /// two sides of rule `i`.
    rules: Vec<Word>,
    contains_empty_word: bool,
}

impl Presentation {
    pub fn new(alphabet_size: u32) -> Self {
        Self {
            alphabet_size,
            rules: Vec::new(),
            contains_empty_word: false,
        }
    }

    pub fn alphabet_size(&self) -> u32 {
        self.alphabet_size
    }

    pub fn contains_empty_word(&self) -> bool {
        self.contains_empty_word
    }

    pub fn set_contains_empty_word(&mut self, yes: bool) -> &mut Self {
        self.contains_empty_word = yes;
        self
    }

    /// Appends a rule. Letters must be in range; whether empty sides are
    /// permitted is only decided by [`validate`](Presentation::validate),
    /// since the empty-word flag may be set after rules are added.
    pub fn add_rule(&mut self, lhs: &[Letter], rhs: &[Letter]) -> Result<&mut Self, Error> {
        for &a in lhs.iter().chain(rhs) {
            if a >= self.alphabet_size {
                return Err(Error::InvalidPresentation(format!(
                    "letter {} out of range for alphabet of size {}",
                    a, self.alphabet_size
                )));
            }
        }
        self.rules.push(lhs.to_vec());
        self.rules.push(rhs.to_vec());
        Ok(self)
    }

    /// The rule sides, flat. Always of even length.
    pub fn rules(&self) -> &[Word] {
        &self.rules
    }

    /// Iterator over the rules as `(lhs, rhs)` pairs.
    pub fn rule_pairs(&self) -> impl Iterator<Item = (&[Letter], &[Letter])> {
        self.rules.chunks_exact(2).map(|c| (&c[0][..], &c[1][..]))
    }

    pub fn number_of_rules(&self) -> usize {
        self.rules.len() / 2
    }

    /// Sum of the lengths of all rule sides.
    pub fn length(&self) -> usize {
        self.rules.iter().map(Vec::len).sum()
    }

    /// Checks the structural invariants: a non-empty alphabet, letters in
    /// range, and empty rule sides only when the empty word is present.
    pub fn validate(&self) -> Result<(), Error> {
        if self.alphabet_size == 0 {
            return Err(Error::InvalidPresentation(
                "the alphabet must be non-empty".to_owned(),
            ));
        }
        debug_assert!(self.rules.len() % 2 == 0);
        for word in &self.rules {
            if word.is_empty() && !self.contains_empty_word {
                return Err(Error::InvalidPresentation(
                    "empty rule side in a presentation without the empty word".to_owned(),
                ));
            }
            for &a in word {
                if a >= self.alphabet_size {
                    return Err(Error::InvalidPresentation(format!(
                        "letter {} out of range for alphabet of size {}",
                        a, self.alphabet_size
                    )));
                }
            }
        }
        Ok(())
    }

    /// Removes rules that duplicate an earlier rule, in either order.
    pub fn remove_duplicate_rules(&mut self) {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(self.rules.len());
        for pair in self.rules.chunks_exact(2) {
            let key = if shortlex_cmp(&pair[0], &pair[1]) == Ordering::Less {
                (pair[1].clone(), pair[0].clone())
            } else {
                (pair[0].clone(), pair[1].clone())
            };
            if seen.insert(key) {
                kept.push(pair[0].clone());
                kept.push(pair[1].clone());
            }
        }
        self.rules = kept;
    }

    /// Swaps rule sides so that the shortlex-greater side comes first.
    pub fn sort_each_rule(&mut self) {
        for pair in self.rules.chunks_exact_mut(2) {
            if shortlex_cmp(&pair[0], &pair[1]) == Ordering::Less {
                pair.swap(0, 1);
            }
        }
    }

    /// Sorts the rules by shortlex of their sides.
    pub fn sort_rules(&mut self) {
        let mut pairs: Vec<(Word, Word)> = self
            .rules
            .chunks_exact(2)
            .map(|c| (c[0].clone(), c[1].clone()))
            .collect();
        pairs.sort_by(|x, y| {
            shortlex_cmp(&x.0, &y.0).then_with(|| shortlex_cmp(&x.1, &y.1))
        });
        self.rules.clear();
        for (lhs, rhs) in pairs {
            self.rules.push(lhs);
            self.rules.push(rhs);
        }
    }
}

/// Shortlex order: shorter words first, ties broken lexicographically.
pub(crate) fn shortlex_cmp(x: &[Letter], y: &[Letter]) -> Ordering {
    x.len().cmp(&y.len()).then_with(|| x.cmp(y))
}
