//! Minimal faithful representations by repeated shrinking searches.

use crate::presentation::Presentation;
use crate::sims::{Sims1, SimsRefinerFaithful};
use crate::word_graph::{Word, WordGraph};
use crate::Error;

/// Searches for a right congruence word graph of minimal degree on which the
/// monoid or semigroup acts faithfully.
///
/// Faithfulness is certified through `forbidden_pairs`: pairs of words known
/// to represent distinct elements. An action that identifies some forbidden
/// pair at every point is rejected, so listing a pair for every two distinct
/// elements makes the result a genuine minimal faithful representation.
pub struct MinimalRepOrc {
    presentation: Option<Presentation>,
    forbid: Vec<(Word, Word)>,
    target_size: u32,
    threads: usize,
    long_rule_length: usize,
}

impl MinimalRepOrc {
    pub fn new() -> Self {
        Self {
            presentation: None,
            forbid: Vec::new(),
            target_size: 0,
            threads: 1,
            long_rule_length: 0,
        }
    }

    pub fn presentation(&mut self, p: Presentation) -> Result<&mut Self, Error> {
        p.validate()?;
        self.presentation = Some(p);
        Ok(self)
    }

    /// The number of elements of the monoid or semigroup; the first search
    /// is capped here, so a faithful action of that degree always exists.
    pub fn target_size(&mut self, size: u32) -> &mut Self {
        self.target_size = size;
        self
    }

    /// Declares `lhs` and `rhs` to be distinct elements.
    pub fn add_forbidden_pair(&mut self, lhs: Word, rhs: Word) -> &mut Self {
        self.forbid.push((lhs, rhs));
        self
    }

    pub fn number_of_threads(&mut self, n: usize) -> Result<&mut Self, Error> {
        if n == 0 {
            return Err(Error::InvalidConfiguration(
                "the number of threads must be positive".to_owned(),
            ));
        }
        self.threads = n;
        Ok(self)
    }

    pub fn long_rule_length(&mut self, len: usize) -> &mut Self {
        self.long_rule_length = len;
        self
    }

    /// Runs the shrinking searches and returns the smallest faithful word
    /// graph found, or the empty graph when even the first search fails.
    pub fn word_graph(&mut self) -> Result<WordGraph, Error> {
        let p = self.presentation.clone().ok_or_else(|| {
            Error::InvalidConfiguration("no presentation has been set".to_owned())
        })?;
        if self.target_size == 0 {
            return Err(Error::InvalidConfiguration(
                "the target size must be positive".to_owned(),
            ));
        }
        // For semigroup presentations the graph carries an extra node for
        // the class of the empty word, which does not count towards the
        // degree of the action.
        let offset = if p.contains_empty_word() { 0 } else { 1 };
        let mut best = WordGraph::empty(p.alphabet_size());
        let mut cap = self.target_size;
        loop {
            let graph = self.search(&p, cap)?;
            if graph.number_of_active_nodes() == 0 {
                break;
            }
            let degree = graph.number_of_active_nodes() - offset;
            log::debug!(
                "Found a faithful action of degree {} (cap was {})",
                degree,
                cap
            );
            best = graph;
            if degree <= 1 {
                break;
            }
            cap = degree - 1;
        }
        Ok(best)
    }

    fn search(&self, p: &Presentation, cap: u32) -> Result<WordGraph, Error> {
        let mut sims = Sims1::new();
        sims.presentation(p.clone())?;
        sims.long_rule_length(self.long_rule_length)?;
        sims.number_of_threads(self.threads)?;
        sims.add_pruner(SimsRefinerFaithful::new(self.forbid.clone()))?;
        sims.find_if(cap, |_: &WordGraph| true)
    }
}

impl Default for MinimalRepOrc {
    fn default() -> Self {
        Self::new()
    }
}
