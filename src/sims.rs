//! Backtracking enumeration of low-index congruences.
//!
//! [`Sims1`] enumerates the right congruences of a finitely presented monoid
//! or semigroup with at most `n` classes, and [`Sims2`] the two-sided
//! congruences, by depth-first search over partial word graphs. Every
//! complete, rule-compatible word graph on at most `n` nodes with a fixed
//! root corresponds to exactly one congruence, so the searches neither miss
//! nor repeat any.

mod orc;
mod search;
mod two_sided;
mod worker;

pub use orc::MinimalRepOrc;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::felsch::FelschIndex;
use crate::presentation::Presentation;
use crate::word_graph::{Word, WordGraph};
use crate::Error;
use search::{PendingDef, SearchState};

/// A test applied to every partial word graph the search builds.
///
/// Returning `false` discards the graph and the whole subtree below it, so a
/// pruner must only reject when every completion of the graph is
/// unwanted. Closures `Fn(&WordGraph) -> bool` are pruners.
pub trait Pruner: Send + Sync {
    fn test(&self, graph: &WordGraph) -> bool;
}

impl<F> Pruner for F
where
    F: Fn(&WordGraph) -> bool + Send + Sync,
{
    fn test(&self, graph: &WordGraph) -> bool {
        self(graph)
    }
}

/// Prunes branches whose congruences cannot act faithfully.
///
/// `forbid` holds pairs of words that are distinct in the monoid. A graph is
/// rejected when some pair acts identically on every node and no further
/// node can ever distinguish them, i.e. the graph can no longer grow.
pub struct SimsRefinerFaithful {
    forbid: Vec<(Word, Word)>,
}

impl SimsRefinerFaithful {
    pub fn new(forbid: Vec<(Word, Word)>) -> Self {
        Self { forbid }
    }
}

impl Pruner for SimsRefinerFaithful {
    fn test(&self, graph: &WordGraph) -> bool {
        // While fresh nodes can still appear, a pair collapsed on the
        // current nodes may yet be separated by a later one.
        let frozen = graph.number_of_active_nodes() == graph.capacity() || graph.is_complete();
        if !frozen {
            return true;
        }
        for (u, v) in &self.forbid {
            let identical = graph.nodes().all(|n| {
                match (graph.follow(n, u), graph.follow(n, v)) {
                    (Some(x), Some(y)) => x == y,
                    _ => false,
                }
            });
            if identical {
                return false;
            }
        }
        true
    }
}

/// Settings and machinery shared by [`Sims1`] and [`Sims2`].
struct SimsCore {
    two_sided: bool,
    presentation: Option<Presentation>,
    long_rule_length: usize,
    threads: usize,
    idle_thread_restarts: usize,
    timeout: Option<Duration>,
    pruners: Vec<Arc<dyn Pruner>>,
    /// Set by the first search; the presentation, pruners, and long rule
    /// length may not change afterwards.
    frozen: bool,
    /// Whether the most recent search was cut short by the timeout.
    stopped: bool,
}

impl SimsCore {
    fn new(two_sided: bool) -> Self {
        Self {
            two_sided,
            presentation: None,
            long_rule_length: 0,
            threads: 1,
            idle_thread_restarts: 64,
            timeout: None,
            pruners: Vec::new(),
            frozen: false,
            stopped: false,
        }
    }

    fn ensure_unfrozen(&self, what: &str) -> Result<(), Error> {
        if self.frozen {
            Err(Error::InvalidConfiguration(format!(
                "cannot change the {} after a search has run",
                what
            )))
        } else {
            Ok(())
        }
    }

    fn set_presentation(&mut self, p: Presentation) -> Result<(), Error> {
        self.ensure_unfrozen("presentation")?;
        p.validate()?;
        self.presentation = Some(p);
        Ok(())
    }

    fn set_long_rule_length(&mut self, len: usize) -> Result<(), Error> {
        self.ensure_unfrozen("long rule length")?;
        self.long_rule_length = len;
        Ok(())
    }

    fn set_threads(&mut self, n: usize) -> Result<(), Error> {
        if n == 0 {
            return Err(Error::InvalidConfiguration(
                "the number of threads must be positive".to_owned(),
            ));
        }
        self.threads = n;
        Ok(())
    }

    fn set_idle_thread_restarts(&mut self, n: usize) -> Result<(), Error> {
        if n == 0 {
            return Err(Error::InvalidConfiguration(
                "the number of idle thread restarts must be positive".to_owned(),
            ));
        }
        self.idle_thread_restarts = n;
        Ok(())
    }

    fn add_pruner(&mut self, pruner: Arc<dyn Pruner>) -> Result<(), Error> {
        self.ensure_unfrozen("pruners")?;
        self.pruners.push(pruner);
        Ok(())
    }

    fn number_of_long_rules(&self) -> usize {
        match (&self.presentation, self.long_rule_length) {
            (Some(p), len) if len > 0 => p
                .rule_pairs()
                .filter(|(lhs, rhs)| lhs.len() + rhs.len() >= len)
                .count(),
            _ => 0,
        }
    }

    /// Builds the root search state for a run capped at `n` classes,
    /// freezing the settings.
    fn root_state(&mut self, n: u32) -> Result<SearchState, Error> {
        if n == 0 {
            return Err(Error::InvalidConfiguration(
                "at least one congruence class is required".to_owned(),
            ));
        }
        let p = self.presentation.as_ref().ok_or_else(|| {
            Error::InvalidConfiguration("no presentation has been set".to_owned())
        })?;
        self.frozen = true;
        let monoid = p.contains_empty_word();
        // Semigroup presentations get one extra node for the class of the
        // empty word, which no edge may re-enter.
        let capacity = if monoid {
            n
        } else {
            n.checked_add(1).ok_or_else(|| {
                Error::InvalidConfiguration(format!("cannot cap a search at {} classes", n))
            })?
        };
        let index = Arc::new(FelschIndex::new(p, self.long_rule_length));
        Ok(SearchState::new(
            index,
            self.pruners.clone(),
            capacity,
            p.alphabet_size(),
            monoid,
            self.two_sided,
        ))
    }

    fn number_of_congruences(&mut self, n: u32) -> Result<u64, Error> {
        let root = self.root_state(n)?;
        let start = Instant::now();
        let outcome = worker::run(
            root,
            self.threads,
            self.idle_thread_restarts,
            self.timeout,
            None,
        );
        self.stopped = outcome.timed_out;
        log::debug!(
            "Counted {} congruences with at most {} classes in {:?}. threads={} stopped={}",
            outcome.count,
            n,
            start.elapsed(),
            self.threads,
            self.stopped,
        );
        Ok(outcome.count)
    }

    fn find_if(
        &mut self,
        n: u32,
        pred: &(dyn Fn(&WordGraph) -> bool + Sync),
    ) -> Result<WordGraph, Error> {
        let root = self.root_state(n)?;
        let out_degree = root.graph().out_degree();
        let outcome = worker::run(
            root,
            self.threads,
            self.idle_thread_restarts,
            self.timeout,
            Some(pred),
        );
        self.stopped = outcome.timed_out;
        Ok(outcome
            .found
            .unwrap_or_else(|| WordGraph::empty(out_degree)))
    }

    fn iter(&mut self, n: u32) -> Result<Congruences, Error> {
        Ok(Congruences::new(self.root_state(n)?))
    }
}

/// Lazy single-threaded enumeration of the congruence word graphs, in the
/// search's deterministic order.
pub struct Congruences {
    state: SearchState,
    frames: VecDeque<PendingDef>,
}

impl Congruences {
    fn new(state: SearchState) -> Self {
        let mut frames = VecDeque::new();
        state.expand(&mut frames);
        Self { state, frames }
    }
}

impl Iterator for Congruences {
    type Item = WordGraph;

    fn next(&mut self) -> Option<WordGraph> {
        while let Some(pd) = self.frames.pop_back() {
            if !self.state.install(&pd) {
                continue;
            }
            if self.state.expand(&mut self.frames) {
                continue;
            }
            if self.state.long_rules_hold() {
                return Some(self.state.graph().trimmed());
            }
        }
        None
    }
}

/// Enumerator of the right congruences of a finitely presented monoid or
/// semigroup.
///
/// ```
/// use low_index::{Presentation, Sims1};
///
/// // The cyclic group of order 4.
/// let mut p = Presentation::new(1);
/// p.set_contains_empty_word(true);
/// p.add_rule(&[0, 0, 0, 0], &[])?;
///
/// let mut sims = Sims1::new();
/// sims.presentation(p)?;
/// assert_eq!(sims.number_of_congruences(4)?, 3);
/// # Ok::<(), low_index::Error>(())
/// ```
pub struct Sims1 {
    core: SimsCore,
}

/// Enumerator of the two-sided congruences of a finitely presented monoid
/// or semigroup. Configured exactly like [`Sims1`].
pub struct Sims2 {
    core: SimsCore,
}

macro_rules! sims_api {
    ($ty:ident) => {
        impl $ty {
            /// Sets the presentation to enumerate over. Must be called
            /// before searching and cannot be changed afterwards.
            pub fn presentation(&mut self, p: Presentation) -> Result<&mut Self, Error> {
                self.core.set_presentation(p)?;
                Ok(self)
            }

            /// Rules of combined length at least `len` are not used to
            /// prune during the search, only to filter complete graphs.
            /// `0` (the default) keeps every rule in the search.
            pub fn long_rule_length(&mut self, len: usize) -> Result<&mut Self, Error> {
                self.core.set_long_rule_length(len)?;
                Ok(self)
            }

            /// Number of rules currently treated as long.
            pub fn number_of_long_rules(&self) -> usize {
                self.core.number_of_long_rules()
            }

            /// Number of worker threads; must be positive. May be changed
            /// between runs.
            pub fn number_of_threads(&mut self, n: usize) -> Result<&mut Self, Error> {
                self.core.set_threads(n)?;
                Ok(self)
            }

            /// How many times an idle worker wakes without finding work
            /// before it retires; must be positive.
            pub fn idle_thread_restarts(&mut self, n: usize) -> Result<&mut Self, Error> {
                self.core.set_idle_thread_restarts(n)?;
                Ok(self)
            }

            /// Abandons searches that run longer than `timeout`, making
            /// counts lower bounds; see [`stopped`](Self::stopped).
            pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
                self.core.timeout = Some(timeout);
                self
            }

            /// Adds a [`Pruner`] run on every partial graph, after those
            /// already added. Cannot be changed once a search has run.
            pub fn add_pruner(&mut self, pruner: impl Pruner + 'static) -> Result<&mut Self, Error> {
                self.core.add_pruner(Arc::new(pruner))?;
                Ok(self)
            }

            /// Counts the congruences with at most `n` classes.
            pub fn number_of_congruences(&mut self, n: u32) -> Result<u64, Error> {
                self.core.number_of_congruences(n)
            }

            /// Returns the first congruence word graph accepted by `pred`,
            /// or the empty graph if there is none.
            pub fn find_if<F>(&mut self, n: u32, pred: F) -> Result<WordGraph, Error>
            where
                F: Fn(&WordGraph) -> bool + Sync,
            {
                self.core.find_if(n, &pred)
            }

            /// Lazy single-threaded enumeration of the congruence word
            /// graphs with at most `n` classes.
            pub fn iter(&mut self, n: u32) -> Result<Congruences, Error> {
                self.core.iter(n)
            }

            /// Whether the most recent search was cut short by the timeout.
            pub fn stopped(&self) -> bool {
                self.core.stopped
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

impl Sims1 {
    pub fn new() -> Self {
        Self {
            core: SimsCore::new(false),
        }
    }
}

impl Sims2 {
    pub fn new() -> Self {
        Self {
            core: SimsCore::new(true),
        }
    }
}

sims_api!(Sims1);
sims_api!(Sims2);
