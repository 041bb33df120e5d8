//! A library for computing the low-index congruences of a finitely
//! presented semigroup or monoid.
//!
//! The central objects are [`Sims1`] and [`Sims2`], which count, search, or
//! enumerate the right (respectively two-sided) congruences with at most a
//! given number of classes. Each congruence is represented by a complete
//! deterministic [`WordGraph`] describing the action of the generators on
//! the congruence classes, and the enumeration is a backtracking search
//! over partial word graphs that prunes with the defining relations as it
//! goes. Searches can run on several threads, trade work through a shared
//! market, and be stopped by a timeout.
//!
//! [`MinimalRepOrc`] builds on the same search to find a minimal-degree
//! faithful action.
//!
//! ```
//! use low_index::{Presentation, Sims1, Sims2};
//!
//! // The symmetric group S3 = <s, t | s^2 = t^2 = (st)^3 = 1>.
//! let mut p = Presentation::new(2);
//! p.set_contains_empty_word(true);
//! p.add_rule(&[0, 0], &[])?;
//! p.add_rule(&[1, 1], &[])?;
//! p.add_rule(&[0, 1, 0, 1, 0, 1], &[])?;
//!
//! // One right congruence per subgroup of S3,
//! let mut sims = Sims1::new();
//! sims.presentation(p.clone())?;
//! assert_eq!(sims.number_of_congruences(6)?, 6);
//!
//! // and one two-sided congruence per normal subgroup.
//! let mut sims = Sims2::new();
//! sims.presentation(p)?;
//! assert_eq!(sims.number_of_congruences(6)?, 3);
//! # Ok::<(), low_index::Error>(())
//! ```

use std::fmt;

mod felsch;
mod job_market;
mod presentation;
mod sims;
#[cfg(test)]
mod test_util;
mod word_graph;

pub use presentation::Presentation;
pub use sims::{Congruences, MinimalRepOrc, Pruner, Sims1, Sims2, SimsRefinerFaithful};
pub use word_graph::{Letter, Node, Word, WordGraph};

/// The errors this crate reports.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// A presentation was malformed, e.g. a rule used a letter outside the
    /// alphabet.
    InvalidPresentation(String),
    /// A search was configured inconsistently or reconfigured after
    /// starting.
    InvalidConfiguration(String),
    /// Bytes did not describe a word graph.
    InvalidWordGraph(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidPresentation(msg) => write!(f, "invalid presentation: {}", msg),
            Error::InvalidConfiguration(msg) => write!(f, "invalid configuration: {}", msg),
            Error::InvalidWordGraph(msg) => write!(f, "invalid word graph: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
