//! Single- and multi-threaded drivers for the backtracking search.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime};

use parking_lot::Mutex;

use crate::job_market::WorkMarket;
use crate::sims::search::{PendingDef, SearchState};
use crate::word_graph::WordGraph;

/// Frames processed between stop-flag polls and work-sharing checks.
const BLOCK_SIZE: usize = 1024;

pub(crate) type Predicate<'a> = &'a (dyn Fn(&WordGraph) -> bool + Sync);

pub(crate) struct RunOutcome {
    /// Number of congruences counted before finishing or being stopped.
    pub count: u64,
    /// Whether the run was cut short by the timeout.
    pub timed_out: bool,
    /// First graph accepted by the predicate, if one was supplied and hit.
    pub found: Option<WordGraph>,
}

/// A unit of work a thread can take over: a search state together with the
/// frames still to be explored from it.
struct Batch {
    state: SearchState,
    frames: VecDeque<PendingDef>,
}

/// Runs the search to completion (or timeout / predicate hit) and reports
/// the outcome. With one thread the exploration order is deterministic.
pub(crate) fn run(
    root: SearchState,
    threads: usize,
    idle_thread_restarts: usize,
    timeout: Option<Duration>,
    predicate: Option<Predicate<'_>>,
) -> RunOutcome {
    if threads == 1 {
        return run_single(root, timeout, predicate);
    }

    let close_at = timeout.map(|t| SystemTime::now() + t);
    let mut market: WorkMarket<Batch> = WorkMarket::new(threads, close_at);
    let count = AtomicU64::new(0);
    let stop = AtomicBool::new(false);
    let found: Mutex<Option<WordGraph>> = Mutex::new(None);

    let mut frames = VecDeque::new();
    root.expand(&mut frames);
    market.push(Batch {
        state: root,
        frames,
    });

    crossbeam_utils::thread::scope(|scope| {
        for t in 0..threads {
            let mut market = market.clone();
            let count = &count;
            let stop = &stop;
            let found = &found;
            scope
                .builder()
                .name(format!("sims-{}", t))
                .spawn(move |_| {
                    log::debug!("{}: Thread started.", t);
                    loop {
                        let mut batch = match market.pop(idle_thread_restarts) {
                            Some(batch) => batch,
                            None => {
                                log::debug!("{}: No more work. Shutting down.", t);
                                return;
                            }
                        };
                        while !batch.frames.is_empty() {
                            if market.timed_out() {
                                log::debug!("{}: Reached timeout, abandoning the batch.", t);
                                return;
                            }
                            if !check_block(&mut batch, count, stop, found, predicate) {
                                if stop.load(Ordering::Relaxed) {
                                    market.close();
                                }
                                return;
                            }
                            // Donate the oldest, shallowest frames: they
                            // cover the largest subtrees.
                            if batch.frames.len() > 1 && market.has_waiting() {
                                let half = batch.frames.len() / 2;
                                let donated: VecDeque<_> = batch.frames.drain(..half).collect();
                                market.push(Batch {
                                    state: batch.state.clone(),
                                    frames: donated,
                                });
                            }
                        }
                    }
                })
                .expect("Failed to spawn a thread");
        }
    })
    .unwrap();

    let timed_out = market.timed_out();
    RunOutcome {
        count: count.load(Ordering::Relaxed),
        timed_out,
        found: found.into_inner(),
    }
}

/// Processes up to [`BLOCK_SIZE`] frames of `batch`. Returns false when the
/// thread should stop.
fn check_block(
    batch: &mut Batch,
    count: &AtomicU64,
    stop: &AtomicBool,
    found: &Mutex<Option<WordGraph>>,
    predicate: Option<Predicate<'_>>,
) -> bool {
    let mut budget = BLOCK_SIZE;
    loop {
        if budget == 0 {
            return true;
        }
        budget -= 1;
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        let pd = match batch.frames.pop_back() {
            Some(pd) => pd,
            None => return true,
        };
        if !batch.state.install(&pd) {
            continue;
        }
        if batch.state.expand(&mut batch.frames) {
            continue;
        }
        if !batch.state.long_rules_hold() {
            continue;
        }
        count.fetch_add(1, Ordering::Relaxed);
        if let Some(pred) = predicate {
            let graph = batch.state.graph().trimmed();
            if pred(&graph) {
                let mut slot = found.lock();
                if slot.is_none() {
                    *slot = Some(graph);
                }
                stop.store(true, Ordering::Relaxed);
                return false;
            }
        }
    }
}

fn run_single(
    mut state: SearchState,
    timeout: Option<Duration>,
    predicate: Option<Predicate<'_>>,
) -> RunOutcome {
    let deadline = timeout.map(|t| Instant::now() + t);
    let mut frames = VecDeque::new();
    state.expand(&mut frames);
    let mut count = 0u64;
    let mut since_poll = 0usize;
    while let Some(pd) = frames.pop_back() {
        since_poll += 1;
        if since_poll >= BLOCK_SIZE {
            since_poll = 0;
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    log::debug!("Reached timeout, abandoning the search");
                    return RunOutcome {
                        count,
                        timed_out: true,
                        found: None,
                    };
                }
            }
        }
        if !state.install(&pd) {
            continue;
        }
        if state.expand(&mut frames) {
            continue;
        }
        if !state.long_rules_hold() {
            continue;
        }
        count += 1;
        if let Some(pred) = predicate {
            let graph = state.graph().trimmed();
            if pred(&graph) {
                return RunOutcome {
                    count,
                    timed_out: false,
                    found: Some(graph),
                };
            }
        }
    }
    RunOutcome {
        count,
        timed_out: false,
        found: None,
    }
}
