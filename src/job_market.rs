//! A market for synchronising the sharing of search work.
//!
//! Each worker thread holds a handle to the shared market. A worker that
//! runs out of frames asks the market for a batch; a worker with spare
//! frames donates a batch when others are waiting. The market also carries
//! the shutdown protocol: it closes when the last busy worker finds the
//! market empty, when a timeout expires, or when a worker panics.

use parking_lot::{Condvar, Mutex};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::sleep;
use std::time::SystemTime;

pub(crate) struct WorkMarket<Job> {
    /// Get notified when there is a new batch to take.
    has_new_work: Arc<Condvar>,
    shared: Arc<Mutex<MarketState<Job>>>,
    timed_out: Arc<AtomicBool>,
}

struct MarketState<Job> {
    /// Whether this market is still open.
    open: bool,
    /// Number of workers.
    thread_count: usize,
    /// Number of workers currently busy (not waiting in `pop`).
    busy_count: usize,
    /// Batches available to take.
    batches: Vec<Job>,
}

impl<Job> Clone for WorkMarket<Job> {
    fn clone(&self) -> Self {
        Self {
            has_new_work: Arc::clone(&self.has_new_work),
            shared: Arc::clone(&self.shared),
            timed_out: Arc::clone(&self.timed_out),
        }
    }
}

impl<Job> Drop for WorkMarket<Job> {
    fn drop(&mut self) {
        let mut shared = self.shared.lock();
        shared.busy_count = shared.busy_count.saturating_sub(1);
        if std::thread::panicking() {
            log::trace!(
                "{}: Dropped while panicking, closing the market.",
                std::thread::current().name().unwrap_or_default()
            );
            shared.open = false;
            shared.batches.clear();
        } else if shared.busy_count == 0 {
            shared.open = false;
        }
        self.has_new_work.notify_all();
    }
}

impl<Job: Send + 'static> WorkMarket<Job> {
    /// Creates a market for a group of `thread_count` workers, optionally
    /// closing itself at `close_at`.
    pub fn new(thread_count: usize, close_at: Option<SystemTime>) -> Self {
        let market = Self {
            has_new_work: Arc::new(Condvar::new()),
            shared: Arc::new(Mutex::new(MarketState {
                open: true,
                thread_count,
                busy_count: thread_count,
                batches: Vec::new(),
            })),
            timed_out: Arc::new(AtomicBool::new(false)),
        };
        if let Some(closing_time) = close_at {
            let handle = market.clone();
            std::thread::Builder::new()
                .name("timeout".to_owned())
                .spawn(move || {
                    if let Ok(time_to_sleep) = closing_time.duration_since(SystemTime::now()) {
                        sleep(time_to_sleep);
                    }
                    let mut shared = handle.shared.lock();
                    if shared.open {
                        log::debug!("Reached timeout, triggering shutdown");
                        shared.open = false;
                        shared.batches.clear();
                        handle.timed_out.store(true, Ordering::Relaxed);
                    }
                    handle.has_new_work.notify_all();
                })
                .unwrap();
        }
        market
    }

    /// Takes a batch from the market, waiting for one to appear if other
    /// workers are still busy. Waits through at most `max_idle_rounds`
    /// wake-ups without work before giving up; returns `None` when retiring
    /// for any reason.
    pub fn pop(&mut self, max_idle_rounds: usize) -> Option<Job> {
        let mut shared = self.shared.lock();
        let mut rounds = 0;
        loop {
            if !shared.open {
                return None;
            }
            if !shared.batches.is_empty() {
                let i = rand::thread_rng().gen_range(0..shared.batches.len());
                log::trace!(
                    "{}: Got a batch. Working.",
                    std::thread::current().name().unwrap_or_default()
                );
                return Some(shared.batches.swap_remove(i));
            }
            shared.busy_count -= 1;
            if shared.busy_count == 0 {
                // We are the last busy thread and there is nothing left.
                log::trace!(
                    "{}: No work. Last busy thread, closing.",
                    std::thread::current().name().unwrap_or_default()
                );
                shared.open = false;
                self.has_new_work.notify_all();
                return None;
            }
            if rounds >= max_idle_rounds {
                // Retire; the drop of our handle settles the accounting.
                log::trace!(
                    "{}: No work after {} idle rounds. Retiring.",
                    std::thread::current().name().unwrap_or_default(),
                    rounds
                );
                shared.busy_count += 1;
                return None;
            }
            log::trace!(
                "{}: No work. Awaiting. busy={}",
                std::thread::current().name().unwrap_or_default(),
                shared.busy_count
            );
            self.has_new_work.wait(&mut shared);
            shared.busy_count += 1;
            rounds += 1;
        }
    }

    /// Donates a batch to the market.
    pub fn push(&mut self, batch: Job) {
        let mut shared = self.shared.lock();
        if !shared.open {
            return;
        }
        shared.batches.push(batch);
        log::trace!(
            "{}: Pushing a batch. busy={}",
            std::thread::current().name().unwrap_or_default(),
            shared.busy_count
        );
        self.has_new_work.notify_one();
    }

    /// Whether some worker is waiting for work.
    pub fn has_waiting(&self) -> bool {
        let shared = self.shared.lock();
        shared.open && shared.busy_count < shared.thread_count
    }

    /// Closes the market, discarding pending batches.
    pub fn close(&self) {
        let mut shared = self.shared.lock();
        shared.open = false;
        shared.batches.clear();
        self.has_new_work.notify_all();
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    #[test]
    fn pop_returns_pushed_batches_until_closed() {
        let mut market: WorkMarket<u32> = WorkMarket::new(1, None);
        market.push(7);
        market.push(8);
        let first = market.pop(1).unwrap();
        let second = market.pop(1).unwrap();
        assert_eq!(first + second, 15);
        assert_ne!(first, second);
        // Last busy thread and no batches: the market closes.
        assert_eq!(market.pop(1), None);
        market.push(9);
        assert_eq!(market.pop(1), None);
    }

    #[test]
    fn timeout_closes_the_market() {
        let mut market: WorkMarket<u32> =
            WorkMarket::new(2, Some(SystemTime::now() + Duration::from_millis(10)));
        market.push(7);
        assert_eq!(market.pop(1), Some(7));
        sleep(Duration::from_millis(100));
        market.push(8);
        assert_eq!(market.pop(1), None);
        assert!(market.timed_out());
    }

    #[test]
    fn close_discards_pending_batches() {
        let mut market: WorkMarket<u32> = WorkMarket::new(2, None);
        market.push(7);
        market.close();
        assert_eq!(market.pop(1), None);
        assert!(!market.timed_out());
    }
}
