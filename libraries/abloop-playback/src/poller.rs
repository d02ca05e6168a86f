//! Position poller
//!
//! A dedicated worker thread that fires a callback on a fixed period. The
//! callback runs on the worker, so ticks never overlap; a slow tick delays
//! the next one instead of skipping it. The poller never touches playback
//! state itself: the [`Player`](crate::Player) callback just forwards a tick
//! message to the thread that owns the session.

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Scheduling state of the poller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    NotScheduled,
    Scheduled,
}

struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Recurring single-worker tick scheduler
pub struct PositionPoller {
    period: Duration,
    worker: Option<Worker>,
}

impl PositionPoller {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            worker: None,
        }
    }

    /// Start ticking. The first tick fires immediately.
    ///
    /// `on_tick` returns `false` to stop the worker from inside. Returns
    /// `Ok(false)` without spawning anything if already scheduled.
    pub fn start<F>(&mut self, mut on_tick: F) -> std::io::Result<bool>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        if self.is_scheduled() {
            return Ok(false);
        }
        // Reap a worker that stopped itself
        self.stop();

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let period = self.period;

        let handle = thread::Builder::new()
            .name("position-poller".into())
            .spawn(move || loop {
                if !on_tick() {
                    debug!("Position poller stopped by its tick handler");
                    break;
                }
                match stop_rx.recv_timeout(period) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    // Stop requested or poller dropped
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        debug!("Position poller scheduled every {:?}", period);
        self.worker = Some(Worker { stop_tx, handle });
        Ok(true)
    }

    /// Cancel the pending wait and join the worker
    ///
    /// A tick already running is allowed to finish.
    pub fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop_tx.try_send(()).ok();
            drop(worker.stop_tx);
            if worker.handle.join().is_err() {
                warn!("Position poller worker panicked");
            }
        }
    }

    pub fn state(&self) -> PollerState {
        if self.is_scheduled() {
            PollerState::Scheduled
        } else {
            PollerState::NotScheduled
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Drop for PositionPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn ticks_until_stopped() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut poller = PositionPoller::new(Duration::from_millis(5));

        let counter = Arc::clone(&count);
        assert!(poller
            .start(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            })
            .unwrap());
        assert_eq!(poller.state(), PollerState::Scheduled);

        thread::sleep(Duration::from_millis(60));
        poller.stop();
        let after_stop = count.load(Ordering::SeqCst);

        assert!(after_stop >= 2, "expected several ticks, got {}", after_stop);
        assert_eq!(poller.state(), PollerState::NotScheduled);

        thread::sleep(Duration::from_millis(30));
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn second_start_is_ignored() {
        let mut poller = PositionPoller::new(Duration::from_millis(50));

        assert!(poller.start(|| true).unwrap());
        assert!(!poller.start(|| true).unwrap());

        poller.stop();
    }

    #[test]
    fn stop_cancels_long_wait_promptly() {
        let mut poller = PositionPoller::new(Duration::from_secs(30));
        poller.start(|| true).unwrap();

        let started = Instant::now();
        poller.stop();

        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn handler_can_stop_the_worker() {
        let mut poller = PositionPoller::new(Duration::from_millis(1));
        poller.start(|| false).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while poller.is_scheduled() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(poller.state(), PollerState::NotScheduled);

        // Can be scheduled again afterwards
        assert!(poller.start(|| true).unwrap());
    }
}
