//! Once-per-second tick source for the timer engine.

use crate::event::HostEvent;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Something that delivers recurring ticks to the engine.
///
/// At most one source is active at a time; `start` is only called after any
/// previous source was cancelled.
pub trait TickScheduler {
    /// Begins producing ticks tagged with `generation`.
    fn start(&mut self, generation: u64);
    /// Stops the active source. No tick is produced after this returns.
    fn cancel(&mut self);
}

struct Worker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Runs the tick source on a background thread that posts
/// [`HostEvent::Tick`] to the host's event channel.
pub struct ThreadTicker {
    tx: Sender<HostEvent>,
    interval: Duration,
    worker: Option<Worker>,
}

impl ThreadTicker {
    pub fn new(tx: Sender<HostEvent>) -> Self {
        Self::with_interval(tx, Duration::from_secs(1))
    }

    pub fn with_interval(tx: Sender<HostEvent>, interval: Duration) -> Self {
        Self {
            tx,
            interval,
            worker: None,
        }
    }
}

/// Sends a tick every `interval` until `stop` fires or the host goes away.
fn run_tick_loop(
    tx: Sender<HostEvent>,
    stop: mpsc::Receiver<()>,
    interval: Duration,
    generation: u64,
) {
    loop {
        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                if tx.send(HostEvent::Tick(generation)).is_err() {
                    break;
                }
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    tracing::debug!(generation, "tick loop finished");
}

impl TickScheduler for ThreadTicker {
    fn start(&mut self, generation: u64) {
        self.cancel();

        let (stop, stop_rx) = mpsc::channel();
        let tx = self.tx.clone();
        let interval = self.interval;
        let handle = thread::spawn(move || run_tick_loop(tx, stop_rx, interval, generation));
        self.worker = Some(Worker { stop, handle });
    }

    fn cancel(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop.send(());
            if worker.handle.join().is_err() {
                tracing::error!("tick thread panicked");
            }
        }
    }
}

impl Drop for ThreadTicker {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_ticker_sends_tagged_ticks() {
        let (tx, rx) = mpsc::channel();
        let mut ticker = ThreadTicker::with_interval(tx, Duration::from_millis(5));
        ticker.start(7);

        let event = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(event, HostEvent::Tick(7));
        ticker.cancel();
    }

    #[test]
    fn test_thread_ticker_silent_after_cancel() {
        let (tx, rx) = mpsc::channel();
        let mut ticker = ThreadTicker::with_interval(tx, Duration::from_millis(5));
        ticker.start(1);
        rx.recv_timeout(Duration::from_secs(2)).unwrap();
        ticker.cancel();

        // Drain anything sent before the cancel returned
        while rx.try_recv().is_ok() {}
        thread::sleep(Duration::from_millis(50));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_thread_ticker_restart_replaces_source() {
        let (tx, rx) = mpsc::channel();
        let mut ticker = ThreadTicker::with_interval(tx, Duration::from_millis(5));
        ticker.start(1);
        ticker.start(2);

        // Only the second source is alive now
        while rx.try_recv().is_ok() {}
        let event = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(event, HostEvent::Tick(2));
        ticker.cancel();
    }

    #[test]
    fn test_cancel_without_start() {
        let (tx, _rx) = mpsc::channel();
        let mut ticker = ThreadTicker::new(tx);
        ticker.cancel();
    }
}
