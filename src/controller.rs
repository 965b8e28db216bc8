//! Process-wide coordination for a pipeline.
//!
//! A [`Controller`] carries the global parameters shared by every block in a
//! pipeline (`block_size`, `channel_depth`, `time_step_sec`) and two one-shot
//! broadcast latches: `started` and `done`.
//!
//! ## Start/done as closable channels
//!
//! Both latches are realized as zero-capacity [`crossbeam_channel`] pairs
//! whose sender half lives behind a `Mutex<Option<Sender<()>>>`. `start()`
//! and `stop()` idempotently `.take()` and drop that sender, which closes
//! the channel exactly once; every waiter holds a cloned `Receiver<()>` and
//! blocks on `.recv()`, which unblocks the instant the channel closes. This
//! is the channel-close-as-broadcast idiom, and it composes directly with
//! [`crossbeam_channel::select!`] for racing a done-check against an input
//! pull (see [`crate::engine`]).
use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::Mutex;

/// One-shot, multi-waiter broadcast latch: closes exactly once, never resets.
struct Latch {
    tx: Mutex<Option<Sender<()>>>,
    rx: Receiver<()>,
}

impl Latch {
    fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            tx: Mutex::new(Some(tx)),
            rx,
        }
    }

    /// Idempotent: closes the channel on first call, a no-op afterwards.
    fn fire(&self) {
        let mut guard = self.tx.lock().expect("latch mutex poisoned");
        guard.take();
    }

    fn is_set(&self) -> bool {
        self.tx.lock().expect("latch mutex poisoned").is_none()
    }

    fn wait(&self) {
        // A closed zero-capacity channel always yields `Err` immediately;
        // an open one never yields anything, so this blocks until closed.
        let _ = self.rx.recv();
    }

    fn receiver(&self) -> Receiver<()> {
        self.rx.clone()
    }
}

/// Coordination record shared by every block of a pipeline.
///
/// Validates its parameters at construction and hands out a cheap,
/// cloneable `Receiver<()>` for the done signal so processing blocks can
/// race it against an input pull via `select!`.
pub struct Controller {
    block_size: usize,
    channel_depth: usize,
    time_step_sec: f64,
    started: Latch,
    done: Latch,
}

impl Controller {
    /// Builds a new controller. Panics if any parameter is non-positive —
    /// these are construction-time contract violations, not recoverable
    /// runtime conditions.
    pub fn new(block_size: usize, channel_depth: usize, time_step_sec: f64) -> Self {
        assert!(block_size > 0, "block_size must be positive");
        assert!(channel_depth > 0, "channel_depth must be positive");
        assert!(time_step_sec > 0.0, "time_step_sec must be positive");

        Self {
            block_size,
            channel_depth,
            time_step_sec,
            started: Latch::new(),
            done: Latch::new(),
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn channel_depth(&self) -> usize {
        self.channel_depth
    }

    pub fn time_step_sec(&self) -> f64 {
        self.time_step_sec
    }

    /// Idempotent: the first call unblocks every `wait_for_start` waiter;
    /// later calls are no-ops.
    pub fn start(&self) {
        self.started.fire();
    }

    /// Blocks until [`Controller::start`] has been called. Returns
    /// immediately if it already has.
    pub fn wait_for_start(&self) {
        self.started.wait();
    }

    /// Idempotent: the first call unblocks every done-signal waiter and
    /// flips [`Controller::is_done`]; later calls are no-ops.
    pub fn stop(&self) {
        self.done.fire();
    }

    /// True once [`Controller::stop`] has been called.
    pub fn is_done(&self) -> bool {
        self.done.is_set()
    }

    /// A cloneable handle to the done latch, usable in
    /// `crossbeam_channel::select!` alongside a wire pull.
    pub fn done_signal(&self) -> Receiver<()> {
        self.done.receiver()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    #[should_panic(expected = "block_size")]
    fn rejects_zero_block_size() {
        Controller::new(0, 1, 0.001);
    }

    #[test]
    #[should_panic(expected = "channel_depth")]
    fn rejects_zero_channel_depth() {
        Controller::new(4, 0, 0.001);
    }

    #[test]
    #[should_panic(expected = "time_step_sec")]
    fn rejects_non_positive_time_step() {
        Controller::new(4, 1, 0.0);
    }

    #[test]
    fn start_unblocks_all_waiters() {
        let c = Arc::new(Controller::new(4, 1, 0.001));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let c = c.clone();
            handles.push(thread::spawn(move || c.wait_for_start()));
        }
        thread::sleep(Duration::from_millis(20));
        c.start();
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let c = Controller::new(4, 1, 0.001);
        c.start();
        c.start();
        c.wait_for_start();

        assert!(!c.is_done());
        c.stop();
        c.stop();
        assert!(c.is_done());
    }

    #[test]
    fn done_signal_observable_via_select() {
        let c = Controller::new(4, 1, 0.001);
        let done = c.done_signal();
        c.stop();
        crossbeam_channel::select! {
            recv(done) -> _ => {},
            default(Duration::from_millis(50)) => panic!("done signal did not fire"),
        }
    }
}
