//! Typed single-producer/multi-consumer fan-out of fixed-size sample blocks.
//!
//! ```text
//!                         ┌──────────────┐
//!                         │ WireSource<T>│  (owned by the producing block)
//!                         └──────┬───────┘
//!                   publish(blk) │  fan-out under `alive`-guarded mutex
//!            ┌───────────────────┼───────────────────┐
//!            ▼                   ▼                    ▼
//!      bounded queue        bounded queue        bounded queue
//!      (depth = N)          (depth = N)          (depth = N)
//!            │                   │                    │
//!            ▼                   ▼                    ▼
//!      WireEnd<T>           WireEnd<T>           WireEnd<T>
//! ```
//!
//! A [`WireSource`] is the producer-facing handle: it owns the subscriber
//! set and is the only thing allowed to [`WireSource::publish`] or
//! [`WireSource::stop`] the wire. A [`Wire`] is the read-side handle handed
//! to consumers — cloneable, and able to mint as many [`WireEnd`]s as
//! needed via [`Wire::new_wire_end`]. Each `WireEnd` owns an independent
//! bounded queue, so multiple consumers of the same wire observe identical
//! block sequences without contending with each other on the read side.
//!
//! ## Chosen fan-out policy
//!
//! `publish` snapshots the current subscriber queues under the source's
//! mutex, then releases the lock *before* attempting the (possibly
//! blocking) sends. This avoids the deadlock risk of holding the lock
//! across a blocking send: a subscriber stuck in `unsubscribe` waiting on
//! the same mutex could never make progress if the publisher held the lock
//! while blocked on that subscriber's full queue. A send against a queue
//! whose `WireEnd` has meanwhile disconnected (receiver dropped) returns a
//! disconnect error immediately rather than blocking, so such races are
//! simply ignored — never retried, never treated as an error.
use crossbeam_channel::{Receiver, Sender, bounded};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// An immutable, fixed-length, reference-counted block of samples.
///
/// Cloning a `Block` clones the `Arc`, not the underlying data: every
/// subscriber of a [`Wire`] receives the same allocation.
pub type Block<T> = Arc<[T]>;

/// Builds a [`Block`] from an owned `Vec`, without copying its contents.
pub fn block_from_vec<T>(v: Vec<T>) -> Block<T> {
    Arc::from(v)
}

struct Inner<T> {
    alive: bool,
    next_id: u64,
    subs: HashMap<u64, Sender<Block<T>>>,
}

/// Producer-facing handle to a wire. Owned by the block that creates it;
/// never cloned.
pub struct WireSource<T> {
    inner: Arc<Mutex<Inner<T>>>,
    buffer_size: usize,
}

impl<T> WireSource<T> {
    /// Creates a new, live wire with the given per-subscriber queue depth.
    pub fn new(buffer_size: usize) -> Self {
        assert!(buffer_size > 0, "buffer_size must be positive");
        Self {
            inner: Arc::new(Mutex::new(Inner {
                alive: true,
                next_id: 0,
                subs: HashMap::new(),
            })),
            buffer_size,
        }
    }

    /// The cloneable, consumer-facing read side of this wire.
    pub fn get_wire(&self) -> Wire<T> {
        Wire {
            inner: self.inner.clone(),
            buffer_size: self.buffer_size,
        }
    }

    /// Delivers `block` to every current subscriber, blocking until each
    /// has room to accept it.
    ///
    /// # Panics
    /// If the wire has already been stopped — publishing after stop is a
    /// programming error, not a recoverable condition.
    pub fn publish(&self, block: Block<T>) {
        let senders: Vec<Sender<Block<T>>> = {
            let guard = self.inner.lock().expect("wire mutex poisoned");
            assert!(guard.alive, "publish on a wire that has already stopped");
            guard.subs.values().cloned().collect()
        };

        for sender in senders {
            // A disconnected subscriber (concurrently unsubscribed) simply
            // drops the send; it will never read it regardless.
            let _ = sender.send(block.clone());
        }
    }

    /// Stops the wire: closes every subscriber's queue so pending and
    /// future `get_data` calls observe end-of-stream.
    ///
    /// # Panics
    /// If the wire has already been stopped.
    pub fn stop(&self) {
        let mut guard = self.inner.lock().expect("wire mutex poisoned");
        assert!(guard.alive, "stop on a wire that has already stopped");
        guard.alive = false;
        guard.subs.clear();
    }
}

/// Consumer-facing, cloneable read side of a wire.
#[derive(Clone)]
pub struct Wire<T> {
    inner: Arc<Mutex<Inner<T>>>,
    buffer_size: usize,
}

impl<T> Wire<T> {
    /// Subscribes a fresh [`WireEnd`] to this wire.
    pub fn new_wire_end(&self) -> WireEnd<T> {
        let mut guard = self.inner.lock().expect("wire mutex poisoned");
        if !guard.alive {
            // Disconnected end: `rx` is immediately closed because no
            // matching `tx` is retained anywhere.
            let (_tx, rx) = bounded(self.buffer_size);
            return WireEnd {
                inner: self.inner.clone(),
                id: None,
                rx,
            };
        }

        let id = guard.next_id;
        guard.next_id += 1;
        let (tx, rx) = bounded(self.buffer_size);
        guard.subs.insert(id, tx);
        WireEnd {
            inner: self.inner.clone(),
            id: Some(id),
            rx,
        }
    }
}

/// Consumer-side handle to one subscription on a [`Wire`].
pub struct WireEnd<T> {
    inner: Arc<Mutex<Inner<T>>>,
    id: Option<u64>,
    rx: Receiver<Block<T>>,
}

impl<T> WireEnd<T> {
    /// Blocking dequeue. Returns `None` once the wire has closed and all
    /// buffered blocks have been drained.
    pub fn get_data(&self) -> Option<Block<T>> {
        self.rx.recv().ok()
    }

    /// The raw receiver, exposed so the processing engine can race a pull
    /// against the controller's done signal via `select!`.
    pub(crate) fn receiver(&self) -> &Receiver<Block<T>> {
        &self.rx
    }

    /// Unsubscribes from the source wire. Safe to call more than once or
    /// after the wire has already stopped.
    pub fn disconnect(&mut self) {
        let Some(id) = self.id.take() else { return };
        let mut guard = self.inner.lock().expect("wire mutex poisoned");
        guard.subs.remove(&id);
    }
}

impl<T> Drop for WireEnd<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
