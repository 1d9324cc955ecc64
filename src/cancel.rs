// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Cooperative cancellation signal, polled by the searches in [astar](crate::astar).
///
/// Implementations must be cheap to query and safe to query from the thread
/// running the search while another thread requests cancellation.
pub trait Cancellable {
    fn is_cancelled(&self) -> bool;
}

/// A [Cancellable] which is never cancelled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NeverCancelled;

impl Cancellable for NeverCancelled {
    #[inline]
    fn is_cancelled(&self) -> bool {
        false
    }
}

impl Cancellable for AtomicBool {
    #[inline]
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl<T: Cancellable + ?Sized> Cancellable for &T {
    #[inline]
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}

impl<T: Cancellable + ?Sized> Cancellable for Arc<T> {
    #[inline]
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}

/// Shared cancellation flag. Clones refer to the same underlying flag,
/// so one clone can be handed to a worker running a search, while another
/// stays with whoever may want to stop it.
#[derive(Debug, Default, Clone)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Searches observe it at their next poll.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Clears a previous cancellation request.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    /// Spawns a timer thread which cancels this flag after `timeout`.
    ///
    /// The timer thread is detached; it holds a clone of the flag until it fires.
    pub fn cancel_after(&self, timeout: Duration) -> thread::JoinHandle<()> {
        let flag = self.clone();
        thread::spawn(move || {
            thread::sleep(timeout);
            log::debug!("search timed out after {:?}", timeout);
            flag.cancel();
        })
    }
}

impl Cancellable for CancelFlag {
    #[inline]
    fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }
}

/// [Cancellable] which reports cancellation once a fixed instant has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn at(instant: Instant) -> Self {
        Self(instant)
    }

    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now() + timeout)
    }
}

impl Cancellable for Deadline {
    fn is_cancelled(&self) -> bool {
        Instant::now() >= self.0
    }
}

/// Number of calls to [PeriodicPoll::is_cancelled] between actual polls.
pub(crate) const POLL_PERIOD: u32 = 128;

/// Wraps a [Cancellable] so that only every [POLL_PERIOD]-th query (starting with the first one)
/// is forwarded to the underlying signal.
pub(crate) struct PeriodicPoll<'a, C: Cancellable + ?Sized> {
    cancellable: &'a C,
    count: u32,
}

impl<'a, C: Cancellable + ?Sized> PeriodicPoll<'a, C> {
    pub(crate) fn new(cancellable: &'a C) -> Self {
        Self {
            cancellable,
            count: 0,
        }
    }

    pub(crate) fn is_cancelled(&mut self) -> bool {
        let poll_now = self.count % POLL_PERIOD == 0;
        self.count = self.count.wrapping_add(1);
        poll_now && self.cancellable.is_cancelled()
    }
}
