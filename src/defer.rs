//! Deferred execution and time sources the decorators build on.
//!
//! The engine itself never blocks and never needs to defer: user steps decide
//! when to report. The decorators do, so they consume two small interfaces:
//! - [`Defer`] runs a callback on a later turn, never synchronously, in FIFO
//!   order relative to other deferred callbacks.
//! - [`Timer`] reads a monotonic clock and schedules cancelable callbacks.
//!
//! [`EventLoop`] implements both on a single thread with a virtual clock,
//! which makes timing behavior fully deterministic. A `futures`
//! [`LocalSpawner`] can be used as a `Defer`, and with the `tokio` feature
//! [`TokioLocal`] provides both on top of a tokio `LocalSet`.

use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap, VecDeque},
    rc::Rc,
    time::Duration,
};

use futures::{executor::LocalSpawner, task::LocalSpawnExt};

/// Boxed zero-argument callback.
pub type Callback = Box<dyn FnOnce()>;

/// Schedules a callback to run on a later turn of the execution loop.
pub trait Defer {
    /// Runs `callback` later. Must never run it before returning.
    fn defer(&self, callback: Callback);
}

/// Identifies a callback scheduled with [`Timer::schedule`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// A monotonic clock with cancelable delayed callbacks.
pub trait Timer {
    /// Time elapsed since the timer's origin.
    fn now(&self) -> Duration;

    /// Runs `callback` once `delay` has elapsed.
    fn schedule(&self, delay: Duration, callback: Callback) -> TimerId;

    /// Cancels a scheduled callback. Cancelling a fired or unknown timer is a no-op.
    fn cancel(&self, id: TimerId);
}

#[derive(Default)]
struct LoopState {
    queue: VecDeque<Callback>,
    // Keyed by deadline, then id so equal deadlines fire in scheduling order.
    timers: BTreeMap<(Duration, u64), Callback>,
    deadlines: HashMap<u64, Duration>,
    now: Duration,
    next_id: u64,
}

/// Deterministic single-threaded event loop with a virtual clock.
///
/// Nothing runs until the loop is driven with [`run_until_idle`],
/// [`advance`] or [`run`]. Clones share the same queue and clock.
///
/// [`run_until_idle`]: EventLoop::run_until_idle
/// [`advance`]: EventLoop::advance
/// [`run`]: EventLoop::run
#[derive(Clone, Default)]
pub struct EventLoop {
    state: Rc<RefCell<LoopState>>,
}

impl EventLoop {
    /// Creates an empty loop at virtual time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs deferred callbacks, including ones they defer, until the queue is empty.
    ///
    /// Returns how many callbacks ran. Timers are not fired.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.state.borrow_mut().queue.pop_front();
            let Some(callback) = next else {
                return ran;
            };
            callback();
            ran += 1;
        }
    }

    /// Moves the clock forward by `by`, firing every timer that falls due on the way.
    ///
    /// Deferred callbacks are drained before the first timer and after each one.
    pub fn advance(&self, by: Duration) {
        let target = self.now() + by;
        loop {
            self.run_until_idle();
            let Some(callback) = self.pop_timer(Some(target)) else {
                break;
            };
            callback();
        }
        self.state.borrow_mut().now = target;
    }

    /// Drives the loop until no deferred callback and no timer is left.
    pub fn run(&self) {
        loop {
            self.run_until_idle();
            let Some(callback) = self.pop_timer(None) else {
                break;
            };
            callback();
        }
    }

    /// Number of deferred callbacks and timers waiting to run.
    #[must_use]
    pub fn pending(&self) -> usize {
        let state = self.state.borrow();
        state.queue.len() + state.timers.len()
    }

    // Removes the earliest timer due no later than `until` and moves the clock to it.
    fn pop_timer(&self, until: Option<Duration>) -> Option<Callback> {
        let mut state = self.state.borrow_mut();
        let (&(deadline, id), _) = state.timers.first_key_value()?;
        if until.is_some_and(|limit| deadline > limit) {
            return None;
        }
        state.deadlines.remove(&id);
        state.now = state.now.max(deadline);
        state.timers.remove(&(deadline, id))
    }
}

impl Defer for EventLoop {
    fn defer(&self, callback: Callback) {
        self.state.borrow_mut().queue.push_back(callback);
    }
}

impl Timer for EventLoop {
    fn now(&self) -> Duration {
        self.state.borrow().now
    }

    fn schedule(&self, delay: Duration, callback: Callback) -> TimerId {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        let deadline = state.now + delay;
        state.timers.insert((deadline, id), callback);
        state.deadlines.insert(id, deadline);
        TimerId(id)
    }

    fn cancel(&self, id: TimerId) {
        let mut state = self.state.borrow_mut();
        if let Some(deadline) = state.deadlines.remove(&id.0) {
            state.timers.remove(&(deadline, id.0));
        }
    }
}

/// Defers onto a `futures` [`LocalPool`](futures::executor::LocalPool).
impl Defer for LocalSpawner {
    fn defer(&self, callback: Callback) {
        if let Err(e) = self.spawn_local(async move { callback() }) {
            tracing::warn!("deferred callback dropped: {e}");
        }
    }
}

#[cfg(feature = "tokio")]
pub use tokio_local::TokioLocal;

#[cfg(feature = "tokio")]
mod tokio_local {
    use std::{cell::RefCell, collections::HashMap, rc::Rc, time::Duration};

    use tokio::{task::AbortHandle, time::Instant};

    use super::{Callback, Defer, Timer, TimerId};

    #[derive(Default)]
    struct Pending {
        handles: HashMap<u64, AbortHandle>,
        next_id: u64,
    }

    /// [`Defer`] and [`Timer`] backed by tokio's local task set.
    ///
    /// Every method must be called from within a
    /// [`LocalSet`](tokio::task::LocalSet) on a runtime with timers enabled.
    #[derive(Clone)]
    pub struct TokioLocal {
        origin: Instant,
        pending: Rc<RefCell<Pending>>,
    }

    impl TokioLocal {
        /// Creates a source whose clock starts now.
        #[must_use]
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                pending: Rc::default(),
            }
        }
    }

    impl Default for TokioLocal {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Defer for TokioLocal {
        fn defer(&self, callback: Callback) {
            tokio::task::spawn_local(async move { callback() });
        }
    }

    impl Timer for TokioLocal {
        fn now(&self) -> Duration {
            self.origin.elapsed()
        }

        fn schedule(&self, delay: Duration, callback: Callback) -> TimerId {
            let id = {
                let mut pending = self.pending.borrow_mut();
                pending.next_id += 1;
                pending.next_id
            };
            let pending = Rc::clone(&self.pending);
            let handle = tokio::task::spawn_local(async move {
                tokio::time::sleep(delay).await;
                pending.borrow_mut().handles.remove(&id);
                callback();
            });
            // The task cannot have run yet, it is only polled once we yield.
            self.pending
                .borrow_mut()
                .handles
                .insert(id, handle.abort_handle());
            TimerId(id)
        }

        fn cancel(&self, id: TimerId) {
            if let Some(handle) = self.pending.borrow_mut().handles.remove(&id.0) {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    fn log() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Callback) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        (log, move |s| {
            let l = Rc::clone(&l);
            Box::new(move || l.borrow_mut().push(s))
        })
    }

    #[test]
    fn defer_is_fifo_and_never_synchronous() {
        let el = EventLoop::new();
        let (log, push) = log();
        el.defer(push("a"));
        el.defer(push("b"));
        assert!(log.borrow().is_empty());
        assert_eq!(el.run_until_idle(), 2);
        assert_eq!(*log.borrow(), ["a", "b"]);
    }

    #[test]
    fn timers_fire_in_deadline_order() {
        let el = EventLoop::new();
        let (log, push) = log();
        el.schedule(Duration::from_millis(20), push("late"));
        el.schedule(Duration::from_millis(10), push("early"));
        let cancelled = el.schedule(Duration::from_millis(15), push("cancelled"));
        el.cancel(cancelled);

        el.advance(Duration::from_millis(12));
        assert_eq!(*log.borrow(), ["early"]);
        assert_eq!(el.now(), Duration::from_millis(12));

        el.run();
        assert_eq!(*log.borrow(), ["early", "late"]);
        assert_eq!(el.now(), Duration::from_millis(20));
        assert_eq!(el.pending(), 0);
    }

    #[test]
    fn local_spawner_defers() {
        let mut pool = futures::executor::LocalPool::new();
        let spawner = pool.spawner();
        let (log, push) = log();
        spawner.defer(push("x"));
        assert!(log.borrow().is_empty());
        pool.run_until_stalled();
        assert_eq!(*log.borrow(), ["x"]);
    }
}
