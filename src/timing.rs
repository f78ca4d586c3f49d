//! Rate limiting wrappers.
//!
//! Provides [`Throttled`] and [`Debounced`], which wrap a callback and
//! control how often it actually runs. Both read time from, and schedule
//! trailing calls on, a [`Timer`]. Dropping the wrapper drops any trailing
//! call it still has pending.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
    time::Duration,
};

use crate::{Timer, TimerId};

struct ThrottleState<A> {
    last_run: Option<Duration>,
    trailing: Option<TimerId>,
    latest: Option<A>,
}

struct Throttle<A> {
    timer: Box<dyn Timer>,
    delay: Duration,
    omit_last: bool,
    callback: Box<dyn Fn(A)>,
    state: RefCell<ThrottleState<A>>,
}

/// Runs a callback at most once per `delay`.
///
/// A call made when at least `delay` has passed since the callback last ran
/// runs it immediately. Calls made sooner are coalesced into a single
/// trailing run, scheduled for when `delay` has elapsed, using the arguments
/// of the latest call. With `omit_last` set, those calls are dropped instead.
pub struct Throttled<A> {
    inner: Rc<Throttle<A>>,
}

impl<A: 'static> Throttled<A> {
    /// Wraps `callback`.
    pub fn new(
        timer: impl Timer + 'static,
        delay: Duration,
        omit_last: bool,
        callback: impl Fn(A) + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(Throttle {
                timer: Box::new(timer),
                delay,
                omit_last,
                callback: Box::new(callback),
                state: RefCell::new(ThrottleState {
                    last_run: None,
                    trailing: None,
                    latest: None,
                }),
            }),
        }
    }

    /// Calls the wrapped callback now, later, or not at all.
    pub fn call(&self, args: A) {
        let inner = &self.inner;
        let now = inner.timer.now();
        let mut state = inner.state.borrow_mut();
        let since = state.last_run.map(|last| now.saturating_sub(last));
        match since {
            Some(elapsed) if elapsed < inner.delay => {
                if inner.omit_last {
                    tracing::trace!("throttled call dropped");
                    return;
                }
                state.latest = Some(args);
                if state.trailing.is_none() {
                    let weak = Rc::downgrade(inner);
                    let wait = inner.delay - elapsed;
                    state.trailing = Some(
                        inner
                            .timer
                            .schedule(wait, Box::new(move || Self::run_trailing(&weak))),
                    );
                }
            }
            _ => {
                if let Some(id) = state.trailing.take() {
                    inner.timer.cancel(id);
                }
                state.latest = None;
                state.last_run = Some(now);
                drop(state);
                (inner.callback)(args);
            }
        }
    }

    /// Drops a pending trailing call, if any.
    pub fn cancel(&self) {
        let mut state = self.inner.state.borrow_mut();
        if let Some(id) = state.trailing.take() {
            self.inner.timer.cancel(id);
        }
        state.latest = None;
    }

    fn run_trailing(weak: &Weak<Throttle<A>>) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let args = {
            let mut state = inner.state.borrow_mut();
            state.trailing = None;
            let args = state.latest.take();
            if args.is_some() {
                state.last_run = Some(inner.timer.now());
            }
            args
        };
        if let Some(args) = args {
            (inner.callback)(args);
        }
    }
}

impl<A> Drop for Throttled<A> {
    fn drop(&mut self) {
        let pending = self.inner.state.borrow_mut().trailing.take();
        if let Some(id) = pending {
            self.inner.timer.cancel(id);
        }
    }
}

struct DebounceState<A> {
    pending: Option<TimerId>,
    latest: Option<A>,
}

struct Debounce<A> {
    timer: Box<dyn Timer>,
    delay: Duration,
    include_first: bool,
    callback: Box<dyn Fn(A)>,
    state: RefCell<DebounceState<A>>,
}

/// Runs a callback once calls have stopped coming for `delay`.
///
/// Every call (re)starts the wait, so a burst of calls ends in one run with
/// the arguments of the last call. With `include_first` set, the first call
/// of a burst also runs the callback right away.
pub struct Debounced<A> {
    inner: Rc<Debounce<A>>,
}

impl<A: Clone + 'static> Debounced<A> {
    /// Wraps `callback`.
    pub fn new(
        timer: impl Timer + 'static,
        delay: Duration,
        include_first: bool,
        callback: impl Fn(A) + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(Debounce {
                timer: Box::new(timer),
                delay,
                include_first,
                callback: Box::new(callback),
                state: RefCell::new(DebounceState {
                    pending: None,
                    latest: None,
                }),
            }),
        }
    }

    /// Restarts the wait, remembering `args` for the trailing run.
    pub fn call(&self, args: A) {
        let inner = &self.inner;
        let leading = {
            let mut state = inner.state.borrow_mut();
            let burst_start = match state.pending.take() {
                Some(id) => {
                    inner.timer.cancel(id);
                    false
                }
                None => true,
            };
            let weak = Rc::downgrade(inner);
            state.pending = Some(
                inner
                    .timer
                    .schedule(inner.delay, Box::new(move || Self::run_trailing(&weak))),
            );
            let leading = (inner.include_first && burst_start).then(|| args.clone());
            state.latest = Some(args);
            leading
        };
        if let Some(args) = leading {
            (inner.callback)(args);
        }
    }

    /// Drops the pending trailing run, if any.
    pub fn cancel(&self) {
        let mut state = self.inner.state.borrow_mut();
        if let Some(id) = state.pending.take() {
            self.inner.timer.cancel(id);
        }
        state.latest = None;
    }

    fn run_trailing(weak: &Weak<Debounce<A>>) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let args = {
            let mut state = inner.state.borrow_mut();
            state.pending = None;
            state.latest.take()
        };
        if let Some(args) = args {
            (inner.callback)(args);
        }
    }
}

impl<A> Drop for Debounced<A> {
    fn drop(&mut self) {
        let pending = self.inner.state.borrow_mut().pending.take();
        if let Some(id) = pending {
            self.inner.timer.cancel(id);
        }
    }
}

/// Shorthand for [`Throttled::new`].
pub fn throttle<A: 'static>(
    timer: impl Timer + 'static,
    delay: Duration,
    omit_last: bool,
    callback: impl Fn(A) + 'static,
) -> Throttled<A> {
    Throttled::new(timer, delay, omit_last, callback)
}

/// Shorthand for [`Debounced::new`].
pub fn debounce<A: Clone + 'static>(
    timer: impl Timer + 'static,
    delay: Duration,
    include_first: bool,
    callback: impl Fn(A) + 'static,
) -> Debounced<A> {
    Debounced::new(timer, delay, include_first, callback)
}
