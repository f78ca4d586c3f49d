//! Provides the slot scheduler every iteration operator is built on.
//!
//! Given a [`Limit`], a sequence length and a job-start function, the
//! scheduler keeps up to `limit` jobs in flight, refilling freed slots as
//! jobs report back, until every job has been started and every started job
//! has finished, or until a job stops the run with an error or a break.
//!
//! Jobs may report before their start function returns. The scheduler tracks
//! that with an `in_start` flag: a report arriving while the flag is set
//! only releases its slot and leaves refilling to the loop that is already
//! running, so a long chain of synchronous completions is handled
//! iteratively by one call frame instead of by recursion. A report arriving
//! after the start function returned drives a new fill pass itself.
//!
//! Once a run is stopped no new jobs are started, but jobs already in flight
//! are never abandoned: the completion callback fires only after every one of
//! them has reported.

use std::{cell::RefCell, rc::Rc};

use crate::{
    Limit, Outcome,
    outcome::Stop,
};

/// Order in which jobs are started.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum Direction {
    #[default]
    Forward,
    Backward,
}

type StartJob<E> = Box<dyn FnMut(usize, JobDone<E>)>;
type AllDone<E> = Box<dyn FnOnce(Option<E>)>;

struct SlotState<E> {
    slots: usize,
    len: usize,
    // Positions consumed so far, holes included.
    cursor: usize,
    in_flight: usize,
    stop: Option<Stop<E>>,
    // Set while a start function runs on this scheduler's own stack.
    in_start: bool,
    finished: bool,
}

pub(crate) struct SlotScheduler<E> {
    state: RefCell<SlotState<E>>,
    direction: Direction,
    start: RefCell<Option<StartJob<E>>>,
    all_done: RefCell<Option<AllDone<E>>>,
}

/// Engine-side completion of one job. Operators wrap it in a guarded
/// [`Done`](crate::Done) before handing it to user code.
pub(crate) struct JobDone<E> {
    scheduler: Rc<SlotScheduler<E>>,
    index: usize,
}

impl<E> Clone for JobDone<E> {
    fn clone(&self) -> Self {
        Self {
            scheduler: Rc::clone(&self.scheduler),
            index: self.index,
        }
    }
}

impl<E: 'static> JobDone<E> {
    pub(crate) fn report(&self, outcome: Outcome<(), E>) {
        self.scheduler.job_done(self.index, outcome);
    }
}

/// Starts a run. With `len == 0` the completion fires before this returns.
pub(crate) fn run<E: 'static>(
    limit: Limit,
    len: usize,
    direction: Direction,
    start: impl FnMut(usize, JobDone<E>) + 'static,
    all_done: impl FnOnce(Option<E>) + 'static,
) {
    tracing::trace!(?limit, len, ?direction, "run started");
    let scheduler = Rc::new(SlotScheduler {
        state: RefCell::new(SlotState {
            slots: limit.slots(),
            len,
            cursor: 0,
            in_flight: 0,
            stop: None,
            in_start: false,
            finished: false,
        }),
        direction,
        start: RefCell::new(Some(Box::new(start))),
        all_done: RefCell::new(Some(Box::new(all_done))),
    });
    scheduler.fill();
}

impl<E: 'static> SlotScheduler<E> {
    fn fill(self: &Rc<Self>) {
        loop {
            let index = {
                let mut state = self.state.borrow_mut();
                if state.finished {
                    return;
                }
                if state.stop.is_some()
                    || state.in_flight >= state.slots
                    || state.cursor >= state.len
                {
                    break;
                }
                state.in_flight += 1;
                state.in_start = true;
                let position = state.cursor;
                state.cursor += 1;
                match self.direction {
                    Direction::Forward => position,
                    Direction::Backward => state.len - 1 - position,
                }
            };
            tracing::trace!(index, "job started");
            let done = JobDone {
                scheduler: Rc::clone(self),
                index,
            };
            if let Some(start) = self.start.borrow_mut().as_mut() {
                start(index, done);
            }
            self.state.borrow_mut().in_start = false;
        }
        self.try_finish();
    }

    fn job_done(self: &Rc<Self>, index: usize, outcome: Outcome<(), E>) {
        let resume = {
            let mut state = self.state.borrow_mut();
            match outcome {
                Outcome::Value(()) => {}
                Outcome::Error(e) => {
                    if Stop::record(&mut state.stop, Stop::Error(e)) {
                        tracing::debug!(index, "run stopped by error");
                    } else {
                        tracing::debug!(index, "later error not surfaced");
                    }
                }
                Outcome::Break => {
                    if Stop::record(&mut state.stop, Stop::Break) {
                        tracing::debug!(index, "run stopped by break");
                    }
                }
            }
            state.in_flight = state.in_flight.saturating_sub(1);
            tracing::trace!(index, in_flight = state.in_flight, "job finished");
            !state.in_start
        };
        if resume {
            self.fill();
        }
    }

    fn try_finish(&self) {
        let stop = {
            let mut state = self.state.borrow_mut();
            if state.finished || state.in_flight > 0 {
                return;
            }
            state.finished = true;
            state.stop.take()
        };
        // Release the operator's captures before reporting.
        let start = self.start.borrow_mut().take();
        drop(start);
        let error = Stop::into_error(stop);
        tracing::debug!(failed = error.is_some(), "run finished");
        let all_done = self.all_done.borrow_mut().take();
        if let Some(all_done) = all_done {
            all_done(error);
        }
    }
}
