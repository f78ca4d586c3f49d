//! Concurrent binary reduction.
//!
//! Items live in a sparse row of slots indexed by their original position.
//! A slot holds a value, is in process (its value is the left operand of a
//! running combine), or is empty (its value was absorbed by a neighbor). The
//! driver repeatedly pairs two adjacent surviving values, marking the left
//! one in process and emptying the right one, and writes the combined value
//! back into the left slot once the combine reports. An in-process slot is a
//! barrier: values on either side of it are never paired across it.
//!
//! Read left to right, the values in the row always form the reduction of
//! the original sequence under an associative combine, whatever order the
//! combines finish in. The run ends when nothing is in flight and no pair
//! can be formed, at which point exactly one value survives.

use std::{cell::RefCell, rc::Rc};

use crate::{
    Done, Flow, GuardMode, Limit, Outcome, Source,
    outcome::Stop,
    scheduler::Direction,
};

enum Slot<T> {
    Empty,
    Value(T),
    InProcess,
}

type Combine<T, E> = Box<dyn FnMut(T, T, Done<T, E>)>;
type Reduced<T, E> = Box<dyn FnOnce(Result<Option<T>, E>)>;

struct ForestState<T, E> {
    slots: Vec<Slot<T>>,
    limit: usize,
    in_flight: usize,
    stop: Option<Stop<E>>,
    in_drive: bool,
    // A combine reported while the driver was running.
    dirty: bool,
    finished: bool,
}

impl<T, E> ForestState<T, E> {
    // Next adjacent pair of surviving values at or after scan position
    // `from`, as (left, right, position after right).
    fn next_pair(&self, from: usize, direction: Direction) -> Option<(usize, usize, usize)> {
        let len = self.slots.len();
        let mut left = None;
        for position in from..len {
            let index = match direction {
                Direction::Forward => position,
                Direction::Backward => len - 1 - position,
            };
            match self.slots[index] {
                Slot::Empty => {}
                Slot::InProcess => left = None,
                Slot::Value(_) => match left {
                    Some(l) => return Some((l, index, position + 1)),
                    None => left = Some(index),
                },
            }
        }
        None
    }
}

struct Forest<T, E> {
    state: RefCell<ForestState<T, E>>,
    direction: Direction,
    mode: GuardMode,
    combine: RefCell<Option<Combine<T, E>>>,
    on_done: RefCell<Option<Reduced<T, E>>>,
}

impl<T: 'static, E: 'static> Forest<T, E> {
    fn drive(self: &Rc<Self>) {
        let mut from = 0;
        loop {
            let pair = {
                let mut state = self.state.borrow_mut();
                if state.finished {
                    return;
                }
                if state.stop.is_some() || state.in_flight >= state.limit {
                    break;
                }
                match state.next_pair(from, self.direction) {
                    Some(pair) => {
                        let (left, right, next) = pair;
                        let a = std::mem::replace(&mut state.slots[left], Slot::InProcess);
                        let b = std::mem::replace(&mut state.slots[right], Slot::Empty);
                        let (Slot::Value(a), Slot::Value(b)) = (a, b) else {
                            unreachable!("paired slots hold values");
                        };
                        state.in_flight += 1;
                        state.in_drive = true;
                        from = next;
                        Some((left, right, a, b))
                    }
                    None if state.dirty => {
                        // Values written back during this pass may pair up
                        // behind the scan position.
                        state.dirty = false;
                        from = 0;
                        continue;
                    }
                    None => None,
                }
            };
            let Some((left, right, a, b)) = pair else {
                break;
            };
            tracing::trace!(left, right, "combine started");
            let forest = Rc::clone(self);
            let done = Done::new(left, self.mode, move |outcome| forest.combined(left, outcome));
            if let Some(combine) = self.combine.borrow_mut().as_mut() {
                // Operands always reach the user in original order.
                match self.direction {
                    Direction::Forward => combine(a, b, done),
                    Direction::Backward => combine(b, a, done),
                }
            }
            self.state.borrow_mut().in_drive = false;
        }
        self.try_finish();
    }

    fn combined(self: &Rc<Self>, left: usize, outcome: Outcome<T, E>) {
        let resume = {
            let mut state = self.state.borrow_mut();
            match outcome {
                Outcome::Value(v) => {
                    if let Some(slot) = state.slots.get_mut(left) {
                        *slot = Slot::Value(v);
                    }
                }
                Outcome::Error(e) => {
                    if Stop::record(&mut state.stop, Stop::Error(e)) {
                        tracing::debug!(left, "reduction stopped by error");
                    }
                }
                Outcome::Break => {
                    if Stop::record(&mut state.stop, Stop::Break) {
                        tracing::debug!(left, "reduction stopped by break");
                    }
                }
            }
            state.in_flight = state.in_flight.saturating_sub(1);
            tracing::trace!(left, in_flight = state.in_flight, "combine finished");
            if state.in_drive {
                state.dirty = true;
            }
            !state.in_drive
        };
        if resume {
            self.drive();
        }
    }

    fn try_finish(&self) {
        let result = {
            let mut state = self.state.borrow_mut();
            if state.finished || state.in_flight > 0 {
                return;
            }
            state.finished = true;
            match state.stop.take() {
                Some(Stop::Error(e)) => Err(e),
                Some(Stop::Break) => Ok(None),
                None => {
                    let mut survivors = state.slots.drain(..).filter_map(|slot| match slot {
                        Slot::Value(v) => Some(v),
                        Slot::Empty | Slot::InProcess => None,
                    });
                    let value = survivors.next();
                    debug_assert!(survivors.next().is_none(), "reduction left several values");
                    Ok(value)
                }
            }
        };
        let combine = self.combine.borrow_mut().take();
        drop(combine);
        tracing::debug!(failed = result.is_err(), "reduction finished");
        let on_done = self.on_done.borrow_mut().take();
        if let Some(on_done) = on_done {
            on_done(result);
        }
    }
}

impl Flow {
    fn reduce_in<S, E>(
        &self,
        limit: Limit,
        direction: Direction,
        source: S,
        combine: impl FnMut(S::Item, S::Item, Done<S::Item, E>) + 'static,
        on_done: impl FnOnce(Result<Option<S::Item>, E>) + 'static,
    ) where
        S: Source,
        S::Item: 'static,
        E: 'static,
    {
        let slots: Vec<Slot<S::Item>> = (0..source.len())
            .map(|i| source.get(i).map_or(Slot::Empty, Slot::Value))
            .collect();
        let present = slots.iter().filter(|s| matches!(s, Slot::Value(_))).count();
        if present < 2 {
            let sole = slots.into_iter().find_map(|slot| match slot {
                Slot::Value(v) => Some(v),
                Slot::Empty | Slot::InProcess => None,
            });
            on_done(Ok(sole));
            return;
        }
        let forest = Rc::new(Forest {
            state: RefCell::new(ForestState {
                slots,
                limit: limit.slots(),
                in_flight: 0,
                stop: None,
                in_drive: false,
                dirty: false,
                finished: false,
            }),
            direction,
            mode: self.config().guard_mode(),
            combine: RefCell::new(Some(Box::new(combine))),
            on_done: RefCell::new(Some(Box::new(on_done))),
        });
        forest.drive();
    }

    /// Reduces the items pairwise with no bound on concurrent combines.
    pub fn reduce<S, E>(
        &self,
        source: S,
        combine: impl FnMut(S::Item, S::Item, Done<S::Item, E>) + 'static,
        on_done: impl FnOnce(Result<Option<S::Item>, E>) + 'static,
    ) where
        S: Source,
        S::Item: 'static,
        E: 'static,
    {
        self.reduce_limit(Limit::UNBOUNDED, source, combine, on_done);
    }

    /// Reduces the items pairwise, one combine at a time.
    pub fn reduce_series<S, E>(
        &self,
        source: S,
        combine: impl FnMut(S::Item, S::Item, Done<S::Item, E>) + 'static,
        on_done: impl FnOnce(Result<Option<S::Item>, E>) + 'static,
    ) where
        S: Source,
        S::Item: 'static,
        E: 'static,
    {
        self.reduce_limit(Limit::SERIAL, source, combine, on_done);
    }

    /// Reduces the items pairwise with at most `limit` combines in flight.
    ///
    /// `combine` always receives two neighbors in their original order, so
    /// for an associative operation the result equals a left fold no matter
    /// how the combines interleave. Fewer than two present items complete
    /// before this returns with the sole item, or `None`. A break ends the
    /// reduction with `Ok(None)` once in-flight combines have reported.
    pub fn reduce_limit<S, E>(
        &self,
        limit: impl Into<Limit>,
        source: S,
        combine: impl FnMut(S::Item, S::Item, Done<S::Item, E>) + 'static,
        on_done: impl FnOnce(Result<Option<S::Item>, E>) + 'static,
    ) where
        S: Source,
        S::Item: 'static,
        E: 'static,
    {
        self.reduce_in(limit.into(), Direction::Forward, source, combine, on_done);
    }

    /// Reduces from the right with no bound on concurrent combines.
    pub fn reduce_right<S, E>(
        &self,
        source: S,
        combine: impl FnMut(S::Item, S::Item, Done<S::Item, E>) + 'static,
        on_done: impl FnOnce(Result<Option<S::Item>, E>) + 'static,
    ) where
        S: Source,
        S::Item: 'static,
        E: 'static,
    {
        self.reduce_right_limit(Limit::UNBOUNDED, source, combine, on_done);
    }

    /// Reduces from the right, one combine at a time.
    pub fn reduce_right_series<S, E>(
        &self,
        source: S,
        combine: impl FnMut(S::Item, S::Item, Done<S::Item, E>) + 'static,
        on_done: impl FnOnce(Result<Option<S::Item>, E>) + 'static,
    ) where
        S: Source,
        S::Item: 'static,
        E: 'static,
    {
        self.reduce_right_limit(Limit::SERIAL, source, combine, on_done);
    }

    /// Reduces from the right with at most `limit` combines in flight.
    ///
    /// Pairs are formed starting from the last item, which is the reduction
    /// of the reversed sequence. Operands are swapped back before reaching
    /// `combine`, so it still sees neighbors in original order.
    pub fn reduce_right_limit<S, E>(
        &self,
        limit: impl Into<Limit>,
        source: S,
        combine: impl FnMut(S::Item, S::Item, Done<S::Item, E>) + 'static,
        on_done: impl FnOnce(Result<Option<S::Item>, E>) + 'static,
    ) where
        S: Source,
        S::Item: 'static,
        E: 'static,
    {
        self.reduce_in(limit.into(), Direction::Backward, source, combine, on_done);
    }
}
