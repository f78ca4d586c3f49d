//! Asynchronous while loops.
//!
//! A synchronous predicate gates a sequence of asynchronous iterations, with
//! the value each iteration reports threaded into the next test and the next
//! iteration. Iterations that report before returning are looped over
//! without growing the stack, the same way the slot scheduler handles
//! synchronous jobs.

use std::{cell::RefCell, rc::Rc};

use crate::{Done, Flow, GuardMode, Outcome, outcome::Stop};

type Test<T> = Box<dyn FnMut(Option<&T>, usize) -> bool>;
type Iteration<T, E> = Box<dyn FnMut(Option<T>, Done<T, E>)>;
type Finished<T, E> = Box<dyn FnOnce(Result<Option<T>, E>)>;

struct LoopState<T, E> {
    last: Option<T>,
    // Predicate evaluations so far.
    index: usize,
    running: bool,
    in_drive: bool,
    stop: Option<Stop<E>>,
    finished: bool,
}

struct Loop<T, E> {
    state: RefCell<LoopState<T, E>>,
    mode: GuardMode,
    test: RefCell<Test<T>>,
    step: RefCell<Iteration<T, E>>,
    on_done: RefCell<Option<Finished<T, E>>>,
}

impl<T: Clone + 'static, E: 'static> Loop<T, E> {
    fn drive(self: &Rc<Self>) {
        loop {
            let (last, index) = {
                let mut state = self.state.borrow_mut();
                if state.finished || state.running {
                    return;
                }
                if state.stop.is_some() {
                    break;
                }
                let index = state.index;
                state.index += 1;
                (state.last.clone(), index)
            };
            let proceed = (self.test.borrow_mut())(last.as_ref(), index);
            if !proceed {
                break;
            }
            {
                let mut state = self.state.borrow_mut();
                state.running = true;
                state.in_drive = true;
            }
            let this = Rc::clone(self);
            let done = Done::new(index, self.mode, move |outcome| this.iterated(outcome));
            (self.step.borrow_mut())(last, done);
            let mut state = self.state.borrow_mut();
            state.in_drive = false;
            if state.running {
                // Resumed by the iteration's completion.
                return;
            }
        }
        self.finish();
    }

    fn iterated(self: &Rc<Self>, outcome: Outcome<T, E>) {
        let resume = {
            let mut state = self.state.borrow_mut();
            match outcome {
                Outcome::Value(v) => state.last = Some(v),
                Outcome::Error(e) => {
                    Stop::record(&mut state.stop, Stop::Error(e));
                }
                Outcome::Break => {
                    Stop::record(&mut state.stop, Stop::Break);
                }
            }
            state.running = false;
            !state.in_drive
        };
        if resume {
            self.drive();
        }
    }

    fn finish(&self) {
        let result = {
            let mut state = self.state.borrow_mut();
            if state.finished {
                return;
            }
            state.finished = true;
            match Stop::into_error(state.stop.take()) {
                Some(e) => Err(e),
                None => Ok(state.last.take()),
            }
        };
        tracing::debug!(failed = result.is_err(), "loop finished");
        let on_done = self.on_done.borrow_mut().take();
        if let Some(on_done) = on_done {
            on_done(result);
        }
    }
}

impl Flow {
    /// Runs `step` for as long as `test` holds.
    ///
    /// `test` receives the value reported by the previous iteration (`None`
    /// before the first) and how many times it has been evaluated. `step`
    /// receives the same previous value and reports the next one; its
    /// handle's [`index`](Done::index) is the iteration number. `on_done`
    /// gets the last reported value once `test` fails or an iteration breaks,
    /// or the error of a failed iteration.
    ///
    /// # Example
    /// ```
    /// # use asyncflow::Flow;
    /// # use std::{cell::RefCell, rc::Rc};
    /// let result = Rc::new(RefCell::new(None));
    /// let r = Rc::clone(&result);
    /// Flow::default().whilst(
    ///     |v: Option<&u32>, _| v.is_none_or(|v| *v < 5),
    ///     |v, done| done.ok(v.unwrap_or(0) + 1),
    ///     move |res: Result<Option<u32>, ()>| *r.borrow_mut() = Some(res),
    /// );
    /// assert_eq!(*result.borrow(), Some(Ok(Some(5))));
    /// ```
    pub fn whilst<T, E>(
        &self,
        test: impl FnMut(Option<&T>, usize) -> bool + 'static,
        step: impl FnMut(Option<T>, Done<T, E>) + 'static,
        on_done: impl FnOnce(Result<Option<T>, E>) + 'static,
    ) where
        T: Clone + 'static,
        E: 'static,
    {
        let looping = Rc::new(Loop {
            state: RefCell::new(LoopState {
                last: None,
                index: 0,
                running: false,
                in_drive: false,
                stop: None,
                finished: false,
            }),
            mode: self.config().guard_mode(),
            test: RefCell::new(Box::new(test)),
            step: RefCell::new(Box::new(step)),
            on_done: RefCell::new(Some(Box::new(on_done))),
        });
        looping.drive();
    }

    /// Runs `step` until `test` holds. Same contract as [`whilst`](Flow::whilst)
    /// with the predicate inverted.
    pub fn until<T, E>(
        &self,
        mut test: impl FnMut(Option<&T>, usize) -> bool + 'static,
        step: impl FnMut(Option<T>, Done<T, E>) + 'static,
        on_done: impl FnOnce(Result<Option<T>, E>) + 'static,
    ) where
        T: Clone + 'static,
        E: 'static,
    {
        self.whilst(move |last, index| !test(last, index), step, on_done);
    }
}
