//! Defines the `Done` completion handle handed to every user step.
//!
//! A `Done` is how a step reports its [`Outcome`] back to the engine. The
//! handle is cheap to clone so it can be moved into deferred callbacks, which
//! also makes it possible to invoke it more than once by accident. Under
//! [`GuardMode::Checked`] the second invocation is rejected before it reaches
//! the engine, under [`GuardMode::Unchecked`] it is forwarded as is.

use std::{cell::Cell, fmt, rc::Rc};

use crate::{FlowError, GuardMode, Outcome};

struct DoneInner<T, E> {
    index: usize,
    mode: GuardMode,
    called: Cell<bool>,
    sink: Box<dyn Fn(Outcome<T, E>)>,
}

/// Completion handle for one job.
///
/// Report exactly one outcome through [`ok`](Done::ok), [`fail`](Done::fail),
/// [`stop`](Done::stop) or [`complete`](Done::complete). The handle may be
/// invoked before the step returns (synchronous resolution) or any time later.
pub struct Done<T, E> {
    inner: Rc<DoneInner<T, E>>,
}

impl<T, E> Clone for Done<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T, E> fmt::Debug for Done<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Done")
            .field("index", &self.inner.index)
            .field("mode", &self.inner.mode)
            .field("called", &self.inner.called.get())
            .finish()
    }
}

impl<T, E> Done<T, E> {
    pub(crate) fn new(index: usize, mode: GuardMode, sink: impl Fn(Outcome<T, E>) + 'static) -> Self {
        Self {
            inner: Rc::new(DoneInner {
                index,
                mode,
                called: Cell::new(false),
                sink: Box::new(sink),
            }),
        }
    }

    /// Position of the job this handle belongs to.
    #[must_use]
    pub fn index(&self) -> usize {
        self.inner.index
    }

    /// Returns `true` once an outcome has been reported through this handle.
    #[must_use]
    pub fn is_called(&self) -> bool {
        self.inner.called.get()
    }

    /// Reports the job's outcome.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::DoubleInvocation`] if an outcome was already
    /// reported and the engine runs in [`GuardMode::Checked`]. The engine's
    /// state is left untouched in that case.
    pub fn try_complete(&self, outcome: impl Into<Outcome<T, E>>) -> Result<(), FlowError> {
        let repeated = self.inner.called.replace(true);
        if repeated {
            match self.inner.mode {
                GuardMode::Checked => {
                    return Err(FlowError::DoubleInvocation {
                        index: self.inner.index,
                    });
                }
                GuardMode::Unchecked => {
                    tracing::warn!(index = self.inner.index, "completion handle reused");
                }
            }
        }
        (self.inner.sink)(outcome.into());
        Ok(())
    }

    /// Reports the job's outcome.
    ///
    /// # Panics
    ///
    /// Panics if an outcome was already reported and the engine runs in
    /// [`GuardMode::Checked`]. Use [`try_complete`](Done::try_complete) to get
    /// the error instead.
    pub fn complete(&self, outcome: impl Into<Outcome<T, E>>) {
        if let Err(e) = self.try_complete(outcome) {
            panic!("{e}");
        }
    }

    /// Reports a successful value.
    pub fn ok(&self, value: T) {
        self.complete(Outcome::Value(value));
    }

    /// Reports a failure.
    pub fn fail(&self, error: E) {
        self.complete(Outcome::Error(error));
    }

    /// Stops the run without failing it.
    pub fn stop(&self) {
        self.complete(Outcome::Break);
    }
}
