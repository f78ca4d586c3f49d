/// What a single job reports back to the engine.
///
/// `Break` stops the run without failing it: no new jobs are started, jobs
/// already running are allowed to finish, and the completion callback sees
/// success with whatever result the operator defines for an early stop.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub enum Outcome<T, E> {
    /// The job produced a value.
    Value(T),

    /// The job failed. Only the first error of a run is surfaced.
    Error(E),

    /// Stop starting new jobs and succeed overall.
    Break,
}

impl<T, E> Outcome<T, E> {
    /// Returns `true` if the outcome is [`Outcome::Break`].
    pub fn is_break(&self) -> bool {
        matches!(self, Outcome::Break)
    }

    /// Maps the value of a successful outcome, leaving errors and breaks untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U, E> {
        match self {
            Outcome::Value(v) => Outcome::Value(f(v)),
            Outcome::Error(e) => Outcome::Error(e),
            Outcome::Break => Outcome::Break,
        }
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(v) => Outcome::Value(v),
            Err(e) => Outcome::Error(e),
        }
    }
}

// Reason a run stopped starting new jobs.
#[derive(Debug)]
pub(crate) enum Stop<E> {
    Error(E),
    Break,
}

impl<E> Stop<E> {
    // Records `next` unless an error is already held. A real error replaces
    // an earlier break, never an earlier error.
    pub(crate) fn record(slot: &mut Option<Stop<E>>, next: Stop<E>) -> bool {
        let replace = matches!(
            (slot.as_ref(), &next),
            (None, _) | (Some(Stop::Break), Stop::Error(_))
        );
        if replace {
            *slot = Some(next);
        }
        replace
    }

    pub(crate) fn into_error(stop: Option<Stop<E>>) -> Option<E> {
        match stop {
            Some(Stop::Error(e)) => Some(e),
            Some(Stop::Break) | None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_error_is_kept() {
        let mut slot = None;
        assert!(Stop::record(&mut slot, Stop::Error(1)));
        assert!(!Stop::record(&mut slot, Stop::Error(2)));
        assert!(!Stop::record(&mut slot, Stop::Break));
        assert_eq!(Stop::into_error(slot), Some(1));
    }

    #[test]
    fn error_replaces_break() {
        let mut slot = None;
        assert!(Stop::record(&mut slot, Stop::<u8>::Break));
        assert!(!Stop::record(&mut slot, Stop::Break));
        assert!(Stop::record(&mut slot, Stop::Error(7)));
        assert_eq!(Stop::into_error(slot), Some(7));
    }

    #[test]
    fn break_is_swallowed() {
        let mut slot = None;
        Stop::<u8>::record(&mut slot, Stop::Break);
        assert_eq!(Stop::into_error(slot), None);
    }
}
