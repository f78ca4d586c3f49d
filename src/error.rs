//! Errors raised by the engine itself.
//!
//! User errors never show up here: they travel through completion callbacks
//! as the `E` of `Result<T, E>`. `FlowError` covers misuse of the engine
//! that is detected synchronously, at the call site that caused it.

use thiserror::Error;

/// Represents programming errors detected by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum FlowError {
    /// A completion handle was invoked after it had already reported an outcome.
    ///
    /// Only raised while [`GuardMode::Checked`](crate::GuardMode::Checked) is active.
    #[error("completion handle for job {index} was invoked more than once")]
    DoubleInvocation {
        /// Position of the job whose handle was reused.
        index: usize,
    },
}
