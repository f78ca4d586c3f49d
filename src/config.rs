//! Engine configuration.
//!
//! The only knob is how completion handles react to being invoked twice.
//! [`GuardMode::Checked`] rejects the second call with
//! [`FlowError::DoubleInvocation`](crate::FlowError::DoubleInvocation);
//! [`GuardMode::Unchecked`] forwards every call to the engine and skips the
//! bookkeeping. Building with the `unchecked` cargo feature changes the
//! default, an explicit [`Config`] always takes precedence.

/// How completion handles handed to user steps guard against reuse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardMode {
    /// A second invocation fails fast.
    Checked,

    /// Every invocation is forwarded. Reusing a handle leaves the run's
    /// results unspecified, but never unsound: each extra call counts as a
    /// finished job, so completion may be reported while other jobs are
    /// still in flight. It is still reported only once.
    Unchecked,
}

impl Default for GuardMode {
    fn default() -> Self {
        if cfg!(feature = "unchecked") {
            GuardMode::Unchecked
        } else {
            GuardMode::Checked
        }
    }
}

/// Configuration injected into a [`Flow`](crate::Flow) at construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct Config {
    guard: GuardMode,
}

impl Config {
    /// Creates a configuration using the build's default [`GuardMode`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration with single-invocation checks enabled.
    pub fn checked() -> Self {
        Self {
            guard: GuardMode::Checked,
        }
    }

    /// Configuration with single-invocation checks disabled.
    pub fn unchecked() -> Self {
        Self {
            guard: GuardMode::Unchecked,
        }
    }

    /// Sets the guard mode.
    pub fn guard(mut self, guard: GuardMode) -> Self {
        self.guard = guard;
        self
    }

    /// Returns the configured guard mode.
    #[must_use]
    pub fn guard_mode(&self) -> GuardMode {
        self.guard
    }
}
