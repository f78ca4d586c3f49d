use std::{fmt, num::NonZeroU32};

/// Upper bound on the number of jobs a run keeps in flight.
///
/// Limits are 32-bit: conversions from wider or signed integers wrap modulo
/// 2^32 the way loosely typed callers expect, and a value of zero after the
/// conversion means "no bound".
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub struct Limit(Option<NonZeroU32>);

impl Limit {
    /// Every job may run at once.
    pub const UNBOUNDED: Self = Self(None);

    /// One job at a time.
    pub const SERIAL: Self = Self(NonZeroU32::new(1));

    /// Create a limit of `value` concurrent jobs, `0` meaning unbounded.
    pub const fn new(value: u32) -> Self {
        Self(NonZeroU32::new(value))
    }

    /// Get the bound, `None` if unbounded.
    #[must_use]
    pub const fn get(&self) -> Option<u32> {
        match self.0 {
            Some(v) => Some(v.get()),
            None => None,
        }
    }

    /// Returns `true` if the limit does not bound concurrency.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.0.is_none()
    }

    // Number of slots as a count comparable with `usize` bookkeeping.
    pub(crate) fn slots(&self) -> usize {
        self.0.map_or(usize::MAX, |v| v.get() as usize)
    }
}

impl Default for Limit {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

impl fmt::Debug for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "Limit({v})"),
            None => f.write_str("Limit(unbounded)"),
        }
    }
}

impl From<u32> for Limit {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

// Truncating casts below are ToUint32: keep the low 32 bits.
impl From<i32> for Limit {
    fn from(value: i32) -> Self {
        Self::new(value as u32)
    }
}

impl From<i64> for Limit {
    fn from(value: i64) -> Self {
        Self::new(value as u32)
    }
}

impl From<usize> for Limit {
    fn from(value: usize) -> Self {
        Self::new(value as u32)
    }
}

impl From<Option<u32>> for Limit {
    fn from(value: Option<u32>) -> Self {
        value.map_or(Self::UNBOUNDED, Self::new)
    }
}
