//! Inputs the iteration operators run over.
//!
//! A [`Source`] is a fixed-length, 0-indexed view whose positions are either
//! present or holes. Holes are skipped: no job is started for them and they
//! contribute nothing to results.

use std::ops::Range;

/// Fixed-length input of an iteration operator.
pub trait Source: 'static {
    /// Value handed to the step function for one position.
    type Item;

    /// Number of positions, holes included.
    fn len(&self) -> usize;

    /// Returns `true` if there are no positions at all.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Item at `index`, `None` for a hole or an out-of-range index.
    fn get(&self, index: usize) -> Option<Self::Item>;
}

impl<T: Clone + 'static> Source for Vec<T> {
    type Item = T;

    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn get(&self, index: usize) -> Option<T> {
        self.as_slice().get(index).cloned()
    }
}

/// Numeric range source, the item is the number itself.
impl Source for Range<usize> {
    type Item = usize;

    fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    fn get(&self, index: usize) -> Option<usize> {
        let n = self.start.checked_add(index)?;
        (n < self.end).then_some(n)
    }
}

/// A sequence that may contain holes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sparse<T> {
    slots: Vec<Option<T>>,
}

impl<T> Sparse<T> {
    /// Creates a sparse sequence of `len` holes.
    #[must_use]
    pub fn with_len(len: usize) -> Self {
        let mut slots = Vec::with_capacity(len);
        slots.resize_with(len, || None);
        Self { slots }
    }

    /// Fills position `index`, growing the sequence with holes if needed.
    pub fn set(&mut self, index: usize, value: T) -> &mut Self {
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index] = Some(value);
        self
    }

    /// Turns position `index` into a hole, returning what was there.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    /// Returns `true` if position `index` holds a value.
    #[must_use]
    pub fn is_present(&self, index: usize) -> bool {
        matches!(self.slots.as_slice().get(index), Some(Some(_)))
    }

    /// Present values in order, holes skipped.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().flatten()
    }

    /// Every position, `None` for a hole.
    #[must_use]
    pub fn as_slice(&self) -> &[Option<T>] {
        &self.slots
    }

    /// Consumes the sequence, returning every position.
    #[must_use]
    pub fn into_vec(self) -> Vec<Option<T>> {
        self.slots
    }
}

impl<T> From<Vec<Option<T>>> for Sparse<T> {
    fn from(slots: Vec<Option<T>>) -> Self {
        Self { slots }
    }
}

impl<T> From<Vec<T>> for Sparse<T> {
    fn from(values: Vec<T>) -> Self {
        Self {
            slots: values.into_iter().map(Some).collect(),
        }
    }
}

impl<T> FromIterator<Option<T>> for Sparse<T> {
    fn from_iter<I: IntoIterator<Item = Option<T>>>(iter: I) -> Self {
        Self {
            slots: iter.into_iter().collect(),
        }
    }
}

impl<T: Clone + 'static> Source for Sparse<T> {
    type Item = T;

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn get(&self, index: usize) -> Option<T> {
        self.slots.as_slice().get(index).cloned().flatten()
    }
}
