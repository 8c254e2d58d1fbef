use std::collections::{BTreeMap, VecDeque};
use std::num::NonZeroUsize;

use crate::catalog::MetricKind;
use crate::model::Sample;

/// Bounded FIFO of the most recent samples of one metric kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    capacity: NonZeroUsize,
    samples: VecDeque<Sample>,
}

impl Window {
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity.get()),
        }
    }

    /// Appends `sample`, returning the evicted oldest sample when full.
    pub fn push(&mut self, sample: Sample) -> Option<Sample> {
        let evicted = if self.samples.len() >= self.capacity.get() {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        evicted
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity.get()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Most recently appended sample.
    #[must_use]
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Samples in arrival order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Sample> {
        self.samples.iter().cloned().collect()
    }
}

/// All windows of a store at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSet {
    capacity: NonZeroUsize,
    windows: BTreeMap<MetricKind, Window>,
}

impl WindowSet {
    pub(super) const fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            windows: BTreeMap::new(),
        }
    }

    pub(super) fn append(&mut self, sample: Sample) -> Option<Sample> {
        let capacity = self.capacity;
        self.windows
            .entry(sample.kind())
            .or_insert_with(|| Window::new(capacity))
            .push(sample)
    }

    pub(super) fn clear(&mut self) {
        self.windows.clear();
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Window for `kind`, if any sample of that kind has been seen.
    #[must_use]
    pub fn get(&self, kind: MetricKind) -> Option<&Window> {
        self.windows.get(&kind)
    }

    /// Copy of the samples for `kind`; empty when the kind was never seen.
    #[must_use]
    pub fn samples(&self, kind: MetricKind) -> Vec<Sample> {
        self.windows.get(&kind).map(Window::to_vec).unwrap_or_default()
    }

    /// Kinds with a window, in catalog order.
    pub fn kinds(&self) -> impl Iterator<Item = MetricKind> + '_ {
        self.windows.keys().copied()
    }

    /// Total samples across all windows.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.windows.values().map(Window::len).sum()
    }
}
