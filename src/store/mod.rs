//! Per-metric sliding windows fed by the stream ingestion path.
//!
//! The store owns one [`WindowSet`] behind a `watch` channel: appends go
//! through `send_modify`, so any number of readers observe whole appends
//! only, never a half-evicted window.

mod window;


use std::num::NonZeroUsize;

use tokio::sync::watch;

use crate::catalog::MetricKind;
use crate::model::Sample;

pub use window::{Window, WindowSet};

/// Samples retained per metric kind unless configured otherwise.
pub const DEFAULT_WINDOW_CAPACITY: NonZeroUsize = match NonZeroUsize::new(60) {
    Some(capacity) => capacity,
    None => NonZeroUsize::MIN,
};

#[derive(Debug)]
pub struct WindowStore {
    windows: watch::Sender<WindowSet>,
}

impl Default for WindowStore {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

impl WindowStore {
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        let (windows, _) = watch::channel(WindowSet::new(capacity));
        Self { windows }
    }

    /// Appends to the window of `sample.kind()`, evicting its oldest entry at
    /// capacity. Every call adds exactly one sample.
    pub fn append(&self, sample: Sample) {
        let kind = sample.kind();
        let mut evicted = false;
        self.windows.send_modify(|set| {
            evicted = set.append(sample).is_some();
        });
        tracing::trace!("Appended {} sample (evicted={})", kind, evicted);
    }

    /// Copy of the window for `kind`, oldest first.
    #[must_use]
    pub fn snapshot(&self, kind: MetricKind) -> Vec<Sample> {
        self.windows.borrow().samples(kind)
    }

    /// Consistent copy of every window.
    #[must_use]
    pub fn snapshot_all(&self) -> WindowSet {
        self.windows.borrow().clone()
    }

    #[must_use]
    pub fn latest(&self, kind: MetricKind) -> Option<Sample> {
        self.windows
            .borrow()
            .get(kind)
            .and_then(Window::latest)
            .cloned()
    }

    #[must_use]
    pub fn len(&self, kind: MetricKind) -> usize {
        self.windows.borrow().get(kind).map_or(0, Window::len)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.windows.borrow().capacity()
    }

    /// Receiver notified after every append.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WindowSet> {
        self.windows.subscribe()
    }

    /// Drops every window, e.g. when the feeding subscription is torn down.
    pub fn clear(&self) {
        self.windows.send_modify(WindowSet::clear);
    }
}
