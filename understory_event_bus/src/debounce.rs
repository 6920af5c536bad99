// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Input debouncing driven by host timestamps.
//!
//! ## Usage
//!
//! ```
//! use understory_event_bus::Debouncer;
//!
//! // 150ms quiescence window.
//! let mut d: Debouncer<u32> = Debouncer::new(150);
//!
//! d.input(1, 1000);
//! d.input(12, 1100); // replaces the pending value and restarts the window
//! assert_eq!(d.poll(1200), None);
//! assert_eq!(d.poll(1250), Some(12));
//! assert_eq!(d.poll(2000), None);
//! ```

/// Coalesces rapid inputs into a single value once the input has been quiet for
/// `window` milliseconds.
///
/// The debouncer never reads a clock. Callers pass the current timestamp to
/// [`Debouncer::input`] and [`Debouncer::poll`], typically from a timer scheduled by
/// the host runtime for [`Debouncer::deadline`].
#[derive(Clone, Debug)]
pub struct Debouncer<T> {
    /// Quiescence window in milliseconds.
    pub window: u64,
    pending: Option<Pending<T>>,
}

#[derive(Clone, Debug)]
struct Pending<T> {
    value: T,
    deadline: u64,
}

impl<T> Debouncer<T> {
    /// Create a debouncer with the given quiescence window (milliseconds).
    pub const fn new(window: u64) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Record an input at `now`.
    ///
    /// Any pending value is replaced and its emission canceled; the replaced value is
    /// returned.
    pub fn input(&mut self, value: T, now: u64) -> Option<T> {
        let deadline = now.saturating_add(self.window);
        self.pending
            .replace(Pending { value, deadline })
            .map(|p| p.value)
    }

    /// Take the pending value if its window has elapsed at `now`.
    pub fn poll(&mut self, now: u64) -> Option<T> {
        match &self.pending {
            Some(p) if now >= p.deadline => self.pending.take().map(|p| p.value),
            _ => None,
        }
    }

    /// Timestamp at which the pending value becomes due.
    pub fn deadline(&self) -> Option<u64> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Whether a value is waiting for its window to elapse.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop the pending value without emitting it.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.value)
    }

    /// Take the pending value immediately, regardless of the window.
    pub fn flush(&mut self) -> Option<T> {
        self.cancel()
    }
}

impl<T> Default for Debouncer<T> {
    /// 150ms window.
    fn default() -> Self {
        Self::new(150)
    }
}
