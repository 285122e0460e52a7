// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! An unpublished crate containing testing utilities for use within this repo.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

mod log;
mod metrics;

pub use log::*;
pub use metrics::*;

/// If something (whatever) does not happen in a test within this time, the test will fail.
///
/// This is only meant to break out of hangs, not to bound anything a test actually expects.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A cloneable counter for how often something was invoked.
///
/// Typically captured by origin closures so a test can assert how many times the origin ran.
///
/// # Examples
///
/// ```
/// use testing_aids::CallCounter;
///
/// let calls = CallCounter::new();
/// let counted = calls.clone();
/// let origin = move || counted.increment();
///
/// origin();
/// origin();
/// assert_eq!(calls.count(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallCounter {
    calls: Arc<AtomicUsize>,
}

impl CallCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one call and returns how many calls were recorded before it.
    pub fn increment(&self) -> usize {
        self.calls.fetch_add(1, Ordering::SeqCst)
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_count() {
        let calls = CallCounter::new();
        let clone = calls.clone();

        assert_eq!(clone.increment(), 0);
        assert_eq!(calls.increment(), 1);
        assert_eq!(calls.count(), 2);
        assert_eq!(clone.count(), 2);
    }
}
