// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Helpers for translating time-to-live durations into backend units.

use std::time::Duration;

/// Converts `ttl` into whole seconds, rounding any fractional second up.
///
/// Network stores expire keys at second granularity. Rounding up keeps an entry alive for at
/// least the requested time; a zero duration stays zero.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use flightcache_store::ttl::whole_seconds;
///
/// assert_eq!(whole_seconds(Duration::from_secs(3)), 3);
/// assert_eq!(whole_seconds(Duration::from_millis(1500)), 2);
/// assert_eq!(whole_seconds(Duration::ZERO), 0);
/// ```
#[must_use]
pub fn whole_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 { secs.saturating_add(1) } else { secs }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_second_ttl_rounds_up_to_one() {
        assert_eq!(whole_seconds(Duration::from_millis(1)), 1);
    }

    #[test]
    fn exact_seconds_are_unchanged() {
        assert_eq!(whole_seconds(Duration::from_secs(60)), 60);
    }

    #[test]
    fn huge_ttl_saturates() {
        assert_eq!(whole_seconds(Duration::new(u64::MAX, 1)), u64::MAX);
    }
}
