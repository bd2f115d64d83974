//! Named policy knobs for cache freshness and batch synchronization.
//!
//! Both policies are plain data so the resolver and orchestrator logic can
//! be tested against arbitrary thresholds without touching configuration.

use std::time::Duration as StdDuration;

use chrono::Duration;

/// Freshness thresholds for point-cache entries.
///
/// An entry's age (measured from `written_at`) classifies it as fresh,
/// usable-but-stale, or expired:
///
/// | Age                          | Class             |
/// |------------------------------|-------------------|
/// | `< staleness`                | fresh             |
/// | `staleness .. hard_expiry`   | usable-but-stale  |
/// | `> hard_expiry`              | expired           |
///
/// Expired entries are never served by the fresh cache tier; the stale
/// fallback tier will still serve an expired entry up to `stale_grace`
/// past its expiry, as a last resort before a live fetch.
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    /// Age past which a served entry triggers a background refresh.
    pub staleness: Duration,
    /// Age past which the fresh tier must not return the entry.
    pub hard_expiry: Duration,
    /// How far past expiry the stale fallback tier may still reach.
    pub stale_grace: Duration,
    /// Entries older than this are deleted by the retention sweep.
    pub retention: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            staleness: Duration::hours(12),
            hard_expiry: Duration::hours(48),
            stale_grace: Duration::days(7),
            retention: Duration::days(7),
        }
    }
}

/// Load-shaping parameters for the sync orchestrator.
///
/// Batch size is the single knob bounding concurrency: batches run
/// sequentially, items within a batch run concurrently, and the
/// orchestrator sleeps `inter_batch_delay` between batches to smooth
/// provider API load.
#[derive(Debug, Clone, Copy)]
pub struct BatchPolicy {
    /// Companies processed concurrently as one batch.
    pub batch_size: usize,
    /// Sleep between consecutive batches.
    pub inter_batch_delay: StdDuration,
    /// Hard timeout for a single provider fetch.
    pub fetch_timeout: StdDuration,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            batch_size: 3,
            inter_batch_delay: StdDuration::from_millis(1_500),
            fetch_timeout: StdDuration::from_secs(15),
        }
    }
}

impl BatchPolicy {
    /// Splits `items` into batches of at most `batch_size`.
    ///
    /// The final batch may be smaller. A `batch_size` of zero is treated
    /// as one to keep partitioning total.
    pub fn partition<T: Clone>(&self, items: &[T]) -> Vec<Vec<T>> {
        let size = self.batch_size.max(1);
        items.chunks(size).map(<[T]>::to_vec).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cache_policy_matches_reference_thresholds() {
        let policy = CachePolicy::default();
        assert_eq!(policy.staleness, Duration::hours(12));
        assert_eq!(policy.hard_expiry, Duration::hours(48));
        assert_eq!(policy.stale_grace, Duration::days(7));
    }

    #[test]
    fn partition_splits_into_fixed_batches() {
        let policy = BatchPolicy {
            batch_size: 3,
            ..BatchPolicy::default()
        };
        let batches = policy.partition(&[1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0], vec![1, 2, 3]);
        assert_eq!(batches[2], vec![7]);
    }

    #[test]
    fn partition_tolerates_zero_batch_size() {
        let policy = BatchPolicy {
            batch_size: 0,
            ..BatchPolicy::default()
        };
        let batches = policy.partition(&[1, 2]);
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn partition_of_empty_set_is_empty() {
        let policy = BatchPolicy::default();
        let batches: Vec<Vec<i64>> = policy.partition(&[]);
        assert!(batches.is_empty());
    }
}
