//! Campaign donations cache invalidation.
//!
//! The ledger does not cache anything itself. Whatever caches a campaign's
//! donation aggregates is told to drop them whenever a ledger row for that
//! campaign is written.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;

use tracing::debug;

/// Hook invoked whenever a campaign's donation rows change.
pub trait DonationsCache: fmt::Debug {
    /// Drop any cached donation aggregates for the campaign.
    fn flush_donations_cache(&self, campaign_id: i64);
}

/// A cache hook with nothing behind it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCache;

impl DonationsCache for NullCache {
    fn flush_donations_cache(&self, campaign_id: i64) {
        debug!("Flushing donations cache for campaign {}", campaign_id);
    }
}

/// Holds flushes back until a transaction has committed.
///
/// Each campaign is flushed once, in id order, by [`DeferredFlush::flush_into`].
/// Dropping it without that call discards the flushes, which is what a
/// rolled-back transaction needs.
#[derive(Debug, Default)]
pub(crate) struct DeferredFlush {
    pending: RefCell<BTreeSet<i64>>,
}

impl DeferredFlush {
    /// Pass every collected flush on to `cache`.
    pub(crate) fn flush_into(self, cache: &dyn DonationsCache) {
        for campaign_id in self.pending.into_inner() {
            cache.flush_donations_cache(campaign_id);
        }
    }
}

impl DonationsCache for DeferredFlush {
    fn flush_donations_cache(&self, campaign_id: i64) {
        self.pending.borrow_mut().insert(campaign_id);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::DonationsCache;

    /// Records every flushed campaign id.
    #[derive(Debug, Default)]
    pub struct RecordingCache {
        flushed: Mutex<Vec<i64>>,
    }

    impl RecordingCache {
        pub fn flushed(&self) -> Vec<i64> {
            self.flushed.lock().unwrap().clone()
        }

        pub fn clear(&self) {
            self.flushed.lock().unwrap().clear();
        }
    }

    impl DonationsCache for RecordingCache {
        fn flush_donations_cache(&self, campaign_id: i64) {
            self.flushed.lock().unwrap().push(campaign_id);
        }
    }
}
