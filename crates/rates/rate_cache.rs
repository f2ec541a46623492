use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::value_objects::currency::RateTable;

/// Shared rate snapshot with a one hour freshness window. An expired table
/// is treated exactly like an absent one; callers must refetch before
/// converting. Explicitly injected state, never ambient.
#[derive(Default)]
pub struct RateCache {
    inner: RwLock<Option<RateTable>>,
}

impl RateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fresh_snapshot(&self, now: DateTime<Utc>) -> Option<RateTable> {
        let guard = self.inner.read().await;
        guard
            .as_ref()
            .filter(|table| table.is_fresh(now))
            .cloned()
    }

    pub async fn store(&self, table: RateTable) {
        let mut guard = self.inner.write().await;
        *guard = Some(table);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::HashMap;

    fn table_at(fetched_at: DateTime<Utc>) -> RateTable {
        RateTable {
            usd_rates: HashMap::from([("USD".to_string(), 1.0)]),
            usdc_usd_rate: 1.0,
            fetched_at,
        }
    }

    #[tokio::test]
    async fn empty_cache_has_no_snapshot() {
        let cache = RateCache::new();
        assert!(cache.fresh_snapshot(Utc::now()).await.is_none());
    }

    #[tokio::test]
    async fn stored_table_is_served_within_the_window() {
        let cache = RateCache::new();
        let fetched_at = Utc::now();
        cache.store(table_at(fetched_at)).await;

        let snapshot = cache
            .fresh_snapshot(fetched_at + Duration::minutes(59))
            .await;
        assert!(snapshot.is_some());
    }

    #[tokio::test]
    async fn expired_table_is_treated_as_absent() {
        let cache = RateCache::new();
        let fetched_at = Utc::now();
        cache.store(table_at(fetched_at)).await;

        let snapshot = cache
            .fresh_snapshot(fetched_at + Duration::hours(1) + Duration::seconds(1))
            .await;
        assert!(snapshot.is_none());
    }

    #[tokio::test]
    async fn refreshed_table_replaces_the_old_one() {
        let cache = RateCache::new();
        let first = Utc::now() - Duration::hours(2);
        let second = Utc::now();
        cache.store(table_at(first)).await;
        cache.store(table_at(second)).await;

        let snapshot = cache.fresh_snapshot(second).await.unwrap();
        assert_eq!(snapshot.fetched_at, second);
    }
}
