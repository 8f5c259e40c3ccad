use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::domain::rule::PricingRule;
use crate::repository::PricingRuleReader;

/// How long a hub's rule snapshot stays valid before the next read goes
/// back to the store.
pub const RULE_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Where a [`RulesSnapshot`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    /// Read from the store during this call.
    Fresh,
    /// Served from a snapshot still inside its TTL window.
    Cached,
    /// The store read failed; whatever was cached (possibly nothing) is
    /// served instead.
    Stale,
}

/// The active rules of one hub, keyed by category.
#[derive(Debug, Clone)]
pub struct RulesSnapshot {
    pub rules: HashMap<String, PricingRule>,
    pub source: SnapshotSource,
}

struct HubSnapshot {
    rules: HashMap<String, PricingRule>,
    refreshed_at: Instant,
}

/// In-process cache over the active pricing rules of each hub.
///
/// One instance is shared per process and injected into callers; there is
/// no module-level state, so tests and multi-tenant hosts can hold
/// independent caches. A hub's snapshot is only ever replaced wholesale or
/// dropped, never patched, and the map and its refresh timestamp live
/// behind one lock so readers never observe a half-updated snapshot.
pub struct RuleCache {
    ttl: Duration,
    hubs: Mutex<HashMap<i32, HubSnapshot>>,
}

impl RuleCache {
    /// Cache with the standard TTL.
    pub fn new() -> Self {
        Self::with_ttl(RULE_CACHE_TTL)
    }

    /// Cache with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            hubs: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i32, HubSnapshot>> {
        self.hubs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The active rules for `hub_id`, keyed by category.
    ///
    /// Serves the cached snapshot while it is inside the TTL window.
    /// Otherwise performs one store read; on success the hub's snapshot is
    /// replaced wholesale, on failure the failure is logged and the stale
    /// snapshot (or an empty map) is served. Pricing must always resolve,
    /// so this never returns an error.
    pub fn fetch_active_rules<R>(&self, repo: &R, hub_id: i32) -> RulesSnapshot
    where
        R: PricingRuleReader + ?Sized,
    {
        {
            let hubs = self.lock();
            if let Some(snapshot) = hubs.get(&hub_id) {
                if snapshot.refreshed_at.elapsed() < self.ttl {
                    return RulesSnapshot {
                        rules: snapshot.rules.clone(),
                        source: SnapshotSource::Cached,
                    };
                }
            }
        }

        match repo.list_active_rules(hub_id) {
            Ok(rules) => {
                let rules: HashMap<String, PricingRule> = rules
                    .into_iter()
                    .map(|rule| (rule.category.clone(), rule))
                    .collect();

                let mut hubs = self.lock();
                hubs.insert(
                    hub_id,
                    HubSnapshot {
                        rules: rules.clone(),
                        refreshed_at: Instant::now(),
                    },
                );

                RulesSnapshot {
                    rules,
                    source: SnapshotSource::Fresh,
                }
            }
            Err(err) => {
                log::warn!("Failed to refresh pricing rules for hub {hub_id}: {err}");

                let hubs = self.lock();
                let rules = hubs
                    .get(&hub_id)
                    .map(|snapshot| snapshot.rules.clone())
                    .unwrap_or_default();

                RulesSnapshot {
                    rules,
                    source: SnapshotSource::Stale,
                }
            }
        }
    }

    /// The single active rule for `category`, or `None` when the hub has no
    /// active rule for it. Falling back to built-in defaults is the
    /// calculator's job, not the cache's.
    pub fn get_rule<R>(&self, repo: &R, hub_id: i32, category: &str) -> Option<PricingRule>
    where
        R: PricingRuleReader + ?Sized,
    {
        self.fetch_active_rules(repo, hub_id)
            .rules
            .remove(category)
    }

    /// Drop the hub's snapshot so the next read goes back to the store.
    /// Called after every successful rule mutation.
    pub fn invalidate(&self, hub_id: i32) {
        self.lock().remove(&hub_id);
    }
}

impl Default for RuleCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{NaiveDate, NaiveDateTime};
    use pushkind_common::repository::errors::RepositoryError;

    use crate::repository::mock::MockPricingRuleReader;

    fn fixed_datetime() -> NaiveDateTime {
        match NaiveDate::from_ymd_opt(2024, 1, 1) {
            Some(date) => date.and_hms_opt(0, 0, 0).unwrap_or_default(),
            None => NaiveDateTime::default(),
        }
    }

    fn sample_rule(hub_id: i32, category: &str, base_credits: f64) -> PricingRule {
        PricingRule {
            id: 1,
            hub_id,
            category: category.to_string(),
            base_credits,
            price_tiers: None,
            priority_multipliers: None,
            budget_multipliers: None,
            time_multipliers: None,
            is_active: true,
            created_at: fixed_datetime(),
            updated_at: fixed_datetime(),
        }
    }

    #[test]
    fn fetch_within_ttl_reads_store_once() {
        let mut repo = MockPricingRuleReader::new();
        repo.expect_list_active_rules()
            .times(1)
            .returning(|hub_id| Ok(vec![sample_rule(hub_id, "dining", 1.0)]));

        let cache = RuleCache::new();

        let first = cache.fetch_active_rules(&repo, 42);
        assert_eq!(first.source, SnapshotSource::Fresh);
        assert_eq!(first.rules.len(), 1);

        let second = cache.fetch_active_rules(&repo, 42);
        assert_eq!(second.source, SnapshotSource::Cached);
        assert_eq!(second.rules.len(), 1);
    }

    #[test]
    fn fetch_after_ttl_reads_store_again() {
        let mut repo = MockPricingRuleReader::new();
        repo.expect_list_active_rules()
            .times(2)
            .returning(|hub_id| Ok(vec![sample_rule(hub_id, "dining", 1.0)]));

        let cache = RuleCache::with_ttl(Duration::from_millis(20));

        assert_eq!(
            cache.fetch_active_rules(&repo, 42).source,
            SnapshotSource::Fresh
        );
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(
            cache.fetch_active_rules(&repo, 42).source,
            SnapshotSource::Fresh
        );
    }

    #[test]
    fn hubs_are_cached_independently() {
        let mut repo = MockPricingRuleReader::new();
        repo.expect_list_active_rules()
            .times(2)
            .returning(|hub_id| Ok(vec![sample_rule(hub_id, "dining", hub_id as f64)]));

        let cache = RuleCache::new();

        let first = cache.fetch_active_rules(&repo, 1);
        let second = cache.fetch_active_rules(&repo, 2);

        assert_eq!(first.rules["dining"].base_credits, 1.0);
        assert_eq!(second.rules["dining"].base_credits, 2.0);
    }

    #[test]
    fn failed_refresh_serves_stale_snapshot() {
        let mut repo = MockPricingRuleReader::new();
        repo.expect_list_active_rules()
            .times(1)
            .returning(|hub_id| Ok(vec![sample_rule(hub_id, "travel", 2.0)]));
        repo.expect_list_active_rules()
            .times(1)
            .returning(|_| Err(RepositoryError::NotFound));

        let cache = RuleCache::with_ttl(Duration::from_millis(20));

        let fresh = cache.fetch_active_rules(&repo, 7);
        assert_eq!(fresh.source, SnapshotSource::Fresh);

        std::thread::sleep(Duration::from_millis(40));

        let stale = cache.fetch_active_rules(&repo, 7);
        assert_eq!(stale.source, SnapshotSource::Stale);
        assert_eq!(stale.rules["travel"].base_credits, 2.0);
    }

    #[test]
    fn failed_refresh_with_empty_cache_serves_empty_map() {
        let mut repo = MockPricingRuleReader::new();
        repo.expect_list_active_rules()
            .times(1)
            .returning(|_| Err(RepositoryError::NotFound));

        let cache = RuleCache::new();

        let snapshot = cache.fetch_active_rules(&repo, 7);
        assert_eq!(snapshot.source, SnapshotSource::Stale);
        assert!(snapshot.rules.is_empty());
    }

    #[test]
    fn invalidate_forces_fresh_read() {
        let mut repo = MockPricingRuleReader::new();
        repo.expect_list_active_rules()
            .times(2)
            .returning(|hub_id| Ok(vec![sample_rule(hub_id, "dining", 1.0)]));

        let cache = RuleCache::new();

        assert_eq!(
            cache.fetch_active_rules(&repo, 42).source,
            SnapshotSource::Fresh
        );
        cache.invalidate(42);
        assert_eq!(
            cache.fetch_active_rules(&repo, 42).source,
            SnapshotSource::Fresh
        );
    }

    #[test]
    fn get_rule_returns_none_for_unknown_category() {
        let mut repo = MockPricingRuleReader::new();
        repo.expect_list_active_rules()
            .returning(|hub_id| Ok(vec![sample_rule(hub_id, "dining", 1.0)]));

        let cache = RuleCache::new();

        assert!(cache.get_rule(&repo, 42, "dining").is_some());
        assert!(cache.get_rule(&repo, 42, "private_aviation").is_none());
    }
}
