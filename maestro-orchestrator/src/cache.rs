//! `ResultCache`: single-flight, TTL + size-bounded cache of orchestration
//! results keyed by (orchestrator tag, normalized query, selected experts).

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Notify;

use crate::trace::TraceSnapshot;

/// Content-addressed cache key. Built by normalizing the query (trim, fold
/// case) and sorting the selected expert id set so `{a, b}` and `{b, a}`
/// hash identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    orchestrator: String,
    normalized_query: String,
    selected_experts: Vec<String>,
}

impl CacheKey {
    pub fn new(orchestrator: &str, query: &str, selected_experts: &[String]) -> Self {
        let mut experts: Vec<String> = selected_experts.to_vec();
        experts.sort();
        Self {
            orchestrator: orchestrator.to_string(),
            normalized_query: query.trim().to_lowercase(),
            selected_experts: experts,
        }
    }
}

/// A completed orchestration result, cached by key.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub answer: String,
    pub trace_snapshot: TraceSnapshot,
    pub experts_used: Vec<String>,
    pub guardrail_triggered: bool,
    pub created_at: Instant,
}

enum Slot {
    InFlight(Arc<Notify>),
    Ready(CacheEntry, Instant),
}

/// Single-flight, TTL + approximate entry-count bounded result cache.
///
/// For N concurrent identical-key orchestrations, exactly one builds the
/// result; the rest await the in-flight build's `Notify` and then read the
/// committed entry. A build that fails never commits an entry — every
/// waiter sees its own error from its own retry, not a cached failure.
pub struct ResultCache {
    entries: DashMap<CacheKey, Slot>,
    ttl: Duration,
    max_entries: usize,
}

/// What a cache lookup resolved to.
pub enum Lookup {
    /// A fresh, unexpired entry.
    Hit(CacheEntry),
    /// This caller is now responsible for building the result and must call
    /// [`ResultCache::commit`] or [`ResultCache::abort`] when done.
    Build,
    /// Another caller is building; this caller waited for it and should
    /// retry the lookup (it will resolve to `Hit` or, if the builder
    /// failed, `Build` again).
    WaitedForBuild,
}

impl ResultCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries,
        }
    }

    /// Looks up `key`. Returns `Hit` on a fresh entry, claims build
    /// responsibility with `Build` if nobody else is building, or awaits the
    /// in-flight build and returns `WaitedForBuild` for the caller to retry.
    pub async fn lookup(&self, key: &CacheKey) -> Lookup {
        loop {
            if let Some(slot) = self.entries.get(key) {
                match &*slot {
                    Slot::Ready(entry, stored_at) if stored_at.elapsed() < self.ttl => {
                        return Lookup::Hit(entry.clone());
                    }
                    Slot::Ready(..) => {
                        drop(slot);
                        self.entries.remove(key);
                        continue;
                    }
                    Slot::InFlight(notify) => {
                        let notify = Arc::clone(notify);
                        drop(slot);
                        notify.notified().await;
                        return Lookup::WaitedForBuild;
                    }
                }
            }
            // No entry: try to claim the build slot. `entry` races other
            // callers atomically under dashmap's shard lock.
            match self.entries.entry(key.clone()) {
                dashmap::mapref::entry::Entry::Vacant(v) => {
                    v.insert(Slot::InFlight(Arc::new(Notify::new())));
                    return Lookup::Build;
                }
                dashmap::mapref::entry::Entry::Occupied(_) => continue,
            }
        }
    }

    /// Commits a successful build, replacing the in-flight slot and waking
    /// every waiter.
    pub fn commit(&self, key: CacheKey, entry: CacheEntry) {
        self.evict_if_over_capacity();
        let notify = match self.entries.get(&key) {
            Some(slot) => match &*slot {
                Slot::InFlight(n) => Some(Arc::clone(n)),
                Slot::Ready(..) => None,
            },
            None => None,
        };
        self.entries.insert(key, Slot::Ready(entry, Instant::now()));
        if let Some(notify) = notify {
            notify.notify_waiters();
        }
    }

    /// Aborts a failed build: removes the in-flight marker so the next
    /// caller retries from scratch instead of waiting forever, and wakes
    /// anyone already waiting so they re-enter `lookup`.
    pub fn abort(&self, key: &CacheKey) {
        if let Some((_, Slot::InFlight(notify))) = self.entries.remove(key) {
            notify.notify_waiters();
        }
    }

    fn evict_if_over_capacity(&self) {
        if self.entries.len() < self.max_entries {
            return;
        }
        // Approximate LRU: evict the stalest ready entry. `Ready` entries
        // only, since in-flight builds must never be evicted out from under
        // their waiters.
        let oldest = self
            .entries
            .iter()
            .filter_map(|e| match &*e {
                Slot::Ready(_, stored_at) => Some((e.key().clone(), *stored_at)),
                Slot::InFlight(_) => None,
            })
            .min_by_key(|(_, stored_at)| *stored_at);
        if let Some((key, _)) = oldest {
            self.entries.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::OrchestrationTrace;

    fn entry(answer: &str) -> CacheEntry {
        CacheEntry {
            answer: answer.to_string(),
            trace_snapshot: OrchestrationTrace::new("moe", "req").snapshot(),
            experts_used: vec!["chitchat".to_string()],
            guardrail_triggered: false,
            created_at: Instant::now(),
        }
    }

    #[tokio::test]
    async fn first_lookup_claims_build_second_waits_then_sees_hit() {
        let cache = ResultCache::new(Duration::from_secs(60), 16);
        let key = CacheKey::new("moe", "hello", &["chitchat".to_string()]);

        assert!(matches!(cache.lookup(&key).await, Lookup::Build));

        let cache = Arc::new(cache);
        let waiter_key = key.clone();
        let waiter_cache = Arc::clone(&cache);
        let waiter = tokio::spawn(async move { waiter_cache.lookup(&waiter_key).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.commit(key.clone(), entry("hi there"));

        let result = waiter.await.unwrap();
        assert!(matches!(result, Lookup::WaitedForBuild));
        match cache.lookup(&key).await {
            Lookup::Hit(e) => assert_eq!(e.answer, "hi there"),
            _ => panic!("expected hit after commit"),
        }
    }

    #[tokio::test]
    async fn expired_entry_is_treated_as_a_miss() {
        let cache = ResultCache::new(Duration::from_millis(1), 16);
        let key = CacheKey::new("moe", "hello", &[]);
        assert!(matches!(cache.lookup(&key).await, Lookup::Build));
        cache.commit(key.clone(), entry("answer"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(matches!(cache.lookup(&key).await, Lookup::Build));
    }

    #[tokio::test]
    async fn abort_clears_the_in_flight_marker_so_next_caller_rebuilds() {
        let cache = ResultCache::new(Duration::from_secs(60), 16);
        let key = CacheKey::new("moe", "hello", &[]);
        assert!(matches!(cache.lookup(&key).await, Lookup::Build));
        cache.abort(&key);
        assert!(matches!(cache.lookup(&key).await, Lookup::Build));
    }

    #[test]
    fn cache_key_is_order_independent_over_selected_experts() {
        let a = CacheKey::new("moe", "Query", &["b".to_string(), "a".to_string()]);
        let b = CacheKey::new("moe", "query", &["a".to_string(), "b".to_string()]);
        assert_eq!(a, b);
    }
}
