//! Bounded, age-limited snapshot caches keyed by traffic volume.

use dashmap::DashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

pub trait CacheEntry {
    fn fetched_at(&self) -> Instant;

    fn is_fresh(&self, max_age: Duration) -> bool {
        self.fetched_at().elapsed() <= max_age
    }
}

/// A fetched value and when it arrived.
#[derive(Debug, Clone)]
pub struct Cached<T> {
    pub value: T,
    fetched_at: Instant,
}

impl<T> Cached<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            fetched_at: Instant::now(),
        }
    }
}

impl<T> CacheEntry for Cached<T> {
    fn fetched_at(&self) -> Instant {
        self.fetched_at
    }
}

/// Fresh value for `key`, if any. Stale entries are left for `prune_cache`.
pub fn lookup<K, T>(cache: &DashMap<K, Cached<T>>, key: &K, max_age: Duration) -> Option<T>
where
    K: Eq + Hash,
    T: Clone,
{
    cache
        .get(key)
        .filter(|entry| entry.is_fresh(max_age))
        .map(|entry| entry.value.clone())
}

/// Drop entries older than `max_age`, then the oldest ones until at most
/// `max_entries` remain.
pub fn prune_cache<K, V>(cache: &DashMap<K, V>, max_entries: usize, max_age: Duration)
where
    K: Clone + Eq + Hash,
    V: CacheEntry,
{
    cache.retain(|_, entry| entry.is_fresh(max_age));
    if cache.len() <= max_entries {
        return;
    }

    let mut by_age: Vec<(K, Instant)> = cache
        .iter()
        .map(|entry| (entry.key().clone(), entry.value().fetched_at()))
        .collect();
    by_age.sort_by_key(|(_, fetched_at)| *fetched_at);

    let excess = cache.len() - max_entries;
    for (key, _) in by_age.into_iter().take(excess) {
        cache.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prune_keeps_newest_entries() {
        let cache: DashMap<String, Cached<u32>> = DashMap::new();
        for (i, tv) in ["A", "B", "C"].iter().enumerate() {
            cache.insert(tv.to_string(), Cached::new(i as u32));
            std::thread::sleep(Duration::from_millis(2));
        }
        prune_cache(&cache, 2, Duration::from_secs(60));
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains_key("A"));
        assert_eq!(lookup(&cache, &"C".to_string(), Duration::from_secs(60)), Some(2));
    }

    #[test]
    fn stale_entries_are_not_returned() {
        let cache: DashMap<&str, Cached<u32>> = DashMap::new();
        cache.insert("TV", Cached::new(7));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(lookup(&cache, &"TV", Duration::from_millis(1)), None);
        prune_cache(&cache, 10, Duration::from_millis(1));
        assert!(cache.is_empty());
    }
}
