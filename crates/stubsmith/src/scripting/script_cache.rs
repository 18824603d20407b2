use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-lifetime cache of script source text keyed by file name
///
/// Entries are never evicted or refreshed. Concurrent first loads of the same
/// name may both read the file, but only the first insert is kept and every
/// caller gets that entry back.
#[derive(Debug, Default)]
pub struct ScriptCache {
    entries: RwLock<HashMap<String, Arc<str>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ScriptCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Arc<str>> {
        let found = self.entries.read().get(name).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Store `source` unless an entry already exists; returns the stored entry
    pub fn insert_if_absent(&self, name: &str, source: String) -> Arc<str> {
        let mut entries = self.entries.write();
        entries
            .entry(name.to_string())
            .or_insert_with(|| Arc::from(source))
            .clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_insert_wins() {
        let cache = ScriptCache::new();
        let first = cache.insert_if_absent("a.rhai", "1".to_string());
        let second = cache.insert_if_absent("a.rhai", "2".to_string());

        assert_eq!(&*first, "1");
        assert_eq!(&*second, "1");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_hit_and_miss_counters() {
        let cache = ScriptCache::new();
        assert!(cache.get("a.rhai").is_none());
        cache.insert_if_absent("a.rhai", "1".to_string());
        assert!(cache.get("a.rhai").is_some());
        assert!(cache.get("a.rhai").is_some());

        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 2);
    }

    #[test]
    fn test_concurrent_inserts_agree() {
        let cache = Arc::new(ScriptCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || cache.insert_if_absent("shared", format!("v{i}")))
            })
            .collect();
        let results: Vec<Arc<str>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(cache.len(), 1);
    }
}
