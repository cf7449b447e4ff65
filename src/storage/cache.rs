// ============================================================================
// src/storage/cache.rs - Bounded, order-preserving document cache
// ============================================================================
//
// Every mutator builds one combined sequence and hands it to `rebuild`,
// which drops duplicate ids (first occurrence wins) and keeps the first
// `capacity` elements. Merging at the front therefore starves the tail,
// merging at the back caps its own excess; neither direction is special.
//
// ============================================================================

use crate::core::Document;
use std::collections::{HashMap, HashSet};

/// In-memory, capacity-limited store keyed by document id.
///
/// Front holds the most recently merged-in documents, the back holds the
/// oldest ones reached by back-fill. The cache performs no I/O; callers that
/// share it across tasks wrap it in a mutex.
#[derive(Debug, Clone)]
pub struct BoundedOrderedCache<T> {
    capacity: usize,
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T: Document> BoundedOrderedCache<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Replaces the contents with `items`.
    pub fn seed(&mut self, items: Vec<T>) {
        self.rebuild(items);
    }

    /// Places `new_items` ahead of the cached sequence.
    pub fn merge_front(&mut self, new_items: Vec<T>) {
        let mut combined = new_items;
        combined.append(&mut self.items);
        self.rebuild(combined);
    }

    /// Places `old_items` after the cached sequence.
    pub fn merge_back(&mut self, old_items: Vec<T>) {
        let mut combined = std::mem::take(&mut self.items);
        combined.extend(old_items);
        self.rebuild(combined);
    }

    /// Drops the given ids, keeping the relative order of everything else.
    pub fn remove<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let doomed: HashSet<String> = ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .filter(|id| self.index.contains_key(id))
            .collect();
        if doomed.is_empty() {
            return;
        }

        let remaining = std::mem::take(&mut self.items)
            .into_iter()
            .filter(|item| !doomed.contains(item.id()))
            .collect();
        self.rebuild(remaining);
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.index.get(id).map(|&pos| &self.items[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Borrowed view of the ordered sequence.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Owned copy of the ordered sequence.
    pub fn snapshot(&self) -> Vec<T> {
        self.items.clone()
    }

    /// Id of the last element, used to resume a back-fill scan.
    pub fn cursor(&self) -> Option<&str> {
        self.items.last().map(|item| item.id())
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.index.clear();
    }

    fn rebuild(&mut self, combined: Vec<T>) {
        let mut seen = HashSet::with_capacity(combined.len());
        let mut items = Vec::with_capacity(combined.len().min(self.capacity));

        for item in combined {
            if items.len() == self.capacity {
                break;
            }
            if seen.insert(item.id().to_string()) {
                items.push(item);
            }
        }

        self.index = items
            .iter()
            .enumerate()
            .map(|(pos, item)| (item.id().to_string(), pos))
            .collect();
        self.items = items;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;
    use chrono::{DateTime, TimeZone, Utc};

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: String,
        rev: u32,
    }

    impl Document for Note {
        const COLLECTION: &'static str = "notes";

        fn id(&self) -> &str {
            &self.id
        }

        fn partition_key(&self) -> &str {
            "user"
        }

        fn updated_at(&self) -> DateTime<Utc> {
            Utc.timestamp_opt(i64::from(self.rev), 0).unwrap()
        }

        fn field(&self, _name: &str) -> Option<Value> {
            None
        }
    }

    fn notes(prefix: &str, count: usize) -> Vec<Note> {
        (0..count)
            .map(|i| Note {
                id: format!("{}-{}", prefix, i),
                rev: 0,
            })
            .collect()
    }

    fn ids(cache: &BoundedOrderedCache<Note>) -> Vec<String> {
        cache.items().iter().map(|n| n.id.clone()).collect()
    }

    #[test]
    fn test_merge_front_evicts_old_tail() {
        let mut cache = BoundedOrderedCache::new(10);
        cache.seed(notes("old", 5));

        let fresh = notes("new", 10);
        cache.merge_front(fresh.clone());

        assert_eq!(cache.snapshot(), fresh);
        assert_eq!(cache.cursor(), Some("new-9"));
        assert!(cache.get("old-0").is_none());
    }

    #[test]
    fn test_merge_back_caps_its_own_excess() {
        let mut cache = BoundedOrderedCache::new(10);
        let initial = notes("init", 5);
        cache.seed(initial.clone());

        let older = notes("older", 10);
        cache.merge_back(older.clone());

        let mut expected = initial;
        expected.extend_from_slice(&older[0..5]);
        assert_eq!(cache.snapshot(), expected);
        assert_eq!(cache.cursor(), Some("older-4"));
    }

    #[test]
    fn test_seed_truncates_to_capacity() {
        let mut cache = BoundedOrderedCache::new(3);
        cache.seed(notes("a", 7));
        assert_eq!(ids(&cache), vec!["a-0", "a-1", "a-2"]);
    }

    #[test]
    fn test_remove_missing_id_is_noop() {
        let mut cache = BoundedOrderedCache::new(10);
        cache.seed(notes("a", 4));
        let before = cache.snapshot();

        cache.remove(["nonexistent-id"]);

        assert_eq!(cache.snapshot(), before);
        assert_eq!(cache.cursor(), Some("a-3"));
    }

    #[test]
    fn test_remove_preserves_relative_order() {
        let mut cache = BoundedOrderedCache::new(10);
        cache.seed(notes("a", 5));

        cache.remove(vec!["a-1".to_string(), "a-4".to_string()]);

        assert_eq!(ids(&cache), vec!["a-0", "a-2", "a-3"]);
        assert_eq!(cache.cursor(), Some("a-3"));
        assert_eq!(cache.get("a-3").map(|n| n.id.as_str()), Some("a-3"));
    }

    #[test]
    fn test_merge_front_replaces_duplicate_with_newer_copy() {
        let mut cache = BoundedOrderedCache::new(10);
        cache.seed(notes("a", 3));

        cache.merge_front(vec![Note {
            id: "a-2".into(),
            rev: 7,
        }]);

        assert_eq!(ids(&cache), vec!["a-2", "a-0", "a-1"]);
        assert_eq!(cache.get("a-2").map(|n| n.rev), Some(7));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_merge_back_keeps_cached_copy_of_duplicate() {
        let mut cache = BoundedOrderedCache::new(10);
        cache.seed(notes("a", 2));

        cache.merge_back(vec![
            Note {
                id: "a-0".into(),
                rev: 9,
            },
            Note {
                id: "b".into(),
                rev: 0,
            },
        ]);

        assert_eq!(ids(&cache), vec!["a-0", "a-1", "b"]);
        assert_eq!(cache.get("a-0").map(|n| n.rev), Some(0));
    }

    #[test]
    fn test_capacity_holds_across_mixed_operations() {
        let mut cache = BoundedOrderedCache::new(6);
        for round in 0..20 {
            let batch = notes(&format!("r{}", round), round % 9);
            match round % 3 {
                0 => cache.seed(batch),
                1 => cache.merge_front(batch),
                _ => cache.merge_back(batch),
            }
            assert!(cache.len() <= cache.capacity());
            assert_eq!(cache.cursor(), cache.items().last().map(|n| n.id.as_str()));
        }
    }

    #[test]
    fn test_clear_empties_cache() {
        let mut cache = BoundedOrderedCache::new(4);
        cache.seed(notes("a", 4));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.cursor(), None);
        assert!(!cache.contains("a-0"));
    }
}
