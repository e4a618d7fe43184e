use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use crate::models::ParsedEntry;

#[derive(Debug, Default)]
struct IndexInner {
    /// Category labels in first-seen order
    order: Vec<String>,
    links: HashMap<String, HashSet<String>>,
}

/// Category → set of stream URLs, shared by every adapter of a run.
///
/// Entries are only ever added. A URL is unique within a category but may be
/// filed under several categories.
#[derive(Debug, Default)]
pub struct CategoryIndex {
    inner: Mutex<IndexInner>,
}

impl CategoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, IndexInner> {
        // Inserts cannot leave the maps half-updated, so a poisoned lock is still usable
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert `url` under `category`. Returns true if it was not already there.
    pub fn add(&self, category: &str, url: &str) -> bool {
        let mut inner = self.lock();
        insert(&mut inner, category, url)
    }

    /// Insert a batch under one lock. Returns how many entries were new.
    pub fn extend<I>(&self, entries: I) -> usize
    where
        I: IntoIterator<Item = ParsedEntry>,
    {
        let mut inner = self.lock();
        entries
            .into_iter()
            .filter(|entry| insert(&mut inner, &entry.category, &entry.url))
            .count()
    }

    /// Every URL across all categories, each once
    pub fn union(&self) -> HashSet<String> {
        let inner = self.lock();
        inner.links.values().flatten().cloned().collect()
    }

    /// Category labels in first-seen order
    pub fn categories(&self) -> Vec<String> {
        self.lock().order.clone()
    }

    pub fn urls(&self, category: &str) -> Option<HashSet<String>> {
        self.lock().links.get(category).cloned()
    }

    /// Number of categories
    pub fn len(&self) -> usize {
        self.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of per-category sizes (a URL in two categories counts twice)
    pub fn total_entries(&self) -> usize {
        self.lock().links.values().map(HashSet::len).sum()
    }
}

fn insert(inner: &mut IndexInner, category: &str, url: &str) -> bool {
    if !inner.links.contains_key(category) {
        inner.order.push(category.to_string());
    }
    inner
        .links
        .entry(category.to_string())
        .or_default()
        .insert(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn as_sets(index: &CategoryIndex) -> BTreeMap<String, Vec<String>> {
        index
            .categories()
            .into_iter()
            .map(|name| {
                let mut urls: Vec<String> =
                    index.urls(&name).unwrap_or_default().into_iter().collect();
                urls.sort();
                (name, urls)
            })
            .collect()
    }

    #[test]
    fn test_add_is_idempotent() {
        let index = CategoryIndex::new();

        assert!(index.add("News", "http://a/1"));
        assert!(!index.add("News", "http://a/1"));

        assert_eq!(index.urls("News").unwrap().len(), 1);
        assert_eq!(index.total_entries(), 1);
    }

    #[test]
    fn test_same_url_in_several_categories() {
        let index = CategoryIndex::new();
        index.add("News", "http://a/1");
        index.add("Sports", "http://a/1");
        index.add("Sports", "http://a/2");

        assert_eq!(index.total_entries(), 3);
        assert_eq!(index.union().len(), 2);
    }

    #[test]
    fn test_union_bounded_by_sum_of_categories() {
        let disjoint = CategoryIndex::new();
        disjoint.add("A", "http://x/1");
        disjoint.add("B", "http://x/2");
        assert_eq!(disjoint.union().len(), disjoint.total_entries());

        let shared = CategoryIndex::new();
        shared.add("A", "http://x/1");
        shared.add("B", "http://x/1");
        assert!(shared.union().len() < shared.total_entries());
    }

    #[test]
    fn test_categories_keep_first_seen_order() {
        let index = CategoryIndex::new();
        index.add("Sports", "http://a/1");
        index.add("News", "http://a/2");
        index.add("Sports", "http://a/3");

        assert_eq!(index.categories(), vec!["Sports", "News"]);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_extend_counts_new_entries() {
        let index = CategoryIndex::new();
        index.add("News", "http://a/1");

        let added = index.extend(vec![
            ParsedEntry::new("News", "http://a/1"),
            ParsedEntry::new("News", "http://a/2"),
            ParsedEntry::new("News", "http://a/2"),
        ]);

        assert_eq!(added, 1);
        assert_eq!(index.total_entries(), 2);
    }

    #[test]
    fn test_batches_commute() {
        let batches = vec![
            vec![
                ParsedEntry::new("News", "http://a/1"),
                ParsedEntry::new("Sports", "http://a/2"),
            ],
            vec![
                ParsedEntry::new("Sports", "http://a/2"),
                ParsedEntry::new("Movies", "http://a/3"),
            ],
            vec![ParsedEntry::new("News", "http://a/3")],
        ];

        let forward = CategoryIndex::new();
        for batch in batches.iter() {
            forward.extend(batch.clone());
        }

        let backward = CategoryIndex::new();
        for batch in batches.iter().rev() {
            backward.extend(batch.clone());
        }

        assert_eq!(as_sets(&forward), as_sets(&backward));
    }

    #[test]
    fn test_concurrent_adds() {
        let index = Arc::new(CategoryIndex::new());

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let index = Arc::clone(&index);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        index.add("General", &format!("http://s/{}", i));
                        index.add(&format!("W{}", worker), &format!("http://w/{}", i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(index.urls("General").unwrap().len(), 100);
        assert_eq!(index.len(), 9);
        assert_eq!(index.union().len(), 200);
    }

    #[test]
    fn test_empty_index() {
        let index = CategoryIndex::new();
        assert!(index.is_empty());
        assert!(index.union().is_empty());
        assert!(index.urls("News").is_none());
    }
}
