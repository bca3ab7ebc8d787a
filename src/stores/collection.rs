//! Generic cache for an ordered, server-owned list of entities.
//!
//! The cache holds the server's ordering in a `Vec` and an id-to-position
//! index over it, plus a validity flag. Mutations mirror what the server
//! acknowledged; anything whose local effect cannot be derived (reorder
//! not yet persisted, updates to uncached items) flips the flag instead,
//! and the next load refetches.

use std::collections::HashMap;

use crate::api::OrderUpdate;
use crate::stores::StoreError;

/// Contract a model must satisfy to live in a [`CollectionCache`].
pub trait CacheItem {
    fn id(&self) -> i64;
    fn hidden(&self) -> bool;
    fn set_hidden(&mut self, hidden: bool);
    fn display_order(&self) -> u32;
    fn set_display_order(&mut self, order: u32);
}

/// Receipt for a server-acknowledged delete whose local removal is
/// deferred. The server row is already gone; the cache keeps the item
/// until the receipt is committed so the UI can animate it out first.
/// Dropping the receipt leaves the item in place until the next refetch.
#[must_use = "the cached item is only removed when the receipt is committed"]
#[derive(Debug)]
pub struct PendingRemoval {
    id: i64,
}

impl PendingRemoval {
    pub(crate) fn new(id: i64) -> Self {
        Self { id }
    }

    pub fn id(&self) -> i64 {
        self.id
    }
}

/// An ordered list of entities plus an id index and a validity flag.
/// Invalid caches still serve reads; they are refetched on the next load.
#[derive(Debug)]
pub struct CollectionCache<T> {
    items: Vec<T>,
    index: HashMap<i64, usize>,
    valid: bool,
}

impl<T: CacheItem> CollectionCache<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
            valid: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Mark the cache dirty; contents stay readable until the next load.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    pub fn mark_valid(&mut self) {
        self.valid = true;
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Items with the hidden flag filtered out, in display order.
    pub fn visible(&self) -> impl Iterator<Item = &T> {
        self.items.iter().filter(|item| !item.hidden())
    }

    pub fn get(&self, id: i64) -> Option<&T> {
        self.index.get(&id).map(|&pos| &self.items[pos])
    }

    pub fn contains(&self, id: i64) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Replace the whole list with a fresh server payload and mark valid.
    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items = items;
        self.reindex();
        self.valid = true;
    }

    /// Empty the cache and mark it invalid. Used on logout.
    pub fn clear(&mut self) {
        self.items.clear();
        self.index.clear();
        self.valid = false;
    }

    /// Append a server-created item, returning a reference to it.
    pub fn insert(&mut self, item: T) -> &T {
        let pos = self.items.len();
        self.index.insert(item.id(), pos);
        self.items.push(item);
        &self.items[pos]
    }

    /// Replace the cached item with the same id in place, keeping its
    /// position. Returns false when the id is not cached; the caller
    /// decides whether that warrants invalidation.
    pub fn apply_update(&mut self, item: T) -> bool {
        match self.index.get(&item.id()) {
            Some(&pos) => {
                self.items[pos] = item;
                true
            }
            None => false,
        }
    }

    /// Move the item at `from` so it ends up at index `to`, shifting the
    /// items in between. The new order is local-only until the server
    /// acknowledges it, so the cache is marked invalid.
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<(), StoreError> {
        if from >= self.items.len() || to >= self.items.len() {
            return Err(StoreError::InvalidMove);
        }
        if from == to {
            return Ok(());
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        self.reindex();
        self.valid = false;
        Ok(())
    }

    /// Flip the hidden flag on the cached item. The item keeps its list
    /// position; hiding is a presentation concern, not a removal.
    pub fn set_hidden(&mut self, id: i64, hidden: bool) -> bool {
        match self.index.get(&id) {
            Some(&pos) => {
                self.items[pos].set_hidden(hidden);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: i64) -> Option<T> {
        let pos = self.index.get(&id).copied()?;
        let item = self.items.remove(pos);
        self.reindex();
        Some(item)
    }

    /// Apply a deferred removal receipt. Returns the removed item, or
    /// None when it was never cached (the delete is still fine).
    pub fn commit_removal(&mut self, pending: PendingRemoval) -> Option<T> {
        self.remove(pending.id)
    }

    /// Stamp each item's display order with its current list position.
    /// Called once the server has persisted a reorder.
    pub fn renumber(&mut self) {
        for (pos, item) in self.items.iter_mut().enumerate() {
            item.set_display_order(pos as u32);
        }
    }

    /// Reorder payload for the current ordering: each id with its
    /// zero-based position.
    pub fn order_payload(&self) -> Vec<OrderUpdate> {
        self.items
            .iter()
            .enumerate()
            .map(|(pos, item)| OrderUpdate {
                id: item.id(),
                display_order: pos as u32,
            })
            .collect()
    }

    /// Structural equality against a freshly fetched payload, used to
    /// detect forced refreshes that changed nothing.
    pub fn same_items(&self, other: &[T]) -> bool
    where
        T: PartialEq,
    {
        self.items.as_slice() == other
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (pos, item) in self.items.iter().enumerate() {
            self.index.insert(item.id(), pos);
        }
    }
}

impl<T: CacheItem> Default for CollectionCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct TestItem {
        id: i64,
        title: String,
        hidden: bool,
        display_order: u32,
    }

    impl TestItem {
        fn new(id: i64, title: &str) -> Self {
            Self {
                id,
                title: title.to_string(),
                hidden: false,
                display_order: 0,
            }
        }
    }

    impl CacheItem for TestItem {
        fn id(&self) -> i64 {
            self.id
        }
        fn hidden(&self) -> bool {
            self.hidden
        }
        fn set_hidden(&mut self, hidden: bool) {
            self.hidden = hidden;
        }
        fn display_order(&self) -> u32 {
            self.display_order
        }
        fn set_display_order(&mut self, order: u32) {
            self.display_order = order;
        }
    }

    fn sample() -> Vec<TestItem> {
        vec![
            TestItem::new(10, "groceries"),
            TestItem::new(20, "rent"),
            TestItem::new(30, "salary"),
            TestItem::new(40, "travel"),
        ]
    }

    #[test]
    fn test_new_cache_is_empty_and_invalid() {
        let cache: CollectionCache<TestItem> = CollectionCache::new();
        assert!(!cache.is_valid());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_replace_all_marks_valid_and_indexes() {
        let mut cache = CollectionCache::new();
        cache.replace_all(sample());
        assert!(cache.is_valid());
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.get(30).map(|i| i.title.as_str()), Some("salary"));
        assert!(!cache.contains(99));
    }

    #[test]
    fn test_insert_appends_at_end() {
        let mut cache = CollectionCache::new();
        cache.replace_all(sample());
        let inserted = cache.insert(TestItem::new(50, "gifts"));
        assert_eq!(inserted.id, 50);
        assert_eq!(cache.items().last().map(|i| i.id), Some(50));
        assert!(cache.is_valid());
    }

    #[test]
    fn test_apply_update_preserves_position() {
        let mut cache = CollectionCache::new();
        cache.replace_all(sample());
        let mut updated = TestItem::new(20, "rent and utilities");
        updated.display_order = 1;
        assert!(cache.apply_update(updated));
        assert_eq!(cache.items()[1].title, "rent and utilities");
        assert!(cache.is_valid());
    }

    #[test]
    fn test_apply_update_unknown_id_returns_false() {
        let mut cache = CollectionCache::new();
        cache.replace_all(sample());
        assert!(!cache.apply_update(TestItem::new(99, "mystery")));
    }

    #[test]
    fn test_move_item_lands_at_target_and_invalidates() {
        let mut cache = CollectionCache::new();
        cache.replace_all(sample());
        cache.move_item(0, 2).expect("move");

        let ids: Vec<i64> = cache.items().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![20, 30, 10, 40]);
        // Untouched items keep their relative order, index follows the move
        assert_eq!(cache.get(10).map(|i| i.title.as_str()), Some("groceries"));
        assert!(!cache.is_valid());
    }

    #[test]
    fn test_move_item_same_position_is_noop() {
        let mut cache = CollectionCache::new();
        cache.replace_all(sample());
        cache.move_item(1, 1).expect("move");
        assert!(cache.is_valid());
    }

    #[test]
    fn test_move_item_out_of_bounds() {
        let mut cache = CollectionCache::new();
        cache.replace_all(sample());
        assert!(matches!(cache.move_item(0, 4), Err(StoreError::InvalidMove)));
        assert!(matches!(cache.move_item(9, 0), Err(StoreError::InvalidMove)));
        assert!(cache.is_valid());
    }

    #[test]
    fn test_renumber_after_persisted_reorder() {
        let mut cache = CollectionCache::new();
        cache.replace_all(sample());
        cache.move_item(3, 0).expect("move");

        let payload = cache.order_payload();
        assert_eq!(payload[0], OrderUpdate { id: 40, display_order: 0 });
        assert_eq!(payload[3], OrderUpdate { id: 30, display_order: 3 });

        cache.renumber();
        cache.mark_valid();
        for (pos, item) in cache.items().iter().enumerate() {
            assert_eq!(item.display_order, pos as u32);
        }
        assert!(cache.is_valid());
    }

    #[test]
    fn test_set_hidden_keeps_position() {
        let mut cache = CollectionCache::new();
        cache.replace_all(sample());
        assert!(cache.set_hidden(20, true));

        let ids: Vec<i64> = cache.items().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![10, 20, 30, 40]);
        let visible: Vec<i64> = cache.visible().map(|i| i.id).collect();
        assert_eq!(visible, vec![10, 30, 40]);
        assert!(!cache.set_hidden(99, true));
    }

    #[test]
    fn test_remove_reindexes_survivors() {
        let mut cache = CollectionCache::new();
        cache.replace_all(sample());
        let removed = cache.remove(20).expect("removed");
        assert_eq!(removed.title, "rent");
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get(30).map(|i| i.title.as_str()), Some("salary"));
        assert_eq!(cache.remove(20), None);
    }

    #[test]
    fn test_commit_removal_is_deferred() {
        let mut cache = CollectionCache::new();
        cache.replace_all(sample());

        let pending = PendingRemoval::new(30);
        assert!(cache.contains(30));

        let removed = cache.commit_removal(pending);
        assert_eq!(removed.map(|i| i.id), Some(30));
        assert!(!cache.contains(30));
    }

    #[test]
    fn test_commit_removal_of_uncached_id_is_harmless() {
        let mut cache = CollectionCache::new();
        cache.replace_all(sample());
        assert!(cache.commit_removal(PendingRemoval::new(99)).is_none());
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn test_same_items_structural_equality() {
        let mut cache = CollectionCache::new();
        cache.replace_all(sample());
        assert!(cache.same_items(&sample()));

        let mut changed = sample();
        changed[2].title = "bonus".to_string();
        assert!(!cache.same_items(&changed));
        assert!(!cache.same_items(&sample()[..3]));
    }

    #[test]
    fn test_clear_empties_and_invalidates() {
        let mut cache = CollectionCache::new();
        cache.replace_all(sample());
        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.is_valid());
        assert!(!cache.contains(10));
    }
}
