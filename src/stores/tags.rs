//! Tag store: cached tag list plus the tag mutations.

use tracing::{debug, info, warn};

use crate::api::TagApi;
use crate::models::{NewTag, Tag, TagUpdate};

use super::collection::{CacheItem, CollectionCache, PendingRemoval};
use super::StoreError;

impl CacheItem for Tag {
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

#[derive(Default)]
pub struct TagStore {
    cache: CollectionCache<Tag>,
}

impl TagStore {
    pub fn new() -> Self {
        Self {
            cache: CollectionCache::new(),
        }
    }

    pub fn tags(&self) -> &[Tag] {
        self.cache.items()
    }

    pub fn get(&self, id: i64) -> Option<&Tag> {
        self.cache.get(id)
    }

    pub fn is_valid(&self) -> bool {
        self.cache.is_valid()
    }

    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Serve the cache when valid, otherwise fetch. A forced refresh that
    /// brings back a structurally identical list rejects with
    /// [`StoreError::AlreadyUpToDate`] so callers can skip re-rendering.
    pub async fn load<A>(&mut self, api: &A, force: bool) -> Result<&[Tag], StoreError>
    where
        A: TagApi + ?Sized,
    {
        if !force && self.cache.is_valid() {
            debug!(count = self.cache.len(), "Serving tags from cache");
            return Ok(self.cache.items());
        }

        let fetched = api.list_tags().await?;
        if force && self.cache.same_items(&fetched) {
            self.cache.mark_valid();
            debug!("Tag list unchanged on forced refresh");
            return Err(StoreError::AlreadyUpToDate);
        }

        info!(count = fetched.len(), "Loaded tags");
        self.cache.replace_all(fetched);
        Ok(self.cache.items())
    }

    pub async fn create<A>(&mut self, api: &A, new: NewTag) -> Result<&Tag, StoreError>
    where
        A: TagApi + ?Sized,
    {
        let created = api.create_tag(&new).await?;
        debug!(id = created.id, "Created tag");
        Ok(self.cache.insert(created))
    }

    pub async fn update<A>(&mut self, api: &A, update: TagUpdate) -> Result<(), StoreError>
    where
        A: TagApi + ?Sized,
    {
        let updated = api.update_tag(&update).await?;
        if !self.cache.apply_update(updated) {
            warn!(id = update.id, "Updated tag was not cached, invalidating");
            self.cache.invalidate();
        }
        Ok(())
    }

    pub async fn set_hidden<A>(&mut self, api: &A, id: i64, hidden: bool) -> Result<(), StoreError>
    where
        A: TagApi + ?Sized,
    {
        api.set_tag_hidden(id, hidden).await?;
        if !self.cache.set_hidden(id, hidden) {
            warn!(id, "Toggled tag was not cached, invalidating");
            self.cache.invalidate();
        }
        Ok(())
    }

    /// Local-only reorder; the cache stays invalid until
    /// [`TagStore::persist_order`] succeeds.
    pub fn move_tag(&mut self, from: usize, to: usize) -> Result<(), StoreError> {
        self.cache.move_item(from, to)
    }

    pub async fn persist_order<A>(&mut self, api: &A) -> Result<(), StoreError>
    where
        A: TagApi + ?Sized,
    {
        let order = self.cache.order_payload();
        api.reorder_tags(&order).await?;
        self.cache.renumber();
        self.cache.mark_valid();
        debug!(count = order.len(), "Persisted tag order");
        Ok(())
    }

    /// Delete on the server first; the returned receipt applies the local
    /// removal when passed to [`TagStore::commit_removal`].
    pub async fn delete<A>(&mut self, api: &A, id: i64) -> Result<PendingRemoval, StoreError>
    where
        A: TagApi + ?Sized,
    {
        api.delete_tag(id).await?;
        debug!(id, "Deleted tag on server, local removal pending");
        Ok(PendingRemoval::new(id))
    }

    pub fn commit_removal(&mut self, pending: PendingRemoval) -> Option<Tag> {
        self.cache.commit_removal(pending)
    }
}

// ============================================================================
// Tests
// ============================================================================
