//! Account store: cached account list plus the account mutations.
//!
//! Balances live on the server; any transaction write makes them drift,
//! so the facade invalidates this store after each one.

use tracing::{debug, info, warn};

use crate::api::AccountApi;
use crate::models::{Account, AccountUpdate, NewAccount};

use super::collection::{CacheItem, CollectionCache, PendingRemoval};
use super::StoreError;

impl CacheItem for Account {
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
pub struct AccountStore {
    cache: CollectionCache<Account>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self {
            cache: CollectionCache::new(),
        }
    }

    pub fn accounts(&self) -> &[Account] {
        self.cache.items()
    }

    pub fn get(&self, id: i64) -> Option<&Account> {
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

    /// Serve the cache when valid, otherwise fetch; see
    /// [`StoreError::AlreadyUpToDate`] for the forced-refresh contract.
    pub async fn load<A>(&mut self, api: &A, force: bool) -> Result<&[Account], StoreError>
    where
        A: AccountApi + ?Sized,
    {
        if !force && self.cache.is_valid() {
            debug!(count = self.cache.len(), "Serving accounts from cache");
            return Ok(self.cache.items());
        }

        let fetched = api.list_accounts().await?;
        if force && self.cache.same_items(&fetched) {
            self.cache.mark_valid();
            debug!("Account list unchanged on forced refresh");
            return Err(StoreError::AlreadyUpToDate);
        }

        info!(count = fetched.len(), "Loaded accounts");
        self.cache.replace_all(fetched);
        Ok(self.cache.items())
    }

    pub async fn create<A>(&mut self, api: &A, new: NewAccount) -> Result<&Account, StoreError>
    where
        A: AccountApi + ?Sized,
    {
        let created = api.create_account(&new).await?;
        debug!(id = created.id, "Created account");
        Ok(self.cache.insert(created))
    }

    pub async fn update<A>(&mut self, api: &A, update: AccountUpdate) -> Result<(), StoreError>
    where
        A: AccountApi + ?Sized,
    {
        let updated = api.update_account(&update).await?;
        if !self.cache.apply_update(updated) {
            warn!(id = update.id, "Updated account was not cached, invalidating");
            self.cache.invalidate();
        }
        Ok(())
    }

    pub async fn set_hidden<A>(&mut self, api: &A, id: i64, hidden: bool) -> Result<(), StoreError>
    where
        A: AccountApi + ?Sized,
    {
        api.set_account_hidden(id, hidden).await?;
        if !self.cache.set_hidden(id, hidden) {
            warn!(id, "Toggled account was not cached, invalidating");
            self.cache.invalidate();
        }
        Ok(())
    }

    /// Local-only reorder; the cache stays invalid until
    /// [`AccountStore::persist_order`] succeeds.
    pub fn move_account(&mut self, from: usize, to: usize) -> Result<(), StoreError> {
        self.cache.move_item(from, to)
    }

    pub async fn persist_order<A>(&mut self, api: &A) -> Result<(), StoreError>
    where
        A: AccountApi + ?Sized,
    {
        let order = self.cache.order_payload();
        api.reorder_accounts(&order).await?;
        self.cache.renumber();
        self.cache.mark_valid();
        debug!(count = order.len(), "Persisted account order");
        Ok(())
    }

    /// Delete on the server first; the returned receipt applies the local
    /// removal when passed to [`AccountStore::commit_removal`].
    pub async fn delete<A>(&mut self, api: &A, id: i64) -> Result<PendingRemoval, StoreError>
    where
        A: AccountApi + ?Sized,
    {
        api.delete_account(id).await?;
        debug!(id, "Deleted account on server, local removal pending");
        Ok(PendingRemoval::new(id))
    }

    pub fn commit_removal(&mut self, pending: PendingRemoval) -> Option<Account> {
        self.cache.commit_removal(pending)
    }
}
