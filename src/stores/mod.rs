//! In-memory stores backing the client state.
//!
//! Each store owns one cache and follows the same contract:
//!
//! - `load(api, force)` serves the cache when it is valid and `force` is
//!   off, with zero boundary calls; otherwise it fetches. A forced
//!   refresh that brings back identical data rejects with
//!   [`StoreError::AlreadyUpToDate`] after revalidating, so callers can
//!   skip re-rendering.
//! - Writes call the boundary first and mirror the acknowledged change
//!   locally. When the local effect cannot be determined (item not
//!   cached, reparent, type change), the cache is invalidated instead.
//! - Deletes return a [`PendingRemoval`] receipt so the UI can animate
//!   the row out before committing the removal.
//!
//! [`Stores`] bundles every store and applies the rules that cross store
//! boundaries, like wiping state on logout.

pub mod accounts;
pub mod categories;
pub mod collection;
pub mod error;
pub mod overview;
pub mod profile;
pub mod rates;
pub mod tags;
pub mod templates;

pub use accounts::AccountStore;
pub use categories::CategoryStore;
pub use collection::{CacheItem, CollectionCache, PendingRemoval};
pub use error::{StoreError, GENERIC_ERROR_MESSAGE};
pub use overview::{OverviewRange, OverviewStore, WindowTotals};
pub use profile::{ProfileChanges, ProfileStore};
pub use rates::{RateSnapshot, RateStore};
pub use tags::TagStore;
pub use templates::TemplateStore;

use tracing::{debug, info};

use crate::api::{AuthApi, ProfileApi, TransactionApi};
use crate::models::{
    LoginResponse, NewTransaction, ProfileUpdate, Transaction, TransactionUpdate,
};
use crate::storage::BlobStore;

/// All client-side caches plus the mutations whose effects span more
/// than one of them.
///
/// Individual transactions are not cached here: the UI pages through
/// them straight off [`TransactionApi`]. Their writes still route
/// through [`Stores`] because an acknowledged write moves account
/// balances and overview totals in ways this layer cannot reproduce
/// locally, so both caches get invalidated.
#[derive(Default)]
pub struct Stores {
    pub accounts: AccountStore,
    pub categories: CategoryStore,
    pub tags: TagStore,
    pub templates: TemplateStore,
    pub overview: OverviewStore,
    pub rates: RateStore,
    pub profile: ProfileStore,
}

impl Stores {
    /// Every cache empty and invalid, as at process start.
    pub fn new() -> Self {
        Self::default()
    }

    /// Like [`Stores::new`], but with the exchange-rate snapshot
    /// rehydrated from local storage so conversions work offline.
    pub fn rehydrated(blob: &dyn BlobStore) -> Self {
        Self {
            rates: RateStore::rehydrate(blob),
            ..Self::new()
        }
    }

    /// Wipe every in-memory cache. Run on logout and account reset so no
    /// data leaks into the next session. The persisted rate blob stays:
    /// exchange rates are not user data.
    pub fn clear_all(&mut self) {
        self.accounts.clear();
        self.categories.clear();
        self.tags.clear();
        self.templates.clear();
        self.overview.clear();
        self.rates.clear();
        self.profile.clear();
        info!("Cleared all stores");
    }

    /// Log in and seed the profile cache from the response. The caller
    /// installs the returned bearer token on its client.
    pub async fn login<A>(
        &mut self,
        api: &A,
        email: &str,
        password: &str,
        otp: Option<&str>,
    ) -> Result<LoginResponse, StoreError>
    where
        A: AuthApi + ?Sized,
    {
        let response = api.login(email, password, otp).await?;
        self.profile.set_profile(response.user.clone());
        info!(user = response.user.id, "Logged in");
        Ok(response)
    }

    /// Tell the server to drop the session, then wipe local state. The
    /// server call is best effort: a dead token must not keep the user
    /// logged in locally.
    pub async fn logout<A>(&mut self, api: &A)
    where
        A: AuthApi + ?Sized,
    {
        if let Err(e) = api.logout().await {
            debug!(error = %e, "Server logout failed, clearing local state anyway");
        }
        self.clear_all();
    }

    pub async fn create_transaction<A>(
        &mut self,
        api: &A,
        new: NewTransaction,
    ) -> Result<Transaction, StoreError>
    where
        A: TransactionApi + ?Sized,
    {
        let created = api.create_transaction(&new).await?;
        debug!(id = created.id, "Created transaction");
        self.after_transaction_write();
        Ok(created)
    }

    pub async fn update_transaction<A>(
        &mut self,
        api: &A,
        update: TransactionUpdate,
    ) -> Result<Transaction, StoreError>
    where
        A: TransactionApi + ?Sized,
    {
        let updated = api.update_transaction(&update).await?;
        debug!(id = updated.id, "Updated transaction");
        self.after_transaction_write();
        Ok(updated)
    }

    pub async fn delete_transaction<A>(&mut self, api: &A, id: i64) -> Result<(), StoreError>
    where
        A: TransactionApi + ?Sized,
    {
        api.delete_transaction(id).await?;
        debug!(id, "Deleted transaction");
        self.after_transaction_write();
        Ok(())
    }

    fn after_transaction_write(&mut self) {
        self.accounts.invalidate();
        self.overview.invalidate();
    }

    /// Profile update plus the cross-cutting rule: a new main currency
    /// makes every converted overview total stale.
    pub async fn update_profile<A>(
        &mut self,
        api: &A,
        update: &ProfileUpdate,
    ) -> Result<ProfileChanges, StoreError>
    where
        A: ProfileApi + ?Sized,
    {
        let changes = self.profile.update(api, update).await?;
        if changes.currency_changed {
            debug!("Main currency changed, invalidating overview");
            self.overview.invalidate();
        }
        Ok(changes)
    }
}

// ============================================================================
// Tests
// ============================================================================
