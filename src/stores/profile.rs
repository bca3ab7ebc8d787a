//! Profile store: the signed-in user's profile, the active-session list,
//! and the two-factor enrollment flow.

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::api::ProfileApi;
use crate::models::{ProfileUpdate, SessionInfo, TwoFactorSetup, UserProfile};

use super::StoreError;

/// Side effects of a profile update that other caches care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileChanges {
    /// The main currency differs from the previously cached profile, so
    /// amounts derived in it elsewhere are stale.
    pub currency_changed: bool,
}

#[derive(Default)]
pub struct ProfileStore {
    profile: Option<UserProfile>,
    profile_valid: bool,
    sessions: Vec<SessionInfo>,
    sessions_valid: bool,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    pub fn sessions(&self) -> &[SessionInfo] {
        &self.sessions
    }

    pub fn is_profile_valid(&self) -> bool {
        self.profile_valid
    }

    pub fn is_sessions_valid(&self) -> bool {
        self.sessions_valid
    }

    pub fn invalidate(&mut self) {
        self.profile_valid = false;
        self.sessions_valid = false;
    }

    pub fn invalidate_sessions(&mut self) {
        self.sessions_valid = false;
    }

    pub fn clear(&mut self) {
        self.profile = None;
        self.profile_valid = false;
        self.sessions.clear();
        self.sessions_valid = false;
    }

    /// Seed the cache with the profile returned by a login, skipping the
    /// fetch a fresh session would otherwise start with.
    pub fn set_profile(&mut self, profile: UserProfile) {
        self.profile = Some(profile);
        self.profile_valid = true;
    }

    pub async fn load<A>(&mut self, api: &A, force: bool) -> Result<&UserProfile, StoreError>
    where
        A: ProfileApi + ?Sized,
    {
        if !force && self.profile_valid && self.profile.is_some() {
            debug!("Serving profile from cache");
            return Ok(self.profile.as_ref().expect("checked is_some"));
        }

        let fetched = api.fetch_profile().await?;
        if force && self.profile.as_ref() == Some(&fetched) {
            self.profile_valid = true;
            debug!("Profile unchanged on forced refresh");
            return Err(StoreError::AlreadyUpToDate);
        }

        info!(user = fetched.id, "Loaded profile");
        self.profile_valid = true;
        Ok(self.profile.insert(fetched))
    }

    /// Push edited profile fields and cache the server's view of the
    /// result. The returned [`ProfileChanges`] tells the caller whether
    /// currency-derived caches elsewhere need invalidating.
    pub async fn update<A>(
        &mut self,
        api: &A,
        update: &ProfileUpdate,
    ) -> Result<ProfileChanges, StoreError>
    where
        A: ProfileApi + ?Sized,
    {
        let updated = api.update_profile(update).await?;
        // Without a cached profile to compare against, assume the worst.
        let currency_changed = match self.profile.as_ref() {
            Some(previous) => previous.main_currency != updated.main_currency,
            None => true,
        };
        info!(user = updated.id, currency_changed, "Updated profile");
        self.profile = Some(updated);
        self.profile_valid = true;
        Ok(ProfileChanges { currency_changed })
    }

    pub async fn load_sessions<A>(
        &mut self,
        api: &A,
        force: bool,
    ) -> Result<&[SessionInfo], StoreError>
    where
        A: ProfileApi + ?Sized,
    {
        if !force && self.sessions_valid {
            debug!(count = self.sessions.len(), "Serving sessions from cache");
            return Ok(&self.sessions);
        }

        let fetched = api.list_sessions().await?;
        if force && self.sessions == fetched {
            self.sessions_valid = true;
            debug!("Session list unchanged on forced refresh");
            return Err(StoreError::AlreadyUpToDate);
        }

        info!(count = fetched.len(), "Loaded sessions");
        self.sessions = fetched;
        self.sessions_valid = true;
        Ok(&self.sessions)
    }

    pub async fn revoke_session<A>(&mut self, api: &A, id: i64) -> Result<(), StoreError>
    where
        A: ProfileApi + ?Sized,
    {
        api.revoke_session(id).await?;
        let before = self.sessions.len();
        self.sessions.retain(|session| session.id != id);
        if self.sessions.len() == before {
            warn!(id, "Revoked session was not cached, invalidating");
            self.sessions_valid = false;
        }
        debug!(id, "Revoked session");
        Ok(())
    }

    /// Revoke several sessions without surfacing failures, used to clean
    /// up superseded logins in the background. Sessions the server
    /// acknowledges disappear from the cache; the rest stay listed.
    pub async fn revoke_sessions_best_effort<A>(&mut self, api: &A, ids: &[i64])
    where
        A: ProfileApi + ?Sized,
    {
        let results = join_all(ids.iter().map(|&id| api.revoke_session(id))).await;
        for (&id, result) in ids.iter().zip(results) {
            match result {
                Ok(()) => {
                    self.sessions.retain(|session| session.id != id);
                }
                Err(e) => debug!(id, error = %e, "Best-effort session revocation failed"),
            }
        }
    }

    /// Start two-factor enrollment. The cached flag stays off until the
    /// setup is confirmed with a code.
    pub async fn two_factor_enable<A>(&mut self, api: &A) -> Result<TwoFactorSetup, StoreError>
    where
        A: ProfileApi + ?Sized,
    {
        let setup = api.two_factor_enable().await?;
        debug!("Started two-factor enrollment");
        Ok(setup)
    }

    pub async fn two_factor_confirm<A>(&mut self, api: &A, code: &str) -> Result<(), StoreError>
    where
        A: ProfileApi + ?Sized,
    {
        api.two_factor_confirm(code).await?;
        if let Some(profile) = self.profile.as_mut() {
            profile.two_factor_enabled = true;
        }
        // The server drops other sessions when two-factor turns on.
        self.sessions_valid = false;
        info!("Two-factor enabled");
        Ok(())
    }

    pub async fn two_factor_disable<A>(&mut self, api: &A, code: &str) -> Result<(), StoreError>
    where
        A: ProfileApi + ?Sized,
    {
        api.two_factor_disable(code).await?;
        if let Some(profile) = self.profile.as_mut() {
            profile.two_factor_enabled = false;
        }
        self.sessions_valid = false;
        info!("Two-factor disabled");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use crate::api::ApiError;

    struct FakeProfileApi {
        profile: Mutex<UserProfile>,
        sessions: Mutex<Vec<SessionInfo>>,
        fetch_calls: AtomicUsize,
        session_calls: AtomicUsize,
        fail_revoke_ids: Vec<i64>,
    }

    impl FakeProfileApi {
        fn new() -> Self {
            Self {
                profile: Mutex::new(profile("USD")),
                sessions: Mutex::new(vec![session(1, true), session(2, false)]),
                fetch_calls: AtomicUsize::new(0),
                session_calls: AtomicUsize::new(0),
                fail_revoke_ids: vec![],
            }
        }

        fn failing_revokes(mut self, ids: Vec<i64>) -> Self {
            self.fail_revoke_ids = ids;
            self
        }
    }

    #[async_trait]
    impl ProfileApi for FakeProfileApi {
        async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.profile.lock().expect("lock").clone())
        }

        async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
            let mut profile = self.profile.lock().expect("lock");
            profile.display_name = update.display_name.clone();
            profile.main_currency = update.main_currency.clone();
            profile.locale = update.locale.clone();
            Ok(profile.clone())
        }

        async fn list_sessions(&self) -> Result<Vec<SessionInfo>, ApiError> {
            self.session_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.sessions.lock().expect("lock").clone())
        }

        async fn revoke_session(&self, id: i64) -> Result<(), ApiError> {
            if self.fail_revoke_ids.contains(&id) {
                return Err(ApiError::ServerError("revocation failed".to_string()));
            }
            self.sessions.lock().expect("lock").retain(|s| s.id != id);
            Ok(())
        }

        async fn two_factor_enable(&self) -> Result<TwoFactorSetup, ApiError> {
            Ok(TwoFactorSetup {
                secret: "JBSWY3DPEHPK3PXP".to_string(),
                otpauth_url: "otpauth://totp/app:user@example.com".to_string(),
            })
        }

        async fn two_factor_confirm(&self, _code: &str) -> Result<(), ApiError> {
            self.profile.lock().expect("lock").two_factor_enabled = true;
            Ok(())
        }

        async fn two_factor_disable(&self, _code: &str) -> Result<(), ApiError> {
            self.profile.lock().expect("lock").two_factor_enabled = false;
            Ok(())
        }
    }

    fn profile(currency: &str) -> UserProfile {
        UserProfile {
            id: 7,
            email: "user@example.com".to_string(),
            display_name: None,
            main_currency: currency.to_string(),
            locale: None,
            two_factor_enabled: false,
        }
    }

    fn session(id: i64, current: bool) -> SessionInfo {
        SessionInfo {
            id,
            user_agent: Some("test".to_string()),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).single().expect("time"),
            last_used_at: None,
            current,
        }
    }

    fn update(currency: &str) -> ProfileUpdate {
        ProfileUpdate {
            display_name: Some("Dana".to_string()),
            main_currency: currency.to_string(),
            locale: None,
        }
    }

    #[tokio::test]
    async fn test_load_hits_network_once() {
        let api = FakeProfileApi::new();
        let mut store = ProfileStore::new();

        store.load(&api, false).await.expect("load");
        store.load(&api, false).await.expect("load");
        assert_eq!(api.fetch_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.profile().expect("cached").main_currency, "USD");
    }

    #[tokio::test]
    async fn test_forced_load_identical_reports_up_to_date() {
        let api = FakeProfileApi::new();
        let mut store = ProfileStore::new();

        store.load(&api, false).await.expect("load");
        let err = store.load(&api, true).await.expect_err("up to date");
        assert!(err.is_up_to_date());
        assert!(store.is_profile_valid());
    }

    #[tokio::test]
    async fn test_update_reports_currency_change() {
        let api = FakeProfileApi::new();
        let mut store = ProfileStore::new();

        store.load(&api, false).await.expect("load");
        let changes = store.update(&api, &update("USD")).await.expect("update");
        assert!(!changes.currency_changed);
        let changes = store.update(&api, &update("EUR")).await.expect("update");
        assert!(changes.currency_changed);
        assert_eq!(store.profile().expect("cached").main_currency, "EUR");
    }

    #[tokio::test]
    async fn test_update_without_cached_profile_assumes_currency_change() {
        let api = FakeProfileApi::new();
        let mut store = ProfileStore::new();

        let changes = store.update(&api, &update("USD")).await.expect("update");
        assert!(changes.currency_changed);
        assert!(store.is_profile_valid());
    }

    #[tokio::test]
    async fn test_revoke_session_removes_cached_entry() {
        let api = FakeProfileApi::new();
        let mut store = ProfileStore::new();

        store.load_sessions(&api, false).await.expect("load");
        store.revoke_session(&api, 2).await.expect("revoke");
        assert!(store.is_sessions_valid());
        assert_eq!(store.sessions().len(), 1);
        assert_eq!(store.sessions()[0].id, 1);
    }

    #[tokio::test]
    async fn test_revoke_uncached_session_invalidates() {
        let api = FakeProfileApi::new();
        let mut store = ProfileStore::new();

        store.load_sessions(&api, false).await.expect("load");
        store.revoke_session(&api, 99).await.expect("revoke");
        assert!(!store.is_sessions_valid());
    }

    #[tokio::test]
    async fn test_best_effort_revocation_keeps_failed_sessions() {
        let api = FakeProfileApi::new().failing_revokes(vec![2]);
        let mut store = ProfileStore::new();

        store.load_sessions(&api, false).await.expect("load");
        store.sessions.push(session(3, false));
        store.revoke_sessions_best_effort(&api, &[2, 3]).await;
        let remaining: Vec<i64> = store.sessions().iter().map(|s| s.id).collect();
        assert_eq!(remaining, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_two_factor_confirm_flips_flag_and_invalidates_sessions() {
        let api = FakeProfileApi::new();
        let mut store = ProfileStore::new();

        store.load(&api, false).await.expect("load");
        store.load_sessions(&api, false).await.expect("load");
        store.two_factor_enable(&api).await.expect("enable");
        assert!(!store.profile().expect("cached").two_factor_enabled);

        store.two_factor_confirm(&api, "123456").await.expect("confirm");
        assert!(store.profile().expect("cached").two_factor_enabled);
        assert!(!store.is_sessions_valid());

        store.two_factor_disable(&api, "123456").await.expect("disable");
        assert!(!store.profile().expect("cached").two_factor_enabled);
    }

    #[tokio::test]
    async fn test_set_profile_seeds_cache() {
        let api = FakeProfileApi::new();
        let mut store = ProfileStore::new();

        store.set_profile(profile("CHF"));
        assert!(store.is_profile_valid());
        store.load(&api, false).await.expect("load");
        assert_eq!(api.fetch_calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.profile().expect("cached").main_currency, "CHF");
    }
}
