//! Exchange rate cache: a single snapshot with day/hour freshness,
//! persisted through the blob store so restarts keep working offline.

use std::collections::HashMap;

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::RateApi;
use crate::models::RatesPayload;
use crate::storage::BlobStore;

use super::StoreError;

/// Blob key the snapshot persists under.
const RATES_BLOB_KEY: &str = "exchange_rates";

/// A rate table plus the instant it was fetched. Rates are units of the
/// keyed currency per one unit of `base`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    #[serde(rename = "fetchedAt")]
    pub fetched_at: DateTime<Utc>,
    pub base: String,
    pub rates: HashMap<String, f64>,
}

impl RateSnapshot {
    /// Fresh when fetched on the same calendar day, or in the same
    /// hour-of-day bucket. Not a sliding TTL.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.fetched_at.date_naive() == now.date_naive() || self.fetched_at.hour() == now.hour()
    }

    fn same_rates(&self, payload: &RatesPayload) -> bool {
        self.base == payload.base && self.rates == payload.rates
    }
}

#[derive(Default)]
pub struct RateStore {
    snapshot: Option<RateSnapshot>,
}

impl RateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: RateSnapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
        }
    }

    /// Rebuild from the persisted blob. Unreadable or unparseable blobs
    /// are logged and treated as absent.
    pub fn rehydrate(blob: &dyn BlobStore) -> Self {
        let snapshot = match blob.get(RATES_BLOB_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<RateSnapshot>(&raw) {
                Ok(snapshot) => {
                    debug!(
                        base = %snapshot.base,
                        count = snapshot.rates.len(),
                        "Rehydrated exchange rates"
                    );
                    Some(snapshot)
                }
                Err(e) => {
                    warn!(error = %e, "Failed to parse persisted exchange rates");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted exchange rates");
                None
            }
        };
        Self { snapshot }
    }

    pub fn snapshot(&self) -> Option<&RateSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn rate(&self, code: &str) -> Option<f64> {
        self.snapshot.as_ref()?.rates.get(code).copied()
    }

    /// Convert minor units between currencies through the snapshot,
    /// flooring the result. None when either rate is missing.
    pub fn exchanged_amount(&self, amount: i64, from: &str, to: &str) -> Option<i64> {
        if from == to {
            return Some(amount);
        }
        let snapshot = self.snapshot.as_ref()?;
        let from_rate = snapshot.rates.get(from).copied()?;
        let to_rate = snapshot.rates.get(to).copied()?;
        if from_rate == 0.0 {
            return None;
        }
        Some(((amount as f64) * to_rate / from_rate).floor() as i64)
    }

    /// Serve the snapshot while fresh, otherwise fetch and persist. A
    /// forced refresh that downloads an identical table rejects with
    /// [`StoreError::AlreadyUpToDate`] and keeps the current snapshot.
    pub async fn refresh<A>(&mut self, api: &A, blob: &dyn BlobStore, force: bool) -> Result<(), StoreError>
    where
        A: RateApi + ?Sized,
    {
        self.refresh_at(api, blob, force, Utc::now()).await
    }

    pub(crate) async fn refresh_at<A>(
        &mut self,
        api: &A,
        blob: &dyn BlobStore,
        force: bool,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>
    where
        A: RateApi + ?Sized,
    {
        if !force && self.snapshot.as_ref().is_some_and(|s| s.is_fresh_at(now)) {
            debug!("Serving exchange rates from cache");
            return Ok(());
        }

        let payload = api.fetch_rates().await?;
        if force && self.snapshot.as_ref().is_some_and(|s| s.same_rates(&payload)) {
            debug!("Exchange rates unchanged on forced refresh");
            return Err(StoreError::AlreadyUpToDate);
        }

        let snapshot = RateSnapshot {
            fetched_at: now,
            base: payload.base,
            rates: payload.rates,
        };

        // Persistence is best effort; a broken disk should not block rates
        match serde_json::to_string(&snapshot) {
            Ok(raw) => {
                if let Err(e) = blob.set(RATES_BLOB_KEY, &raw) {
                    warn!(error = %e, "Failed to persist exchange rates");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize exchange rates"),
        }

        info!(base = %snapshot.base, count = snapshot.rates.len(), "Loaded exchange rates");
        self.snapshot = Some(snapshot);
        Ok(())
    }

    /// Forget the in-memory snapshot. The persisted blob stays so the
    /// next session can rehydrate; rates are not user data.
    pub fn clear(&mut self) {
        self.snapshot = None;
    }
}

// ============================================================================
// Tests
// ============================================================================
