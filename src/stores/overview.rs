//! Overview store: per-window income/expense totals by currency, and
//! their aggregation into the user's main currency.
//!
//! The server reports raw per-currency sums for each requested time
//! window; conversion into the main currency happens locally against the
//! exchange rate snapshot so a currency change never needs a refetch.
//! Window bounds depend on the current date, so the cache remembers the
//! day it was computed for and goes stale at midnight.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::api::OverviewApi;
use crate::models::{CurrencyAmounts, OverviewPeriod};

use super::rates::RateStore;
use super::StoreError;

/// Number of whole past months added when the extended window set is
/// requested. Six keeps the trend view useful without bloating the query.
const EXTENDED_MONTH_WINDOWS: u32 = 6;

/// One overview time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverviewRange {
    Today,
    ThisWeek,
    ThisMonth,
    ThisYear,
    /// A whole past calendar month.
    Month { year: i32, month: u32 },
}

impl OverviewRange {
    /// Wire key for this window, echoed back by the server.
    pub fn key(&self) -> String {
        match self {
            OverviewRange::Today => "today".to_string(),
            OverviewRange::ThisWeek => "thisWeek".to_string(),
            OverviewRange::ThisMonth => "thisMonth".to_string(),
            OverviewRange::ThisYear => "thisYear".to_string(),
            OverviewRange::Month { year, month } => format!("{:04}-{:02}", year, month),
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "today" => Some(OverviewRange::Today),
            "thisWeek" => Some(OverviewRange::ThisWeek),
            "thisMonth" => Some(OverviewRange::ThisMonth),
            "thisYear" => Some(OverviewRange::ThisYear),
            _ => {
                let (year, month) = key.split_once('-')?;
                let year: i32 = year.parse().ok()?;
                let month: u32 = month.parse().ok()?;
                if (1..=12).contains(&month) {
                    Some(OverviewRange::Month { year, month })
                } else {
                    None
                }
            }
        }
    }

    /// Inclusive date bounds of the window as of `today`. Weeks run
    /// Monday through Sunday; month and year windows span whole periods.
    pub fn bounds(&self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            OverviewRange::Today => Some((today, today)),
            OverviewRange::ThisWeek => {
                let monday =
                    today - Duration::days(today.weekday().num_days_from_monday() as i64);
                Some((monday, monday + Duration::days(6)))
            }
            OverviewRange::ThisMonth => month_bounds(today.year(), today.month()),
            OverviewRange::ThisYear => {
                let start = NaiveDate::from_ymd_opt(today.year(), 1, 1)?;
                let end = NaiveDate::from_ymd_opt(today.year(), 12, 31)?;
                Some((start, end))
            }
            OverviewRange::Month { year, month } => month_bounds(*year, *month),
        }
    }
}

fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((start, next - Duration::days(1)))
}

/// The windows fetched for a given date. The extended set appends the
/// previous [`EXTENDED_MONTH_WINDOWS`] whole calendar months.
fn window_set(today: NaiveDate, extended: bool) -> Vec<OverviewRange> {
    let mut windows = vec![
        OverviewRange::Today,
        OverviewRange::ThisWeek,
        OverviewRange::ThisMonth,
        OverviewRange::ThisYear,
    ];
    if extended {
        let mut year = today.year();
        let mut month = today.month();
        for _ in 0..EXTENDED_MONTH_WINDOWS {
            if month == 1 {
                month = 12;
                year -= 1;
            } else {
                month -= 1;
            }
            windows.push(OverviewRange::Month { year, month });
        }
    }
    windows
}

/// Totals for one window converted into the target currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowTotals {
    /// Sums in the target currency's minor units, floored per conversion.
    pub income: i64,
    pub expense: i64,
    /// True when some currency on that side had no usable rate, making
    /// the sum a lower bound rather than exact.
    pub incomplete_income: bool,
    pub incomplete_expense: bool,
}

#[derive(Default)]
pub struct OverviewStore {
    windows: HashMap<OverviewRange, Vec<CurrencyAmounts>>,
    valid: bool,
    /// Whether the cached data includes the extended month windows.
    extended: bool,
    computed_for: Option<NaiveDate>,
}

impl OverviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    pub fn clear(&mut self) {
        self.windows.clear();
        self.valid = false;
        self.extended = false;
        self.computed_for = None;
    }

    /// Raw per-currency rows for one window.
    pub fn window(&self, range: OverviewRange) -> Option<&[CurrencyAmounts]> {
        self.windows.get(&range).map(|rows| rows.as_slice())
    }

    /// Serve the cache when valid for today's date and the requested
    /// shape, otherwise fetch. An extended cache satisfies a basic
    /// request; the reverse refetches.
    pub async fn load<A>(&mut self, api: &A, force: bool, extended: bool) -> Result<(), StoreError>
    where
        A: OverviewApi + ?Sized,
    {
        self.load_at(api, force, extended, Utc::now().date_naive()).await
    }

    pub(crate) async fn load_at<A>(
        &mut self,
        api: &A,
        force: bool,
        extended: bool,
        today: NaiveDate,
    ) -> Result<(), StoreError>
    where
        A: OverviewApi + ?Sized,
    {
        let fresh = self.computed_for == Some(today);
        let shape_ok = self.extended || !extended;
        if !force && self.valid && fresh && shape_ok {
            debug!(windows = self.windows.len(), "Serving overview from cache");
            return Ok(());
        }

        let requested = window_set(today, extended);
        let periods: Vec<OverviewPeriod> = requested
            .iter()
            .filter_map(|range| {
                let (from, to) = range.bounds(today)?;
                Some(OverviewPeriod {
                    key: range.key(),
                    from,
                    to,
                })
            })
            .collect();

        let rows = api.fetch_overview(&periods).await?;
        let mut windows: HashMap<OverviewRange, Vec<CurrencyAmounts>> = HashMap::new();
        for row in rows {
            match OverviewRange::from_key(&row.key) {
                Some(range) => {
                    windows.insert(range, row.amounts);
                }
                None => warn!(key = %row.key, "Unknown overview window key, skipping"),
            }
        }

        if force && fresh && extended == self.extended && windows == self.windows {
            self.valid = true;
            debug!("Overview unchanged on forced refresh");
            return Err(StoreError::AlreadyUpToDate);
        }

        info!(windows = windows.len(), extended, "Loaded overview");
        self.windows = windows;
        self.valid = true;
        self.extended = extended;
        self.computed_for = Some(today);
        Ok(())
    }

    /// Convert every cached window into the target currency.
    ///
    /// Amounts already in the target currency add directly; everything
    /// else goes through the rate snapshot with each conversion floored.
    /// A nonzero amount with no usable rate is skipped and flags its side
    /// incomplete. When the this-month window is missing entirely, a
    /// single zeroed incomplete entry for it is returned so the primary
    /// dashboard card always has something to show.
    pub fn aggregate(&self, target: &str, rates: &RateStore) -> HashMap<OverviewRange, WindowTotals> {
        if !self.windows.contains_key(&OverviewRange::ThisMonth) {
            let mut totals = HashMap::new();
            totals.insert(
                OverviewRange::ThisMonth,
                WindowTotals {
                    income: 0,
                    expense: 0,
                    incomplete_income: true,
                    incomplete_expense: true,
                },
            );
            return totals;
        }

        self.windows
            .iter()
            .map(|(range, rows)| {
                let mut totals = WindowTotals {
                    income: 0,
                    expense: 0,
                    incomplete_income: false,
                    incomplete_expense: false,
                };
                for row in rows {
                    if row.income != 0 {
                        match rates.exchanged_amount(row.income, &row.currency, target) {
                            Some(converted) => totals.income += converted,
                            None => totals.incomplete_income = true,
                        }
                    }
                    if row.expense != 0 {
                        match rates.exchanged_amount(row.expense, &row.currency, target) {
                            Some(converted) => totals.expense += converted,
                            None => totals.incomplete_expense = true,
                        }
                    }
                }
                (*range, totals)
            })
            .collect()
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
    use chrono::TimeZone;

    use crate::api::ApiError;
    use crate::models::WindowAmounts;
    use crate::stores::rates::RateSnapshot;

    struct FakeOverviewApi {
        calls: AtomicUsize,
        last_periods: Mutex<Vec<OverviewPeriod>>,
        amounts: HashMap<String, Vec<CurrencyAmounts>>,
    }

    impl FakeOverviewApi {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                last_periods: Mutex::new(vec![]),
                amounts: HashMap::new(),
            }
        }

        fn with_amounts(mut self, key: &str, rows: Vec<CurrencyAmounts>) -> Self {
            self.amounts.insert(key.to_string(), rows);
            self
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OverviewApi for FakeOverviewApi {
        async fn fetch_overview(
            &self,
            periods: &[OverviewPeriod],
        ) -> Result<Vec<WindowAmounts>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_periods.lock().expect("lock") = periods.to_vec();
            Ok(periods
                .iter()
                .map(|p| WindowAmounts {
                    key: p.key.clone(),
                    amounts: self.amounts.get(&p.key).cloned().unwrap_or_default(),
                })
                .collect())
        }
    }

    fn row(currency: &str, income: i64, expense: i64) -> CurrencyAmounts {
        CurrencyAmounts {
            currency: currency.to_string(),
            income,
            expense,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn usd_rates() -> RateStore {
        let mut rates = HashMap::new();
        rates.insert("USD".to_string(), 1.0);
        rates.insert("EUR".to_string(), 0.93);
        RateStore::with_snapshot(RateSnapshot {
            fetched_at: Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).single().expect("time"),
            base: "USD".to_string(),
            rates,
        })
    }

    #[test]
    fn test_window_bounds() {
        // 2024-03-15 is a Friday
        let today = date(2024, 3, 15);
        assert_eq!(OverviewRange::Today.bounds(today), Some((today, today)));
        assert_eq!(
            OverviewRange::ThisWeek.bounds(today),
            Some((date(2024, 3, 11), date(2024, 3, 17)))
        );
        assert_eq!(
            OverviewRange::ThisMonth.bounds(today),
            Some((date(2024, 3, 1), date(2024, 3, 31)))
        );
        assert_eq!(
            OverviewRange::ThisYear.bounds(today),
            Some((date(2024, 1, 1), date(2024, 12, 31)))
        );
        // Leap February
        assert_eq!(
            OverviewRange::Month { year: 2024, month: 2 }.bounds(today),
            Some((date(2024, 2, 1), date(2024, 2, 29)))
        );
    }

    #[test]
    fn test_window_set_extended_crosses_year_boundary() {
        let windows = window_set(date(2024, 2, 10), true);
        assert_eq!(windows.len(), 4 + EXTENDED_MONTH_WINDOWS as usize);
        assert_eq!(windows[4], OverviewRange::Month { year: 2024, month: 1 });
        assert_eq!(windows[5], OverviewRange::Month { year: 2023, month: 12 });
        assert_eq!(windows[9], OverviewRange::Month { year: 2023, month: 8 });
    }

    #[test]
    fn test_keys_roundtrip() {
        let today = date(2024, 3, 15);
        for range in window_set(today, true) {
            assert_eq!(OverviewRange::from_key(&range.key()), Some(range));
        }
        assert_eq!(OverviewRange::from_key("2024-13"), None);
        assert_eq!(OverviewRange::from_key("lastTuesday"), None);
    }

    #[tokio::test]
    async fn test_load_caches_until_day_rolls_over() {
        let api = FakeOverviewApi::new();
        let mut store = OverviewStore::new();
        let today = date(2024, 3, 15);

        store.load_at(&api, false, false, today).await.expect("load");
        store.load_at(&api, false, false, today).await.expect("load");
        assert_eq!(api.call_count(), 1);

        // Midnight passed: same cache contents, different bounds
        store
            .load_at(&api, false, false, date(2024, 3, 16))
            .await
            .expect("load");
        assert_eq!(api.call_count(), 2);
    }

    #[tokio::test]
    async fn test_extended_cache_serves_basic_request() {
        let api = FakeOverviewApi::new();
        let mut store = OverviewStore::new();
        let today = date(2024, 3, 15);

        store.load_at(&api, false, true, today).await.expect("load");
        assert_eq!(api.call_count(), 1);
        assert_eq!(
            api.last_periods.lock().expect("lock").len(),
            4 + EXTENDED_MONTH_WINDOWS as usize
        );

        store.load_at(&api, false, false, today).await.expect("load");
        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test]
    async fn test_basic_cache_refetches_for_extended_request() {
        let api = FakeOverviewApi::new();
        let mut store = OverviewStore::new();
        let today = date(2024, 3, 15);

        store.load_at(&api, false, false, today).await.expect("load");
        assert_eq!(api.last_periods.lock().expect("lock").len(), 4);

        store.load_at(&api, false, true, today).await.expect("load");
        assert_eq!(api.call_count(), 2);
        assert!(store
            .window(OverviewRange::Month { year: 2024, month: 2 })
            .is_some());
    }

    #[tokio::test]
    async fn test_forced_refresh_identical_reports_up_to_date() {
        let api = FakeOverviewApi::new()
            .with_amounts("thisMonth", vec![row("USD", 120_00, 80_00)]);
        let mut store = OverviewStore::new();
        let today = date(2024, 3, 15);

        store.load_at(&api, false, false, today).await.expect("load");
        let err = store
            .load_at(&api, true, false, today)
            .await
            .expect_err("up to date");
        assert!(err.is_up_to_date());
        assert!(store.is_valid());
        assert_eq!(api.call_count(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let api = FakeOverviewApi::new();
        let mut store = OverviewStore::new();
        let today = date(2024, 3, 15);

        store.load_at(&api, false, false, today).await.expect("load");
        store.invalidate();
        store.load_at(&api, false, false, today).await.expect("load");
        assert_eq!(api.call_count(), 2);
    }

    #[tokio::test]
    async fn test_aggregate_converts_and_flags_missing_rates() {
        let api = FakeOverviewApi::new().with_amounts(
            "thisMonth",
            vec![
                row("USD", 100_00, 40_00),
                // 1000 EUR cents -> 1075 USD cents (floored)
                row("EUR", 10_00, 0),
                // No GBP rate: expense side incomplete, income side clean
                row("GBP", 0, 5_00),
            ],
        );
        let mut store = OverviewStore::new();
        store
            .load_at(&api, false, false, date(2024, 3, 15))
            .await
            .expect("load");

        let totals = store.aggregate("USD", &usd_rates());
        let this_month = totals.get(&OverviewRange::ThisMonth).expect("window");
        assert_eq!(this_month.income, 100_00 + 1075);
        assert_eq!(this_month.expense, 40_00);
        assert!(!this_month.incomplete_income);
        assert!(this_month.incomplete_expense);

        // Empty windows aggregate to clean zeros
        let today_totals = totals.get(&OverviewRange::Today).expect("window");
        assert_eq!(today_totals.income, 0);
        assert!(!today_totals.incomplete_income);
    }

    #[test]
    fn test_aggregate_without_this_month_synthesizes_entry() {
        let store = OverviewStore::new();
        let totals = store.aggregate("USD", &usd_rates());
        assert_eq!(totals.len(), 1);
        let this_month = totals.get(&OverviewRange::ThisMonth).expect("synthetic");
        assert_eq!(this_month.income, 0);
        assert_eq!(this_month.expense, 0);
        assert!(this_month.incomplete_income);
        assert!(this_month.incomplete_expense);
    }
}
