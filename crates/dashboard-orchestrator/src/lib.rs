//! Wires the four external data sources to the pure computation core.
//!
//! All I/O happens here, before the core runs: registry and memberships
//! are fetched concurrently, then fundamentals and prices, then the
//! synchronous pipeline (resolve → snapshot × 3 → metrics) produces the
//! table. Source responses are memoized for five minutes per query, the
//! same TTL the original dashboard used.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use dashboard_core::{
    Anomaly, DashboardError, FundamentalRecord, FundamentalsSource, IndexMembership,
    MembershipSource, MetricsTable, PriceObservation, PriceSource, RegistrySource, TickerInfo,
};
use dashmap::DashMap;
use metric_engine::SnapshotHistory;
use point_in_time::PriceSeries;
use std::collections::{BTreeMap, HashMap};

/// Indexes the dashboard knows how to render.
pub const INDEX_OPTIONS: &[&str] = &["S&P 500"];

const CACHE_TTL_SECS: i64 = 300; // 5 minutes

/// Snapshot horizons behind the reference date, in calendar days.
const ONE_YEAR_DAYS: i64 = 365;
const FIVE_YEAR_DAYS: i64 = 1825;

/// The 5y return lookback needs an observation at or before
/// reference − 1825d, so the price fetch starts a month earlier.
const PRICE_WINDOW_SLACK_DAYS: i64 = 30;

/// Internal cache entry with timestamp
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    fn fresh(data: T) -> Self {
        Self { data, cached_at: Utc::now() }
    }

    fn is_fresh(&self) -> bool {
        Utc::now() - self.cached_at < Duration::seconds(CACHE_TTL_SECS)
    }
}

pub struct DashboardOrchestrator<R, M, F, P> {
    registry: R,
    memberships: M,
    fundamentals: F,
    prices: P,
    registry_cache: DashMap<String, CacheEntry<Vec<TickerInfo>>>,
    membership_cache: DashMap<String, CacheEntry<Vec<IndexMembership>>>,
    fundamentals_cache: DashMap<String, CacheEntry<Vec<FundamentalRecord>>>,
    price_cache: DashMap<String, CacheEntry<Vec<PriceObservation>>>,
    dates_cache: DashMap<String, CacheEntry<Vec<NaiveDate>>>,
}

impl<R, M, F, P> DashboardOrchestrator<R, M, F, P>
where
    R: RegistrySource,
    M: MembershipSource,
    F: FundamentalsSource,
    P: PriceSource,
{
    pub fn new(registry: R, memberships: M, fundamentals: F, prices: P) -> Self {
        Self {
            registry,
            memberships,
            fundamentals,
            prices,
            registry_cache: DashMap::new(),
            membership_cache: DashMap::new(),
            fundamentals_cache: DashMap::new(),
            price_cache: DashMap::new(),
            dates_cache: DashMap::new(),
        }
    }

    /// Index names the boundary can offer in its picker.
    pub fn index_options(&self) -> &'static [&'static str] {
        INDEX_OPTIONS
    }

    /// Distinct fundamentals reporting dates, newest first. Feeds the
    /// reference-date picker.
    pub async fn available_dates(&self) -> Result<Vec<NaiveDate>, DashboardError> {
        if let Some(entry) = self.dates_cache.get("all") {
            if entry.is_fresh() {
                return Ok(entry.data.clone());
            }
        }
        let mut dates = self
            .fundamentals
            .list_reported_dates()
            .await
            .map_err(|e| DashboardError::source_unavailable("fundamentals", e))?;
        dates.sort_unstable_by(|a, b| b.cmp(a));
        dates.dedup();
        self.dates_cache.insert("all".to_string(), CacheEntry::fresh(dates.clone()));
        Ok(dates)
    }

    /// Full dashboard build for one (index, reference date) request.
    pub async fn build_dashboard(
        &self,
        index_name: &str,
        reference_date: NaiveDate,
    ) -> Result<MetricsTable, DashboardError> {
        tracing::info!("Building dashboard for {} as of {}", index_name, reference_date);

        let one_year_date = offset_back(reference_date, ONE_YEAR_DAYS)?;
        let five_year_date = offset_back(reference_date, FIVE_YEAR_DAYS)?;
        let price_start = offset_back(reference_date, FIVE_YEAR_DAYS + PRICE_WINDOW_SLACK_DAYS)?;

        let (registry, memberships) =
            tokio::join!(self.get_registry(), self.get_memberships(index_name));
        let registry = registry?;
        let memberships = memberships?;

        let resolved = universe_resolver::resolve(index_name, reference_date, &memberships, &registry);
        let mut anomalies = resolved.anomalies;
        tracing::info!(
            "{} constituents in {} as of {}",
            resolved.tickers.len(),
            index_name,
            reference_date
        );

        let (fundamentals, price_rows) = tokio::join!(
            self.get_fundamentals(reference_date),
            self.get_prices(&resolved.tickers, price_start, reference_date)
        );
        let fundamentals = fundamentals?;
        let price_rows = price_rows?;

        let current = snapshot_builder::build_snapshots(&resolved.tickers, &fundamentals, reference_date);
        let one_year = snapshot_builder::build_snapshots(&resolved.tickers, &fundamentals, one_year_date);
        let five_year = snapshot_builder::build_snapshots(&resolved.tickers, &fundamentals, five_year_date);
        // The three builds scan one pool; a duplicated record can surface
        // from each of them, so merge without repeats.
        merge_anomalies(&mut anomalies, current.anomalies.clone());
        merge_anomalies(&mut anomalies, one_year.anomalies.clone());
        merge_anomalies(&mut anomalies, five_year.anomalies.clone());

        let prices = group_prices(price_rows, &mut anomalies);

        let mut table = metric_engine::compute(
            &resolved.tickers,
            &registry,
            SnapshotHistory {
                current: &current.snapshots,
                one_year: &one_year.snapshots,
                five_year: &five_year.snapshots,
            },
            &prices,
            reference_date,
        );
        table.anomalies = anomalies;
        Ok(table)
    }

    async fn get_registry(&self) -> Result<Vec<TickerInfo>, DashboardError> {
        if let Some(entry) = self.registry_cache.get("all") {
            if entry.is_fresh() {
                return Ok(entry.data.clone());
            }
        }
        let data = self
            .registry
            .list_tickers()
            .await
            .map_err(|e| DashboardError::source_unavailable("registry", e))?;
        self.registry_cache.insert("all".to_string(), CacheEntry::fresh(data.clone()));
        Ok(data)
    }

    async fn get_memberships(&self, index_name: &str) -> Result<Vec<IndexMembership>, DashboardError> {
        if let Some(entry) = self.membership_cache.get(index_name) {
            if entry.is_fresh() {
                return Ok(entry.data.clone());
            }
        }
        let data = self
            .memberships
            .list_memberships(index_name)
            .await
            .map_err(|e| DashboardError::source_unavailable("membership", e))?;
        self.membership_cache
            .insert(index_name.to_string(), CacheEntry::fresh(data.clone()));
        Ok(data)
    }

    async fn get_fundamentals(&self, max_date: NaiveDate) -> Result<Vec<FundamentalRecord>, DashboardError> {
        let key = max_date.to_string();
        if let Some(entry) = self.fundamentals_cache.get(&key) {
            if entry.is_fresh() {
                return Ok(entry.data.clone());
            }
        }
        let data = self
            .fundamentals
            .list_fundamentals(max_date)
            .await
            .map_err(|e| DashboardError::source_unavailable("fundamentals", e))?;
        tracing::info!("Fetched {} fundamental records up to {}", data.len(), max_date);
        self.fundamentals_cache.insert(key, CacheEntry::fresh(data.clone()));
        Ok(data)
    }

    async fn get_prices(
        &self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceObservation>, DashboardError> {
        let key = format!("{}:{}:{}", start, end, tickers.join(","));
        if let Some(entry) = self.price_cache.get(&key) {
            if entry.is_fresh() {
                return Ok(entry.data.clone());
            }
        }
        let data = self
            .prices
            .list_prices(tickers, start, end)
            .await
            .map_err(|e| DashboardError::source_unavailable("price", e))?;
        tracing::info!(
            "Fetched {} price observations for {} tickers",
            data.len(),
            tickers.len()
        );
        self.price_cache.insert(key, CacheEntry::fresh(data.clone()));
        Ok(data)
    }
}

fn offset_back(date: NaiveDate, days: i64) -> Result<NaiveDate, DashboardError> {
    date.checked_sub_signed(Duration::days(days)).ok_or_else(|| {
        DashboardError::InvalidRequest(format!("reference date {date} cannot look back {days} days"))
    })
}

fn merge_anomalies(into: &mut Vec<Anomaly>, from: Vec<Anomaly>) {
    for anomaly in from {
        if !into.contains(&anomaly) {
            into.push(anomaly);
        }
    }
}

fn group_prices(rows: Vec<PriceObservation>, anomalies: &mut Vec<Anomaly>) -> HashMap<String, PriceSeries> {
    // BTreeMap keeps anomaly reporting order deterministic across runs.
    let mut by_ticker: BTreeMap<String, Vec<(NaiveDate, f64)>> = BTreeMap::new();
    for row in rows {
        by_ticker
            .entry(row.ticker)
            .or_default()
            .push((row.trade_date, row.close));
    }
    by_ticker
        .into_iter()
        .map(|(ticker, observations)| {
            let series = PriceSeries::new(&ticker, observations, anomalies);
            (ticker, series)
        })
        .collect()
}
