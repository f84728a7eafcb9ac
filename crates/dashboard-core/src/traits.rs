use crate::{FundamentalRecord, IndexMembership, PriceObservation, TickerInfo};
use async_trait::async_trait;
use chrono::NaiveDate;

// The four external collaborators the dashboard reads from. Implementations
// live outside this workspace (database clients, files, fixtures); an empty
// result means "no data available" and is never an error.

/// Master registry of listed companies.
#[async_trait]
pub trait RegistrySource: Send + Sync {
    async fn list_tickers(&self) -> anyhow::Result<Vec<TickerInfo>>;
}

/// Historical index constituents.
#[async_trait]
pub trait MembershipSource: Send + Sync {
    async fn list_memberships(&self, index_name: &str) -> anyhow::Result<Vec<IndexMembership>>;
}

/// Long-format fundamentals facts.
#[async_trait]
pub trait FundamentalsSource: Send + Sync {
    /// All records reported at or before `max_date`. The pool must reach at
    /// least five years behind any reference date the caller will use.
    async fn list_fundamentals(&self, max_date: NaiveDate) -> anyhow::Result<Vec<FundamentalRecord>>;

    /// Distinct reporting dates, any order. Feeds the date picker.
    async fn list_reported_dates(&self) -> anyhow::Result<Vec<NaiveDate>>;
}

/// Daily closing prices.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn list_prices(
        &self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<PriceObservation>>;
}
