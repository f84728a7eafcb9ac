//! Derives the comparison table: per-ticker performance returns, growth
//! rates, margins and leverage ratios from point-in-time snapshots and
//! price history, plus the synthetic index-average row.
//!
//! Every metric is a raw fraction or ratio. Undefined results stay `None`
//! all the way through; nothing here coerces missing data to zero, and the
//! average row is computed over present values only.

use chrono::{Duration, NaiveDate};
use dashboard_core::{
    FundamentalField, FundamentalSnapshot, MetricColumn, MetricRow, MetricsTable, TickerInfo,
    INDEX_AVERAGE_LABEL,
};
use point_in_time::PriceSeries;
use std::collections::HashMap;


/// Price-return lookback windows in calendar days, paired with the column
/// they fill.
pub const RETURN_WINDOWS: [(i64, MetricColumn); 6] = [
    (30, MetricColumn::Return1M),
    (90, MetricColumn::Return3M),
    (182, MetricColumn::Return6M),
    (365, MetricColumn::Return1Y),
    (1095, MetricColumn::Return3Y),
    (1825, MetricColumn::Return5Y),
];

/// The three snapshot horizons a dashboard build works from.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotHistory<'a> {
    pub current: &'a HashMap<String, FundamentalSnapshot>,
    pub one_year: &'a HashMap<String, FundamentalSnapshot>,
    pub five_year: &'a HashMap<String, FundamentalSnapshot>,
}

/// cur/prior − 1. Undefined when either operand is missing or prior is
/// zero; cur == 0 against a nonzero prior is a defined −100%.
fn growth(cur: Option<f64>, prior: Option<f64>) -> Option<f64> {
    match (cur, prior) {
        (Some(c), Some(p)) if p != 0.0 => Some(c / p - 1.0),
        _ => None,
    }
}

/// num/den with the denominator guarded. Never divides by zero; a zero
/// numerator is a defined 0.0.
fn ratio(num: Option<f64>, den: Option<f64>) -> Option<f64> {
    match (num, den) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d),
        _ => None,
    }
}

/// Earnings growth prefers net income when both periods report it, and
/// otherwise falls back to basic EPS for both periods. The two bases are
/// never mixed within one computation.
fn earnings_growth(cur: &FundamentalSnapshot, prior: &FundamentalSnapshot) -> Option<f64> {
    let cur_ni = cur.get(FundamentalField::NetIncome);
    let prior_ni = prior.get(FundamentalField::NetIncome);
    if cur_ni.is_some() && prior_ni.is_some() {
        return growth(cur_ni, prior_ni);
    }
    growth(
        cur.get(FundamentalField::EpsBasic),
        prior.get(FundamentalField::EpsBasic),
    )
}

/// p(reference)/p(reference − window) − 1 via latest-at-or-before lookups
/// on both endpoints. Undefined if either endpoint has no observation.
fn window_return(prices: &PriceSeries, reference_date: NaiveDate, window_days: i64) -> Option<f64> {
    let lookback = reference_date.checked_sub_signed(Duration::days(window_days))?;
    let now = prices.latest_at_or_before(reference_date);
    let then = prices.latest_at_or_before(lookback);
    ratio(now, then).map(|r| r - 1.0)
}

fn compute_row(
    info: &TickerInfo,
    snapshots: &SnapshotHistory<'_>,
    prices: Option<&PriceSeries>,
    reference_date: NaiveDate,
) -> MetricRow {
    let mut row = MetricRow::empty(
        info.ticker.clone(),
        info.company.clone(),
        info.sector.clone(),
        info.industry.clone(),
    );

    if let Some(series) = prices {
        for (days, column) in RETURN_WINDOWS {
            column.set(&mut row, window_return(series, reference_date, days));
        }
    }

    let current = snapshots.current.get(&info.ticker);
    let one_year = snapshots.one_year.get(&info.ticker);
    let five_year = snapshots.five_year.get(&info.ticker);

    if let Some(cur) = current {
        row.net_margin = ratio(
            cur.get(FundamentalField::NetIncome),
            cur.get(FundamentalField::Revenue),
        );
        row.cash_to_debt = ratio(
            cur.get(FundamentalField::CashOnHand),
            cur.get(FundamentalField::LongTermDebt),
        );
        row.pe_trailing_approx = ratio(
            prices.and_then(|s| s.latest_at_or_before(reference_date)),
            cur.get(FundamentalField::EpsBasic),
        );

        if let Some(prior) = one_year {
            row.revenue_growth_1y = growth(
                cur.get(FundamentalField::Revenue),
                prior.get(FundamentalField::Revenue),
            );
            row.earnings_growth_1y = earnings_growth(cur, prior);
        }
        if let Some(prior) = five_year {
            row.revenue_growth_5y = growth(
                cur.get(FundamentalField::Revenue),
                prior.get(FundamentalField::Revenue),
            );
            row.earnings_growth_5y = earnings_growth(cur, prior);
        }
    }

    row
}

/// Arithmetic mean per column over rows where the column is present; a
/// column nobody reports stays undefined. Identifying columns carry the
/// sentinel label. The average row never feeds its own mean.
pub fn index_average(rows: &[MetricRow]) -> MetricRow {
    let mut average = MetricRow::empty(
        INDEX_AVERAGE_LABEL.to_string(),
        INDEX_AVERAGE_LABEL.to_string(),
        None,
        None,
    );
    for column in MetricColumn::ALL {
        let present: Vec<f64> = rows.iter().filter_map(|row| column.value(row)).collect();
        if !present.is_empty() {
            column.set(&mut average, Some(present.iter().sum::<f64>() / present.len() as f64));
        }
    }
    average
}

/// Builds the full table for a universe. Every universe ticker gets a row
/// even when all its metrics are undefined, so analysts can tell missing
/// from zero. Row order follows the universe order.
pub fn compute(
    universe: &[String],
    registry: &[TickerInfo],
    snapshots: SnapshotHistory<'_>,
    prices: &HashMap<String, PriceSeries>,
    reference_date: NaiveDate,
) -> MetricsTable {
    let by_ticker: HashMap<&str, &TickerInfo> =
        registry.iter().map(|t| (t.ticker.as_str(), t)).collect();

    let rows: Vec<MetricRow> = universe
        .iter()
        .map(|ticker| {
            // The resolver excludes unregistered tickers, but stay tolerant
            // of callers that assemble the universe themselves.
            let fallback = TickerInfo {
                ticker: ticker.clone(),
                company: ticker.clone(),
                sector: None,
                industry: None,
            };
            let info = by_ticker.get(ticker.as_str()).copied().unwrap_or(&fallback);
            compute_row(info, &snapshots, prices.get(ticker), reference_date)
        })
        .collect();

    tracing::info!(
        "Computed {} metric rows as of {} ({} with price history)",
        rows.len(),
        reference_date,
        rows.iter().filter(|r| r.return_1m.is_some()).count()
    );

    let index_average = index_average(&rows);
    MetricsTable {
        as_of: reference_date,
        rows,
        index_average,
        anomalies: Vec::new(),
    }
}
