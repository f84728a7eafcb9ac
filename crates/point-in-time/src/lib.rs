//! Latest-at-or-before lookups over small in-memory date series.
//!
//! This is the only time-series semantics the dashboard needs: given a
//! ticker's observations and a target date, find the most recent value
//! known at that date. `None` always means "no observation", never zero.

use chrono::NaiveDate;
use dashboard_core::Anomaly;
use serde::{Deserialize, Serialize};

/// Latest value at or before `target`, over a series in any order.
///
/// Duplicate dates cannot occur by construction (one value per date per
/// entity); if they do anyway, the last-seen element of the input wins.
/// Pure function; callers that also want the duplicates reported should
/// build a [`PriceSeries`] instead.
pub fn latest_at_or_before<T: Clone>(series: &[(NaiveDate, T)], target: NaiveDate) -> Option<T> {
    let mut best: Option<&(NaiveDate, T)> = None;
    for obs in series {
        if obs.0 > target {
            continue;
        }
        // `>=` keeps the last-seen element on a date tie.
        match best {
            Some(b) if obs.0 >= b.0 => best = Some(obs),
            None => best = Some(obs),
            _ => {}
        }
    }
    best.map(|(_, v)| v.clone())
}

/// One ticker's closing prices, sorted once for repeated lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    ticker: String,
    observations: Vec<(NaiveDate, f64)>,
}

impl PriceSeries {
    /// Builds a sorted series. Duplicate trade dates are collapsed to the
    /// last-seen value and reported into `anomalies`.
    pub fn new(ticker: &str, observations: Vec<(NaiveDate, f64)>, anomalies: &mut Vec<Anomaly>) -> Self {
        let mut sorted = observations;
        // Stable sort: input order survives within a date, so "last seen"
        // stays meaningful for duplicate collapsing below.
        sorted.sort_by_key(|(date, _)| *date);

        let mut deduped: Vec<(NaiveDate, f64)> = Vec::with_capacity(sorted.len());
        for (date, close) in sorted {
            match deduped.last_mut() {
                Some(last) if last.0 == date => {
                    tracing::warn!("Duplicate price observation for {} on {}, keeping last-seen value", ticker, date);
                    anomalies.push(Anomaly::DuplicateObservation {
                        ticker: ticker.to_string(),
                        date,
                        field: None,
                    });
                    last.1 = close;
                }
                _ => deduped.push((date, close)),
            }
        }

        Self {
            ticker: ticker.to_string(),
            observations: deduped,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Close on the latest trade date at or before `target`.
    pub fn latest_at_or_before(&self, target: NaiveDate) -> Option<f64> {
        let idx = self.observations.partition_point(|(date, _)| *date <= target);
        if idx == 0 {
            None
        } else {
            Some(self.observations[idx - 1].1)
        }
    }
}
