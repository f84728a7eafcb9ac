//! Resolves which tickers belong to an index as of a date, from historical
//! membership intervals cross-checked against the master registry.

use chrono::NaiveDate;
use dashboard_core::{Anomaly, IndexMembership, TickerInfo};
use std::collections::HashSet;

/// Outcome of resolving an index universe. An empty ticker list is a valid
/// outcome (index unknown, or no constituents on that date), not an error.
#[derive(Debug, Clone)]
pub struct ResolvedUniverse {
    /// First-seen order of qualifying memberships; duplicates removed.
    pub tickers: Vec<String>,
    pub anomalies: Vec<Anomaly>,
}

/// Tickers belonging to `index_name` as of `as_of`.
///
/// A ticker qualifies iff at least one membership interval contains the
/// date. Malformed intervals (start after end) are skipped and reported;
/// tickers missing from the registry are excluded and reported.
pub fn resolve(
    index_name: &str,
    as_of: NaiveDate,
    memberships: &[IndexMembership],
    registry: &[TickerInfo],
) -> ResolvedUniverse {
    let registered: HashSet<&str> = registry.iter().map(|t| t.ticker.as_str()).collect();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut flagged_unregistered: HashSet<&str> = HashSet::new();
    let mut tickers = Vec::new();
    let mut anomalies = Vec::new();

    for membership in memberships.iter().filter(|m| m.index_name == index_name) {
        if !membership.is_well_formed() {
            let end = membership
                .included_end
                .unwrap_or(membership.included_start);
            tracing::warn!(
                "Skipping malformed membership interval for {} in {} ({} > {})",
                membership.ticker,
                index_name,
                membership.included_start,
                end
            );
            anomalies.push(Anomaly::InvalidMembershipInterval {
                index_name: index_name.to_string(),
                ticker: membership.ticker.clone(),
                included_start: membership.included_start,
                included_end: end,
            });
            continue;
        }
        if !membership.contains(as_of) {
            continue;
        }
        if !registered.contains(membership.ticker.as_str()) {
            if flagged_unregistered.insert(membership.ticker.as_str()) {
                tracing::warn!(
                    "{} is in {} membership history but not in the registry, excluding",
                    membership.ticker,
                    index_name
                );
                anomalies.push(Anomaly::UnregisteredTicker {
                    index_name: index_name.to_string(),
                    ticker: membership.ticker.clone(),
                });
            }
            continue;
        }
        if seen.insert(membership.ticker.as_str()) {
            tickers.push(membership.ticker.clone());
        }
    }

    ResolvedUniverse { tickers, anomalies }
}
