//! Pivots long-format fundamentals into per-ticker snapshots as of a date.
//!
//! For each ticker the snapshot is taken from the single reporting date
//! that is the maximum reported_date <= as_of; a single reporting date may
//! carry several field rows, which pivot into the snapshot together.

use chrono::NaiveDate;
use dashboard_core::{Anomaly, FundamentalRecord, FundamentalSnapshot};
use std::collections::{HashMap, HashSet};

/// Snapshots keyed by ticker. Tickers with no record at or before the
/// as-of date are absent; callers treat absence as all-fields-undefined.
#[derive(Debug, Clone, Default)]
pub struct SnapshotSet {
    pub snapshots: HashMap<String, FundamentalSnapshot>,
    pub anomalies: Vec<Anomaly>,
}

impl SnapshotSet {
    pub fn get(&self, ticker: &str) -> Option<&FundamentalSnapshot> {
        self.snapshots.get(ticker)
    }
}

/// Builds one snapshot per universe ticker from the fundamentals pool.
///
/// Callers invoke this three times per dashboard build (as-of, as-of − 1y,
/// as-of − 5y) over the same pool. A duplicate field at the selected
/// reporting date keeps the last-seen value and is reported.
pub fn build_snapshots(
    tickers: &[String],
    fundamentals: &[FundamentalRecord],
    as_of: NaiveDate,
) -> SnapshotSet {
    let universe: HashSet<&str> = tickers.iter().map(String::as_str).collect();

    // Pass 1: the snapshot date per ticker (max reported_date <= as_of).
    let mut snapshot_dates: HashMap<&str, NaiveDate> = HashMap::new();
    for record in fundamentals
        .iter()
        .filter(|r| r.reported_date <= as_of && universe.contains(r.ticker.as_str()))
    {
        snapshot_dates
            .entry(record.ticker.as_str())
            .and_modify(|date| {
                if record.reported_date > *date {
                    *date = record.reported_date;
                }
            })
            .or_insert(record.reported_date);
    }

    // Pass 2: pivot the field rows at each ticker's snapshot date. Input
    // order decides which value survives a duplicate field.
    let mut set = SnapshotSet::default();
    for record in fundamentals {
        let Some(&date) = snapshot_dates.get(record.ticker.as_str()) else {
            continue;
        };
        if record.reported_date != date {
            continue;
        }
        let snapshot = set
            .snapshots
            .entry(record.ticker.clone())
            .or_insert_with(|| FundamentalSnapshot::new(as_of, date));
        if snapshot.set(record.field, record.value).is_some() {
            tracing::warn!(
                "Duplicate {} record for {} on {}, keeping last-seen value",
                record.field.as_str(),
                record.ticker,
                date
            );
            set.anomalies.push(Anomaly::DuplicateObservation {
                ticker: record.ticker.clone(),
                date,
                field: Some(record.field),
            });
        }
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashboard_core::FundamentalField::{self, *};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn rec(ticker: &str, date: NaiveDate, field: FundamentalField, value: f64) -> FundamentalRecord {
        FundamentalRecord {
            ticker: ticker.to_string(),
            reported_date: date,
            field,
            value,
        }
    }

    fn tickers(ticker: &str) -> Vec<String> {
        vec![ticker.to_string()]
    }

    #[test]
    fn snapshot_uses_only_the_max_qualifying_date() {
        let pool = vec![
            rec("AAA", d(2023, 3, 31), Revenue, 80.0),
            rec("AAA", d(2024, 3, 31), Revenue, 100.0),
            rec("AAA", d(2024, 3, 31), NetIncome, 10.0),
            rec("AAA", d(2024, 6, 30), Revenue, 110.0),
        ];
        let set = build_snapshots(&tickers("AAA"), &pool, d(2024, 5, 1));
        let snap = set.get("AAA").unwrap();
        assert_eq!(snap.reported_date, d(2024, 3, 31));
        assert_eq!(snap.get(Revenue), Some(100.0));
        // NetIncome from the same reporting date pivots in alongside.
        assert_eq!(snap.get(NetIncome), Some(10.0));
        // The 2024-06-30 value is in the future of the as-of date.
        assert_ne!(snap.get(Revenue), Some(110.0));
    }

    #[test]
    fn ticker_without_qualifying_records_is_absent() {
        let pool = vec![rec("BBB", d(2024, 6, 30), Revenue, 50.0)];
        let set = build_snapshots(&tickers("BBB"), &pool, d(2024, 1, 1));
        assert!(set.get("BBB").is_none());
        assert!(set.snapshots.is_empty());
    }

    #[test]
    fn as_of_date_is_inclusive() {
        let pool = vec![rec("AAA", d(2024, 3, 31), Revenue, 100.0)];
        let set = build_snapshots(&tickers("AAA"), &pool, d(2024, 3, 31));
        assert_eq!(set.get("AAA").unwrap().get(Revenue), Some(100.0));
    }

    #[test]
    fn duplicate_field_keeps_last_seen_and_reports() {
        let pool = vec![
            rec("AAA", d(2024, 3, 31), Revenue, 100.0),
            rec("AAA", d(2024, 3, 31), Revenue, 105.0),
        ];
        let set = build_snapshots(&tickers("AAA"), &pool, d(2024, 5, 1));
        assert_eq!(set.get("AAA").unwrap().get(Revenue), Some(105.0));
        assert_eq!(
            set.anomalies,
            vec![Anomaly::DuplicateObservation {
                ticker: "AAA".to_string(),
                date: d(2024, 3, 31),
                field: Some(Revenue),
            }]
        );
    }

    #[test]
    fn tickers_are_grouped_independently() {
        let pool = vec![
            rec("AAA", d(2024, 3, 31), Revenue, 100.0),
            rec("BBB", d(2023, 12, 31), Revenue, 40.0),
            rec("BBB", d(2024, 4, 30), Revenue, 45.0),
        ];
        let set = build_snapshots(&["AAA".to_string(), "BBB".to_string()], &pool, d(2024, 4, 1));
        assert_eq!(set.get("AAA").unwrap().reported_date, d(2024, 3, 31));
        assert_eq!(set.get("BBB").unwrap().reported_date, d(2023, 12, 31));
        assert_eq!(set.get("BBB").unwrap().get(Revenue), Some(40.0));
    }

    #[test]
    fn records_outside_the_universe_are_ignored() {
        let pool = vec![
            rec("AAA", d(2024, 3, 31), Revenue, 100.0),
            rec("ZZZ", d(2024, 3, 31), Revenue, 900.0),
        ];
        let set = build_snapshots(&tickers("AAA"), &pool, d(2024, 5, 1));
        assert!(set.get("AAA").is_some());
        assert!(set.get("ZZZ").is_none());
    }

    #[test]
    fn missing_fields_stay_missing() {
        let pool = vec![rec("AAA", d(2024, 3, 31), Revenue, 100.0)];
        let set = build_snapshots(&tickers("AAA"), &pool, d(2024, 5, 1));
        let snap = set.get("AAA").unwrap();
        assert_eq!(snap.get(NetIncome), None);
        assert_eq!(snap.get(LongTermDebt), None);
    }
}
