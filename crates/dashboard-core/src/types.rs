use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Registry row for a listed company
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerInfo {
    pub ticker: String,
    pub company: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
}

/// One interval during which a ticker belonged to a named index.
///
/// An open `included_end` means the ticker is still a member. A ticker may
/// carry several non-overlapping intervals for the same index (re-entry
/// after removal).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMembership {
    pub index_name: String,
    pub ticker: String,
    pub included_start: NaiveDate,
    pub included_end: Option<NaiveDate>,
}

impl IndexMembership {
    /// Whether the interval itself is well-formed (start <= end).
    pub fn is_well_formed(&self) -> bool {
        self.included_end.map_or(true, |end| self.included_start <= end)
    }

    /// Membership as of `date` holds iff start <= date <= end.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.included_start <= date && self.included_end.map_or(true, |end| date <= end)
    }
}

/// Known fundamentals fields. Source rows naming anything else are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FundamentalField {
    Revenue,
    NetIncome,
    EpsBasic,
    CashOnHand,
    LongTermDebt,
}

impl FundamentalField {
    /// Parse a source field name; `None` for fields we do not track.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "revenue" => Some(Self::Revenue),
            "net_income" => Some(Self::NetIncome),
            "eps_basic" => Some(Self::EpsBasic),
            "cash_on_hand" => Some(Self::CashOnHand),
            "long_term_debt" => Some(Self::LongTermDebt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::NetIncome => "net_income",
            Self::EpsBasic => "eps_basic",
            Self::CashOnHand => "cash_on_hand",
            Self::LongTermDebt => "long_term_debt",
        }
    }
}

/// Long-format fundamentals fact: one (ticker, date, field, value) row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundamentalRecord {
    pub ticker: String,
    pub reported_date: NaiveDate,
    pub field: FundamentalField,
    pub value: f64,
}

/// Wide-format view of a ticker's latest known fundamentals at an as-of
/// date. Absent fields stay absent; `get` never substitutes zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundamentalSnapshot {
    pub as_of: NaiveDate,
    /// The reporting date the snapshot was taken from (max date <= as_of).
    pub reported_date: NaiveDate,
    values: HashMap<FundamentalField, f64>,
}

impl FundamentalSnapshot {
    pub fn new(as_of: NaiveDate, reported_date: NaiveDate) -> Self {
        Self {
            as_of,
            reported_date,
            values: HashMap::new(),
        }
    }

    pub fn set(&mut self, field: FundamentalField, value: f64) -> Option<f64> {
        self.values.insert(field, value)
    }

    pub fn get(&self, field: FundamentalField) -> Option<f64> {
        self.values.get(&field).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Daily closing price for a ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceObservation {
    pub ticker: String,
    pub trade_date: NaiveDate,
    pub close: f64,
}

/// One output row per ticker. Every metric is a raw fraction or ratio;
/// `None` means undefined (insufficient data), which is distinct from a
/// computed zero. Presentation scales percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub ticker: String,
    pub company: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub return_1m: Option<f64>,
    pub return_3m: Option<f64>,
    pub return_6m: Option<f64>,
    pub return_1y: Option<f64>,
    pub return_3y: Option<f64>,
    pub return_5y: Option<f64>,
    pub net_margin: Option<f64>,
    pub revenue_growth_1y: Option<f64>,
    pub revenue_growth_5y: Option<f64>,
    pub earnings_growth_1y: Option<f64>,
    pub earnings_growth_5y: Option<f64>,
    pub cash_to_debt: Option<f64>,
    /// Trailing price over basic EPS. Approximate: there is no forward
    /// EPS source, and the label must say so.
    pub pe_trailing_approx: Option<f64>,
}

impl MetricRow {
    /// A row with identifying columns filled and every metric undefined.
    pub fn empty(ticker: String, company: String, sector: Option<String>, industry: Option<String>) -> Self {
        Self {
            ticker,
            company,
            sector,
            industry,
            return_1m: None,
            return_3m: None,
            return_6m: None,
            return_1y: None,
            return_3y: None,
            return_5y: None,
            net_margin: None,
            revenue_growth_1y: None,
            revenue_growth_5y: None,
            earnings_growth_1y: None,
            earnings_growth_5y: None,
            cash_to_debt: None,
            pe_trailing_approx: None,
        }
    }
}

/// Numeric columns of a `MetricRow`, in display order. Lets the average
/// row and any presentation layer walk columns without stringly maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricColumn {
    Return1M,
    Return3M,
    Return6M,
    Return1Y,
    Return3Y,
    Return5Y,
    NetMargin,
    RevenueGrowth1Y,
    RevenueGrowth5Y,
    EarningsGrowth1Y,
    EarningsGrowth5Y,
    CashToDebt,
    PeTrailingApprox,
}

impl MetricColumn {
    pub const ALL: [MetricColumn; 13] = [
        MetricColumn::Return1M,
        MetricColumn::Return3M,
        MetricColumn::Return6M,
        MetricColumn::Return1Y,
        MetricColumn::Return3Y,
        MetricColumn::Return5Y,
        MetricColumn::NetMargin,
        MetricColumn::RevenueGrowth1Y,
        MetricColumn::RevenueGrowth5Y,
        MetricColumn::EarningsGrowth1Y,
        MetricColumn::EarningsGrowth5Y,
        MetricColumn::CashToDebt,
        MetricColumn::PeTrailingApprox,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MetricColumn::Return1M => "1M Return",
            MetricColumn::Return3M => "3M Return",
            MetricColumn::Return6M => "6M Return",
            MetricColumn::Return1Y => "1Y Return",
            MetricColumn::Return3Y => "3Y Return",
            MetricColumn::Return5Y => "5Y Return",
            MetricColumn::NetMargin => "Net Margin",
            MetricColumn::RevenueGrowth1Y => "Revenue Growth (1Y)",
            MetricColumn::RevenueGrowth5Y => "Revenue Growth (5Y)",
            MetricColumn::EarningsGrowth1Y => "Earnings Growth (1Y)",
            MetricColumn::EarningsGrowth5Y => "Earnings Growth (5Y)",
            MetricColumn::CashToDebt => "Cash / LT Debt",
            MetricColumn::PeTrailingApprox => "P/E (trailing, approx)",
        }
    }

    pub fn value(&self, row: &MetricRow) -> Option<f64> {
        match self {
            MetricColumn::Return1M => row.return_1m,
            MetricColumn::Return3M => row.return_3m,
            MetricColumn::Return6M => row.return_6m,
            MetricColumn::Return1Y => row.return_1y,
            MetricColumn::Return3Y => row.return_3y,
            MetricColumn::Return5Y => row.return_5y,
            MetricColumn::NetMargin => row.net_margin,
            MetricColumn::RevenueGrowth1Y => row.revenue_growth_1y,
            MetricColumn::RevenueGrowth5Y => row.revenue_growth_5y,
            MetricColumn::EarningsGrowth1Y => row.earnings_growth_1y,
            MetricColumn::EarningsGrowth5Y => row.earnings_growth_5y,
            MetricColumn::CashToDebt => row.cash_to_debt,
            MetricColumn::PeTrailingApprox => row.pe_trailing_approx,
        }
    }

    pub fn set(&self, row: &mut MetricRow, value: Option<f64>) {
        match self {
            MetricColumn::Return1M => row.return_1m = value,
            MetricColumn::Return3M => row.return_3m = value,
            MetricColumn::Return6M => row.return_6m = value,
            MetricColumn::Return1Y => row.return_1y = value,
            MetricColumn::Return3Y => row.return_3y = value,
            MetricColumn::Return5Y => row.return_5y = value,
            MetricColumn::NetMargin => row.net_margin = value,
            MetricColumn::RevenueGrowth1Y => row.revenue_growth_1y = value,
            MetricColumn::RevenueGrowth5Y => row.revenue_growth_5y = value,
            MetricColumn::EarningsGrowth1Y => row.earnings_growth_1y = value,
            MetricColumn::EarningsGrowth5Y => row.earnings_growth_5y = value,
            MetricColumn::CashToDebt => row.cash_to_debt = value,
            MetricColumn::PeTrailingApprox => row.pe_trailing_approx = value,
        }
    }
}

/// Label carried by the synthetic average row's identifying columns.
pub const INDEX_AVERAGE_LABEL: &str = "Index Average";

/// Full dashboard output: one row per ticker, the synthetic index-average
/// row, the echoed reference date, and any anomalies found along the way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsTable {
    pub as_of: NaiveDate,
    pub rows: Vec<MetricRow>,
    pub index_average: MetricRow,
    pub anomalies: Vec<Anomaly>,
}

/// Data-integrity findings reported alongside results, never fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Anomaly {
    /// More than one observation for the same ticker and date (and field,
    /// for fundamentals). Last-seen value wins; values are never averaged.
    DuplicateObservation {
        ticker: String,
        date: NaiveDate,
        field: Option<FundamentalField>,
    },
    /// Membership interval with start after end; the interval is skipped.
    InvalidMembershipInterval {
        index_name: String,
        ticker: String,
        included_start: NaiveDate,
        included_end: NaiveDate,
    },
    /// Ticker appears in membership history but not in the registry.
    UnregisteredTicker { index_name: String, ticker: String },
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anomaly::DuplicateObservation { ticker, date, field: Some(field) } => {
                write!(f, "duplicate {} observation for {} on {}", field.as_str(), ticker, date)
            }
            Anomaly::DuplicateObservation { ticker, date, field: None } => {
                write!(f, "duplicate price observation for {} on {}", ticker, date)
            }
            Anomaly::InvalidMembershipInterval { index_name, ticker, included_start, included_end } => {
                write!(
                    f,
                    "membership interval for {} in {} has start {} after end {}",
                    ticker, index_name, included_start, included_end
                )
            }
            Anomaly::UnregisteredTicker { index_name, ticker } => {
                write!(f, "{} appears in {} membership history but not in the registry", ticker, index_name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn unknown_field_names_are_ignored() {
        assert_eq!(FundamentalField::parse("revenue"), Some(FundamentalField::Revenue));
        assert_eq!(FundamentalField::parse("long_term_debt"), Some(FundamentalField::LongTermDebt));
        assert_eq!(FundamentalField::parse("free_cash_flow"), None);
        assert_eq!(FundamentalField::parse(""), None);
    }

    #[test]
    fn open_ended_membership_contains_any_later_date() {
        let m = IndexMembership {
            index_name: "S&P 500".to_string(),
            ticker: "AAA".to_string(),
            included_start: d(2020, 1, 1),
            included_end: None,
        };
        assert!(m.is_well_formed());
        assert!(m.contains(d(2030, 1, 1)));
        assert!(!m.contains(d(2019, 12, 31)));
    }

    #[test]
    fn undefined_metrics_serialize_as_null_not_zero() {
        let mut row = MetricRow::empty("AAA".to_string(), "AAA Inc.".to_string(), None, None);
        row.net_margin = Some(0.0);
        let json = serde_json::to_value(&row).unwrap();
        // A computed zero and a missing value must stay distinguishable at
        // the output boundary.
        assert_eq!(json["net_margin"], serde_json::json!(0.0));
        assert_eq!(json["return_1y"], serde_json::Value::Null);
    }

    #[test]
    fn metric_columns_round_trip_through_accessors() {
        let mut row = MetricRow::empty("AAA".to_string(), "AAA Inc.".to_string(), None, None);
        for (i, column) in MetricColumn::ALL.iter().enumerate() {
            column.set(&mut row, Some(i as f64));
        }
        for (i, column) in MetricColumn::ALL.iter().enumerate() {
            assert_eq!(column.value(&row), Some(i as f64));
        }
    }

    #[test]
    fn snapshot_get_never_zero_fills() {
        let mut snap = FundamentalSnapshot::new(d(2024, 6, 30), d(2024, 3, 31));
        snap.set(FundamentalField::Revenue, 100.0);
        assert_eq!(snap.get(FundamentalField::Revenue), Some(100.0));
        assert_eq!(snap.get(FundamentalField::NetIncome), None);
    }
}
