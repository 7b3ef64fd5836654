//! Tender records and the canonical column schema

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Canonical column names shared by record frames, feature frames and artifacts
pub mod columns {
    pub const BASE_AMOUNT: &str = "base_amount";
    pub const WORK_CATEGORY: &str = "work_category";
    pub const COMPETITOR_COUNT: &str = "competitor_count";
    pub const TENDER_DATE: &str = "tender_date";
    pub const ANOMALY_THRESHOLD: &str = "anomaly_threshold";

    pub const TENDER_YEAR: &str = "tender_year";
    pub const TENDER_MONTH: &str = "tender_month";

    /// Feature candidates, in the order they are considered
    pub const CANDIDATE_FEATURES: [&str; 4] =
        [BASE_AMOUNT, WORK_CATEGORY, COMPETITOR_COUNT, TENDER_DATE];

    /// Regression target
    pub const TARGET: &str = ANOMALY_THRESHOLD;
}

/// One historical tender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenderRecord {
    pub base_amount: f64,
    #[serde(default)]
    pub work_category: Option<String>,
    #[serde(default)]
    pub competitor_count: Option<u32>,
    #[serde(default)]
    pub tender_date: Option<NaiveDate>,
    /// Anomaly threshold percentage; absent for rows not usable in training
    #[serde(default)]
    pub anomaly_threshold: Option<f64>,
}

impl TenderRecord {
    pub fn new(base_amount: f64) -> Self {
        Self {
            base_amount,
            work_category: None,
            competitor_count: None,
            tender_date: None,
            anomaly_threshold: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.work_category = Some(category.into());
        self
    }

    pub fn with_competitors(mut self, count: u32) -> Self {
        self.competitor_count = Some(count);
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.tender_date = Some(date);
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.anomaly_threshold = Some(threshold);
        self
    }
}

/// Build a record frame with the canonical columns.
///
/// Dates are stored as ISO `YYYY-MM-DD` strings, which is also the shape the
/// storage layer hands over.
pub fn records_to_frame(records: &[TenderRecord]) -> Result<DataFrame> {
    let base_amount: Vec<f64> = records.iter().map(|r| r.base_amount).collect();
    let category: Vec<Option<String>> =
        records.iter().map(|r| r.work_category.clone()).collect();
    let competitors: Vec<Option<f64>> = records
        .iter()
        .map(|r| r.competitor_count.map(f64::from))
        .collect();
    let dates: Vec<Option<String>> = records
        .iter()
        .map(|r| r.tender_date.map(|d| d.format("%Y-%m-%d").to_string()))
        .collect();
    let threshold: Vec<Option<f64>> = records.iter().map(|r| r.anomaly_threshold).collect();

    let df = DataFrame::new(vec![
        Column::new(columns::BASE_AMOUNT.into(), base_amount),
        Column::new(columns::WORK_CATEGORY.into(), category),
        Column::new(columns::COMPETITOR_COUNT.into(), competitors),
        Column::new(columns::TENDER_DATE.into(), dates),
        Column::new(columns::ANOMALY_THRESHOLD.into(), threshold),
    ])?;

    Ok(df)
}

/// Column names of a frame as owned strings
pub(crate) fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_to_frame_shape() {
        let records = vec![
            TenderRecord::new(100_000.0)
                .with_category("OG1")
                .with_competitors(12)
                .with_date(NaiveDate::from_ymd_opt(2023, 4, 18).unwrap())
                .with_threshold(18.25),
            TenderRecord::new(250_000.0),
        ];

        let df = records_to_frame(&records).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 5);

        let dates = df.column(columns::TENDER_DATE).unwrap().str().unwrap().clone();
        assert_eq!(dates.get(0), Some("2023-04-18"));
        assert_eq!(dates.get(1), None);
    }

    #[test]
    fn test_record_deserialize_defaults() {
        let record: TenderRecord = serde_json::from_str(r#"{"base_amount": 5000.0}"#).unwrap();
        assert_eq!(record, TenderRecord::new(5000.0));
    }
}
