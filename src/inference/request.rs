//! Single-record prediction request

use crate::error::{Result, ThresholdError};
use crate::records::TenderRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Attributes of one tender to score.
///
/// `work_category` and `competitor_count` may be omitted; the preprocessor
/// then falls back to `"Unknown"` and 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub base_amount: f64,
    pub tender_date: NaiveDate,
    #[serde(default)]
    pub work_category: Option<String>,
    #[serde(default)]
    pub competitor_count: Option<i64>,
}

impl PredictionRequest {
    pub fn new(base_amount: f64, tender_date: NaiveDate) -> Self {
        Self {
            base_amount,
            tender_date,
            work_category: None,
            competitor_count: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.work_category = Some(category.into());
        self
    }

    pub fn with_competitors(mut self, count: i64) -> Self {
        self.competitor_count = Some(count);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.base_amount.is_finite() || self.base_amount < 0.0 {
            return Err(ThresholdError::InvalidInput(format!(
                "base amount must be a non-negative number, got {}",
                self.base_amount
            )));
        }
        if let Some(count) = self.competitor_count {
            if u32::try_from(count).is_err() {
                return Err(ThresholdError::InvalidInput(format!(
                    "competitor count must be between 0 and {}, got {}",
                    u32::MAX,
                    count
                )));
            }
        }
        Ok(())
    }

    /// The request as a record without target
    pub fn to_record(&self) -> TenderRecord {
        TenderRecord {
            base_amount: self.base_amount,
            work_category: self.work_category.clone(),
            competitor_count: self.competitor_count.and_then(|c| u32::try_from(c).ok()),
            tender_date: Some(self.tender_date),
            anomaly_threshold: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    #[test]
    fn test_validation() {
        assert!(PredictionRequest::new(300_000.0, date()).validate().is_ok());
        assert!(PredictionRequest::new(-1.0, date()).validate().is_err());
        assert!(PredictionRequest::new(f64::NAN, date()).validate().is_err());
        assert!(PredictionRequest::new(1.0, date()).with_competitors(-3).validate().is_err());
    }

    #[test]
    fn test_oversized_competitor_count_rejected() {
        let request = PredictionRequest::new(1.0, date()).with_competitors(i64::from(u32::MAX) + 1);
        assert!(matches!(request.validate(), Err(ThresholdError::InvalidInput(_))));

        let largest = PredictionRequest::new(1.0, date()).with_competitors(i64::from(u32::MAX));
        assert!(largest.validate().is_ok());
        assert_eq!(largest.to_record().competitor_count, Some(u32::MAX));
    }

    #[test]
    fn test_json_shape() {
        let request: PredictionRequest = serde_json::from_str(
            r#"{"base_amount": 250000, "tender_date": "2025-03-10", "work_category": "OG1"}"#,
        )
        .unwrap();
        assert_eq!(request.tender_date, date());
        assert_eq!(request.work_category.as_deref(), Some("OG1"));
        assert!(request.competitor_count.is_none());
    }
}
