//! Descriptive statistics of historical anomaly thresholds

use crate::error::{Result, ThresholdError};
use crate::preprocessing::median;
use crate::records::{column_names, columns};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Statistical estimate shown next to the model prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; `None` below two values
    pub std_dev: Option<f64>,
    pub min: f64,
    pub max: f64,
}

impl ThresholdSummary {
    /// Summarize the target column over rows where it is known
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        if !column_names(df).iter().any(|c| c == columns::TARGET) {
            return Err(ThresholdError::InsufficientData(format!(
                "target column '{}' is missing",
                columns::TARGET
            )));
        }

        let series = df
            .column(columns::TARGET)?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        let values: Vec<f64> = series
            .f64()?
            .into_iter()
            .flatten()
            .filter(|v| v.is_finite())
            .collect();

        Self::from_values(&values)
    }

    pub fn from_values(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(ThresholdError::InsufficientData(
                "no anomaly threshold values available".to_string(),
            ));
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std_dev = (values.len() > 1).then(|| {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (n - 1.0)).sqrt()
        });
        let present: Vec<Option<f64>> = values.iter().copied().map(Some).collect();

        Ok(Self {
            count: values.len(),
            mean,
            median: median(&present).unwrap_or(mean),
            std_dev,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        let df = df!("anomaly_threshold" => &[Some(18.0), None, Some(20.0), Some(22.0)]).unwrap();
        let summary = ThresholdSummary::from_frame(&df).unwrap();

        assert_eq!(summary.count, 3);
        assert_eq!(summary.mean, 20.0);
        assert_eq!(summary.median, 20.0);
        assert_eq!(summary.std_dev, Some(2.0));
        assert_eq!(summary.min, 18.0);
        assert_eq!(summary.max, 22.0);
    }

    #[test]
    fn test_single_value_has_no_std() {
        let summary = ThresholdSummary::from_values(&[19.5]).unwrap();
        assert_eq!(summary.std_dev, None);
        assert_eq!(summary.median, 19.5);
    }

    #[test]
    fn test_no_targets() {
        let df = df!("anomaly_threshold" => &[None::<f64>]).unwrap();
        assert!(matches!(
            ThresholdSummary::from_frame(&df).unwrap_err(),
            ThresholdError::InsufficientData(_)
        ));
    }
}
