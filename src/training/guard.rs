//! Minimum-sample gate applied before a training run is offered

use crate::error::{Result, ThresholdError};
use crate::records::{column_names, columns};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Columns that must all be present for a row to count
const REQUIRED: [&str; 3] = [columns::TARGET, columns::BASE_AMOUNT, columns::TENDER_DATE];

/// Result of [`TrainingGuard::check`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingReadiness {
    pub valid_samples: usize,
    pub required: usize,
}

impl TrainingReadiness {
    pub fn is_ready(&self) -> bool {
        self.valid_samples >= self.required
    }

    /// Rows still needed before training can run
    pub fn missing(&self) -> usize {
        self.required.saturating_sub(self.valid_samples)
    }
}

/// Counts usable historical rows. [`ModelTrainer`](super::ModelTrainer)
/// does not consult it; callers decide whether to gate on it.
#[derive(Debug, Clone, Copy)]
pub struct TrainingGuard {
    min_samples: usize,
}

impl Default for TrainingGuard {
    fn default() -> Self {
        Self::new(15)
    }
}

impl TrainingGuard {
    pub fn new(min_samples: usize) -> Self {
        Self { min_samples }
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    /// Count rows with target, base amount and date all present.
    /// An absent required column counts as zero valid rows.
    pub fn check(&self, df: &DataFrame) -> Result<TrainingReadiness> {
        let present = column_names(df);
        let mut mask = vec![true; df.height()];

        for name in REQUIRED {
            if !present.iter().any(|c| c == name) {
                return Ok(TrainingReadiness {
                    valid_samples: 0,
                    required: self.min_samples,
                });
            }
            let nulls = df.column(name)?.is_null();
            for (keep, is_null) in mask.iter_mut().zip(&nulls) {
                if is_null.unwrap_or(true) {
                    *keep = false;
                }
            }
        }

        Ok(TrainingReadiness {
            valid_samples: mask.iter().filter(|&&k| k).count(),
            required: self.min_samples,
        })
    }

    /// Like [`check`](Self::check) but fails below the gate
    pub fn ensure(&self, df: &DataFrame) -> Result<TrainingReadiness> {
        let present = column_names(df);
        if let Some(missing) = REQUIRED.iter().find(|c| !present.iter().any(|p| p == *c)) {
            return Err(ThresholdError::InsufficientData(format!(
                "required column '{}' is missing",
                missing
            )));
        }

        let readiness = self.check(df)?;
        if !readiness.is_ready() {
            return Err(ThresholdError::InsufficientData(format!(
                "{} valid samples, at least {} required",
                readiness.valid_samples, readiness.required
            )));
        }
        Ok(readiness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(n: usize, with_gaps: bool) -> DataFrame {
        let target: Vec<Option<f64>> = (0..n)
            .map(|i| if with_gaps && i == 0 { None } else { Some(18.0 + i as f64 * 0.1) })
            .collect();
        let base: Vec<f64> = (0..n).map(|i| 50_000.0 + i as f64 * 1_000.0).collect();
        let dates: Vec<Option<&str>> = (0..n)
            .map(|i| if with_gaps && i == 1 { None } else { Some("2024-01-10") })
            .collect();
        df!(
            "anomaly_threshold" => target,
            "base_amount" => base,
            "tender_date" => dates
        )
        .unwrap()
    }

    #[test]
    fn test_counts_complete_rows() {
        let readiness = TrainingGuard::default().check(&frame(20, true)).unwrap();
        assert_eq!(readiness.valid_samples, 18);
        assert!(readiness.is_ready());
    }

    #[test]
    fn test_rejects_small_sets() {
        let guard = TrainingGuard::default();
        let readiness = guard.check(&frame(5, false)).unwrap();
        assert_eq!(readiness.missing(), 10);

        let err = guard.ensure(&frame(5, false)).unwrap_err();
        assert!(matches!(err, ThresholdError::InsufficientData(_)));
    }

    #[test]
    fn test_missing_column() {
        let df = df!("base_amount" => &[1.0]).unwrap();
        let guard = TrainingGuard::new(1);
        assert_eq!(guard.check(&df).unwrap().valid_samples, 0);
        assert!(guard.ensure(&df).is_err());
    }
}
