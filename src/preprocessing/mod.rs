//! Feature preprocessing module
//!
//! Turns raw tender frames into numeric feature tables:
//! - Candidate column selection and target filtering
//! - Calendar features (year, month) from the tender date
//! - Median / constant imputation
//! - Label encoding through a persisted [`EncoderRegistry`]
//! - Column alignment against the trained layout

mod dates;
mod encoder;
mod imputer;
mod pipeline;

pub use dates::{parse_tender_date, CalendarFeatures};
pub use encoder::{EncoderRegistry, OOV_CODE};
pub use imputer::{median, ImputeStrategy, Imputer, UNKNOWN_CATEGORY};
pub use pipeline::{align_columns, FeaturePreprocessor, FitOutput};

use crate::error::{Result, ThresholdError};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ordered feature column names fixed at fit time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrainedColumnOrder(Vec<String>);

impl TrainedColumnOrder {
    pub fn new(columns: Vec<String>) -> Self {
        Self(columns)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.0.iter().position(|c| c == column)
    }

    /// Reject layouts that no feature table can satisfy
    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(ThresholdError::Preprocessing(
                "trained column list is empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for name in &self.0 {
            if name.trim().is_empty() {
                return Err(ThresholdError::Preprocessing(
                    "trained column list contains an empty name".to_string(),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(ThresholdError::Preprocessing(format!(
                    "trained column list contains '{}' twice",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Copy the named columns of a feature table into a row-major matrix
pub fn frame_to_matrix(df: &DataFrame, columns: &TrainedColumnOrder) -> Result<Array2<f64>> {
    let mut x = Array2::zeros((df.height(), columns.len()));

    for (j, name) in columns.iter().enumerate() {
        let series = df
            .column(name)
            .map_err(|_| ThresholdError::Preprocessing(format!("feature '{}' not found", name)))?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        for (i, value) in series.f64()?.into_iter().enumerate() {
            x[[i, j]] = value.unwrap_or(0.0);
        }
    }

    Ok(x)
}
