//! Missing value imputation strategies

use serde::{Deserialize, Serialize};

/// Sentinel written into categorical cells that carry no value
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Strategy for imputing missing values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Median of the observed values, `fallback` when none are observed
    Median { fallback: f64 },
    /// Replace with a constant value
    Constant(f64),
    /// Replace with a constant string (categorical)
    ConstantString(String),
}

impl ImputeStrategy {
    /// Numeric policy used when fitting on historical rows
    pub fn fit_numeric() -> Self {
        ImputeStrategy::Median { fallback: 0.0 }
    }

    /// Numeric policy used when transforming unseen rows
    pub fn transform_numeric() -> Self {
        ImputeStrategy::Constant(0.0)
    }

    /// Categorical policy, shared by both modes
    pub fn categorical() -> Self {
        ImputeStrategy::ConstantString(UNKNOWN_CATEGORY.to_string())
    }
}

/// Stateless imputer; fill values are computed from the column being filled
/// and never persisted.
#[derive(Debug, Clone)]
pub struct Imputer {
    strategy: ImputeStrategy,
}

impl Imputer {
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &ImputeStrategy {
        &self.strategy
    }

    /// Value that replaces missing numeric cells of `values`
    pub fn numeric_fill_value(&self, values: &[Option<f64>]) -> f64 {
        match &self.strategy {
            ImputeStrategy::Median { fallback } => median(values).unwrap_or(*fallback),
            ImputeStrategy::Constant(c) => *c,
            ImputeStrategy::ConstantString(_) => 0.0,
        }
    }

    /// Fill a numeric column; returns the filled values and the fill used, if any cell was missing
    pub fn impute_numeric(&self, values: &[Option<f64>]) -> (Vec<f64>, Option<f64>) {
        if values.iter().all(|v| v.is_some()) {
            return (values.iter().map(|v| v.unwrap_or_default()).collect(), None);
        }

        let fill = self.numeric_fill_value(values);
        let filled = values.iter().map(|v| v.unwrap_or(fill)).collect();
        (filled, Some(fill))
    }

    /// Fill a categorical column
    pub fn impute_categorical(&self, values: &[Option<String>]) -> Vec<String> {
        let fill = match &self.strategy {
            ImputeStrategy::ConstantString(s) => s.clone(),
            ImputeStrategy::Constant(c) => c.to_string(),
            ImputeStrategy::Median { .. } => UNKNOWN_CATEGORY.to_string(),
        };

        values
            .iter()
            .map(|v| v.clone().unwrap_or_else(|| fill.clone()))
            .collect()
    }
}

/// Median of the present values (average of the two middle values for even counts)
pub fn median(values: &[Option<f64>]) -> Option<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }

    present.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = present.len() / 2;
    if present.len() % 2 == 0 {
        Some((present[mid - 1] + present[mid]) / 2.0)
    } else {
        Some(present[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_even() {
        assert_eq!(median(&[Some(3.0), None, Some(1.0), Some(2.0)]), Some(2.0));
        assert_eq!(median(&[Some(4.0), Some(1.0), Some(2.0), Some(3.0)]), Some(2.5));
        assert_eq!(median(&[None, None]), None);
    }

    #[test]
    fn test_median_imputation_falls_back_to_zero() {
        let imputer = Imputer::new(ImputeStrategy::fit_numeric());

        let (filled, fill) = imputer.impute_numeric(&[Some(10.0), None, Some(20.0)]);
        assert_eq!(filled, vec![10.0, 15.0, 20.0]);
        assert_eq!(fill, Some(15.0));

        let (filled, fill) = imputer.impute_numeric(&[None, None]);
        assert_eq!(filled, vec![0.0, 0.0]);
        assert_eq!(fill, Some(0.0));
    }

    #[test]
    fn test_complete_column_untouched() {
        let imputer = Imputer::new(ImputeStrategy::transform_numeric());
        let (filled, fill) = imputer.impute_numeric(&[Some(1.5), Some(2.5)]);
        assert_eq!(filled, vec![1.5, 2.5]);
        assert!(fill.is_none());
    }

    #[test]
    fn test_categorical_sentinel() {
        let imputer = Imputer::new(ImputeStrategy::categorical());
        let filled = imputer.impute_categorical(&[Some("OG1".to_string()), None]);
        assert_eq!(filled, vec!["OG1".to_string(), UNKNOWN_CATEGORY.to_string()]);
    }
}
