//! Two-mode feature pipeline: fit on history, transform unseen records

use crate::error::{Result, ThresholdError};
use crate::records::{column_names, columns};
use super::{
    dates::{parse_tender_date, CalendarFeatures},
    encoder::EncoderRegistry,
    imputer::{ImputeStrategy, Imputer},
    TrainedColumnOrder,
};
use chrono::NaiveDate;
use ndarray::Array1;
use polars::prelude::*;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Numeric feature columns in output order
const NUMERIC_FEATURES: [&str; 4] = [
    columns::BASE_AMOUNT,
    columns::COMPETITOR_COUNT,
    columns::TENDER_YEAR,
    columns::TENDER_MONTH,
];

/// Categorical feature columns in output order
const CATEGORICAL_FEATURES: [&str; 1] = [columns::WORK_CATEGORY];

/// Result of fitting the pipeline on historical records
#[derive(Debug, Clone)]
pub struct FitOutput {
    /// Numeric feature table, columns in `columns` order
    pub features: DataFrame,
    /// Target values aligned with the rows of `features`
    pub target: Array1<f64>,
    pub registry: EncoderRegistry,
    pub columns: TrainedColumnOrder,
    /// Rows dropped because the target was missing
    pub dropped_rows: usize,
}

/// Raw candidate columns pulled out of a record frame
#[derive(Debug, Default)]
struct RawColumns {
    numeric: Vec<(&'static str, Vec<Option<f64>>)>,
    categorical: Vec<(&'static str, Vec<Option<String>>)>,
    dates: Option<Vec<Option<NaiveDate>>>,
}

impl RawColumns {
    fn extract(df: &DataFrame, keep: Option<&[bool]>) -> Result<Self> {
        let present: HashSet<String> = column_names(df).into_iter().collect();
        let mut raw = RawColumns::default();

        for name in [columns::BASE_AMOUNT, columns::COMPETITOR_COUNT] {
            if present.contains(name) {
                raw.numeric.push((name, filter_rows(numeric_cells(df, name)?, keep)));
            }
        }
        for name in CATEGORICAL_FEATURES {
            if present.contains(name) {
                raw.categorical.push((name, filter_rows(string_cells(df, name)?, keep)));
            }
        }
        if present.contains(columns::TENDER_DATE) {
            raw.dates = Some(filter_rows(date_cells(df, columns::TENDER_DATE)?, keep));
        }

        Ok(raw)
    }

    /// Replace the raw date column with year/month columns when any date parses
    fn derive_calendar(&mut self) {
        if let Some(cells) = self.dates.take() {
            let calendar = CalendarFeatures::from_dates(&cells);
            debug!(parsed = calendar.parsed, total = cells.len(), "Derived calendar features");
            if calendar.any_parsed() {
                self.numeric.push((columns::TENDER_YEAR, calendar.year));
                self.numeric.push((columns::TENDER_MONTH, calendar.month));
            }
        }
    }

    /// Numeric columns sorted into output order
    fn ordered_numeric(&mut self) -> Vec<(&'static str, Vec<Option<f64>>)> {
        let mut ordered = std::mem::take(&mut self.numeric);
        ordered.sort_by_key(|(name, _)| {
            NUMERIC_FEATURES.iter().position(|n| n == name).unwrap_or(usize::MAX)
        });
        ordered
    }
}

/// Converts raw tender frames into numeric feature tables.
///
/// `fit` learns the encoder registry and column order from history;
/// `transform` replays them on unseen rows and never fails on missing values
/// or unseen categories.
#[derive(Debug, Clone, Default)]
pub struct FeaturePreprocessor;

impl FeaturePreprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Fit mode: drop rows without target, impute, encode, capture the column order
    pub fn fit(&self, df: &DataFrame) -> Result<FitOutput> {
        let start = Instant::now();

        if !column_names(df).iter().any(|c| c == columns::TARGET) {
            return Err(ThresholdError::InsufficientData(format!(
                "target column '{}' is missing",
                columns::TARGET
            )));
        }

        let target_cells = numeric_cells(df, columns::TARGET)?;
        let keep: Vec<bool> = target_cells.iter().map(|t| t.is_some()).collect();
        let target: Vec<f64> = target_cells.into_iter().flatten().collect();
        let dropped_rows = df.height() - target.len();
        if dropped_rows > 0 {
            info!(dropped = dropped_rows, "Removed rows with missing target");
        }
        if target.is_empty() {
            return Err(ThresholdError::InsufficientData(
                "no rows with a valid target remain".to_string(),
            ));
        }

        let mut raw = RawColumns::extract(df, Some(&keep))?;
        raw.derive_calendar();

        let numeric_imputer = Imputer::new(ImputeStrategy::fit_numeric());
        let categorical_imputer = Imputer::new(ImputeStrategy::categorical());
        let mut registry = EncoderRegistry::new();
        let mut output: Vec<Column> = Vec::new();

        for (name, cells) in raw.ordered_numeric() {
            let (values, fill) = numeric_imputer.impute_numeric(&cells);
            if let Some(fill) = fill {
                debug!(column = name, fill, "Imputed missing numeric values with median");
            }
            output.push(Column::new(name.into(), values));
        }

        for (name, cells) in raw.categorical {
            let values = categorical_imputer.impute_categorical(&cells);
            let codes = registry.fit(name, &values);
            debug!(
                column = name,
                classes = registry.vocabulary(name).map_or(0, |v| v.len()),
                "Fitted label vocabulary"
            );
            output.push(Column::new(name.into(), to_f64(&codes)));
        }

        let features = DataFrame::new(output)?;
        let columns = TrainedColumnOrder::new(column_names(&features));

        info!(
            rows = features.height(),
            features = ?columns.as_slice(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Preprocessing (fit) complete"
        );

        Ok(FitOutput {
            features,
            target: Array1::from_vec(target),
            registry,
            columns,
            dropped_rows,
        })
    }

    /// Transform mode: reproduce the fitted layout for unseen rows
    pub fn transform(
        &self,
        df: &DataFrame,
        registry: &EncoderRegistry,
        trained_columns: &TrainedColumnOrder,
    ) -> Result<DataFrame> {
        trained_columns.validate()?;

        let n_rows = df.height();
        let mut raw = RawColumns::extract(df, None)?;
        raw.derive_calendar();

        let numeric_imputer = Imputer::new(ImputeStrategy::transform_numeric());
        let categorical_imputer = Imputer::new(ImputeStrategy::categorical());
        let mut output: Vec<Column> = Vec::new();

        for (name, cells) in raw.ordered_numeric() {
            let (values, _) = numeric_imputer.impute_numeric(&cells);
            output.push(Column::new(name.into(), values));
        }

        for (name, cells) in raw.categorical {
            let values = categorical_imputer.impute_categorical(&cells);
            match registry.transform(name, &values) {
                Some(codes) => output.push(Column::new(name.into(), to_f64(&codes))),
                None => warn!(column = name, "No vocabulary for categorical column; column dropped"),
            }
        }

        let produced = DataFrame::new(output)?;
        align_columns(&produced, trained_columns, n_rows)
    }
}

/// Align a feature table to the trained column order.
///
/// Missing expected columns are added as zeros, unexpected columns are
/// discarded and the rest are reordered. Applying it to an aligned table
/// returns an identical table.
pub fn align_columns(
    df: &DataFrame,
    trained_columns: &TrainedColumnOrder,
    n_rows: usize,
) -> Result<DataFrame> {
    trained_columns.validate()?;

    let present = column_names(df);
    let expected: HashSet<&str> = trained_columns.iter().collect();

    let extra: Vec<&String> = present.iter().filter(|c| !expected.contains(c.as_str())).collect();
    if !extra.is_empty() {
        warn!(columns = ?extra, "Discarding columns not seen during training");
    }

    let height = if df.width() > 0 { df.height() } else { n_rows };
    let mut aligned: Vec<Column> = Vec::with_capacity(trained_columns.len());

    for name in trained_columns.iter() {
        if present.iter().any(|c| c == name) {
            let series = df
                .column(name)?
                .as_materialized_series()
                .cast(&DataType::Float64)?;
            aligned.push(series.into());
        } else {
            warn!(column = name, "Expected column missing; filled with 0");
            aligned.push(Column::new(name.into(), vec![0.0f64; height]));
        }
    }

    DataFrame::new(aligned).map_err(|e| {
        ThresholdError::Preprocessing(format!(
            "cannot align to trained columns {:?}: {}",
            trained_columns.as_slice(),
            e
        ))
    })
}

fn numeric_cells(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let values = series
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect();
    Ok(values)
}

fn string_cells(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

/// Temporal columns are read as dates; anything else goes through the text parser
fn date_cells(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDate>>> {
    let series = df.column(name)?.as_materialized_series();
    match series.dtype() {
        DataType::Date | DataType::Datetime(_, _) => {
            let dates = series.cast(&DataType::Date)?;
            Ok(dates.date()?.as_date_iter().collect())
        }
        _ => Ok(string_cells(df, name)?
            .into_iter()
            .map(|c| c.as_deref().and_then(parse_tender_date))
            .collect()),
    }
}

fn filter_rows<T>(cells: Vec<T>, keep: Option<&[bool]>) -> Vec<T> {
    match keep {
        Some(mask) => cells
            .into_iter()
            .zip(mask.iter())
            .filter_map(|(cell, &k)| k.then_some(cell))
            .collect(),
        None => cells,
    }
}

fn to_f64(codes: &[i64]) -> Vec<f64> {
    codes.iter().map(|&c| c as f64).collect()
}
