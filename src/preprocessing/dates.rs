//! Tender date parsing and calendar features

use chrono::{Datelike, NaiveDate, NaiveDateTime};

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parse a tender date; `None` when the text matches no supported format
pub fn parse_tender_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Year and month columns derived from raw date cells
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarFeatures {
    pub year: Vec<Option<f64>>,
    pub month: Vec<Option<f64>>,
    /// Number of cells that parsed
    pub parsed: usize,
}

impl CalendarFeatures {
    pub fn from_raw(cells: &[Option<String>]) -> Self {
        let dates: Vec<Option<NaiveDate>> = cells
            .iter()
            .map(|c| c.as_deref().and_then(parse_tender_date))
            .collect();
        Self::from_dates(&dates)
    }

    pub fn from_dates(dates: &[Option<NaiveDate>]) -> Self {
        Self {
            year: dates.iter().map(|d| d.map(|d| d.year() as f64)).collect(),
            month: dates.iter().map(|d| d.map(|d| d.month() as f64)).collect(),
            parsed: dates.iter().filter(|d| d.is_some()).count(),
        }
    }

    pub fn any_parsed(&self) -> bool {
        self.parsed > 0
    }
}
