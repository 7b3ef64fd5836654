//! Categorical vocabularies, one per encoded column

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Code assigned at transform time to values absent from a vocabulary
pub const OOV_CODE: i64 = -1;

/// Per-column label vocabularies captured at fit time.
///
/// Each vocabulary is the sorted list of distinct strings seen during fit;
/// the position of a string is its code. The registry is rebuilt from scratch
/// for every training run and never grows at inference time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncoderRegistry {
    vocabularies: BTreeMap<String, Vec<String>>,
}

impl EncoderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn the vocabulary of `column` and return the codes of `values`.
    ///
    /// Replaces any vocabulary previously registered for the column.
    pub fn fit(&mut self, column: &str, values: &[String]) -> Vec<i64> {
        let vocabulary: Vec<String> = values
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let index = Self::index_of(&vocabulary);
        let codes = values
            .iter()
            .map(|v| index.get(v.as_str()).copied().unwrap_or(OOV_CODE))
            .collect();

        self.vocabularies.insert(column.to_string(), vocabulary);
        codes
    }

    /// Encode `values` with the stored vocabulary of `column`.
    ///
    /// Unseen values map to [`OOV_CODE`]. Returns `None` when the column has
    /// no registered vocabulary.
    pub fn transform(&self, column: &str, values: &[String]) -> Option<Vec<i64>> {
        let vocabulary = self.vocabularies.get(column)?;
        let index = Self::index_of(vocabulary);

        Some(
            values
                .iter()
                .map(|v| index.get(v.as_str()).copied().unwrap_or(OOV_CODE))
                .collect(),
        )
    }

    /// Code of a single value, `None` if the column is unknown
    pub fn encode(&self, column: &str, value: &str) -> Option<i64> {
        let vocabulary = self.vocabularies.get(column)?;
        Some(
            vocabulary
                .iter()
                .position(|v| v == value)
                .map(|i| i as i64)
                .unwrap_or(OOV_CODE),
        )
    }

    /// Ordered vocabulary of a column
    pub fn vocabulary(&self, column: &str) -> Option<&[String]> {
        self.vocabularies.get(column).map(|v| v.as_slice())
    }

    pub fn contains(&self, column: &str) -> bool {
        self.vocabularies.contains_key(column)
    }

    /// Names of the encoded columns
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.vocabularies.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.vocabularies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocabularies.is_empty()
    }

    fn index_of(vocabulary: &[String]) -> HashMap<&str, i64> {
        vocabulary
            .iter()
            .enumerate()
            .map(|(i, v)| (v.as_str(), i as i64))
            .collect()
    }
}
