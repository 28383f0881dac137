//! One-hot encoding of categorical columns

use crate::error::{PipelineError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One-hot encoder.
///
/// Each fitted column owns a sorted vocabulary; a value maps to the slot of
/// its position in that vocabulary. Values never seen at fit time (and nulls)
/// have no slot and encode as an all-zero block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Encoder {
    vocabularies: Vec<(String, Vec<String>)>,
}

impl Encoder {
    /// Create a new encoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit the encoder to the data. Any previous fit is discarded.
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        let mut vocabularies = Vec::with_capacity(columns.len());
        for col_name in columns {
            let column = df
                .column(col_name)
                .map_err(|_| PipelineError::FeatureNotFound(col_name.clone()))?;
            let strings = Self::as_str(column)?;

            let vocabulary: BTreeSet<String> = strings
                .into_iter()
                .flatten()
                .map(|v| v.to_string())
                .collect();
            vocabularies.push((col_name.clone(), vocabulary.into_iter().collect()));
        }

        self.vocabularies = vocabularies;
        Ok(self)
    }

    /// Fitted vocabularies in column order
    pub fn vocabularies(&self) -> &[(String, Vec<String>)] {
        &self.vocabularies
    }

    /// Vocabulary of a single column
    pub fn vocabulary(&self, column: &str) -> Option<&[String]> {
        self.vocabularies
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v.as_slice())
    }

    /// Total number of one-hot output columns
    pub fn width(&self) -> usize {
        self.vocabularies.iter().map(|(_, v)| v.len()).sum()
    }

    /// Output names, `<column>_<category>`, in output order
    pub fn feature_names(&self) -> Vec<String> {
        self.vocabularies
            .iter()
            .flat_map(|(col, vocab)| vocab.iter().map(move |cat| format!("{}_{}", col, cat)))
            .collect()
    }

    /// Slot of every value of `column` within the `idx`-th vocabulary.
    /// `None` for nulls and unseen categories.
    pub fn slots(&self, idx: usize, column: &Column) -> Result<Vec<Option<usize>>> {
        let (_, vocab) = self.vocabularies.get(idx).ok_or_else(|| {
            PipelineError::InvalidInput(format!("encoder has no column at index {}", idx))
        })?;

        let strings = Self::as_str(column)?;
        Ok(strings
            .into_iter()
            .map(|v| v.and_then(|s| Self::slot(vocab, s)))
            .collect())
    }

    #[inline]
    fn slot(vocab: &[String], value: &str) -> Option<usize> {
        vocab.binary_search_by(|c| c.as_str().cmp(value)).ok()
    }

    /// Render any dtype as strings (booleans become "true"/"false")
    fn as_str(column: &Column) -> Result<StringChunked> {
        let casted = column
            .cast(&DataType::String)
            .map_err(|e| PipelineError::DataError(e.to_string()))?;
        Ok(casted
            .str()
            .map_err(|e| PipelineError::DataError(e.to_string()))?
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        df!(
            "employment_type" => &["salaried", "self_employed", "salaried", "contract"],
            "has_guarantor" => &[true, false, false, true],
        )
        .unwrap()
    }

    fn fitted() -> Encoder {
        let mut encoder = Encoder::new();
        encoder
            .fit(&frame(), &["employment_type".to_string(), "has_guarantor".to_string()])
            .unwrap();
        encoder
    }

    #[test]
    fn test_vocabulary_is_sorted() {
        let encoder = fitted();
        assert_eq!(
            encoder.vocabulary("employment_type").unwrap(),
            &["contract", "salaried", "self_employed"]
        );
        assert_eq!(encoder.vocabulary("has_guarantor").unwrap(), &["false", "true"]);
        assert_eq!(encoder.width(), 5);
    }

    #[test]
    fn test_feature_names() {
        let names = fitted().feature_names();
        assert_eq!(names[0], "employment_type_contract");
        assert_eq!(names[4], "has_guarantor_true");
    }

    #[test]
    fn test_unseen_and_null_have_no_slot() {
        let encoder = fitted();
        let df = df!("employment_type" => &[Some("salaried"), Some("retired"), None]).unwrap();
        let slots = encoder.slots(0, df.column("employment_type").unwrap()).unwrap();
        assert_eq!(slots, vec![Some(1), None, None]);
    }

    #[test]
    fn test_null_is_not_part_of_vocabulary() {
        let df = df!("c" => &[Some("a"), None, Some("b")]).unwrap();
        let mut encoder = Encoder::new();
        encoder.fit(&df, &["c".to_string()]).unwrap();
        assert_eq!(encoder.vocabulary("c").unwrap(), &["a", "b"]);
    }

    #[test]
    fn test_unknown_column_index_errors() {
        let encoder = Encoder::new();
        let df = frame();
        assert!(matches!(
            encoder.slots(0, df.column("employment_type").unwrap()),
            Err(PipelineError::InvalidInput(_))
        ));
    }
}
