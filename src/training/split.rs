//! Stratified, seeded train/test splitting

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Axis};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Disjoint train/test row indices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPartition {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl SplitPartition {
    pub fn len(&self) -> usize {
        self.train.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Single stratified train/test splitter.
///
/// Each class contributes to the test partition in proportion to its share
/// of the labels, so class proportions in both partitions stay within one
/// sample of the full set. The same labels and seed always give the same
/// partition.
#[derive(Debug, Clone, Copy)]
pub struct StratifiedSplit {
    test_size: f64,
    seed: u64,
}

impl StratifiedSplit {
    pub fn new(test_size: f64, seed: u64) -> Self {
        Self { test_size, seed }
    }

    pub fn test_size(&self) -> f64 {
        self.test_size
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Split row indices `0..labels.len()` into train and test partitions
    pub fn split(&self, labels: &Array1<i64>) -> Result<SplitPartition> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PipelineError::ConfigError(format!(
                "test_size must lie strictly between 0 and 1, got {}",
                self.test_size
            )));
        }

        let n = labels.len();
        if n == 0 {
            return Err(PipelineError::StratificationError(
                "cannot split an empty label vector".to_string(),
            ));
        }

        // Group samples by class, visited in sorted order
        let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, &class) in labels.iter().enumerate() {
            class_indices.entry(class).or_default().push(idx);
        }

        if let Some((class, members)) = class_indices.iter().find(|(_, m)| m.len() < 2) {
            return Err(PipelineError::StratificationError(format!(
                "class {} has {} member(s); at least 2 are needed to appear in both partitions",
                class,
                members.len()
            )));
        }

        // Float noise (0.1 * 30 = 3.0000000000000004) must not add a test row
        let n_test = ((self.test_size * n as f64) - 1e-9).ceil().max(1.0) as usize;
        let quotas = Self::allocate(&class_indices, n, n_test);

        for (class, members) in &class_indices {
            let quota = quotas[class];
            if quota == 0 || quota >= members.len() {
                return Err(PipelineError::StratificationError(format!(
                    "class {} ({} members) would get {} test row(s) and leave a partition without it",
                    class,
                    members.len(),
                    quota
                )));
            }
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut train = Vec::with_capacity(n - n_test);
        let mut test = Vec::with_capacity(n_test);

        for (class, members) in class_indices.iter_mut() {
            members.shuffle(&mut rng);
            let quota = quotas[class];
            test.extend_from_slice(&members[..quota]);
            train.extend_from_slice(&members[quota..]);
        }

        train.shuffle(&mut rng);
        test.shuffle(&mut rng);

        Ok(SplitPartition { train, test })
    }

    /// Largest-remainder allocation of `n_test` rows across classes.
    /// Ties on the remainder go to the smaller class label.
    fn allocate(
        class_indices: &BTreeMap<i64, Vec<usize>>,
        n: usize,
        n_test: usize,
    ) -> BTreeMap<i64, usize> {
        let mut quotas = BTreeMap::new();
        let mut remainders: Vec<(usize, i64)> = Vec::with_capacity(class_indices.len());
        let mut assigned = 0usize;

        for (&class, members) in class_indices {
            let exact = n_test * members.len();
            let base = exact / n;
            quotas.insert(class, base);
            remainders.push((exact % n, class));
            assigned += base;
        }

        remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        for (_, class) in remainders.into_iter().take(n_test.saturating_sub(assigned)) {
            if let Some(q) = quotas.get_mut(&class) {
                *q += 1;
            }
        }

        quotas
    }
}

/// Count of each class, in sorted class order
pub fn class_counts(labels: &Array1<i64>) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for &class in labels.iter() {
        *counts.entry(class).or_insert(0) += 1;
    }
    counts
}

/// Select rows of a table by index
pub fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec(
        "idx".into(),
        indices.iter().map(|&i| i as IdxSize).collect(),
    );
    Ok(df.take(&idx)?)
}

/// Select labels by index
pub fn take_labels(labels: &Array1<i64>, indices: &[usize]) -> Array1<i64> {
    labels.select(Axis(0), indices)
}
