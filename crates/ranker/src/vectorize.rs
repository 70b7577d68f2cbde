//! Dense feature vectors: a fixed feature-name schema and per-dimension
//! standardization, both fit once on the training data.

use std::collections::BTreeMap;

use features::FeatureMap;
use serde::{Deserialize, Serialize};

/// Maps named features onto a fixed, sorted list of dimensions.
///
/// Names not seen at fit time are dropped by [`transform`](Self::transform).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DictVectorizer {
    names: Vec<String>,
}

impl DictVectorizer {
    /// Build the schema from training rows.
    ///
    /// With `min_count > 1`, names non-zero in fewer than `min_count` rows
    /// are left out; otherwise every observed name is kept.
    pub fn fit(rows: &[FeatureMap], min_count: usize) -> Self {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for row in rows {
            for (name, value) in row {
                let count = counts.entry(name.as_str()).or_default();
                if *value != 0.0 {
                    *count += 1;
                }
            }
        }
        let total = counts.len();
        let names: Vec<String> = counts
            .into_iter()
            .filter(|(_, count)| min_count <= 1 || *count >= min_count)
            .map(|(name, _)| name.to_string())
            .collect();
        if names.len() < total {
            tracing::info!(kept = names.len(), pruned = total - names.len(), "Pruned rare features");
        }
        Self { names }
    }

    pub fn fit_transform(rows: &[FeatureMap], min_count: usize) -> (Self, Vec<Vec<f64>>) {
        let vectorizer = Self::fit(rows, min_count);
        let matrix = rows.iter().map(|row| vectorizer.transform(row)).collect();
        (vectorizer, matrix)
    }

    pub fn transform(&self, feats: &FeatureMap) -> Vec<f64> {
        let mut out = vec![0.0; self.names.len()];
        for (name, value) in feats {
            if let Ok(idx) = self.names.binary_search(name) {
                out[idx] = *value;
            }
        }
        out
    }

    /// Feature names in dimension order.
    pub fn feature_names(&self) -> &[String] {
        &self.names
    }

    pub fn dim(&self) -> usize {
        self.names.len()
    }
}

/// Per-dimension standardization to zero mean and unit variance.
///
/// Dimensions with zero variance keep a scale of 1, so a constant feature
/// always maps to 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit on `rows`, each of length `dim`. An empty matrix yields the
    /// identity transform.
    pub fn fit(rows: &[Vec<f64>], dim: usize) -> Self {
        let n = rows.len() as f64;
        let mut mean = vec![0.0; dim];
        let mut scale = vec![1.0; dim];
        if rows.is_empty() {
            return Self { mean, scale };
        }

        for row in rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut var = vec![0.0; dim];
        for row in rows {
            for ((v, x), m) in var.iter_mut().zip(row).zip(&mean) {
                *v += (x - m) * (x - m);
            }
        }
        for (s, v) in scale.iter_mut().zip(&var) {
            let std = (v / n).sqrt();
            if std > 0.0 {
                *s = std;
            }
        }
        Self { mean, scale }
    }

    pub fn fit_transform(rows: Vec<Vec<f64>>, dim: usize) -> (Self, Vec<Vec<f64>>) {
        let scaler = Self::fit(&rows, dim);
        let matrix = rows.into_iter().map(|row| scaler.transform(row)).collect();
        (scaler, matrix)
    }

    pub fn transform(&self, mut row: Vec<f64>) -> Vec<f64> {
        for ((x, m), s) in row.iter_mut().zip(&self.mean).zip(&self.scale) {
            *x = (*x - m) / s;
        }
        row
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }
}

/// Vectorizer and normalizer fitted together; frozen after training setup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeaturePipeline {
    pub vectorizer: DictVectorizer,
    pub normalizer: StandardScaler,
}

impl FeaturePipeline {
    /// Fit both stages on the training rows, returning the transformed matrix.
    pub fn fit_transform(rows: &[FeatureMap], min_count: usize) -> (Self, Vec<Vec<f64>>) {
        let (vectorizer, matrix) = DictVectorizer::fit_transform(rows, min_count);
        let (normalizer, matrix) = StandardScaler::fit_transform(matrix, vectorizer.dim());
        (
            Self {
                vectorizer,
                normalizer,
            },
            matrix,
        )
    }

    pub fn transform(&self, feats: &FeatureMap) -> Vec<f64> {
        self.normalizer.transform(self.vectorizer.transform(feats))
    }

    pub fn dim(&self) -> usize {
        self.vectorizer.dim()
    }
}
