//! The perceptron ranker model and its scoring.

use std::sync::Arc;

use features::{FeatureContext, FeatureExtractor, Features};
use planner::{CandidateGenerator, PlannerError, TreeScorer};
use ttree::{Da, TTree};

use crate::config::RankerConfig;
use crate::error::RankerError;
use crate::vectorize::FeaturePipeline;

/// Linear tree ranker over standardized features.
///
/// Weights, vectorizer and normalizer are fixed by training setup; only the
/// trainer changes the weights afterwards.
pub struct PerceptronRanker {
    pub(crate) config: RankerConfig,
    pub(crate) features: Features,
    pub(crate) pipeline: Option<FeaturePipeline>,
    pub(crate) w: Vec<f64>,
    pub(crate) candgen: Option<Arc<CandidateGenerator>>,
}

impl PerceptronRanker {
    /// Untrained ranker; fails on invalid settings or feature templates.
    pub fn new(config: RankerConfig) -> Result<Self, RankerError> {
        config.validate()?;
        let features = Features::new(&config.features)?;
        Ok(Self {
            config,
            features,
            pipeline: None,
            w: Vec::new(),
            candgen: None,
        })
    }

    pub fn config(&self) -> &RankerConfig {
        &self.config
    }

    /// Use an already loaded candidate generator instead of `candgen_model`.
    pub fn set_candgen(&mut self, candgen: Arc<CandidateGenerator>) {
        self.candgen = Some(candgen);
    }

    /// The candidate generator, loading `candgen_model` on first use.
    pub fn candgen(&mut self) -> Result<Option<Arc<CandidateGenerator>>, RankerError> {
        if self.candgen.is_none() {
            if let Some(path) = &self.config.candgen_model {
                self.candgen = Some(Arc::new(CandidateGenerator::load_model(path)?));
            }
        }
        Ok(self.candgen.clone())
    }

    pub fn is_trained(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn weights(&self) -> &[f64] {
        &self.w
    }

    pub fn pipeline(&self) -> Option<&FeaturePipeline> {
        self.pipeline.as_ref()
    }

    /// Weights paired with their feature names; empty before training.
    pub fn feature_weights(&self) -> Vec<(&str, f64)> {
        match &self.pipeline {
            Some(pipeline) => pipeline
                .vectorizer
                .feature_names()
                .iter()
                .map(String::as_str)
                .zip(self.w.iter().copied())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Score a candidate tree for a DA with the current weights.
    pub fn score(&self, tree: &TTree, da: &Da) -> Result<f64, RankerError> {
        let feats = self.extract_feats(tree, da)?;
        Ok(self.score_feats(&feats))
    }

    /// Normalized feature vector of a tree for a DA.
    pub fn extract_feats(&self, tree: &TTree, da: &Da) -> Result<Vec<f64>, RankerError> {
        let pipeline = self.pipeline.as_ref().ok_or(RankerError::NotTrained)?;
        let raw = self.features.get_features(tree, &FeatureContext { da });
        Ok(pipeline.transform(&raw))
    }

    /// Dot product of the weights with a normalized feature vector.
    pub fn score_feats(&self, feats: &[f64]) -> f64 {
        let score: f64 = self.w.iter().zip(feats).map(|(w, x)| w * x).sum();
        tracing::trace!(score, "Scored candidate");
        score
    }
}

impl TreeScorer for PerceptronRanker {
    fn score_tree(&self, tree: &TTree, da: &Da) -> Result<f64, PlannerError> {
        self.score(tree, da)
            .map_err(|e| PlannerError::Scorer(anyhow::Error::new(e)))
    }
}

impl std::fmt::Debug for PerceptronRanker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerceptronRanker")
            .field("config", &self.config)
            .field("dim", &self.w.len())
            .field("trained", &self.is_trained())
            .field("candgen", &self.candgen.is_some())
            .finish()
    }
}
