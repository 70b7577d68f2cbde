//! Ranker configuration loaded from TOML.

use std::path::PathBuf;

use features::FeatureTemplate;
use planner::FuturePromiseType;
use serde::{Deserialize, Serialize};

use crate::error::RankerError;

/// How rival (negative) candidates are produced during training.
///
/// Enabled strategies always run in declaration order, whatever order the
/// configuration lists them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RivalStrategy {
    /// Gold trees of other training instances, scored against the current DA.
    OtherInst,
    /// Trees drawn from the sampling planner.
    Random,
    /// Closed-list trees from an A* search guided by the current weights.
    GenCurWeights,
}

/// Perceptron ranker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankerConfig {
    /// Perceptron learning rate.
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Number of passes over the training data.
    #[serde(default = "default_passes")]
    pub passes: usize,

    /// Rivals per strategy per instance.
    #[serde(default = "default_rival_number")]
    pub rival_number: usize,

    /// Language of the t-tree zone to read.
    #[serde(default = "default_language")]
    pub language: String,

    /// Selector of the t-tree zone to read.
    #[serde(default)]
    pub selector: String,

    #[serde(default = "default_rival_gen_strategy")]
    pub rival_gen_strategy: Vec<RivalStrategy>,

    /// A* iteration cap for `gen_cur_weights`.
    #[serde(default = "default_rival_gen_max_iter")]
    pub rival_gen_max_iter: usize,

    /// A* cap on consecutive iterations without improvement.
    #[serde(default = "default_rival_gen_max_defic_iter")]
    pub rival_gen_max_defic_iter: usize,

    /// A* open-list beam; unbounded when absent.
    #[serde(default)]
    pub rival_gen_beam_size: Option<usize>,

    /// Weight of the future-promise term in A* priorities; 0 disables it.
    #[serde(default)]
    pub future_promise_weight: f64,

    #[serde(default)]
    pub future_promise_type: FuturePromiseType,

    /// Candidate generator model, required by `random` and `gen_cur_weights`.
    #[serde(default)]
    pub candgen_model: Option<PathBuf>,

    /// Feature templates; a `bias` template is added automatically.
    #[serde(default)]
    pub features: Vec<FeatureTemplate>,

    /// Replace the final weights by their average over all training steps.
    #[serde(default)]
    pub averaging: bool,

    /// Drop features active in fewer training instances than this.
    #[serde(default = "default_prune_feats")]
    pub prune_feats: usize,

    /// Consecutive gold duplicates tolerated per `random` rival.
    #[serde(default = "default_random_max_attempts")]
    pub random_max_attempts: usize,

    /// RNG seed for rival sampling; entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_alpha() -> f64 {
    1.0
}
fn default_passes() -> usize {
    5
}
fn default_rival_number() -> usize {
    10
}
fn default_language() -> String {
    "en".to_string()
}
fn default_rival_gen_strategy() -> Vec<RivalStrategy> {
    vec![RivalStrategy::OtherInst]
}
fn default_rival_gen_max_iter() -> usize {
    50
}
fn default_rival_gen_max_defic_iter() -> usize {
    3
}
fn default_prune_feats() -> usize {
    1
}
fn default_random_max_attempts() -> usize {
    100
}

impl RankerConfig {
    pub fn uses(&self, strategy: RivalStrategy) -> bool {
        self.rival_gen_strategy.contains(&strategy)
    }

    /// Reject settings training cannot start with.
    ///
    /// Whether a candidate generator is actually available is checked when
    /// rival generation is set up.
    pub fn validate(&self) -> Result<(), RankerError> {
        if !self.alpha.is_finite() {
            return Err(RankerError::Config(format!(
                "alpha must be finite, got {}",
                self.alpha
            )));
        }
        if !self.rival_gen_strategy.is_empty() && self.rival_number == 0 {
            return Err(RankerError::Config(
                "rival_number must be positive when rival strategies are enabled".to_string(),
            ));
        }
        if self.uses(RivalStrategy::Random) && self.random_max_attempts == 0 {
            return Err(RankerError::Config(
                "random_max_attempts must be positive for the random strategy".to_string(),
            ));
        }
        if self.uses(RivalStrategy::GenCurWeights)
            && (self.rival_gen_max_iter == 0 || self.rival_gen_max_defic_iter == 0)
        {
            return Err(RankerError::Config(format!(
                "gen_cur_weights needs positive search limits, got rival_gen_max_iter = {} and rival_gen_max_defic_iter = {}",
                self.rival_gen_max_iter, self.rival_gen_max_defic_iter
            )));
        }
        if !self.future_promise_weight.is_finite() {
            return Err(RankerError::Config(format!(
                "future_promise_weight must be finite, got {}",
                self.future_promise_weight
            )));
        }
        if self.rival_gen_beam_size == Some(0) {
            return Err(RankerError::Config(
                "rival_gen_beam_size must be positive when set".to_string(),
            ));
        }
        if self.rival_gen_strategy.is_empty() {
            tracing::warn!("No rival strategy enabled; training will never update weights");
        }
        if self.alpha <= 0.0 {
            tracing::warn!(alpha = self.alpha, "Non-positive learning rate");
        }
        Ok(())
    }
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            passes: default_passes(),
            rival_number: default_rival_number(),
            language: default_language(),
            selector: String::new(),
            rival_gen_strategy: default_rival_gen_strategy(),
            rival_gen_max_iter: default_rival_gen_max_iter(),
            rival_gen_max_defic_iter: default_rival_gen_max_defic_iter(),
            rival_gen_beam_size: None,
            future_promise_weight: 0.0,
            future_promise_type: FuturePromiseType::default(),
            candgen_model: None,
            features: Vec::new(),
            averaging: false,
            prune_feats: default_prune_feats(),
            random_max_attempts: default_random_max_attempts(),
            seed: None,
        }
    }
}
