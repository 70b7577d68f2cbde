//! Structured-perceptron reranker for t-trees.
//!
//! A [`PerceptronRanker`] scores `(tree, DA)` pairs with a linear model over
//! standardized features. Training compares each gold tree with rival
//! candidates from a [`RivalGenerator`] and applies the perceptron update
//! whenever a rival outscores the gold. One rival strategy searches the
//! candidate space with the ranker's own current weights, so the ranker
//! also implements [`planner::TreeScorer`].
//!
//! # Modules
//!
//! - [`config`]: `RankerConfig` with serde defaults and validation
//! - [`vectorize`]: feature-name schema and per-dimension standardization
//! - [`ranker`]: the model and its scoring
//! - [`trainer`]: corpus loading, training passes, per-pass reports
//! - [`rivals`]: `other_inst`, `random` and `gen_cur_weights` rival generation
//! - [`eval`] / [`lists`]: per-pass diagnostics
//! - [`persist`]: JSON snapshots of a trained model

pub mod config;
pub mod error;
pub mod eval;
pub mod lists;
pub mod persist;
pub mod ranker;
pub mod rivals;
pub mod trainer;
pub mod vectorize;

pub use config::{RankerConfig, RivalStrategy};
pub use error::RankerError;
pub use eval::{EvalType, Evaluator, Prf};
pub use lists::{ListStats, ListsAnalyzer};
pub use persist::RankerSnapshot;
pub use ranker::PerceptronRanker;
pub use rivals::{RivalBackend, RivalGenerator, Rivals};
pub use trainer::{perceptron_update, Corpus, InstanceOutcome, PassReport, TrainingData, TrainingState};
pub use vectorize::{DictVectorizer, FeaturePipeline, StandardScaler};
