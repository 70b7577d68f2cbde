use std::path::PathBuf;

use features::FeatureError;
use planner::PlannerError;
use ttree::CorpusError;

/// Errors that can occur while configuring, training or persisting a ranker.
#[derive(Debug, thiserror::Error)]
pub enum RankerError {
    /// Setup cannot proceed with the given configuration.
    #[error("Invalid ranker configuration: {0}")]
    Config(String),
    /// Training data could not be loaded or does not line up.
    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),
    /// Feature templates are malformed.
    #[error("Feature error: {0}")]
    Feature(#[from] FeatureError),
    /// Candidate generation or search failed.
    #[error("Planner error: {0}")]
    Planner(#[from] PlannerError),
    /// Scoring needs a fitted vectorizer and normalizer.
    #[error("Ranker has not been trained")]
    NotTrained,
    /// A snapshot file could not be opened or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A snapshot file could not be (de)serialized.
    #[error("Invalid ranker snapshot {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// A snapshot was written by an incompatible version.
    #[error("Unsupported snapshot format version {found} (expected {expected})")]
    SnapshotVersion { found: u32, expected: u32 },
}
