//! Saving and loading trained rankers as JSON snapshots.

use std::path::Path;

use features::Features;
use serde::{Deserialize, Serialize};

use crate::config::RankerConfig;
use crate::error::RankerError;
use crate::ranker::PerceptronRanker;
use crate::vectorize::FeaturePipeline;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Everything needed to score with a trained ranker.
///
/// Feature templates travel inside `config`; the candidate generator does
/// not, since scoring never needs it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankerSnapshot {
    pub format_version: u32,
    pub config: RankerConfig,
    pub pipeline: FeaturePipeline,
    pub weights: Vec<f64>,
}

impl PerceptronRanker {
    pub fn snapshot(&self) -> Result<RankerSnapshot, RankerError> {
        let pipeline = self.pipeline.clone().ok_or(RankerError::NotTrained)?;
        Ok(RankerSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            config: self.config.clone(),
            pipeline,
            weights: self.w.clone(),
        })
    }

    pub fn from_snapshot(snapshot: RankerSnapshot) -> Result<Self, RankerError> {
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(RankerError::SnapshotVersion {
                found: snapshot.format_version,
                expected: SNAPSHOT_FORMAT_VERSION,
            });
        }
        if snapshot.weights.len() != snapshot.pipeline.dim() {
            return Err(RankerError::Config(format!(
                "snapshot has {} weights for {} features",
                snapshot.weights.len(),
                snapshot.pipeline.dim()
            )));
        }
        let features = Features::new(&snapshot.config.features)?;
        Ok(Self {
            config: snapshot.config,
            features,
            pipeline: Some(snapshot.pipeline),
            w: snapshot.weights,
            candgen: None,
        })
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), RankerError> {
        tracing::info!(path = %path.display(), "Saving ranker");
        let snapshot = self.snapshot()?;
        let file = std::fs::File::create(path).map_err(|source| RankerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::to_writer(std::io::BufWriter::new(file), &snapshot).map_err(|source| {
            RankerError::Snapshot {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    pub fn load_from_file(path: &Path) -> Result<Self, RankerError> {
        tracing::info!(path = %path.display(), "Loading ranker");
        let file = std::fs::File::open(path).map_err(|source| RankerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: RankerSnapshot = serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|source| RankerError::Snapshot {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_snapshot(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use features::FeatureMap;

    fn trained() -> PerceptronRanker {
        let mut ranker = PerceptronRanker::new(RankerConfig::default()).unwrap();
        let rows = vec![
            FeatureMap::from([("bias".to_string(), 1.0), ("depth".to_string(), 1.0)]),
            FeatureMap::from([("bias".to_string(), 1.0), ("depth".to_string(), 3.0)]),
        ];
        let (pipeline, _) = FeaturePipeline::fit_transform(&rows, 1);
        ranker.w = vec![0.1, -0.7];
        ranker.pipeline = Some(pipeline);
        ranker
    }

    #[test]
    fn test_untrained_cannot_be_saved() {
        let tmp = tempfile::TempDir::new().unwrap();
        let ranker = PerceptronRanker::new(RankerConfig::default()).unwrap();
        let err = ranker.save_to_file(&tmp.path().join("r.json")).unwrap_err();
        assert!(matches!(err, RankerError::NotTrained));
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("ranker.json");
        let ranker = trained();
        ranker.save_to_file(&path).unwrap();
        let loaded = PerceptronRanker::load_from_file(&path).unwrap();
        assert_eq!(loaded.weights(), ranker.weights());
        assert_eq!(loaded.snapshot().unwrap(), ranker.snapshot().unwrap());
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut snapshot = trained().snapshot().unwrap();
        snapshot.format_version = 99;
        let err = PerceptronRanker::from_snapshot(snapshot).unwrap_err();
        assert!(matches!(
            err,
            RankerError::SnapshotVersion {
                found: 99,
                expected: 1
            }
        ));
    }

    #[test]
    fn test_weight_count_checked() {
        let mut snapshot = trained().snapshot().unwrap();
        snapshot.weights.push(1.0);
        assert!(PerceptronRanker::from_snapshot(snapshot).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = PerceptronRanker::load_from_file(Path::new("/nonexistent/ranker.json")).unwrap_err();
        assert!(matches!(err, RankerError::Io { .. }));
    }
}
