//! TOML config loading for the percrank CLI.
//!
//! Deserializes `configs/percrank.toml`, which has a `[ranker]` section and an
//! optional `[training]` section, then merges with CLI overrides.

use std::path::{Path, PathBuf};

use ranker::RankerConfig;
use serde::Deserialize;

/// Top-level structure matching `configs/percrank.toml`.
#[derive(Debug, Deserialize)]
pub struct PercrankToml {
    /// Ranker and rival generation parameters.
    pub ranker: RankerConfig,
    /// Run-level settings not stored with the model.
    #[serde(default)]
    pub training: TrainingSection,
}

/// Optional `[training]` settings.
#[derive(Debug, Default, Deserialize)]
pub struct TrainingSection {
    /// Fraction of the corpus to train on (default 1.0).
    pub data_portion: Option<f64>,
}

/// Training settings that can be overridden on the command line.
#[derive(Debug, Default, Clone)]
pub struct TrainOverrides {
    pub passes: Option<usize>,
    pub seed: Option<u64>,
    pub candgen_model: Option<PathBuf>,
    pub data_portion: Option<f64>,
}

/// Load and deserialize a `PercrankToml` from a TOML file.
pub fn load_percrank_toml(path: &Path) -> anyhow::Result<PercrankToml> {
    let contents = std::fs::read_to_string(path)?;
    let config: PercrankToml = toml::from_str(&contents)?;
    tracing::info!(path = %path.display(), "Loaded percrank config");
    Ok(config)
}

/// Build the ranker config and data portion for a training run.
///
/// Priority chain: `RankerConfig` defaults < TOML values < CLI flags.
pub fn build_train_config(toml: PercrankToml, cli: &TrainOverrides) -> (RankerConfig, f64) {
    let mut config = toml.ranker;
    let mut data_portion = toml.training.data_portion.unwrap_or(1.0);

    if let Some(passes) = cli.passes {
        config.passes = passes;
    }
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    if let Some(path) = &cli.candgen_model {
        config.candgen_model = Some(path.clone());
    }
    if let Some(portion) = cli.data_portion {
        data_portion = portion;
    }

    (config, data_portion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ranker::RivalStrategy;

    #[test]
    fn test_deserialize_full_percrank_toml() {
        let toml_str = r#"
[ranker]
alpha = 0.1
passes = 100
rival_number = 1
rival_gen_strategy = ["gen_cur_weights"]
rival_gen_max_iter = 100
rival_gen_max_defic_iter = 10
averaging = true
candgen_model = "model/candgen.json"

[[ranker.features]]
label = "depth"
kind = "depth"

[[ranker.features]]
label = "lemma"
kind = "presence"
attrs = ["t_lemma"]

[training]
data_portion = 0.5
"#;
        let config: PercrankToml = toml::from_str(toml_str).unwrap();
        assert!((config.ranker.alpha - 0.1).abs() < 1e-9);
        assert_eq!(config.ranker.passes, 100);
        assert_eq!(
            config.ranker.rival_gen_strategy,
            vec![RivalStrategy::GenCurWeights]
        );
        assert_eq!(config.ranker.features.len(), 2);
        assert!(config.ranker.averaging);
        assert_eq!(config.training.data_portion, Some(0.5));
    }

    #[test]
    fn test_deserialize_optional_training() {
        // training section completely missing
        let toml_str = r#"
[ranker]
passes = 3
"#;
        let config: PercrankToml = toml::from_str(toml_str).unwrap();
        assert_eq!(config.ranker.passes, 3);
        assert!(config.training.data_portion.is_none());
        // Defaults for unspecified ranker fields
        assert_eq!(config.ranker.rival_number, 10);
    }

    #[test]
    fn test_cli_override_priority() {
        let toml_str = r#"
[ranker]
passes = 3
seed = 1

[training]
data_portion = 0.5
"#;
        let load = || toml::from_str::<PercrankToml>(toml_str).unwrap();

        // TOML values win over defaults
        let (config, portion) = build_train_config(load(), &TrainOverrides::default());
        assert_eq!(config.passes, 3);
        assert_eq!(config.seed, Some(1));
        assert!((portion - 0.5).abs() < 1e-9);

        // CLI flags win over TOML
        let cli = TrainOverrides {
            passes: Some(7),
            seed: Some(9),
            candgen_model: Some(PathBuf::from("cg.json")),
            data_portion: Some(1.0),
        };
        let (config, portion) = build_train_config(load(), &cli);
        assert_eq!(config.passes, 7);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.candgen_model, Some(PathBuf::from("cg.json")));
        assert!((portion - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../configs/percrank.toml");
        let toml = load_percrank_toml(&path).unwrap();
        assert_eq!(toml.ranker.rival_gen_strategy, vec![RivalStrategy::GenCurWeights]);
        assert_eq!(toml.ranker.features.len(), 42);
        assert_eq!(
            toml.ranker.future_promise_type,
            planner::FuturePromiseType::NormExpChildren
        );
        assert_eq!(toml.ranker.future_promise_weight, 0.0);
        let (config, portion) = build_train_config(toml, &TrainOverrides::default());
        assert!((portion - 1.0).abs() < 1e-9);
        // Combine templates must reference earlier labels
        ranker::PerceptronRanker::new(config).unwrap();
    }

    #[test]
    fn test_load_percrank_toml_missing_file() {
        assert!(load_percrank_toml(Path::new("/nonexistent/percrank.toml")).is_err());
    }
}
