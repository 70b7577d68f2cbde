//! Subcommand implementations: candidate generator training, ranker
//! training, and scoring a corpus with a saved ranker.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};

use planner::CandidateGenerator;
use ranker::{Corpus, PerceptronRanker};

use crate::config::{build_train_config, load_percrank_toml, TrainOverrides};
use crate::results::{write_jsonl, write_report, PassSummary, RankRecord, TrainReport};

/// Arguments for the `train-candgen` subcommand.
#[derive(Debug)]
pub struct TrainCandgenArgs {
    pub das: PathBuf,
    pub ttrees: PathBuf,
    /// Path for the candidate generator model JSON.
    pub output: PathBuf,
    pub language: String,
    pub selector: String,
}

/// Arguments for the `train` subcommand.
#[derive(Debug)]
pub struct TrainArgs {
    /// Path to the percrank config TOML file.
    pub config: PathBuf,
    pub das: PathBuf,
    pub ttrees: PathBuf,
    /// Path for the trained ranker snapshot.
    pub output: PathBuf,
    pub overrides: TrainOverrides,
    /// Optional path for a JSON report of per-pass statistics.
    pub report: Option<PathBuf>,
}

/// Arguments for the `rank` subcommand.
#[derive(Debug)]
pub struct RankArgs {
    pub model: PathBuf,
    pub das: PathBuf,
    pub ttrees: PathBuf,
    /// JSONL output path; stdout when absent.
    pub output: Option<PathBuf>,
}

/// Collect the node inventory from a corpus and save the candidate generator.
pub fn run_train_candgen(args: TrainCandgenArgs) -> anyhow::Result<()> {
    let corpus = Corpus::load(&args.das, &args.ttrees, &args.language, &args.selector)?;
    let candgen = CandidateGenerator::train(&corpus.das, &corpus.trees)?;
    candgen.save_model(&args.output)?;
    println!(
        "Candidate generator trained on {} instances (max tree size {}), saved to {}",
        corpus.len(),
        candgen.max_tree_size(),
        args.output.display()
    );
    Ok(())
}

/// Train a perceptron ranker and save its snapshot.
pub fn run_train(args: TrainArgs) -> anyhow::Result<()> {
    let start = Instant::now();

    // 1. Config: defaults < TOML < CLI
    let toml = load_percrank_toml(&args.config)
        .with_context(|| format!("Failed to load config {}", args.config.display()))?;
    let (config, data_portion) = build_train_config(toml, &args.overrides);
    tracing::info!(
        passes = config.passes,
        alpha = config.alpha,
        strategies = ?config.rival_gen_strategy,
        "Training configuration"
    );

    // 2. Corpus
    let corpus = Corpus::load(&args.das, &args.ttrees, &config.language, &config.selector)?;

    // 3. Passes with progress bar
    let pb = ProgressBar::new(config.passes as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .expect("valid progress bar template"),
    );
    let mut ranker = PerceptronRanker::new(config)?;
    let reports = ranker.train_with(corpus, data_portion, |report| {
        pb.set_message(format!("acc {:.4}", report.accuracy));
        pb.inc(1);
    })?;
    pb.finish_with_message("done");

    // 4. Save model
    ranker.save_to_file(&args.output)?;

    let summaries: Vec<PassSummary> = reports.iter().map(PassSummary::from).collect();
    let features = ranker.pipeline().map_or(0, |p| p.dim());
    if let Some(path) = &args.report {
        write_report(
            path,
            &TrainReport {
                das: args.das.display().to_string(),
                ttrees: args.ttrees.display().to_string(),
                data_portion,
                features,
                passes: summaries.clone(),
            },
        )?;
    }

    // 5. Summary
    println!("Training complete in {:.1}s", start.elapsed().as_secs_f64());
    println!("  Features: {features}");
    if let Some(last) = summaries.last() {
        println!("  Passes:   {}", summaries.len());
        println!(
            "  Final:    accuracy {:.4}, node F1 {:.4}, dep F1 {:.4}",
            last.accuracy, last.node_f1, last.dep_f1
        );
    }
    println!("  Model:    {}", args.output.display());
    Ok(())
}

/// Score every DA/tree pair of a corpus with a saved ranker.
pub fn run_rank(args: RankArgs) -> anyhow::Result<()> {
    let ranker = PerceptronRanker::load_from_file(&args.model)?;
    let config = ranker.config();
    let corpus = Corpus::load(&args.das, &args.ttrees, &config.language, &config.selector)?;

    let records = corpus
        .das
        .iter()
        .zip(&corpus.trees)
        .enumerate()
        .map(|(index, (da, tree))| {
            Ok(RankRecord {
                index,
                da: da.to_string(),
                tree: tree.to_string(),
                score: ranker.score(tree, da)?,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    match &args.output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_jsonl(&mut std::io::BufWriter::new(file), &records)?;
            tracing::info!(count = records.len(), path = %path.display(), "Wrote scores");
        }
        None => write_jsonl(&mut std::io::stdout().lock(), &records)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use planner::mocks::restaurant_corpus;
    use std::path::Path;
    use ttree::{write_ttrees, TreeDocument};

    const OTHER_INST_TOML: &str = r#"
[ranker]
alpha = 0.1
passes = 2
rival_number = 2
rival_gen_strategy = ["other_inst"]
seed = 3

[[ranker.features]]
label = "lemma"
kind = "presence"
attrs = ["t_lemma"]

[[ranker.features]]
label = "slot"
kind = "slot_presence"

[[ranker.features]]
label = "lemma+slot"
kind = "combine"
left = "lemma"
right = "slot"
"#;

    /// Write the restaurant corpus as a DA file and a t-tree document.
    fn write_corpus(dir: &Path) -> (PathBuf, PathBuf) {
        let (das, trees) = restaurant_corpus();
        let das_path = dir.join("das.txt");
        let text: String = das.iter().map(|da| format!("{da}\n")).collect();
        std::fs::write(&das_path, text).unwrap();
        let ttrees_path = dir.join("ttrees.json");
        write_ttrees(&ttrees_path, &TreeDocument::from_trees(trees, "en", "")).unwrap();
        (das_path, ttrees_path)
    }

    fn train_args(dir: &Path, config: PathBuf, overrides: TrainOverrides) -> TrainArgs {
        let (das, ttrees) = write_corpus(dir);
        TrainArgs {
            config,
            das,
            ttrees,
            output: dir.join("ranker.json"),
            overrides,
            report: Some(dir.join("report.json")),
        }
    }

    #[test]
    fn test_train_then_rank() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = tmp.path().join("percrank.toml");
        std::fs::write(&config, OTHER_INST_TOML).unwrap();

        let args = train_args(tmp.path(), config, TrainOverrides::default());
        let (das, ttrees, model) = (args.das.clone(), args.ttrees.clone(), args.output.clone());
        run_train(args).unwrap();
        assert!(model.exists());

        let report: TrainReport =
            serde_json::from_str(&std::fs::read_to_string(tmp.path().join("report.json")).unwrap())
                .unwrap();
        assert_eq!(report.passes.len(), 2);
        assert_eq!(report.passes[0].instances, 5);
        assert!(report.features > 0);

        let scores = tmp.path().join("scores.jsonl");
        run_rank(RankArgs {
            model: model.clone(),
            das,
            ttrees,
            output: Some(scores.clone()),
        })
        .unwrap();
        let text = std::fs::read_to_string(&scores).unwrap();
        let records: Vec<RankRecord> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(records.len(), 5);
        assert_eq!(records[2].index, 2);

        // Rank output agrees with the reloaded ranker
        let (das, trees) = restaurant_corpus();
        let ranker = PerceptronRanker::load_from_file(&model).unwrap();
        assert_eq!(records[0].score, ranker.score(&trees[0], &das[0]).unwrap());
    }

    #[test]
    fn test_cli_overrides_apply() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = tmp.path().join("percrank.toml");
        std::fs::write(&config, OTHER_INST_TOML).unwrap();

        let overrides = TrainOverrides {
            passes: Some(1),
            data_portion: Some(0.4),
            ..Default::default()
        };
        run_train(train_args(tmp.path(), config, overrides)).unwrap();
        let report: TrainReport =
            serde_json::from_str(&std::fs::read_to_string(tmp.path().join("report.json")).unwrap())
                .unwrap();
        assert_eq!(report.passes.len(), 1);
        assert_eq!(report.passes[0].instances, 2);
    }

    #[test]
    fn test_candgen_then_gen_cur_weights_training() {
        let tmp = tempfile::TempDir::new().unwrap();
        let (das, ttrees) = write_corpus(tmp.path());
        let candgen = tmp.path().join("candgen.json");
        run_train_candgen(TrainCandgenArgs {
            das,
            ttrees,
            output: candgen.clone(),
            language: "en".to_string(),
            selector: String::new(),
        })
        .unwrap();
        assert!(candgen.exists());

        let toml = OTHER_INST_TOML
            .replace("[\"other_inst\"]", "[\"gen_cur_weights\"]")
            .replace("rival_number = 2", "rival_number = 1\nrival_gen_max_iter = 20");
        let config = tmp.path().join("percrank.toml");
        std::fs::write(&config, toml).unwrap();
        let overrides = TrainOverrides {
            passes: Some(1),
            candgen_model: Some(candgen),
            ..Default::default()
        };
        run_train(train_args(tmp.path(), config, overrides)).unwrap();
        assert!(tmp.path().join("ranker.json").exists());
    }

    #[test]
    fn test_gen_cur_weights_without_candgen_fails() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = tmp.path().join("percrank.toml");
        std::fs::write(
            &config,
            OTHER_INST_TOML.replace("[\"other_inst\"]", "[\"gen_cur_weights\"]"),
        )
        .unwrap();
        let err = run_train(train_args(tmp.path(), config, TrainOverrides::default()));
        assert!(err.is_err());
        assert!(!tmp.path().join("ranker.json").exists());
    }

    #[test]
    fn test_rank_missing_model() {
        let tmp = tempfile::TempDir::new().unwrap();
        let (das, ttrees) = write_corpus(tmp.path());
        let result = run_rank(RankArgs {
            model: tmp.path().join("missing.json"),
            das,
            ttrees,
            output: None,
        });
        assert!(result.is_err());
    }
}
