//! Perceptron training: corpus loading, setup, passes and per-pass reports.

use std::path::Path;
use std::time::{Duration, Instant};

use features::{FeatureContext, FeatureExtractor, FeatureMap};
use ttree::{read_das, read_ttrees, sentences_from_doc, trees_from_doc, CorpusError, Da, TTree};

use crate::error::RankerError;
use crate::eval::{EvalType, Evaluator, Prf};
use crate::lists::{ListStats, ListsAnalyzer};
use crate::ranker::PerceptronRanker;
use crate::rivals::RivalGenerator;
use crate::vectorize::FeaturePipeline;

/// DA/tree pairs aligned by index, with the reference sentences if the
/// tree document has them.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub das: Vec<Da>,
    pub trees: Vec<TTree>,
    pub sentences: Vec<String>,
}

impl Corpus {
    /// Fails if the two lists differ in length.
    pub fn new(das: Vec<Da>, trees: Vec<TTree>) -> Result<Self, RankerError> {
        let sentences = vec![String::new(); trees.len()];
        Self::with_sentences(das, trees, sentences)
    }

    pub fn with_sentences(
        das: Vec<Da>,
        trees: Vec<TTree>,
        mut sentences: Vec<String>,
    ) -> Result<Self, RankerError> {
        if das.len() != trees.len() {
            return Err(CorpusError::Misaligned {
                das: das.len(),
                trees: trees.len(),
            }
            .into());
        }
        sentences.resize(trees.len(), String::new());
        Ok(Self {
            das,
            trees,
            sentences,
        })
    }

    /// Read a DA file and the `language`/`selector` zone of a t-tree file.
    pub fn load(
        das_path: &Path,
        ttree_path: &Path,
        language: &str,
        selector: &str,
    ) -> Result<Self, RankerError> {
        tracing::info!(path = %das_path.display(), "Reading DAs");
        let das = read_das(das_path)?;
        tracing::info!(path = %ttree_path.display(), "Reading t-trees");
        let doc = read_ttrees(ttree_path)?;
        let trees = trees_from_doc(&doc, language, selector)?;
        let sentences = sentences_from_doc(&doc, language, selector)?;
        Self::with_sentences(das, trees, sentences)
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    fn truncate(&mut self, len: usize) {
        self.das.truncate(len);
        self.trees.truncate(len);
        self.sentences.truncate(len);
    }
}

/// The training set in use, with gold features fixed at setup.
#[derive(Debug, Clone, Default)]
pub struct TrainingData {
    pub das: Vec<Da>,
    pub trees: Vec<TTree>,
    pub sentences: Vec<String>,
    /// Normalized gold feature vectors.
    pub feats: Vec<Vec<f64>>,
}

impl TrainingData {
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

/// Everything a training run needs besides the model itself.
pub struct TrainingState {
    pub data: TrainingData,
    pub rivals: RivalGenerator,
    pub evaluator: Evaluator,
    pub lists: ListsAnalyzer,
    /// Running sum of the weights after every instance, for averaging.
    weight_sum: Vec<f64>,
    steps: usize,
}

/// What happened on one training instance.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceOutcome {
    pub index: usize,
    /// Position of the best candidate; 0 is the gold tree.
    pub top_cand_idx: usize,
    pub rivals: usize,
    pub scores: Vec<f64>,
    pub updated: bool,
}

/// Diagnostics for one pass over the training data.
#[derive(Debug, Clone)]
pub struct PassReport {
    pub pass: usize,
    pub instances: usize,
    pub errors: usize,
    /// `1 - errors / instances`; 1 on an empty training set.
    pub accuracy: f64,
    pub node: Prf,
    pub dep: Prf,
    pub lists: ListStats,
    pub duration: Duration,
}

/// First index of the highest score, so ties favour the gold tree.
fn argmax_first(scores: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, score) in scores.iter().enumerate() {
        match best {
            Some(b) if scores[b] >= *score => {}
            _ => best = Some(i),
        }
    }
    best
}

/// `w += alpha * gold - alpha * rival`, elementwise.
pub fn perceptron_update(w: &mut [f64], gold: &[f64], rival: &[f64], alpha: f64) {
    for ((w, g), r) in w.iter_mut().zip(gold).zip(rival) {
        *w += alpha * g - alpha * r;
    }
}

impl PerceptronRanker {
    /// Train on a DA file and a t-tree file, using the first
    /// `round(data_portion * N)` instances.
    pub fn train(
        &mut self,
        das_path: &Path,
        ttree_path: &Path,
        data_portion: f64,
    ) -> Result<Vec<PassReport>, RankerError> {
        let corpus = Corpus::load(
            das_path,
            ttree_path,
            &self.config.language,
            &self.config.selector,
        )?;
        self.train_corpus(corpus, data_portion)
    }

    pub fn train_corpus(
        &mut self,
        corpus: Corpus,
        data_portion: f64,
    ) -> Result<Vec<PassReport>, RankerError> {
        self.train_with(corpus, data_portion, |_| {})
    }

    /// Like [`train_corpus`](Self::train_corpus), calling `on_pass` after
    /// every pass.
    pub fn train_with<F: FnMut(&PassReport)>(
        &mut self,
        corpus: Corpus,
        data_portion: f64,
        on_pass: F,
    ) -> Result<Vec<PassReport>, RankerError> {
        let state = self.init_training(corpus, data_portion)?;
        self.run_training(state, on_pass)
    }

    /// Set up rival generation from the config, then fit the feature
    /// pipeline and reset the weights.
    pub fn init_training(
        &mut self,
        corpus: Corpus,
        data_portion: f64,
    ) -> Result<TrainingState, RankerError> {
        let candgen = self.candgen()?;
        let rivals = RivalGenerator::from_config(&self.config, candgen)?;
        self.init_training_with(corpus, data_portion, rivals)
    }

    /// [`init_training`](Self::init_training) with a caller-built rival generator.
    pub fn init_training_with(
        &mut self,
        mut corpus: Corpus,
        data_portion: f64,
        rivals: RivalGenerator,
    ) -> Result<TrainingState, RankerError> {
        if !(0.0..=1.0).contains(&data_portion) {
            return Err(RankerError::Config(format!(
                "data_portion must be within [0, 1], got {data_portion}"
            )));
        }
        let total = corpus.len();
        let train_size = (data_portion * total as f64).round() as usize;
        corpus.truncate(train_size);
        tracing::info!(instances = train_size, total, "Using training instances");

        let raw: Vec<FeatureMap> = corpus
            .das
            .iter()
            .zip(&corpus.trees)
            .map(|(da, tree)| self.features.get_features(tree, &FeatureContext { da }))
            .collect();
        let (pipeline, feats) = FeaturePipeline::fit_transform(&raw, self.config.prune_feats);
        tracing::info!(features = pipeline.dim(), "Fitted feature pipeline");

        self.w = vec![1.0; pipeline.dim()];
        self.pipeline = Some(pipeline);

        tracing::info!("Training ...");
        Ok(TrainingState {
            data: TrainingData {
                das: corpus.das,
                trees: corpus.trees,
                sentences: corpus.sentences,
                feats,
            },
            rivals,
            evaluator: Evaluator::new(),
            lists: ListsAnalyzer::new(),
            weight_sum: vec![0.0; self.w.len()],
            steps: 0,
        })
    }

    /// Run all configured passes, then average the weights if enabled.
    pub fn run_training<F: FnMut(&PassReport)>(
        &mut self,
        mut state: TrainingState,
        mut on_pass: F,
    ) -> Result<Vec<PassReport>, RankerError> {
        let mut reports = Vec::with_capacity(self.config.passes);
        for pass in 1..=self.config.passes {
            let report = self.training_iter(&mut state, pass)?;
            on_pass(&report);
            reports.push(report);
        }

        if self.config.averaging && state.steps > 0 {
            let steps = state.steps as f64;
            self.w = state.weight_sum.iter().map(|s| s / steps).collect();
            tracing::info!(steps = state.steps, "Averaged weights");
        }
        Ok(reports)
    }

    /// One pass over the training data in fixed order.
    pub fn training_iter(
        &mut self,
        state: &mut TrainingState,
        pass: usize,
    ) -> Result<PassReport, RankerError> {
        let start = Instant::now();
        state.evaluator.reset();
        state.lists.reset();

        let mut errors = 0;
        for idx in 0..state.data.len() {
            let outcome = self.training_step(state, idx)?;
            if outcome.updated {
                errors += 1;
            }
        }

        let instances = state.data.len();
        let accuracy = if instances == 0 {
            1.0
        } else {
            1.0 - errors as f64 / instances as f64
        };
        let report = PassReport {
            pass,
            instances,
            errors,
            accuracy,
            node: state.evaluator.p_r_f1(EvalType::Node),
            dep: state.evaluator.p_r_f1(EvalType::Dep),
            lists: state.lists.stats(),
            duration: start.elapsed(),
        };

        tracing::info!(
            pass,
            errors,
            instances,
            "Iteration {pass:05} -- tree-level accuracy: {accuracy:.4}"
        );
        tracing::info!(" * Generated trees NODE scores: {}", report.node);
        tracing::info!(" * Generated trees DEP  scores: {}", report.dep);
        tracing::info!(" * Gold tree {}", report.lists);
        tracing::info!(duration = ?report.duration, " * Pass finished");
        Ok(report)
    }

    /// Score the gold tree against its rivals and update on a mistake.
    pub fn training_step(
        &mut self,
        state: &mut TrainingState,
        idx: usize,
    ) -> Result<InstanceOutcome, RankerError> {
        let rivals = state
            .rivals
            .generate(idx, &state.data, self, &mut state.lists)?;
        let gold_feats = &state.data.feats[idx];

        let scores: Vec<f64> = std::iter::once(gold_feats)
            .chain(&rivals.feats)
            .map(|feats| self.score_feats(feats))
            .collect();
        let top_cand_idx = argmax_first(&scores).unwrap_or(0);

        if let Some(best_rival) = argmax_first(&scores[1..]) {
            state
                .evaluator
                .append(&state.data.trees[idx], &rivals.trees[best_rival]);
        }

        tracing::debug!(
            instance = idx,
            selected = top_cand_idx,
            candidates = scores.len(),
            sentence = %state.data.sentences[idx],
            "Scored candidates"
        );
        for (tree, score) in std::iter::once(&state.data.trees[idx]).chain(&rivals.trees).zip(&scores) {
            tracing::trace!("{score:.3}\t{tree}");
        }

        let updated = top_cand_idx != 0;
        if updated {
            perceptron_update(
                &mut self.w,
                gold_feats,
                &rivals.feats[top_cand_idx - 1],
                self.config.alpha,
            );
            tracing::debug!(instance = idx, "Updated weights");
        }

        if self.config.averaging {
            for (sum, w) in state.weight_sum.iter_mut().zip(&self.w) {
                *sum += w;
            }
        }
        state.steps += 1;

        Ok(InstanceOutcome {
            index: idx,
            top_cand_idx,
            rivals: rivals.len(),
            scores,
            updated,
        })
    }
}
