//! Rival (negative) candidate generation for perceptron training.

use std::sync::Arc;

use planner::{ASearchPlanner, CandidateGenerator, SamplingPlanner, TreeSampler, TreeSearch};
use rand::rngs::StdRng;
use rand::SeedableRng;
use ttree::TTree;

use crate::config::{RankerConfig, RivalStrategy};
use crate::error::RankerError;
use crate::lists::ListsAnalyzer;
use crate::ranker::PerceptronRanker;
use crate::trainer::TrainingData;

/// One configured rival strategy with everything it needs to run.
pub enum RivalBackend {
    OtherInst,
    Random {
        sampler: Box<dyn TreeSampler>,
        /// Consecutive gold duplicates tolerated per rival.
        max_attempts: usize,
    },
    GenCurWeights {
        search: Box<dyn TreeSearch>,
        max_iter: usize,
        max_defic_iter: usize,
        beam_size: Option<usize>,
    },
}

impl RivalBackend {
    pub fn strategy(&self) -> RivalStrategy {
        match self {
            Self::OtherInst => RivalStrategy::OtherInst,
            Self::Random { .. } => RivalStrategy::Random,
            Self::GenCurWeights { .. } => RivalStrategy::GenCurWeights,
        }
    }
}

/// Rival trees for one instance with their normalized features, aligned.
#[derive(Debug, Clone, Default)]
pub struct Rivals {
    pub trees: Vec<TTree>,
    pub feats: Vec<Vec<f64>>,
}

impl Rivals {
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

/// Runs the enabled strategies in fixed order and concatenates their rivals.
///
/// `rival_number` caps each strategy separately.
pub struct RivalGenerator {
    backends: Vec<RivalBackend>,
    rival_number: usize,
    rng: StdRng,
    warned_small_corpus: bool,
}

impl RivalGenerator {
    pub fn new(mut backends: Vec<RivalBackend>, rival_number: usize, rng: StdRng) -> Self {
        backends.sort_by_key(RivalBackend::strategy);
        backends.dedup_by_key(|b| b.strategy());
        Self {
            backends,
            rival_number,
            rng,
            warned_small_corpus: false,
        }
    }

    /// Backends for every strategy the config enables.
    ///
    /// `random` and `gen_cur_weights` need a candidate generator; asking for
    /// them without one is a configuration error.
    pub fn from_config(
        config: &RankerConfig,
        candgen: Option<Arc<CandidateGenerator>>,
    ) -> Result<Self, RankerError> {
        let require = |strategy: RivalStrategy| {
            candgen.clone().ok_or_else(|| {
                RankerError::Config(format!(
                    "rival strategy {strategy:?} needs a candidate generator model (candgen_model)"
                ))
            })
        };

        let mut backends = Vec::new();
        if config.uses(RivalStrategy::OtherInst) {
            backends.push(RivalBackend::OtherInst);
        }
        if config.uses(RivalStrategy::Random) {
            let candgen = require(RivalStrategy::Random)?;
            let sampler = SamplingPlanner::from_seed(candgen, config.seed.map(|s| s.wrapping_add(1)));
            backends.push(RivalBackend::Random {
                sampler: Box::new(sampler),
                max_attempts: config.random_max_attempts,
            });
        }
        if config.uses(RivalStrategy::GenCurWeights) {
            let candgen = require(RivalStrategy::GenCurWeights)?;
            backends.push(RivalBackend::GenCurWeights {
                search: Box::new(ASearchPlanner::new(candgen).with_future_promise(
                    config.future_promise_weight,
                    config.future_promise_type,
                )),
                max_iter: config.rival_gen_max_iter,
                max_defic_iter: config.rival_gen_max_defic_iter,
                beam_size: config.rival_gen_beam_size,
            });
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        tracing::info!(
            strategies = ?backends.iter().map(RivalBackend::strategy).collect::<Vec<_>>(),
            rival_number = config.rival_number,
            "Rival generation ready"
        );
        Ok(Self::new(backends, config.rival_number, rng))
    }

    pub fn strategies(&self) -> Vec<RivalStrategy> {
        self.backends.iter().map(RivalBackend::strategy).collect()
    }

    /// Rivals for instance `idx`, featurized against that instance's DA.
    ///
    /// `gen_cur_weights` searches with `ranker`'s current weights and logs
    /// every run's lists to `lists`.
    pub fn generate(
        &mut self,
        idx: usize,
        data: &TrainingData,
        ranker: &PerceptronRanker,
        lists: &mut ListsAnalyzer,
    ) -> Result<Rivals, RankerError> {
        let da = &data.das[idx];
        let gold = &data.trees[idx];
        let mut rivals = Rivals::default();

        for backend in &mut self.backends {
            let trees: Vec<TTree> = match backend {
                RivalBackend::OtherInst => {
                    let n = data.len();
                    if n < 2 {
                        tracing::debug!(instances = n, "Too few instances for other_inst rivals");
                        continue;
                    }
                    let k = self.rival_number.min(n - 1);
                    if k < self.rival_number && !self.warned_small_corpus {
                        tracing::warn!(
                            instances = n,
                            rival_number = self.rival_number,
                            "Corpus smaller than rival_number + 1; other_inst capped at {k} rivals"
                        );
                        self.warned_small_corpus = true;
                    }
                    rand::seq::index::sample(&mut self.rng, n - 1, k)
                        .into_iter()
                        .map(|j| if j == idx { n - 1 } else { j })
                        .map(|j| data.trees[j].clone())
                        .collect()
                }
                RivalBackend::Random {
                    sampler,
                    max_attempts,
                } => {
                    let mut out = Vec::with_capacity(self.rival_number);
                    'rivals: while out.len() < self.rival_number {
                        let mut duplicates = 0;
                        loop {
                            let tree = sampler.generate_tree(da)?;
                            if tree != *gold {
                                out.push(tree);
                                break;
                            }
                            duplicates += 1;
                            if duplicates >= *max_attempts {
                                tracing::warn!(
                                    instance = idx,
                                    attempts = duplicates,
                                    found = out.len(),
                                    "Sampling planner keeps producing the gold tree; stopping random rivals"
                                );
                                break 'rivals;
                            }
                        }
                    }
                    out
                }
                RivalBackend::GenCurWeights {
                    search,
                    max_iter,
                    max_defic_iter,
                    beam_size,
                } => {
                    let result = search.run(da, ranker, *max_iter, *max_defic_iter, *beam_size)?;
                    lists.append(gold, &result);
                    let mut closed = result.closed;
                    let mut out = Vec::with_capacity(self.rival_number);
                    while out.len() < self.rival_number {
                        let Some((tree, _)) = closed.pop() else {
                            break;
                        };
                        if tree != *gold {
                            out.push(tree);
                        }
                    }
                    out
                }
            };

            for tree in trees {
                rivals.feats.push(ranker.extract_feats(&tree, da)?);
                rivals.trees.push(tree);
            }
        }

        tracing::debug!(instance = idx, rivals = rivals.len(), "Generated rivals");
        Ok(rivals)
    }
}
