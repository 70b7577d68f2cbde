//! Random tree generation from the candidate generator's statistics.

use std::sync::Arc;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use ttree::{Da, TTree};

use crate::asearch::PlannerError;
use crate::candgen::CandidateGenerator;

/// Produces one random tree per call for a DA.
pub trait TreeSampler {
    fn generate_tree(&mut self, da: &Da) -> Result<TTree, PlannerError>;
}

/// Grows trees by weighted random expansions until a sampled target size.
///
/// The target size is drawn from the training size histogram; each step
/// picks one allowed expansion with probability proportional to how often
/// that child was seen under its parent.
pub struct SamplingPlanner {
    candgen: Arc<CandidateGenerator>,
    rng: StdRng,
}

impl SamplingPlanner {
    pub fn new(candgen: Arc<CandidateGenerator>, rng: StdRng) -> Self {
        Self { candgen, rng }
    }

    /// Seeded for reproducible runs, otherwise seeded from the OS.
    pub fn from_seed(candgen: Arc<CandidateGenerator>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(candgen, rng)
    }
}

impl TreeSampler for SamplingPlanner {
    fn generate_tree(&mut self, da: &Da) -> Result<TTree, PlannerError> {
        let target = self.candgen.sample_tree_size(&mut self.rng);
        let mut tree = TTree::new();

        while tree.size() < target {
            let expansions = self.candgen.expansions(&tree, da);
            let weights = expansions.iter().map(|exp| exp.child.count);
            let Ok(dist) = WeightedIndex::new(weights) else {
                break;
            };
            let pick = &expansions[dist.sample(&mut self.rng)];
            tree = CandidateGenerator::apply(&tree, pick);
        }

        tracing::trace!(target, size = tree.size(), tree = %tree, "Sampled tree");
        Ok(tree)
    }
}
