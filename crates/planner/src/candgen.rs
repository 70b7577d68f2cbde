//! Candidate generator model: which children a node may take, learned from
//! a training corpus and restricted by the input DA.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use ttree::{Da, NodeData, TTree};

use crate::asearch::PlannerError;

/// A child observed under some parent, with the side it was attached on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildType {
    pub node: NodeData,
    pub right: bool,
    /// How many times this child was seen under the parent.
    pub count: usize,
}

/// How the A* planner estimates what a partial tree may still gain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuturePromiseType {
    /// Expected children not attached yet, summed over all nodes.
    #[default]
    ExpChildren,
    /// `exp_children` divided by the number of nodes, root included.
    NormExpChildren,
    /// Nodes missing to reach the mean training tree size.
    NumNodes,
}

/// One possible single-node expansion of a tree.
#[derive(Debug, Clone, Copy)]
pub struct Expansion<'a> {
    /// Arena index of the node receiving the child.
    pub parent: usize,
    pub child: &'a ChildType,
}

/// Corpus statistics used to propose tree expansions.
///
/// Keys are `NodeData::key()` strings (`t_lemma/formeme`) and
/// `Dai::slot_key()` strings (`inform(food)`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateGenerator {
    /// Child types observed under each parent.
    child_types: BTreeMap<String, Vec<ChildType>>,
    /// Most children ever attached to a node with this key.
    max_children: BTreeMap<String, usize>,
    /// Mean number of children of a node with this key.
    #[serde(default)]
    exp_children: BTreeMap<String, f64>,
    /// Node keys seen in trees whose DA contained the item.
    dai_nodes: BTreeMap<String, BTreeSet<String>>,
    /// Histogram of tree sizes (real nodes).
    tree_sizes: BTreeMap<usize, usize>,
    /// Largest tree seen.
    max_tree_size: usize,
}

impl CandidateGenerator {
    /// Learn expansion statistics from DA/tree pairs aligned by index.
    pub fn train(das: &[Da], trees: &[TTree]) -> Result<Self, PlannerError> {
        if das.len() != trees.len() {
            return Err(PlannerError::Misaligned {
                das: das.len(),
                trees: trees.len(),
            });
        }

        let mut model = Self::default();
        let mut child_totals: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        for (da, tree) in das.iter().zip(trees) {
            for idx in 0..tree.len() {
                let parent_key = tree.node(idx).key();
                let children = tree.children(idx);
                let totals = child_totals.entry(parent_key.clone()).or_default();
                totals.0 += children.len();
                totals.1 += 1;
                let seen = model.max_children.entry(parent_key.clone()).or_default();
                *seen = (*seen).max(children.len());

                let types = model.child_types.entry(parent_key).or_default();
                for child in children {
                    let node = tree.node(child);
                    let right = child > idx;
                    match types.iter_mut().find(|t| &t.node == node && t.right == right) {
                        Some(t) => t.count += 1,
                        None => types.push(ChildType {
                            node: node.clone(),
                            right,
                            count: 1,
                        }),
                    }
                }
            }

            for dai in da.iter() {
                let nodes = model.dai_nodes.entry(dai.slot_key()).or_default();
                nodes.extend(tree.nodes()[1..].iter().map(NodeData::key));
            }

            *model.tree_sizes.entry(tree.size()).or_default() += 1;
            model.max_tree_size = model.max_tree_size.max(tree.size());
        }

        model.exp_children = child_totals
            .into_iter()
            .map(|(key, (children, seen))| (key, children as f64 / seen as f64))
            .collect();

        tracing::info!(
            parents = model.child_types.len(),
            dais = model.dai_nodes.len(),
            max_tree_size = model.max_tree_size,
            "Trained candidate generator"
        );
        Ok(model)
    }

    /// Load a model saved with [`save_model`](Self::save_model).
    pub fn load_model(path: &Path) -> Result<Self, PlannerError> {
        let file = std::fs::File::open(path).map_err(|source| PlannerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model: Self = serde_json::from_reader(std::io::BufReader::new(file)).map_err(
            |source| PlannerError::Model {
                path: path.to_path_buf(),
                source,
            },
        )?;
        tracing::info!(path = %path.display(), "Loaded candidate generator");
        Ok(model)
    }

    pub fn save_model(&self, path: &Path) -> Result<(), PlannerError> {
        let file = std::fs::File::create(path).map_err(|source| PlannerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::to_writer(std::io::BufWriter::new(file), self).map_err(|source| {
            PlannerError::Model {
                path: path.to_path_buf(),
                source,
            }
        })?;
        tracing::info!(path = %path.display(), "Saved candidate generator");
        Ok(())
    }

    pub fn max_tree_size(&self) -> usize {
        self.max_tree_size
    }

    /// Node keys compatible with at least one item of `da`.
    pub fn allowed_nodes(&self, da: &Da) -> HashSet<&str> {
        da.iter()
            .filter_map(|dai| self.dai_nodes.get(&dai.slot_key()))
            .flatten()
            .map(String::as_str)
            .collect()
    }

    /// Every single-node expansion of `tree` allowed for `da`.
    pub fn expansions(&self, tree: &TTree, da: &Da) -> Vec<Expansion<'_>> {
        if tree.size() >= self.max_tree_size {
            return Vec::new();
        }
        let allowed = self.allowed_nodes(da);
        let mut out = Vec::new();
        for idx in 0..tree.len() {
            let key = tree.node(idx).key();
            let limit = self.max_children.get(&key).copied().unwrap_or(0);
            if tree.children(idx).len() >= limit {
                continue;
            }
            let Some(types) = self.child_types.get(&key) else {
                continue;
            };
            out.extend(
                types
                    .iter()
                    .filter(|t| allowed.contains(t.node.key().as_str()))
                    .map(|child| Expansion { parent: idx, child }),
            );
        }
        out
    }

    /// Copy of `tree` with the expansion applied.
    pub fn apply(tree: &TTree, expansion: &Expansion<'_>) -> TTree {
        let mut next = tree.clone();
        next.create_child(expansion.parent, expansion.child.right, expansion.child.node.clone());
        next
    }

    /// All trees one expansion away from `tree`.
    pub fn successors(&self, tree: &TTree, da: &Da) -> Vec<TTree> {
        self.expansions(tree, da)
            .iter()
            .map(|exp| Self::apply(tree, exp))
            .collect()
    }

    /// Mean real-node count of the training trees; 0 for an empty model.
    pub fn mean_tree_size(&self) -> f64 {
        let trees: usize = self.tree_sizes.values().sum();
        if trees == 0 {
            return 0.0;
        }
        let nodes: usize = self.tree_sizes.iter().map(|(size, count)| size * count).sum();
        nodes as f64 / trees as f64
    }

    /// Estimated growth still ahead of `tree`, never negative. Unseen node
    /// keys are expected to take no children.
    pub fn future_promise(&self, tree: &TTree, kind: FuturePromiseType) -> f64 {
        let missing_children = || -> f64 {
            (0..tree.len())
                .map(|idx| {
                    let expected = self.exp_children.get(&tree.node(idx).key()).copied().unwrap_or(0.0);
                    (expected - tree.children(idx).len() as f64).max(0.0)
                })
                .sum()
        };
        match kind {
            FuturePromiseType::ExpChildren => missing_children(),
            FuturePromiseType::NormExpChildren => missing_children() / tree.len().max(1) as f64,
            FuturePromiseType::NumNodes => (self.mean_tree_size() - tree.size() as f64).max(0.0),
        }
    }

    /// Draw a target tree size from the training histogram; 0 for an empty model.
    pub fn sample_tree_size(&self, rng: &mut impl Rng) -> usize {
        let sizes: Vec<_> = self.tree_sizes.iter().collect();
        match WeightedIndex::new(sizes.iter().map(|(_, count)| **count)) {
            Ok(dist) => *sizes[dist.sample(rng)].0,
            Err(_) => 0,
        }
    }
}
