//! Feature extraction over `(t-tree, dialogue act)` pairs.
//!
//! A [`Features`] pipeline is built from a list of typed
//! [`FeatureTemplate`]s. Each template computes a small map of local keys to
//! values; the pipeline prefixes the keys with the template label and merges
//! everything into one [`FeatureMap`].

pub mod functions;
pub mod template;

use std::collections::BTreeMap;

use ttree::{Da, TTree};

pub use template::{Attr, FeatureKind, FeatureTemplate, Features};

/// Named sparse features. Ordered so iteration is deterministic.
pub type FeatureMap = BTreeMap<String, f64>;

/// Extra inputs a feature function may look at besides the tree.
#[derive(Debug, Clone, Copy)]
pub struct FeatureContext<'a> {
    pub da: &'a Da,
}

/// Anything mapping a candidate tree and its input to named features.
pub trait FeatureExtractor {
    fn get_features(&self, tree: &TTree, ctx: &FeatureContext<'_>) -> FeatureMap;
}

/// Errors from building a feature pipeline.
#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    /// Two templates share a label.
    #[error("Duplicate feature label {0:?}")]
    DuplicateLabel(String),
    /// A `combine` template names a label not defined before it.
    #[error("Feature {label:?} combines unknown feature {missing:?}")]
    UnknownReference { label: String, missing: String },
    /// A template that needs node attributes was given none.
    #[error("Feature {0:?} needs at least one node attribute")]
    NoAttributes(String),
}
