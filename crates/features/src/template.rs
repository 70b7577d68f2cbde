//! Typed feature templates and the [`Features`] pipeline built from them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ttree::TTree;

use crate::functions;
use crate::{FeatureContext, FeatureError, FeatureExtractor, FeatureMap};

/// Node attribute a template reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attr {
    TLemma,
    Formeme,
    /// Number of the node's children.
    NumChildren,
}

/// What a template computes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureKind {
    Bias,
    Depth,
    TreeSize,
    MaxChildren,
    NodesPerDai,
    /// Surplus occurrences of repeated nodes.
    RepNodes,
    RepNodesPerRepDai,
    Presence { attrs: Vec<Attr> },
    Repeated { attrs: Vec<Attr> },
    Dependency { attrs: Vec<Attr> },
    DirDependency { attrs: Vec<Attr> },
    Siblings { attrs: Vec<Attr> },
    Bigrams { attrs: Vec<Attr> },
    DaiPresence,
    SlotPresence,
    /// DA items without values that occur more than once.
    SlotRepeated,
    /// Product of two earlier templates, referenced by label.
    Combine { left: String, right: String },
    /// Features of `left` whose key does not occur in `right`.
    SetDifference { left: String, right: String },
}

impl FeatureKind {
    fn attrs(&self) -> Option<&[Attr]> {
        match self {
            Self::Presence { attrs }
            | Self::Repeated { attrs }
            | Self::Dependency { attrs }
            | Self::DirDependency { attrs }
            | Self::Siblings { attrs }
            | Self::Bigrams { attrs } => Some(attrs),
            _ => None,
        }
    }

    /// Labels of the earlier templates this one is computed from.
    fn operands(&self) -> Option<(&String, &String)> {
        match self {
            Self::Combine { left, right } | Self::SetDifference { left, right } => {
                Some((left, right))
            }
            _ => None,
        }
    }
}

/// A labelled feature template, as written in the ranker's TOML config:
///
/// ```toml
/// [[features]]
/// label = "lemma"
/// kind = "presence"
/// attrs = ["t_lemma"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTemplate {
    pub label: String,
    #[serde(flatten)]
    pub kind: FeatureKind,
}

impl FeatureTemplate {
    pub fn new(label: &str, kind: FeatureKind) -> Self {
        Self {
            label: label.to_string(),
            kind,
        }
    }
}

/// Compiled feature pipeline.
///
/// A `bias` template is always evaluated first, whether configured or not.
#[derive(Debug, Clone)]
pub struct Features {
    templates: Vec<FeatureTemplate>,
    /// For `combine` and `set_difference` templates: positions of the two
    /// operands in `templates`.
    operands: HashMap<usize, (usize, usize)>,
}

impl Features {
    pub fn new(templates: &[FeatureTemplate]) -> Result<Self, FeatureError> {
        let mut all = Vec::with_capacity(templates.len() + 1);
        if !templates.iter().any(|t| t.kind == FeatureKind::Bias) {
            all.push(FeatureTemplate::new("bias", FeatureKind::Bias));
        }
        all.extend(templates.iter().cloned());

        let mut positions: HashMap<&str, usize> = HashMap::new();
        let mut operands = HashMap::new();
        for (pos, template) in all.iter().enumerate() {
            if let Some(attrs) = template.kind.attrs() {
                if attrs.is_empty() {
                    return Err(FeatureError::NoAttributes(template.label.clone()));
                }
            }
            if let Some((left, right)) = template.kind.operands() {
                let lookup = |name: &String| {
                    positions.get(name.as_str()).copied().ok_or_else(|| {
                        FeatureError::UnknownReference {
                            label: template.label.clone(),
                            missing: name.clone(),
                        }
                    })
                };
                operands.insert(pos, (lookup(left)?, lookup(right)?));
            }
            if positions.insert(template.label.as_str(), pos).is_some() {
                return Err(FeatureError::DuplicateLabel(template.label.clone()));
            }
        }

        tracing::debug!(templates = all.len(), "Built feature pipeline");
        Ok(Self {
            templates: all,
            operands,
        })
    }

    pub fn templates(&self) -> &[FeatureTemplate] {
        &self.templates
    }

    fn evaluate(&self, pos: usize, tree: &TTree, ctx: &FeatureContext<'_>, done: &[FeatureMap]) -> FeatureMap {
        match &self.templates[pos].kind {
            FeatureKind::Bias => functions::bias(),
            FeatureKind::Depth => functions::depth(tree),
            FeatureKind::TreeSize => functions::tree_size(tree),
            FeatureKind::MaxChildren => functions::max_children(tree),
            FeatureKind::NodesPerDai => functions::nodes_per_dai(tree, ctx.da),
            FeatureKind::RepNodes => functions::rep_nodes(tree),
            FeatureKind::RepNodesPerRepDai => functions::rep_nodes_per_rep_dai(tree, ctx.da),
            FeatureKind::Presence { attrs } => functions::presence(tree, attrs),
            FeatureKind::Repeated { attrs } => functions::repeated(tree, attrs),
            FeatureKind::Dependency { attrs } => functions::dependency(tree, attrs),
            FeatureKind::DirDependency { attrs } => functions::dir_dependency(tree, attrs),
            FeatureKind::Siblings { attrs } => functions::siblings(tree, attrs),
            FeatureKind::Bigrams { attrs } => functions::bigrams(tree, attrs),
            FeatureKind::DaiPresence => functions::dai_presence(ctx.da),
            FeatureKind::SlotPresence => functions::slot_presence(ctx.da),
            FeatureKind::SlotRepeated => functions::slot_repeated(ctx.da),
            FeatureKind::Combine { .. } => {
                let (l, r) = self.operands[&pos];
                functions::combine(&done[l], &done[r])
            }
            FeatureKind::SetDifference { .. } => {
                let (l, r) = self.operands[&pos];
                functions::set_difference(&done[l], &done[r])
            }
        }
    }
}

impl FeatureExtractor for Features {
    fn get_features(&self, tree: &TTree, ctx: &FeatureContext<'_>) -> FeatureMap {
        let mut local: Vec<FeatureMap> = Vec::with_capacity(self.templates.len());
        for pos in 0..self.templates.len() {
            let values = self.evaluate(pos, tree, ctx, &local);
            local.push(values);
        }

        let mut out = FeatureMap::new();
        for (template, values) in self.templates.iter().zip(local) {
            for (key, value) in values {
                let name = if key.is_empty() {
                    template.label.clone()
                } else {
                    format!("{}_{}", template.label, key)
                };
                out.insert(name, value);
            }
        }
        out
    }
}
