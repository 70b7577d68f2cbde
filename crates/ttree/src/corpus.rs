//! Corpus I/O: DA files, t-tree documents, and zone selection.
//!
//! DA files hold one dialogue act per line. T-tree documents are JSON:
//!
//! ```json
//! {"bundles": [{"zones": [{"language": "en", "selector": "", "sentence": "...", "ttree": {...}}]}]}
//! ```

use std::io::BufRead;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::da::Da;
use crate::tree::TTree;

/// Errors from reading or validating corpus data.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    /// A corpus file could not be opened, read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// JSON document could not be parsed or produced.
    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// A dialogue act line is malformed.
    #[error("Malformed dialogue act: {0:?}")]
    DaSyntax(String),
    /// Parent links do not form a tree rooted at node 0.
    #[error("Invalid t-tree: {0}")]
    InvalidTree(String),
    /// A bundle has no zone for the requested language and selector.
    #[error("Bundle {bundle} has no zone for language {language:?}, selector {selector:?}")]
    MissingZone {
        bundle: usize,
        language: String,
        selector: String,
    },
    /// DA and t-tree files describe different numbers of instances.
    #[error("Misaligned corpus: {das} DAs vs {trees} t-trees")]
    Misaligned { das: usize, trees: usize },
}

/// One language/selector view of a bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub language: String,
    #[serde(default)]
    pub selector: String,
    /// Surface sentence, kept for logging only.
    #[serde(default)]
    pub sentence: Option<String>,
    pub ttree: TTree,
}

/// All zones belonging to one corpus instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub zones: Vec<Zone>,
}

impl Bundle {
    /// First zone matching `language` and `selector`.
    pub fn zone(&self, language: &str, selector: &str) -> Option<&Zone> {
        self.zones
            .iter()
            .find(|z| z.language == language && z.selector == selector)
    }
}

/// A t-tree document: bundles aligned by index with a DA file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeDocument {
    pub bundles: Vec<Bundle>,
}

impl TreeDocument {
    /// Build a single-zone-per-bundle document from plain trees.
    pub fn from_trees(trees: Vec<TTree>, language: &str, selector: &str) -> Self {
        let bundles = trees
            .into_iter()
            .map(|ttree| Bundle {
                zones: vec![Zone {
                    language: language.to_string(),
                    selector: selector.to_string(),
                    sentence: None,
                    ttree,
                }],
            })
            .collect();
        Self { bundles }
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    fn zones<'a>(
        &'a self,
        language: &'a str,
        selector: &'a str,
    ) -> impl Iterator<Item = Result<&'a Zone, CorpusError>> + 'a {
        self.bundles.iter().enumerate().map(move |(bundle, b)| {
            b.zone(language, selector).ok_or_else(|| CorpusError::MissingZone {
                bundle,
                language: language.to_string(),
                selector: selector.to_string(),
            })
        })
    }
}

/// Read dialogue acts, one per line. Blank lines are skipped.
pub fn read_das(path: &Path) -> Result<Vec<Da>, CorpusError> {
    let io_err = |source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = std::fs::File::open(path).map_err(io_err)?;
    let mut das = Vec::new();
    for line in std::io::BufReader::new(file).lines() {
        let line = line.map_err(io_err)?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        das.push(line.parse()?);
    }
    tracing::info!(count = das.len(), path = %path.display(), "Read DAs");
    Ok(das)
}

/// Read a JSON t-tree document.
pub fn read_ttrees(path: &Path) -> Result<TreeDocument, CorpusError> {
    let file = std::fs::File::open(path).map_err(|source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: TreeDocument = serde_json::from_reader(std::io::BufReader::new(file)).map_err(
        |source| CorpusError::Json {
            path: path.to_path_buf(),
            source,
        },
    )?;
    tracing::info!(bundles = doc.len(), path = %path.display(), "Read t-tree document");
    Ok(doc)
}

/// Write a t-tree document as JSON.
pub fn write_ttrees(path: &Path, doc: &TreeDocument) -> Result<(), CorpusError> {
    let file = std::fs::File::create(path).map_err(|source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::to_writer(std::io::BufWriter::new(file), doc).map_err(|source| {
        CorpusError::Json {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// The t-tree of every bundle's `language`/`selector` zone, in bundle order.
pub fn trees_from_doc(
    doc: &TreeDocument,
    language: &str,
    selector: &str,
) -> Result<Vec<TTree>, CorpusError> {
    doc.zones(language, selector)
        .map(|zone| zone.map(|z| z.ttree.clone()))
        .collect()
}

/// The sentence of every bundle's `language`/`selector` zone, empty when absent.
pub fn sentences_from_doc(
    doc: &TreeDocument,
    language: &str,
    selector: &str,
) -> Result<Vec<String>, CorpusError> {
    doc.zones(language, selector)
        .map(|zone| zone.map(|z| z.sentence.clone().unwrap_or_default()))
        .collect()
}
