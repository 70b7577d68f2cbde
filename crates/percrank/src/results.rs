//! Output record types for training reports and ranking results.

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use ranker::PassReport;
use serde::{Deserialize, Serialize};

/// Summary of one training pass, as written to the JSON report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassSummary {
    pub pass: usize,
    pub instances: usize,
    pub errors: usize,
    pub accuracy: f64,
    pub node_f1: f64,
    pub dep_f1: f64,
    /// Fraction of searches whose best closed tree was the gold tree.
    pub gold_best: f64,
    pub gold_on_close: f64,
    pub gold_on_any: f64,
    pub duration_secs: f64,
}

impl From<&PassReport> for PassSummary {
    fn from(report: &PassReport) -> Self {
        Self {
            pass: report.pass,
            instances: report.instances,
            errors: report.errors,
            accuracy: report.accuracy,
            node_f1: report.node.f1,
            dep_f1: report.dep.f1,
            gold_best: report.lists.best,
            gold_on_close: report.lists.close,
            gold_on_any: report.lists.any,
            duration_secs: report.duration.as_secs_f64(),
        }
    }
}

/// Full training report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainReport {
    pub das: String,
    pub ttrees: String,
    pub data_portion: f64,
    pub features: usize,
    pub passes: Vec<PassSummary>,
}

/// Score of one corpus instance's tree under a trained ranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankRecord {
    pub index: usize,
    pub da: String,
    pub tree: String,
    pub score: f64,
}

/// Write one JSON object per line.
pub fn write_jsonl<T: Serialize>(out: &mut impl Write, records: &[T]) -> anyhow::Result<()> {
    for record in records {
        serde_json::to_writer(&mut *out, record)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_report(path: &Path, report: &TrainReport) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    Ok(())
}
