//! End-to-end tests of the percrank binary on a small restaurant corpus:
//! candidate generator training, ranker training, then ranking.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use planner::mocks::restaurant_corpus;
use ttree::{write_ttrees, TreeDocument};

const CONFIG: &str = r#"
[ranker]
alpha = 0.1
passes = 2
rival_number = 1
rival_gen_strategy = ["other_inst", "gen_cur_weights"]
rival_gen_max_iter = 20
rival_gen_max_defic_iter = 5
future_promise_weight = 0.5
future_promise_type = "norm_exp_children"
averaging = true
seed = 11

[[ranker.features]]
label = "lemma"
kind = "presence"
attrs = ["t_lemma"]

[[ranker.features]]
label = "formeme-numc"
kind = "presence"
attrs = ["formeme", "num_children"]

[[ranker.features]]
label = "slot"
kind = "slot_presence"

[[ranker.features]]
label = "rep-slot"
kind = "slot_repeated"

[[ranker.features]]
label = "not-rep-slot"
kind = "set_difference"
left = "slot"
right = "rep-slot"

[[ranker.features]]
label = "lemma+slot"
kind = "combine"
left = "lemma"
right = "not-rep-slot"

[[ranker.features]]
label = "rep-nodes"
kind = "rep_nodes"
"#;

struct Workspace {
    _tmp: tempfile::TempDir,
    dir: PathBuf,
    das: PathBuf,
    ttrees: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let (das, trees) = restaurant_corpus();
        let das_path = dir.join("das.txt");
        let text: String = das.iter().map(|da| format!("{da}\n")).collect();
        std::fs::write(&das_path, text).unwrap();
        let ttrees_path = dir.join("ttrees.json");
        write_ttrees(&ttrees_path, &TreeDocument::from_trees(trees, "en", "")).unwrap();
        std::fs::write(dir.join("percrank.toml"), CONFIG).unwrap();
        Self {
            _tmp: tmp,
            dir,
            das: das_path,
            ttrees: ttrees_path,
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

fn percrank(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_percrank"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to launch percrank")
}

fn s(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn train_candgen(ws: &Workspace) -> PathBuf {
    let candgen = ws.path("candgen.json");
    let out = percrank(&[
        "train-candgen",
        "--das",
        s(&ws.das),
        "--ttrees",
        s(&ws.ttrees),
        "--output",
        s(&candgen),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    candgen
}

#[test]
fn test_candgen_train_rank_pipeline() {
    let ws = Workspace::new();
    let candgen = train_candgen(&ws);
    assert!(candgen.exists());

    let model = ws.path("ranker.json");
    let report = ws.path("report.json");
    let out = percrank(&[
        "train",
        "--config",
        s(&ws.path("percrank.toml")),
        "--das",
        s(&ws.das),
        "--ttrees",
        s(&ws.ttrees),
        "--output",
        s(&model),
        "--candgen-model",
        s(&candgen),
        "--report",
        s(&report),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).contains("Training complete"));

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    let passes = report["passes"].as_array().unwrap();
    assert_eq!(passes.len(), 2);
    assert_eq!(passes[0]["instances"], 5);

    let scores = ws.path("scores.jsonl");
    let out = percrank(&[
        "rank",
        "--model",
        s(&model),
        "--das",
        s(&ws.das),
        "--ttrees",
        s(&ws.ttrees),
        "--output",
        s(&scores),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let lines: Vec<serde_json::Value> = std::fs::read_to_string(&scores)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 5);
    for (i, line) in lines.iter().enumerate() {
        assert_eq!(line["index"], i);
        assert!(line["score"].as_f64().unwrap().is_finite());
    }
    assert_eq!(lines[3]["da"], "request(food)");

    // Without --output the same records go to stdout
    let out = percrank(&[
        "rank",
        "--model",
        s(&model),
        "--das",
        s(&ws.das),
        "--ttrees",
        s(&ws.ttrees),
    ]);
    assert!(out.status.success());
    let stdout: Vec<serde_json::Value> = String::from_utf8_lossy(&out.stdout)
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(stdout, lines);
}

#[test]
fn test_train_without_candgen_fails() {
    let ws = Workspace::new();
    let model = ws.path("ranker.json");
    let out = percrank(&[
        "train",
        "--config",
        s(&ws.path("percrank.toml")),
        "--das",
        s(&ws.das),
        "--ttrees",
        s(&ws.ttrees),
        "--output",
        s(&model),
    ]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("candidate generator"));
    assert!(!model.exists());
}

#[test]
fn test_rank_rejects_misaligned_corpus() {
    let ws = Workspace::new();
    let candgen = train_candgen(&ws);
    let model = ws.path("ranker.json");
    let out = percrank(&[
        "train",
        "--config",
        s(&ws.path("percrank.toml")),
        "--das",
        s(&ws.das),
        "--ttrees",
        s(&ws.ttrees),
        "--output",
        s(&model),
        "--candgen-model",
        s(&candgen),
        "--passes",
        "1",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let short_das = ws.path("short.txt");
    std::fs::write(&short_das, "inform(food=Chinese)\n").unwrap();
    let out = percrank(&[
        "rank",
        "--model",
        s(&model),
        "--das",
        s(&short_das),
        "--ttrees",
        s(&ws.ttrees),
    ]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Misaligned"));
}
