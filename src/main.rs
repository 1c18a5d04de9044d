//! Scoring CLI: load a corpus and predict issues from stdin, one per line.
//!
//! Useful for inspecting how the hybrid scorer treats a ticket before it
//! enters the workflow:
//!
//! ```text
//! triage ./corpus.json < issues.txt
//! ```

use std::io::BufRead;

use anyhow::Context;

use triage::scoring::{HashedBowEmbedder, Scorer, ScoringEngine, TrainingCorpus};
use triage::{telemetry, TriageConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let path = std::env::args()
        .nth(1)
        .context("usage: triage <corpus.json>")?;
    let corpus = TrainingCorpus::load(&path)
        .with_context(|| format!("loading corpus from {path}"))?;

    let engine = ScoringEngine::new(
        corpus,
        Box::new(HashedBowEmbedder::default()),
        TriageConfig::default(),
    )?;

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let issue = line.context("reading stdin")?;
        if issue.trim().is_empty() {
            continue;
        }
        let result = engine.predict(&issue).await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    Ok(())
}
