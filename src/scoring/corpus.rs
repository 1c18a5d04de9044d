//! Training corpus — labeled reported-issue/resolution pairs.
//!
//! Immutable after load; every index and classifier is built from it once
//! at startup.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::engine::ScoringError;

/// One historical ticket: the reported issue, the resolution that worked,
/// and its labeled priority and team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub issue: String,
    pub resolution: String,
    pub priority: String,
    pub team: String,
}

/// The full labeled corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingCorpus {
    records: Vec<CorpusRecord>,
}

impl TrainingCorpus {
    /// Build a corpus from records, dropping entries with an empty issue
    /// text (they can never match and would poison document statistics).
    pub fn from_records(records: Vec<CorpusRecord>) -> Result<Self, ScoringError> {
        let records: Vec<CorpusRecord> = records
            .into_iter()
            .filter(|r| !r.issue.trim().is_empty())
            .collect();

        if records.is_empty() {
            return Err(ScoringError::EmptyCorpus);
        }
        Ok(Self { records })
    }

    /// Load a corpus from a JSON file (an array of records).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScoringError> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| ScoringError::CorpusLoad(e.to_string()))?;
        let records: Vec<CorpusRecord> = serde_json::from_slice(&bytes)
            .map_err(|e| ScoringError::CorpusLoad(e.to_string()))?;
        Self::from_records(records)
    }

    pub fn records(&self) -> &[CorpusRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Issue texts in corpus order, for index construction.
    pub fn issue_texts(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.issue.as_str()).collect()
    }

    /// Issue + resolution text per record, the classifier's feature input.
    pub fn training_texts(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| format!("{} {}", r.issue, r.resolution))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(issue: &str, resolution: &str, priority: &str, team: &str) -> CorpusRecord {
        CorpusRecord {
            issue: issue.into(),
            resolution: resolution.into(),
            priority: priority.into(),
            team: team.into(),
        }
    }

    #[test]
    fn test_empty_corpus_rejected() {
        let err = TrainingCorpus::from_records(vec![]).unwrap_err();
        assert!(matches!(err, ScoringError::EmptyCorpus));
    }

    #[test]
    fn test_blank_issues_dropped() {
        let corpus = TrainingCorpus::from_records(vec![
            record("  ", "n/a", "P3", "Network"),
            record("vpn drops", "restart tunnel", "P2", "Network"),
        ])
        .unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.records()[0].issue, "vpn drops");
    }

    #[test]
    fn test_load_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        let records = vec![record("disk full", "purge logs", "P1", "Infra")];
        std::fs::write(&path, serde_json::to_vec(&records).unwrap()).unwrap();

        let corpus = TrainingCorpus::load(&path).unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.records()[0].team, "Infra");
    }
}
