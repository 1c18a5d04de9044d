//! Hybrid scoring engine — lexical retrieval, statistical classification,
//! and semantic nearest-neighbor search reconciled by weighted voting.
//!
//! Constructed once at startup from the training corpus; prediction is
//! read-only and safe to share across runs. The two prediction sides run on
//! the blocking pool and are joined.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::TriageConfig;

use super::classifier::StatisticalClassifier;
use super::corpus::TrainingCorpus;
use super::lexical::LexicalIndex;
use super::semantic::{Embedder, SemanticHit, SemanticIndex};
use super::NearestExample;

/// Resolution text used when no historical match is usable.
pub const NO_MATCH_RESOLUTION: &str = "No close historical match found";

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("training corpus is empty")]
    EmptyCorpus,
    #[error("failed to load corpus: {0}")]
    CorpusLoad(String),
    #[error("no usable candidate from any prediction source")]
    NoUsableCandidate,
    #[error("prediction task failed: {0}")]
    Join(String),
}

/// Confidence-weighted vote between the lexical and statistical candidates
/// for one label field. Agreement wins outright; otherwise the side whose
/// weight is larger wins, with the lexical score deciding the weighting.
pub fn weighted_voting(
    lexical_label: &str,
    statistical_label: &str,
    lexical_score: f64,
    lexical_vote_threshold: f64,
) -> String {
    if lexical_label == statistical_label {
        return lexical_label.to_string();
    }
    let (lexical_weight, statistical_weight) = if lexical_score >= lexical_vote_threshold {
        (0.7, 0.3)
    } else {
        (0.3, 0.7)
    };
    // Ties fall to the lexical candidate.
    if lexical_weight >= statistical_weight {
        lexical_label.to_string()
    } else {
        statistical_label.to_string()
    }
}

/// Lexical + statistical reconciliation output.
#[derive(Debug, Clone)]
pub struct HybridPrediction {
    pub priority: String,
    pub priority_confidence: f64,
    pub team: String,
    pub team_confidence: f64,
    pub resolution: String,
    pub lexical_score: f64,
    /// The BM25 best match, when one exists.
    pub lexical_match: Option<NearestExample>,
}

/// Embedding nearest-neighbor output.
#[derive(Debug, Clone)]
pub struct SemanticPrediction {
    pub priority: String,
    pub priority_confidence: f64,
    pub team: String,
    pub team_confidence: f64,
    pub resolution: String,
    pub top_similarity: f64,
    pub nearest: Vec<NearestExample>,
}

/// Final combined prediction consumed by the workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringResult {
    pub priority: String,
    pub classified_team: String,
    pub resolution: String,
    /// Mean of the four per-field confidences, in `[0, 1]`.
    pub combined_score: f64,
    pub is_new_issue: bool,
    pub lexical_score: f64,
    pub semantic_score: f64,
    /// Closest historical examples by embedding similarity, for resolution
    /// synthesis on novel issues.
    pub nearest: Vec<NearestExample>,
    /// The BM25 best match's resolution with its lexical score, so novel
    /// issues are synthesized from both retrieval sides. `None` when no
    /// document matched at all.
    pub lexical_match: Option<NearestExample>,
}

/// Prediction capability consumed by the L2 node. The engine is the real
/// implementation; tests substitute scripted scorers.
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn predict(&self, issue_text: &str) -> Result<ScoringResult, ScoringError>;
}

/// Sum similarity per label across the retrieved neighbors; the winner's
/// aggregate over the total similarity mass is its confidence.
fn aggregate_labels<'a>(
    hits: &[SemanticHit],
    total: f64,
    label_of: impl Fn(usize) -> &'a str,
) -> (String, f64) {
    let mut sums: Vec<(&str, f64)> = Vec::new();
    for hit in hits {
        let label = label_of(hit.doc);
        let weight = hit.similarity.max(0.0);
        match sums.iter_mut().find(|(l, _)| *l == label) {
            Some((_, s)) => *s += weight,
            None => sums.push((label, weight)),
        }
    }
    let (label, sum) = sums
        .into_iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .unwrap_or(("", 0.0));
    (label.to_string(), sum / total)
}

/// An issue is known when either retrieval side finds a sufficiently close
/// historical match; otherwise it is novel and needs resolution synthesis.
fn known_issue(lexical_score: f64, semantic_score: f64, config: &TriageConfig) -> bool {
    lexical_score >= config.known_lexical_score || semantic_score >= config.known_semantic_score
}

/// Per-field combination: agreement keeps the label, a disagreement goes to
/// the side with the strictly higher confidence, and a tie falls to the
/// semantic side.
fn pick_label(
    hybrid_label: &str,
    hybrid_confidence: f64,
    semantic_label: &str,
    semantic_confidence: f64,
) -> String {
    if hybrid_label == semantic_label || semantic_confidence < hybrid_confidence {
        hybrid_label.to_string()
    } else {
        semantic_label.to_string()
    }
}

struct Inner {
    corpus: TrainingCorpus,
    lexical: LexicalIndex,
    statistical: StatisticalClassifier,
    semantic: SemanticIndex,
    config: TriageConfig,
}

/// Shared hybrid scoring engine. Cloning is cheap; all indices live behind
/// one `Arc`.
#[derive(Clone)]
pub struct ScoringEngine {
    inner: Arc<Inner>,
}

impl ScoringEngine {
    /// Build all three indices from the corpus. Fails fast on an unusable
    /// corpus so a broken deployment never serves predictions.
    pub fn new(
        corpus: TrainingCorpus,
        embedder: Box<dyn Embedder>,
        config: TriageConfig,
    ) -> Result<Self, ScoringError> {
        if corpus.is_empty() {
            return Err(ScoringError::EmptyCorpus);
        }
        let issues = corpus.issue_texts();
        let lexical = LexicalIndex::build(&issues);
        let semantic = SemanticIndex::build(embedder, &issues);
        let statistical = StatisticalClassifier::train(&corpus)?;
        Ok(Self {
            inner: Arc::new(Inner {
                corpus,
                lexical,
                statistical,
                semantic,
                config,
            }),
        })
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl Scorer for ScoringEngine {
    async fn predict(&self, issue_text: &str) -> Result<ScoringResult, ScoringError> {
        let hybrid_inner = Arc::clone(&self.inner);
        let hybrid_text = issue_text.to_string();
        let hybrid_task =
            tokio::task::spawn_blocking(move || hybrid_inner.hybrid_predict(&hybrid_text));

        let semantic_inner = Arc::clone(&self.inner);
        let semantic_text = issue_text.to_string();
        let semantic_task =
            tokio::task::spawn_blocking(move || semantic_inner.semantic_predict(&semantic_text));

        let (hybrid, semantic) = tokio::try_join!(hybrid_task, semantic_task)
            .map_err(|e| ScoringError::Join(e.to_string()))?;

        self.inner.combine(hybrid, semantic)
    }
}

impl Inner {
    /// BM25 retrieval plus statistical classification, reconciled per field.
    fn hybrid_predict(&self, issue_text: &str) -> HybridPrediction {
        let best = self.lexical.best_match(issue_text);
        let (lexical_score, record) = match best {
            Some(m) => (m.score, Some(&self.corpus.records()[m.doc])),
            None => (0.0, None),
        };

        let stat = self.statistical.predict(issue_text);

        let (lexical_priority, lexical_team, resolution) = match record {
            Some(r) => (
                r.priority.as_str(),
                r.team.as_str(),
                r.resolution.clone(),
            ),
            None => (
                stat.priority.as_str(),
                stat.team.as_str(),
                NO_MATCH_RESOLUTION.to_string(),
            ),
        };

        let threshold = self.config.lexical_vote_threshold;
        let priority =
            weighted_voting(lexical_priority, &stat.priority, lexical_score, threshold);
        let team = weighted_voting(lexical_team, &stat.team, lexical_score, threshold);

        // The voted label's posterior serves as the hybrid confidence.
        let priority_confidence = self.statistical.priority_posterior(issue_text, &priority);
        let team_confidence = self.statistical.team_posterior(issue_text, &team);

        debug!(
            lexical_score,
            priority, team, "hybrid prediction reconciled"
        );

        let lexical_match = record.map(|r| NearestExample {
            resolution: r.resolution.clone(),
            similarity: lexical_score,
        });

        HybridPrediction {
            priority,
            priority_confidence,
            team,
            team_confidence,
            resolution,
            lexical_score,
            lexical_match,
        }
    }

    /// Top-k retrieval with per-label similarity aggregation.
    fn semantic_predict(&self, issue_text: &str) -> SemanticPrediction {
        let hits = self.semantic.search(issue_text, self.config.retrieval_k);
        let total: f64 = hits.iter().map(|h| h.similarity.max(0.0)).sum();

        if hits.is_empty() || total <= 0.0 {
            return SemanticPrediction {
                priority: String::new(),
                priority_confidence: 0.0,
                team: String::new(),
                team_confidence: 0.0,
                resolution: NO_MATCH_RESOLUTION.to_string(),
                top_similarity: 0.0,
                nearest: Vec::new(),
            };
        }

        let records = self.corpus.records();
        let (priority, priority_confidence) =
            aggregate_labels(&hits, total, |doc| records[doc].priority.as_str());
        let (team, team_confidence) =
            aggregate_labels(&hits, total, |doc| records[doc].team.as_str());

        let nearest: Vec<NearestExample> = hits
            .iter()
            .map(|h| NearestExample {
                resolution: records[h.doc].resolution.clone(),
                similarity: h.similarity,
            })
            .collect();

        SemanticPrediction {
            priority,
            priority_confidence,
            team,
            team_confidence,
            resolution: records[hits[0].doc].resolution.clone(),
            top_similarity: hits[0].similarity,
            nearest,
        }
    }

    /// Per-field agreement-or-higher-confidence combination, novelty decision,
    /// and resolution selection.
    fn combine(
        &self,
        hybrid: HybridPrediction,
        semantic: SemanticPrediction,
    ) -> Result<ScoringResult, ScoringError> {
        if hybrid.priority_confidence == 0.0
            && hybrid.team_confidence == 0.0
            && semantic.priority_confidence == 0.0
            && semantic.team_confidence == 0.0
        {
            return Err(ScoringError::NoUsableCandidate);
        }

        let priority = pick_label(
            &hybrid.priority,
            hybrid.priority_confidence,
            &semantic.priority,
            semantic.priority_confidence,
        );
        let classified_team = pick_label(
            &hybrid.team,
            hybrid.team_confidence,
            &semantic.team,
            semantic.team_confidence,
        );

        let combined_score = (hybrid.priority_confidence
            + hybrid.team_confidence
            + semantic.priority_confidence
            + semantic.team_confidence)
            / 4.0;

        let known = known_issue(hybrid.lexical_score, semantic.top_similarity, &self.config);

        let resolution = if !known {
            NO_MATCH_RESOLUTION.to_string()
        } else if semantic.top_similarity >= self.config.known_semantic_score {
            semantic.resolution
        } else {
            hybrid.resolution
        };

        debug!(
            priority,
            classified_team,
            combined_score,
            is_new_issue = !known,
            "prediction combined"
        );

        Ok(ScoringResult {
            priority,
            classified_team,
            resolution,
            combined_score,
            is_new_issue: !known,
            lexical_score: hybrid.lexical_score,
            semantic_score: semantic.top_similarity,
            nearest: semantic.nearest,
            lexical_match: hybrid.lexical_match,
        })
    }
}
