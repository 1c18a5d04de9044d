//! Triage configuration — named thresholds for routing and scoring.

/// Top-level triage configuration.
///
/// Every routing threshold the analyser and scoring engine consume lives
/// here as a named value. `Default` reads `TRIAGE_*` environment overrides
/// and falls back to the shipped constants.
#[derive(Debug, Clone)]
pub struct TriageConfig {
    /// Analyser threshold for the first L2 pass (`l2_count == 1`).
    pub first_pass_threshold: f64,
    /// Analyser threshold for the second L2 pass (`l2_count == 2`).
    pub second_pass_threshold: f64,
    /// Maximum automated L2 passes before forced escalation.
    pub max_l2_passes: u32,
    /// Lexical confidence above which the lexical candidate dominates
    /// weighted voting (0.7/0.3 instead of 0.3/0.7).
    pub lexical_vote_threshold: f64,
    /// Lexical similarity at or above which an issue counts as known.
    pub known_lexical_score: f64,
    /// Semantic top-1 similarity at or above which an issue counts as known.
    pub known_semantic_score: f64,
    /// Number of nearest neighbors fetched by the semantic index.
    pub retrieval_k: usize,
    /// Local retries for a failed checkpoint write before surfacing the error.
    pub checkpoint_retries: u32,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            first_pass_threshold: env_f64("TRIAGE_FIRST_PASS_THRESHOLD", 0.7),
            second_pass_threshold: env_f64("TRIAGE_SECOND_PASS_THRESHOLD", 0.8),
            max_l2_passes: env_u32("TRIAGE_MAX_L2_PASSES", 2),
            lexical_vote_threshold: env_f64("TRIAGE_LEXICAL_VOTE_THRESHOLD", 0.75),
            known_lexical_score: env_f64("TRIAGE_KNOWN_LEXICAL_SCORE", 8.0),
            known_semantic_score: env_f64("TRIAGE_KNOWN_SEMANTIC_SCORE", 0.6),
            retrieval_k: env_u32("TRIAGE_RETRIEVAL_K", 5) as usize,
            checkpoint_retries: env_u32("TRIAGE_CHECKPOINT_RETRIES", 3),
        }
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
