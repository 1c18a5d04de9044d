//! Hybrid scoring engine — lexical retrieval, statistical classification,
//! and semantic nearest-neighbor search, reconciled by confidence-weighted
//! voting.
//!
//! No dependency on the workflow engine: the engine consumes a
//! [`ScoringResult`] through the [`Scorer`] trait.

pub mod classifier;
pub mod corpus;
pub mod engine;
pub mod lexical;
pub mod semantic;

pub use classifier::{LabelClassifier, StatisticalClassifier, TfIdfVectorizer};
pub use corpus::{CorpusRecord, TrainingCorpus};
pub use engine::{
    weighted_voting, HybridPrediction, Scorer, ScoringEngine, ScoringError, ScoringResult,
    SemanticPrediction, NO_MATCH_RESOLUTION,
};
pub use lexical::{tokenize, LexicalIndex, LexicalMatch};
pub use semantic::{Embedder, HashedBowEmbedder, SemanticHit, SemanticIndex};

use serde::{Deserialize, Serialize};

/// A nearby historical resolution, handed to the resolution-synthesis
/// capability when an issue is novel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearestExample {
    pub resolution: String,
    pub similarity: f64,
}
