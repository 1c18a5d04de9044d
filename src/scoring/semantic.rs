//! Semantic similarity over a pluggable embedding backend.
//!
//! The default [`HashedBowEmbedder`] is a deterministic feature-hashing
//! bag-of-words embedder, so the index works offline with no model files.
//! Production deployments can swap in a real sentence embedder through the
//! [`Embedder`] trait.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::lexical::tokenize;

/// Produces fixed-width embeddings for free text. Implementations must be
/// deterministic for a given input within one process lifetime.
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;
    fn embed(&self, text: &str) -> Vec<f64>;
}

/// Feature-hashing bag-of-words embedder with sign hashing, L2-normalized.
#[derive(Debug, Clone)]
pub struct HashedBowEmbedder {
    dimension: usize,
}

impl HashedBowEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashedBowEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Embedder for HashedBowEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Vec<f64> {
        let mut vector = vec![0.0f64; self.dimension];
        for token in tokenize(text) {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let h = hasher.finish();
            let bucket = (h % self.dimension as u64) as usize;
            // Second hash bit decides the sign to reduce collision bias.
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

/// One retrieved neighbour: corpus document index and cosine similarity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SemanticHit {
    pub doc: usize,
    pub similarity: f64,
}

/// Dense vector index over the corpus issue texts.
pub struct SemanticIndex {
    embedder: Box<dyn Embedder>,
    vectors: Vec<Vec<f64>>,
}

impl SemanticIndex {
    pub fn build<S: AsRef<str>>(embedder: Box<dyn Embedder>, docs: &[S]) -> Self {
        let vectors = docs.iter().map(|d| embedder.embed(d.as_ref())).collect();
        Self { embedder, vectors }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Top-k documents by cosine similarity, best first.
    pub fn search(&self, query: &str, k: usize) -> Vec<SemanticHit> {
        let q = self.embedder.embed(query);
        let mut hits: Vec<SemanticHit> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(doc, v)| SemanticHit {
                doc,
                similarity: cosine(&q, v),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        hits
    }
}

/// Cosine similarity. Inputs are already L2-normalized so this is the dot
/// product, but the guard keeps zero vectors at 0.
fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedder_is_deterministic() {
        let e = HashedBowEmbedder::default();
        assert_eq!(e.embed("disk full on app server"), e.embed("disk full on app server"));
    }

    #[test]
    fn test_embedding_is_unit_length() {
        let e = HashedBowEmbedder::default();
        let v = e.embed("kernel panic after update");
        let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_text_embeds_to_zero_vector() {
        let e = HashedBowEmbedder::default();
        assert!(e.embed("").iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_search_ranks_identical_text_first() {
        let docs = [
            "vpn tunnel keeps dropping",
            "printer offline in building two",
            "database connection pool exhausted",
        ];
        let index = SemanticIndex::build(Box::new(HashedBowEmbedder::default()), &docs);
        let hits = index.search("vpn tunnel keeps dropping", 2);
        assert_eq!(hits[0].doc, 0);
        assert!((hits[0].similarity - 1.0).abs() < 1e-9);
        assert!(hits[0].similarity > hits[1].similarity);
    }

    #[test]
    fn test_search_truncates_to_k() {
        let docs = ["a b", "b c", "c d", "d e"];
        let index = SemanticIndex::build(Box::new(HashedBowEmbedder::default()), &docs);
        assert_eq!(index.search("b", 2).len(), 2);
    }
}
