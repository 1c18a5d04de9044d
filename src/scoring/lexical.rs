//! Lexical similarity index — BM25 Okapi ranking over corpus issue text.
//!
//! Saturating term-frequency weighting, length normalization, and inverse
//! document frequency; the arg-max document is the lexical candidate and
//! its score the lexical confidence proxy.

use std::collections::HashMap;

const K1: f64 = 1.5;
const B: f64 = 0.75;

/// Lowercase alphanumeric tokenization shared by every text component.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Best lexical match for a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexicalMatch {
    /// Index of the matched corpus document.
    pub doc: usize,
    /// BM25 score of that document.
    pub score: f64,
}

/// Sparse term-frequency index over the corpus, scored with BM25 Okapi.
#[derive(Debug, Clone)]
pub struct LexicalIndex {
    /// Per-document term frequencies.
    doc_tf: Vec<HashMap<String, usize>>,
    /// Per-document token counts.
    doc_len: Vec<usize>,
    /// Mean document length.
    avgdl: f64,
    /// Document frequency per term.
    df: HashMap<String, usize>,
}

impl LexicalIndex {
    /// Index the given documents in order.
    pub fn build<S: AsRef<str>>(docs: &[S]) -> Self {
        let mut doc_tf = Vec::with_capacity(docs.len());
        let mut doc_len = Vec::with_capacity(docs.len());
        let mut df: HashMap<String, usize> = HashMap::new();

        for doc in docs {
            let tokens = tokenize(doc.as_ref());
            doc_len.push(tokens.len());

            let mut tf: HashMap<String, usize> = HashMap::new();
            for token in tokens {
                *tf.entry(token).or_insert(0) += 1;
            }
            for term in tf.keys() {
                *df.entry(term.clone()).or_insert(0) += 1;
            }
            doc_tf.push(tf);
        }

        let avgdl = if doc_len.is_empty() {
            0.0
        } else {
            doc_len.iter().sum::<usize>() as f64 / doc_len.len() as f64
        };

        Self {
            doc_tf,
            doc_len,
            avgdl,
            df,
        }
    }

    pub fn len(&self) -> usize {
        self.doc_tf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_tf.is_empty()
    }

    fn idf(&self, term: &str) -> f64 {
        let n = self.doc_tf.len() as f64;
        let df = self.df.get(term).copied().unwrap_or(0) as f64;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// BM25 score of every document against the query, in corpus order.
    pub fn scores(&self, query: &str) -> Vec<f64> {
        let query_terms = tokenize(query);
        let mut scores = vec![0.0; self.doc_tf.len()];

        for term in &query_terms {
            let idf = self.idf(term);
            for (i, tf_map) in self.doc_tf.iter().enumerate() {
                let tf = tf_map.get(term).copied().unwrap_or(0) as f64;
                if tf == 0.0 {
                    continue;
                }
                let dl = self.doc_len[i] as f64;
                let norm = K1 * (1.0 - B + B * dl / self.avgdl.max(f64::EPSILON));
                scores[i] += idf * (tf * (K1 + 1.0)) / (tf + norm);
            }
        }
        scores
    }

    /// The arg-max document for a query; `None` only for an empty index.
    pub fn best_match(&self, query: &str) -> Option<LexicalMatch> {
        let scores = self.scores(query);
        scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(doc, &score)| LexicalMatch { doc, score })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> LexicalIndex {
        LexicalIndex::build(&[
            "email sync fails on mobile client",
            "vpn connection drops every hour",
            "printer spooler stuck with queued jobs",
        ])
    }

    #[test]
    fn test_tokenize_lowercases_and_splits() {
        assert_eq!(
            tokenize("VPN-connection DROPS, hourly!"),
            vec!["vpn", "connection", "drops", "hourly"]
        );
        assert!(tokenize("  --- ").is_empty());
    }

    #[test]
    fn test_exact_match_ranks_first() {
        let index = sample_index();
        let m = index.best_match("vpn connection drops every hour").unwrap();
        assert_eq!(m.doc, 1);
        assert!(m.score > 0.0);
    }

    #[test]
    fn test_unrelated_query_scores_zero() {
        let index = sample_index();
        let scores = index.scores("quantum flux capacitor");
        assert!(scores.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_rare_term_outweighs_common_term() {
        let index = LexicalIndex::build(&[
            "server error on login",
            "server error on checkout",
            "kerberos ticket expired on login",
        ]);
        // "kerberos" appears in one document; it should dominate.
        let m = index.best_match("kerberos error").unwrap();
        assert_eq!(m.doc, 2);
    }

    #[test]
    fn test_empty_index_has_no_match() {
        let index = LexicalIndex::build::<&str>(&[]);
        assert!(index.best_match("anything").is_none());
    }
}
