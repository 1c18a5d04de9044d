//! Statistical classification — TF-IDF features feeding two independent
//! multinomial naive Bayes classifiers (priority, team).
//!
//! Trained once from the corpus at startup, read-only thereafter. Each
//! prediction carries the predicted label's posterior probability as its
//! confidence.

use std::collections::HashMap;

use super::corpus::TrainingCorpus;
use super::engine::ScoringError;
use super::lexical::tokenize;

/// Laplace smoothing constant.
const ALPHA: f64 = 1.0;

/// Sparse TF-IDF features: (vocabulary index, weight).
pub type Features = Vec<(usize, f64)>;

/// TF-IDF vectorizer with smoothed inverse document frequency.
#[derive(Debug, Clone)]
pub struct TfIdfVectorizer {
    vocab: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl TfIdfVectorizer {
    /// Fit vocabulary and document frequencies on the given documents.
    pub fn fit<S: AsRef<str>>(docs: &[S]) -> Self {
        let mut vocab: HashMap<String, usize> = HashMap::new();
        let mut df: Vec<usize> = Vec::new();

        for doc in docs {
            let mut seen: Vec<usize> = Vec::new();
            for token in tokenize(doc.as_ref()) {
                let next_id = vocab.len();
                let id = *vocab.entry(token).or_insert(next_id);
                if id == df.len() {
                    df.push(0);
                }
                if !seen.contains(&id) {
                    df[id] += 1;
                    seen.push(id);
                }
            }
        }

        let n = docs.len() as f64;
        let idf = df
            .iter()
            .map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
            .collect();

        Self { vocab, idf }
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    /// L2-normalized TF-IDF features for a text. Unknown tokens are ignored.
    pub fn transform(&self, text: &str) -> Features {
        let mut tf: HashMap<usize, f64> = HashMap::new();
        for token in tokenize(text) {
            if let Some(&id) = self.vocab.get(&token) {
                *tf.entry(id).or_insert(0.0) += 1.0;
            }
        }

        let mut features: Features = tf
            .into_iter()
            .map(|(id, count)| (id, count * self.idf[id]))
            .collect();

        let norm = features.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in &mut features {
                *w /= norm;
            }
        }
        features.sort_by_key(|&(id, _)| id);
        features
    }
}

/// Multinomial naive Bayes over TF-IDF features for one label field.
#[derive(Debug, Clone)]
pub struct LabelClassifier {
    classes: Vec<String>,
    log_prior: Vec<f64>,
    /// Per-class log feature probabilities, indexed by vocabulary id.
    feature_log_prob: Vec<Vec<f64>>,
}

impl LabelClassifier {
    /// Train from per-document features and their labels.
    pub fn train(
        features: &[Features],
        labels: &[&str],
        vocab_size: usize,
    ) -> Result<Self, ScoringError> {
        if features.is_empty() || features.len() != labels.len() {
            return Err(ScoringError::EmptyCorpus);
        }

        let mut classes: Vec<String> = Vec::new();
        let mut class_of: Vec<usize> = Vec::with_capacity(labels.len());
        for label in labels {
            let idx = match classes.iter().position(|c| c == label) {
                Some(idx) => idx,
                None => {
                    classes.push((*label).to_string());
                    classes.len() - 1
                }
            };
            class_of.push(idx);
        }

        let n_classes = classes.len();
        let mut class_counts = vec![0usize; n_classes];
        let mut feature_sums = vec![vec![0.0f64; vocab_size]; n_classes];

        for (doc_features, &class) in features.iter().zip(&class_of) {
            class_counts[class] += 1;
            for &(id, weight) in doc_features {
                feature_sums[class][id] += weight;
            }
        }

        let total_docs = features.len() as f64;
        let log_prior = class_counts
            .iter()
            .map(|&c| (c as f64 / total_docs).ln())
            .collect();

        let feature_log_prob = feature_sums
            .iter()
            .map(|sums| {
                let total: f64 = sums.iter().sum::<f64>() + ALPHA * vocab_size as f64;
                sums.iter().map(|&s| ((s + ALPHA) / total).ln()).collect()
            })
            .collect();

        Ok(Self {
            classes,
            log_prior,
            feature_log_prob,
        })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Posterior probability per class for the given features.
    pub fn posteriors(&self, features: &Features) -> Vec<f64> {
        let log_joint: Vec<f64> = (0..self.classes.len())
            .map(|class| {
                let mut lj = self.log_prior[class];
                for &(id, weight) in features {
                    lj += weight * self.feature_log_prob[class][id];
                }
                lj
            })
            .collect();

        // Softmax in log space for numerical stability.
        let max = log_joint
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = log_joint.iter().map(|&lj| (lj - max).exp()).collect();
        let sum: f64 = exps.iter().sum();
        exps.into_iter().map(|e| e / sum).collect()
    }

    /// Predicted label and its posterior probability.
    pub fn predict(&self, features: &Features) -> (String, f64) {
        let posteriors = self.posteriors(features);
        let (idx, &p) = posteriors
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or((0, &0.0));
        (self.classes[idx].clone(), p)
    }

    /// Posterior probability of a specific label; 0 for a label never seen
    /// in training.
    pub fn posterior_for(&self, features: &Features, label: &str) -> f64 {
        match self.classes.iter().position(|c| c == label) {
            Some(idx) => self.posteriors(features)[idx],
            None => 0.0,
        }
    }
}

/// Prediction from the statistical side of the pipeline.
#[derive(Debug, Clone)]
pub struct StatPrediction {
    pub priority: String,
    pub priority_confidence: f64,
    pub team: String,
    pub team_confidence: f64,
}

/// Two independently trained label classifiers sharing one vectorizer.
#[derive(Debug, Clone)]
pub struct StatisticalClassifier {
    vectorizer: TfIdfVectorizer,
    priority: LabelClassifier,
    team: LabelClassifier,
}

impl StatisticalClassifier {
    /// Train both classifiers from the corpus (issue + resolution text).
    pub fn train(corpus: &TrainingCorpus) -> Result<Self, ScoringError> {
        let texts = corpus.training_texts();
        let vectorizer = TfIdfVectorizer::fit(&texts);

        let features: Vec<Features> =
            texts.iter().map(|t| vectorizer.transform(t)).collect();
        let priority_labels: Vec<&str> =
            corpus.records().iter().map(|r| r.priority.as_str()).collect();
        let team_labels: Vec<&str> =
            corpus.records().iter().map(|r| r.team.as_str()).collect();

        let vocab_size = vectorizer.vocab_size();
        let priority = LabelClassifier::train(&features, &priority_labels, vocab_size)?;
        let team = LabelClassifier::train(&features, &team_labels, vocab_size)?;

        Ok(Self {
            vectorizer,
            priority,
            team,
        })
    }

    pub fn predict(&self, text: &str) -> StatPrediction {
        let features = self.vectorizer.transform(text);
        let (priority, priority_confidence) = self.priority.predict(&features);
        let (team, team_confidence) = self.team.predict(&features);
        StatPrediction {
            priority,
            priority_confidence,
            team,
            team_confidence,
        }
    }

    /// Posterior of an arbitrary priority label (used after voting).
    pub fn priority_posterior(&self, text: &str, label: &str) -> f64 {
        let features = self.vectorizer.transform(text);
        self.priority.posterior_for(&features, label)
    }

    /// Posterior of an arbitrary team label (used after voting).
    pub fn team_posterior(&self, text: &str, label: &str) -> f64 {
        let features = self.vectorizer.transform(text);
        self.team.posterior_for(&features, label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::corpus::CorpusRecord;

    fn small_corpus() -> TrainingCorpus {
        TrainingCorpus::from_records(vec![
            CorpusRecord {
                issue: "vpn tunnel drops and reconnects constantly".into(),
                resolution: "reset the gateway profile".into(),
                priority: "P2".into(),
                team: "Network".into(),
            },
            CorpusRecord {
                issue: "vpn client cannot reach internal hosts".into(),
                resolution: "push split tunnel routes".into(),
                priority: "P2".into(),
                team: "Network".into(),
            },
            CorpusRecord {
                issue: "payroll report shows wrong totals".into(),
                resolution: "rerun the aggregation job".into(),
                priority: "P1".into(),
                team: "Apps".into(),
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_vectorizer_ignores_unknown_tokens() {
        let v = TfIdfVectorizer::fit(&["alpha beta", "beta gamma"]);
        assert!(v.transform("zeta omega").is_empty());
        assert!(!v.transform("alpha").is_empty());
    }

    #[test]
    fn test_features_are_l2_normalized() {
        let v = TfIdfVectorizer::fit(&["alpha beta gamma", "beta gamma delta"]);
        let f = v.transform("alpha beta beta");
        let norm: f64 = f.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_classifier_recovers_training_labels() {
        let stats = StatisticalClassifier::train(&small_corpus()).unwrap();

        let network = stats.predict("vpn tunnel drops on reconnect");
        assert_eq!(network.team, "Network");
        assert!(network.team_confidence > 0.5);

        let apps = stats.predict("payroll totals look wrong in the report");
        assert_eq!(apps.team, "Apps");
    }

    #[test]
    fn test_posteriors_sum_to_one() {
        let stats = StatisticalClassifier::train(&small_corpus()).unwrap();
        let features = stats.vectorizer.transform("vpn drops");
        let sum: f64 = stats.team.posteriors(&features).iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unseen_label_posterior_is_zero() {
        let stats = StatisticalClassifier::train(&small_corpus()).unwrap();
        assert_eq!(stats.priority_posterior("vpn drops", "P9"), 0.0);
    }
}
