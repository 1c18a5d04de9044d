//! L2 node: automated classification and resolution via the scoring engine.

use tracing::{info, warn};

use crate::capabilities::LlmCapability;
use crate::scoring::{Scorer, ScoringError};
use crate::ticket::{TicketState, TicketStatus};

/// Score the ticket and record the prediction.
///
/// For a novel issue the stored resolutions do not apply; fresh resolution
/// text is synthesized from the nearest historical examples. A synthesis
/// failure keeps the scorer's provisional resolution rather than aborting
/// the pass.
///
/// On a scoring failure the state is left untouched so the analyser sees
/// the inconsistency instead of a half-written prediction.
pub async fn run(
    scorer: &dyn Scorer,
    llm: &dyn LlmCapability,
    state: &mut TicketState,
) -> Result<(), ScoringError> {
    let result = scorer.predict(&state.combined_issue_text()).await?;

    let resolution = if result.is_new_issue {
        // Condition synthesis on both retrieval sides: the BM25 best match
        // first, then the semantic neighbours.
        let mut candidates = result.nearest.clone();
        if let Some(lexical) = &result.lexical_match {
            candidates.insert(0, lexical.clone());
        }
        match llm.synthesize_resolution(&state.description, &candidates).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    ticket_id = %state.ticket_id,
                    error = %e,
                    "resolution synthesis failed, keeping provisional resolution"
                );
                result.resolution
            }
        }
    } else {
        result.resolution
    };

    state.priority = Some(result.priority);
    state.classified_team = Some(result.classified_team);
    state.resolution = Some(resolution);
    state.combined_score = Some(result.combined_score);
    state.l2_is_new = Some(result.is_new_issue);
    state.l2_count += 1;
    state.status = TicketStatus::L2Processed;

    info!(
        ticket_id = %state.ticket_id,
        l2_count = state.l2_count,
        combined_score = result.combined_score,
        is_new_issue = result.is_new_issue,
        "l2 pass complete"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{LlmError, RcaOutput, TierLabel};
    use crate::scoring::{NearestExample, ScoringResult};
    use async_trait::async_trait;

    struct FixedScorer(ScoringResult);

    #[async_trait]
    impl Scorer for FixedScorer {
        async fn predict(&self, _issue_text: &str) -> Result<ScoringResult, ScoringError> {
            Ok(self.0.clone())
        }
    }

    struct FailingScorer;

    #[async_trait]
    impl Scorer for FailingScorer {
        async fn predict(&self, _issue_text: &str) -> Result<ScoringResult, ScoringError> {
            Err(ScoringError::NoUsableCandidate)
        }
    }

    struct StubLlm;

    #[async_trait]
    impl LlmCapability for StubLlm {
        async fn classify_tier(&self, _: &str, _: &str) -> Result<TierLabel, LlmError> {
            Ok(TierLabel::L3)
        }

        async fn generate_rca(&self, _: &str) -> Result<RcaOutput, LlmError> {
            Ok(RcaOutput {
                rca: "rca".into(),
                pm: "pm".into(),
            })
        }

        async fn synthesize_resolution(
            &self,
            _: &str,
            _: &[NearestExample],
        ) -> Result<String, LlmError> {
            Ok("synthesized steps".into())
        }
    }

    fn known_result() -> ScoringResult {
        ScoringResult {
            priority: "P2".into(),
            classified_team: "Network".into(),
            resolution: "reset the gateway profile".into(),
            combined_score: 0.85,
            is_new_issue: false,
            lexical_score: 9.1,
            semantic_score: 0.8,
            nearest: Vec::new(),
            lexical_match: None,
        }
    }

    #[tokio::test]
    async fn test_known_issue_reuses_stored_resolution() {
        let mut state = TicketState::new("T-1", "user@example.com", "vpn drops");
        run(&FixedScorer(known_result()), &StubLlm, &mut state)
            .await
            .unwrap();

        assert_eq!(state.status, TicketStatus::L2Processed);
        assert_eq!(state.l2_count, 1);
        assert_eq!(state.resolution.as_deref(), Some("reset the gateway profile"));
        assert_eq!(state.combined_score, Some(0.85));
        assert_eq!(state.l2_is_new, Some(false));
    }

    #[tokio::test]
    async fn test_novel_issue_synthesizes_resolution() {
        let mut result = known_result();
        result.is_new_issue = true;
        let mut state = TicketState::new("T-1", "user@example.com", "brand new problem");
        run(&FixedScorer(result), &StubLlm, &mut state).await.unwrap();

        assert_eq!(state.resolution.as_deref(), Some("synthesized steps"));
        assert_eq!(state.l2_is_new, Some(true));
    }

    #[tokio::test]
    async fn test_synthesis_sees_lexical_candidate_before_semantic_neighbours() {
        use std::sync::Mutex;

        #[derive(Default)]
        struct RecordingLlm {
            candidates: Mutex<Vec<NearestExample>>,
        }

        #[async_trait]
        impl LlmCapability for RecordingLlm {
            async fn classify_tier(&self, _: &str, _: &str) -> Result<TierLabel, LlmError> {
                unimplemented!("not used in l2 tests")
            }

            async fn generate_rca(&self, _: &str) -> Result<RcaOutput, LlmError> {
                unimplemented!("not used in l2 tests")
            }

            async fn synthesize_resolution(
                &self,
                _: &str,
                nearest: &[NearestExample],
            ) -> Result<String, LlmError> {
                *self.candidates.lock().unwrap() = nearest.to_vec();
                Ok("synthesized steps".into())
            }
        }

        let mut result = known_result();
        result.is_new_issue = true;
        result.nearest = vec![NearestExample {
            resolution: "clear the embedding cache".into(),
            similarity: 0.4,
        }];
        result.lexical_match = Some(NearestExample {
            resolution: "restart the ingest worker".into(),
            similarity: 5.2,
        });

        let llm = RecordingLlm::default();
        let mut state = TicketState::new("T-1", "user@example.com", "brand new problem");
        run(&FixedScorer(result), &llm, &mut state).await.unwrap();

        let candidates = llm.candidates.lock().unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].resolution, "restart the ingest worker");
        assert_eq!(candidates[0].similarity, 5.2);
        assert_eq!(candidates[1].resolution, "clear the embedding cache");
    }

    #[tokio::test]
    async fn test_scoring_failure_leaves_state_untouched() {
        let mut state = TicketState::new("T-1", "user@example.com", "vpn drops");
        let before = state.clone();
        let err = run(&FailingScorer, &StubLlm, &mut state).await.unwrap_err();

        assert!(matches!(err, ScoringError::NoUsableCandidate));
        assert_eq!(state.status, before.status);
        assert_eq!(state.l2_count, before.l2_count);
        assert!(state.resolution.is_none());
    }
}
