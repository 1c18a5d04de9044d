//! Analyser node: routes on the L2 pass count and combined score.

use tracing::{error, info};

use crate::config::TriageConfig;
use crate::ticket::{TicketState, TicketStatus};

/// Pick the next phase after an L2 pass.
///
/// Below the cap: a score under the first threshold means the description
/// is too thin, ask the user for more. On the final pass: a score still
/// under the (stricter) second threshold means automated resolution failed,
/// escalate. A pass count of zero or past the cap is an engine-level
/// inconsistency and terminates the run with an error status.
pub fn run(config: &TriageConfig, state: &mut TicketState) {
    let score = state.combined_score.unwrap_or(0.0);

    if state.l2_count == 0 || state.l2_count > config.max_l2_passes {
        error!(
            ticket_id = %state.ticket_id,
            l2_count = state.l2_count,
            "invalid l2 pass count"
        );
        state.status = TicketStatus::Error;
        return;
    }

    state.status = if state.l2_count < config.max_l2_passes {
        if score < config.first_pass_threshold {
            TicketStatus::MoreInfoNeeded
        } else {
            TicketStatus::FeedbackNeeded
        }
    } else if score < config.second_pass_threshold {
        TicketStatus::L3L4ClassificationNeeded
    } else {
        TicketStatus::FeedbackNeeded
    };

    info!(
        ticket_id = %state.ticket_id,
        l2_count = state.l2_count,
        score,
        status = %state.status,
        "analyser routed ticket"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(l2_count: u32, score: f64) -> TicketState {
        let mut state = TicketState::new("T-1", "user@example.com", "vpn drops");
        state.l2_count = l2_count;
        state.combined_score = Some(score);
        state
    }

    #[test]
    fn test_first_pass_below_threshold_needs_more_info() {
        let config = TriageConfig::default();
        let mut state = state_with(1, 0.69);
        run(&config, &mut state);
        assert_eq!(state.status, TicketStatus::MoreInfoNeeded);
    }

    #[test]
    fn test_first_pass_at_threshold_needs_feedback() {
        let config = TriageConfig::default();
        let mut state = state_with(1, 0.7);
        run(&config, &mut state);
        assert_eq!(state.status, TicketStatus::FeedbackNeeded);
    }

    #[test]
    fn test_second_pass_below_threshold_escalates() {
        let config = TriageConfig::default();
        let mut state = state_with(2, 0.79);
        run(&config, &mut state);
        assert_eq!(state.status, TicketStatus::L3L4ClassificationNeeded);
    }

    #[test]
    fn test_second_pass_at_threshold_needs_feedback() {
        let config = TriageConfig::default();
        let mut state = state_with(2, 0.8);
        run(&config, &mut state);
        assert_eq!(state.status, TicketStatus::FeedbackNeeded);
    }

    #[test]
    fn test_invalid_pass_count_is_an_error() {
        let config = TriageConfig::default();
        let mut state = state_with(0, 0.9);
        run(&config, &mut state);
        assert_eq!(state.status, TicketStatus::Error);

        let mut state = state_with(3, 0.9);
        run(&config, &mut state);
        assert_eq!(state.status, TicketStatus::Error);
    }

    #[test]
    fn test_intermediate_pass_loops_to_more_info_under_larger_cap() {
        let config = TriageConfig {
            max_l2_passes: 3,
            ..TriageConfig::default()
        };

        // Second of three passes behaves like a first pass.
        let mut state = state_with(2, 0.5);
        run(&config, &mut state);
        assert_eq!(state.status, TicketStatus::MoreInfoNeeded);

        let mut state = state_with(2, 0.75);
        run(&config, &mut state);
        assert_eq!(state.status, TicketStatus::FeedbackNeeded);

        // Only the final pass escalates.
        let mut state = state_with(3, 0.5);
        run(&config, &mut state);
        assert_eq!(state.status, TicketStatus::L3L4ClassificationNeeded);

        let mut state = state_with(4, 0.9);
        run(&config, &mut state);
        assert_eq!(state.status, TicketStatus::Error);
    }

    #[test]
    fn test_missing_score_counts_as_zero() {
        let config = TriageConfig::default();
        let mut state = state_with(1, 0.0);
        state.combined_score = None;
        run(&config, &mut state);
        assert_eq!(state.status, TicketStatus::MoreInfoNeeded);
    }
}
