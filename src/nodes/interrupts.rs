//! Interrupt-point node bodies.
//!
//! These run only on resume, after the engine has applied the external
//! state updates that ended the pause.

use tracing::info;

use crate::ticket::{TicketState, TicketStatus};

/// More-info node: the appended description and `additional_info` were
/// injected on resume; nothing further to do before the next L2 pass.
pub fn more_info(state: &mut TicketState) {
    info!(
        ticket_id = %state.ticket_id,
        "additional info received, rerunning l2"
    );
}

/// Feedback node: turn the user's verdict into the next phase. An absent
/// verdict counts as unsatisfied.
pub fn feedback(state: &mut TicketState) {
    if state.feedback_satisfied.unwrap_or(false) {
        state.status = TicketStatus::Resolved;
        info!(ticket_id = %state.ticket_id, "user confirmed resolution");
    } else {
        state.status = TicketStatus::L3L4ClassificationNeeded;
        info!(
            ticket_id = %state.ticket_id,
            "user rejected resolution, escalating to tier classification"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_satisfied_feedback_resolves() {
        let mut state = TicketState::new("T-1", "user@example.com", "vpn drops");
        state.feedback_satisfied = Some(true);
        feedback(&mut state);
        assert_eq!(state.status, TicketStatus::Resolved);
    }

    #[test]
    fn test_unsatisfied_feedback_escalates() {
        let mut state = TicketState::new("T-1", "user@example.com", "vpn drops");
        state.feedback_satisfied = Some(false);
        feedback(&mut state);
        assert_eq!(state.status, TicketStatus::L3L4ClassificationNeeded);
    }

    #[test]
    fn test_missing_verdict_counts_as_unsatisfied() {
        let mut state = TicketState::new("T-1", "user@example.com", "vpn drops");
        feedback(&mut state);
        assert_eq!(state.status, TicketStatus::L3L4ClassificationNeeded);
    }
}
