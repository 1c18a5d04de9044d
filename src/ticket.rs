//! Ticket state — the record threaded through every workflow node,
//! plus the durable ticket row mirrored into the ticket store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current node/phase tag of a ticket's run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Freshly submitted, not yet processed.
    New,
    /// L2 agent has produced a classified prediction.
    L2Processed,
    /// Analyser decided the description is too thin; user must add detail.
    MoreInfoNeeded,
    /// Paused at the more-info interrupt awaiting the user's reply.
    AwaitingMoreInfo,
    /// Analyser is confident enough to ask the user whether the proposed
    /// resolution worked.
    FeedbackNeeded,
    /// Paused at the feedback interrupt awaiting the user's verdict.
    AwaitingFeedback,
    /// Confidence stayed low after the second pass; route to tier
    /// classification.
    L3L4ClassificationNeeded,
    /// Classified as a development issue, handed to L3.
    L3Processing,
    /// Classified as needing human intervention, handed to L4.
    L4Escalated,
    /// User confirmed the resolution.
    Resolved,
    /// Routing or classification produced an unusable value; terminal.
    Error,
}

impl TicketStatus {
    /// Whether this status ends a run outright (no outgoing edge).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Error)
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::L2Processed => write!(f, "l2_processed"),
            Self::MoreInfoNeeded => write!(f, "more_info_needed"),
            Self::AwaitingMoreInfo => write!(f, "awaiting_more_info"),
            Self::FeedbackNeeded => write!(f, "feedback_needed"),
            Self::AwaitingFeedback => write!(f, "awaiting_feedback"),
            Self::L3L4ClassificationNeeded => write!(f, "l3_l4_classification_needed"),
            Self::L3Processing => write!(f, "l3_processing"),
            Self::L4Escalated => write!(f, "l4_escalated"),
            Self::Resolved => write!(f, "resolved"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Key addressing a single ticket's run.
///
/// Doubles as the checkpoint key and the mutual-exclusion key: two
/// concurrent runs for the same pair must never interleave.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunKey {
    pub user_email: String,
    pub ticket_id: String,
}

impl RunKey {
    pub fn new(user_email: &str, ticket_id: &str) -> Self {
        Self {
            user_email: user_email.to_string(),
            ticket_id: ticket_id.to_string(),
        }
    }
}

impl std::fmt::Display for RunKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.user_email, self.ticket_id)
    }
}

/// The unit of work: one per ticket, one active run per ticket at a time.
///
/// Mutated exclusively by node executions inside the workflow engine;
/// external handlers inject [`crate::workflow::StateUpdates`] and resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketState {
    pub ticket_id: String,
    pub user_email: String,
    /// Append-only: "more info" submissions are concatenated, never
    /// overwritten.
    pub description: String,
    /// The last submitted info-request answer.
    pub additional_info: Option<String>,
    pub status: TicketStatus,
    /// Incremented each time the L2 node runs; drives analyser thresholds.
    pub l2_count: u32,
    pub feedback: Option<String>,
    /// Unset until the user answers the feedback request.
    pub feedback_satisfied: Option<bool>,
    pub priority: Option<String>,
    pub classified_team: Option<String>,
    pub resolution: Option<String>,
    /// Mean of the four scoring confidences; the routing signal.
    pub combined_score: Option<f64>,
    pub l2_is_new: Option<bool>,
    pub l3_resolution: Option<String>,
    pub l4_status: Option<String>,
    /// Root cause analysis, written by the RCA entry branch.
    pub rca: Option<String>,
    /// Preventive measures, written by the RCA entry branch.
    pub pm: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TicketState {
    /// Create the initial state for a freshly submitted ticket.
    pub fn new(ticket_id: &str, user_email: &str, description: &str) -> Self {
        Self {
            ticket_id: ticket_id.to_string(),
            user_email: user_email.to_string(),
            description: description.to_string(),
            additional_info: None,
            status: TicketStatus::New,
            l2_count: 0,
            feedback: None,
            feedback_satisfied: None,
            priority: None,
            classified_team: None,
            resolution: None,
            combined_score: None,
            l2_is_new: None,
            l3_resolution: None,
            l4_status: None,
            rca: None,
            pm: None,
            created_at: Utc::now(),
        }
    }

    pub fn run_key(&self) -> RunKey {
        RunKey::new(&self.user_email, &self.ticket_id)
    }

    /// Record a "more info" submission: append to the description and keep
    /// the answer for the next L2 pass.
    pub fn append_additional_info(&mut self, info: &str) {
        self.description.push_str("\nAdditional Info: ");
        self.description.push_str(info);
        self.additional_info = Some(info.to_string());
    }

    /// The text the L2 agent scores: description plus the latest answer.
    pub fn combined_issue_text(&self) -> String {
        match &self.additional_info {
            Some(info) => format!("{} {}", self.description, info),
            None => self.description.clone(),
        }
    }
}

/// Durable ticket row — the source of truth read by external observers
/// while a run is paused or finished.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub sys_id: String,
    pub email: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: Option<String>,
    pub classified_team: Option<String>,
    pub feedback: Option<String>,
    pub l2_is_new: Option<bool>,
    pub l2_resolution: Option<String>,
    pub l3_resolution: Option<String>,
    pub l4_status: Option<String>,
    /// Origin system (e.g. servicenow, jira).
    pub source: Option<String>,
    /// Root cause analysis, written by the RCA branch.
    pub rca: Option<String>,
    /// Preventive measures, written by the RCA branch.
    pub pm: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Create a durable row for a fresh submission.
    pub fn new(sys_id: &str, email: &str, description: &str) -> Self {
        let now = Utc::now();
        Self {
            sys_id: sys_id.to_string(),
            email: email.to_string(),
            description: description.to_string(),
            status: TicketStatus::New,
            priority: None,
            classified_team: None,
            feedback: None,
            l2_is_new: None,
            l2_resolution: None,
            l3_resolution: None,
            l4_status: None,
            source: None,
            rca: None,
            pm: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mirror the run state into this row. Overwrites the same fields with
    /// the same values on a duplicate node run, which keeps re-execution
    /// harmless.
    pub fn apply_state(&mut self, state: &TicketState) {
        self.description = state.description.clone();
        self.status = state.status;
        self.priority = state.priority.clone();
        self.classified_team = state.classified_team.clone();
        self.feedback = state.feedback.clone();
        self.l2_is_new = state.l2_is_new;
        self.l2_resolution = state.resolution.clone();
        self.l3_resolution = state.l3_resolution.clone();
        self.l4_status = state.l4_status.clone();
        if state.rca.is_some() {
            self.rca = state.rca.clone();
        }
        if state.pm.is_some() {
            self.pm = state.pm.clone();
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_tags() {
        assert_eq!(TicketStatus::New.to_string(), "new");
        assert_eq!(TicketStatus::L2Processed.to_string(), "l2_processed");
        assert_eq!(
            TicketStatus::L3L4ClassificationNeeded.to_string(),
            "l3_l4_classification_needed"
        );
        assert_eq!(TicketStatus::AwaitingMoreInfo.to_string(), "awaiting_more_info");
        assert_eq!(TicketStatus::L4Escalated.to_string(), "l4_escalated");
    }

    #[test]
    fn test_additional_info_appends() {
        let mut state = TicketState::new("T-1", "user@example.com", "printer jams");
        state.append_additional_info("model X200, error E4");

        assert!(state.description.starts_with("printer jams"));
        assert!(state.description.contains("Additional Info: model X200"));
        assert_eq!(state.additional_info.as_deref(), Some("model X200, error E4"));

        // A second submission appends again, never overwrites.
        state.append_additional_info("tray two only");
        assert!(state.description.contains("model X200"));
        assert!(state.description.contains("tray two only"));
    }

    #[test]
    fn test_run_key_display() {
        let state = TicketState::new("T-9", "a@b.c", "x");
        assert_eq!(state.run_key().to_string(), "a@b.c:T-9");
    }

    #[test]
    fn test_apply_state_mirrors_outputs() {
        let mut ticket = Ticket::new("T-1", "user@example.com", "desc");
        let mut state = TicketState::new("T-1", "user@example.com", "desc");
        state.status = TicketStatus::L2Processed;
        state.priority = Some("P2".into());
        state.resolution = Some("restart the spooler".into());

        ticket.apply_state(&state);
        assert_eq!(ticket.status, TicketStatus::L2Processed);
        assert_eq!(ticket.l2_resolution.as_deref(), Some("restart the spooler"));
    }
}
