//! Node identifiers for the triage graph.
//!
//! The graph is closed: every node is a variant here and every edge lives
//! in the engine's routing table, so an unknown target is unrepresentable.

use serde::{Deserialize, Serialize};

/// One node of the triage graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeId {
    /// Entry branch: root cause analysis and preventive measures.
    RcaPm,
    /// Entry branch: automated L2 classification via the scoring engine.
    L2Agent,
    MailL2,
    /// Conditional router over `l2_count` and `combined_score`.
    Analyser,
    MailMoreInfo,
    /// Interrupt point: waits for the user's additional information.
    MoreInfo,
    MailFeedback,
    /// Interrupt point: waits for the user's resolution verdict.
    FeedbackAgent,
    /// LLM-backed L3-versus-L4 decision.
    L3L4Classifier,
    L3Agent,
    MailL3,
    L4Agent,
    MailL4,
}

impl NodeId {
    /// Interrupt points: the engine refuses to enter these until an
    /// external event supplies the required state.
    pub fn is_interrupt(self) -> bool {
        matches!(self, Self::MoreInfo | Self::FeedbackAgent)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Self::RcaPm => "rca_pm",
            Self::L2Agent => "l2_agent",
            Self::MailL2 => "mail_l2",
            Self::Analyser => "analyser",
            Self::MailMoreInfo => "mail_more_info",
            Self::MoreInfo => "more_info",
            Self::MailFeedback => "mail_feedback",
            Self::FeedbackAgent => "feedback_agent",
            Self::L3L4Classifier => "l3_l4_classifier",
            Self::L3Agent => "l3_agent",
            Self::MailL3 => "mail_l3",
            Self::L4Agent => "l4_agent",
            Self::MailL4 => "mail_l4",
        };
        write!(f, "{tag}")
    }
}
