//! Mail node: notify the user of the ticket's current phase.
//!
//! The node builds the notification payload from the state; rendering the
//! message text is shared here so every [`crate::capabilities::Notifier`]
//! implementation sends the same wording.

use tracing::info;

use crate::capabilities::{NotificationDetails, Notifier, NotifyError};
use crate::ticket::{TicketState, TicketStatus};

pub async fn run(notifier: &dyn Notifier, state: &TicketState) -> Result<(), NotifyError> {
    let details = NotificationDetails {
        priority: state.priority.clone(),
        classified_team: state.classified_team.clone(),
        resolution: state.resolution.clone(),
    };

    notifier
        .send(&state.user_email, &state.ticket_id, state.status, &details)
        .await?;

    info!(
        ticket_id = %state.ticket_id,
        status = %state.status,
        "notification sent"
    );
    Ok(())
}

/// Subject line for a ticket notification.
pub fn message_subject(ticket_id: &str) -> String {
    format!("Ticket Update: {ticket_id}")
}

/// Plain-text message body for a ticket notification.
pub fn message_body(ticket_id: &str, status: TicketStatus, details: &NotificationDetails) -> String {
    let or_na = |field: &Option<String>| field.clone().unwrap_or_else(|| "N/A".to_string());

    match status {
        TicketStatus::L2Processed => format!(
            "Dear User,\n\n\
             Your ticket {ticket_id} has been processed by our L2 agent.\n\n\
             Priority: {}\n\n\
             Assigned Team: {}\n\n\
             Resolution suggested: {}\n\n\
             Please wait for further updates or provide feedback if requested.\n\n\
             Best regards,\nSupport Team",
            or_na(&details.priority),
            or_na(&details.classified_team),
            or_na(&details.resolution),
        ),
        TicketStatus::MoreInfoNeeded => format!(
            "Dear User,\n\n\
             Your ticket {ticket_id} requires additional information to proceed.\n\n\
             Please provide more details via our application.\n\n\
             Best regards,\nSupport Team"
        ),
        TicketStatus::FeedbackNeeded => format!(
            "Dear User,\n\n\
             Your ticket {ticket_id} has a proposed resolution: {}.\n\n\
             Do tell us if this has resolved your issue via our application.\n\n\
             Best regards,\nSupport Team",
            or_na(&details.resolution),
        ),
        TicketStatus::L3Processing => format!(
            "Dear User,\n\n\
             Your ticket {ticket_id} has been escalated to L3 for development-level resolution.\n\n\
             Status: Processing\n\n\
             We will update you once the issue is resolved.\n\n\
             Best regards,\nSupport Team"
        ),
        TicketStatus::L4Escalated => format!(
            "Dear User,\n\n\
             Your ticket {ticket_id} has been escalated to L4 for human intervention.\n\n\
             Assigned Team: {}\n\n\
             Status: Pending\n\n\
             We will update you once the issue is resolved.\n\n\
             Best regards,\nSupport Team",
            or_na(&details.classified_team),
        ),
        other => format!(
            "Dear User,\n\n\
             Your ticket {ticket_id} status has been updated: {other}.\n\
             Please contact support for further details.\n\n\
             Best regards,\nSupport Team"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, TicketStatus)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(
            &self,
            to_email: &str,
            _ticket_id: &str,
            status: TicketStatus,
            _details: &NotificationDetails,
        ) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push((to_email.to_string(), status));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_mail_node_sends_current_status() {
        let notifier = RecordingNotifier::default();
        let mut state = TicketState::new("T-1", "user@example.com", "vpn drops");
        state.status = TicketStatus::FeedbackNeeded;
        state.resolution = Some("reset the gateway profile".into());

        run(&notifier, &state).await.unwrap();

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], ("user@example.com".to_string(), TicketStatus::FeedbackNeeded));
    }

    #[test]
    fn test_feedback_body_carries_resolution() {
        let details = NotificationDetails {
            resolution: Some("reset the gateway profile".into()),
            ..Default::default()
        };
        let body = message_body("T-1", TicketStatus::FeedbackNeeded, &details);
        assert!(body.contains("proposed resolution: reset the gateway profile"));
    }

    #[test]
    fn test_l4_body_names_team() {
        let details = NotificationDetails {
            classified_team: Some("Network".into()),
            ..Default::default()
        };
        let body = message_body("T-1", TicketStatus::L4Escalated, &details);
        assert!(body.contains("escalated to L4"));
        assert!(body.contains("Assigned Team: Network"));
    }

    #[test]
    fn test_missing_fields_render_as_na() {
        let body = message_body("T-1", TicketStatus::L2Processed, &NotificationDetails::default());
        assert!(body.contains("Priority: N/A"));
    }
}
