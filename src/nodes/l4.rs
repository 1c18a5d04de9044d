//! L4 node: hand-off stub for human intervention.

use tracing::info;

use crate::ticket::TicketState;

pub fn run(state: &mut TicketState) {
    state.l4_status = Some("Pending human intervention".to_string());
    info!(
        ticket_id = %state.ticket_id,
        team = state.classified_team.as_deref().unwrap_or("unassigned"),
        "ticket handed to l4"
    );
}
