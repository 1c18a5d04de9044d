//! L3 node: hand-off stub for development-level resolution.

use tracing::info;

use crate::ticket::TicketState;

pub fn run(state: &mut TicketState) {
    state.l3_resolution = Some("Processing development issue".to_string());
    info!(ticket_id = %state.ticket_id, "ticket handed to l3");
}
