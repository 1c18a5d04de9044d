//! Tier classification node: L3 (development fix) versus L4 (human
//! intervention), decided by the LLM capability's structured output.

use tracing::info;

use crate::capabilities::{LlmCapability, LlmError, TierLabel};
use crate::ticket::{TicketState, TicketStatus};

pub async fn run(llm: &dyn LlmCapability, state: &mut TicketState) -> Result<(), LlmError> {
    let additional_info = state.additional_info.as_deref().unwrap_or("");
    let label = llm.classify_tier(&state.description, additional_info).await?;

    state.status = match label {
        TierLabel::L3 => TicketStatus::L3Processing,
        TierLabel::L4 => TicketStatus::L4Escalated,
    };

    info!(ticket_id = %state.ticket_id, tier = %label, "ticket tier classified");
    Ok(())
}
