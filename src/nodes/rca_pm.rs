//! RCA node: root cause analysis and preventive measures for the ticket,
//! generated once at entry in parallel with the L2 pass.

use tracing::info;

use crate::capabilities::{LlmCapability, LlmError};
use crate::ticket::TicketState;

pub async fn run(llm: &dyn LlmCapability, state: &mut TicketState) -> Result<(), LlmError> {
    let output = llm.generate_rca(&state.description).await?;
    state.rca = Some(output.rca);
    state.pm = Some(output.pm);
    info!(ticket_id = %state.ticket_id, "rca and preventive measures generated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{RcaOutput, TierLabel};
    use crate::scoring::NearestExample;
    use async_trait::async_trait;

    struct RcaLlm;

    #[async_trait]
    impl LlmCapability for RcaLlm {
        async fn classify_tier(&self, _: &str, _: &str) -> Result<TierLabel, LlmError> {
            unimplemented!("not used in rca tests")
        }

        async fn generate_rca(&self, _: &str) -> Result<RcaOutput, LlmError> {
            Ok(RcaOutput {
                rca: "stale dns cache on the client".into(),
                pm: "shorten the dns ttl".into(),
            })
        }

        async fn synthesize_resolution(
            &self,
            _: &str,
            _: &[NearestExample],
        ) -> Result<String, LlmError> {
            unimplemented!("not used in rca tests")
        }
    }

    #[tokio::test]
    async fn test_rca_outputs_recorded() {
        let mut state = TicketState::new("T-1", "user@example.com", "vpn drops");
        run(&RcaLlm, &mut state).await.unwrap();
        assert_eq!(state.rca.as_deref(), Some("stale dns cache on the client"));
        assert_eq!(state.pm.as_deref(), Some("shorten the dns ttl"));
    }
}
