//! External capability interfaces the workflow nodes consume.
//!
//! The HTTP layer, relational storage, mail delivery, and LLM invocation
//! live outside this crate; nodes see them only through these traits.
//! In-memory implementations are provided for the ticket store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::scoring::NearestExample;
use crate::ticket::{Ticket, TicketStatus};

/// Tier label produced by the L3/L4 classification capability.
///
/// The structured-output contract: the capability returns exactly one of
/// these labels or fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TierLabel {
    /// Development issue fixable in under forty engineering hours.
    L3,
    /// Needs human intervention or exceeds forty hours.
    L4,
}

impl std::fmt::Display for TierLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::L3 => write!(f, "L3"),
            Self::L4 => write!(f, "L4"),
        }
    }
}

/// Structured output of the RCA/preventive-measures capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RcaOutput {
    /// Root cause analysis paragraph.
    pub rca: String,
    /// Preventive measures paragraph.
    pub pm: String,
}

/// Error type for LLM capability calls.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM returned an unusable value: {0}")]
    InvalidOutput(String),

    #[error("LLM capability unavailable: {0}")]
    Unavailable(String),
}

/// The narrow LLM surface the triage pipeline consumes.
#[async_trait]
pub trait LlmCapability: Send + Sync {
    /// Label the ticket L3 or L4 given its description and any additional
    /// info the user supplied.
    async fn classify_tier(
        &self,
        description: &str,
        additional_info: &str,
    ) -> Result<TierLabel, LlmError>;

    /// Produce a root cause analysis and preventive measures for the ticket.
    async fn generate_rca(&self, description: &str) -> Result<RcaOutput, LlmError>;

    /// Compose fresh resolution text for a novel issue, conditioned on the
    /// nearest historical resolutions and their similarity scores.
    async fn synthesize_resolution(
        &self,
        description: &str,
        nearest: &[NearestExample],
    ) -> Result<String, LlmError>;
}

/// Payload handed to the notifier alongside the status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationDetails {
    pub priority: Option<String>,
    pub classified_team: Option<String>,
    pub resolution: Option<String>,
}

/// Error type for notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Outbound notification channel. Fire-and-forget: a delivery failure is
/// logged by the caller and never aborts a run.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        to_email: &str,
        ticket_id: &str,
        status: TicketStatus,
        details: &NotificationDetails,
    ) -> Result<(), NotifyError>;
}

/// Error type for ticket store operations.
#[derive(Debug, thiserror::Error)]
pub enum TicketStoreError {
    #[error("ticket store unavailable: {0}")]
    Unavailable(String),

    #[error("lock poisoned")]
    LockPoisoned,
}

/// Durable home for ticket rows; the workflow nodes read and write ticket
/// fields through this.
#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn find_by_sys_id(&self, sys_id: &str) -> Result<Option<Ticket>, TicketStoreError>;

    async fn upsert(&self, ticket: Ticket) -> Result<(), TicketStoreError>;
}

/// In-memory ticket store, keyed by `sys_id`.
#[derive(Default)]
pub struct InMemoryTicketStore {
    inner: RwLock<HashMap<String, Ticket>>,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn find_by_sys_id(&self, sys_id: &str) -> Result<Option<Ticket>, TicketStoreError> {
        let inner = self.inner.read().map_err(|_| TicketStoreError::LockPoisoned)?;
        Ok(inner.get(sys_id).cloned())
    }

    async fn upsert(&self, ticket: Ticket) -> Result<(), TicketStoreError> {
        let mut inner = self.inner.write().map_err(|_| TicketStoreError::LockPoisoned)?;
        inner.insert(ticket.sys_id.clone(), ticket);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store_roundtrip() {
        let store = InMemoryTicketStore::new();
        let ticket = Ticket::new("T-1", "user@example.com", "vpn drops hourly");

        store.upsert(ticket.clone()).await.unwrap();
        let found = store.find_by_sys_id("T-1").await.unwrap().unwrap();
        assert_eq!(found.email, "user@example.com");

        assert!(store.find_by_sys_id("T-404").await.unwrap().is_none());
    }

    #[test]
    fn test_tier_label_display() {
        assert_eq!(TierLabel::L3.to_string(), "L3");
        assert_eq!(TierLabel::L4.to_string(), "L4");
    }
}
