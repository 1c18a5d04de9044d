//! Workflow engine: executes the triage graph over a ticket state until it
//! reaches an interrupt point or a terminal status.
//!
//! The graph is fixed: the routing table in [`WorkflowEngine::successor`] is
//! the single source of edges. Entry fans out to the RCA branch and the L2
//! branch; interrupt points pause the run with a durable checkpoint and an
//! `awaiting_*` status, and an external event resumes it by key.
//!
//! Failure policy per node kind, applied by the dispatcher:
//! - scoring failure: log and leave the state untouched,
//! - tier classification failure: terminal `error` status,
//! - RCA and notification failures: log and continue,
//! - checkpoint or ticket-store failure: fatal for the call, after bounded
//!   retries for checkpoint writes.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{error, info, warn};

use crate::capabilities::{LlmCapability, Notifier, TicketStore, TicketStoreError};
use crate::config::TriageConfig;
use crate::nodes;
use crate::scoring::Scorer;
use crate::ticket::{RunKey, Ticket, TicketState, TicketStatus};

use super::checkpoint::{Checkpoint, CheckpointStore, StoreError};
use super::node::NodeId;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no route from {node} for status {value}")]
    Routing { node: NodeId, value: String },

    #[error(transparent)]
    Persistence(#[from] StoreError),

    #[error(transparent)]
    TicketStore(#[from] TicketStoreError),

    #[error("a run is already active for {key}")]
    Contention { key: String },

    #[error("no run found for {key}")]
    NotPaused { key: String },

    #[error("run is paused at {expected}, not {found}")]
    WrongNode { expected: NodeId, found: NodeId },
}

/// External updates injected at an interrupt point before resuming.
#[derive(Debug, Clone, Default)]
pub struct StateUpdates {
    pub additional_info: Option<String>,
    pub feedback: Option<String>,
    /// Explicit verdict; when unset it is derived from the feedback text
    /// ("yes", case-insensitive, means satisfied).
    pub feedback_satisfied: Option<bool>,
}

impl StateUpdates {
    pub fn more_info(info: &str) -> Self {
        Self {
            additional_info: Some(info.to_string()),
            ..Self::default()
        }
    }

    pub fn feedback(text: &str) -> Self {
        Self {
            feedback: Some(text.to_string()),
            ..Self::default()
        }
    }

    fn apply(&self, state: &mut TicketState) {
        if let Some(info) = &self.additional_info {
            state.append_additional_info(info);
        }
        if let Some(text) = &self.feedback {
            let satisfied = self
                .feedback_satisfied
                .unwrap_or_else(|| text.trim().eq_ignore_ascii_case("yes"));
            state.feedback = Some(text.clone());
            state.feedback_satisfied = Some(satisfied);
        } else if let Some(verdict) = self.feedback_satisfied {
            state.feedback_satisfied = Some(verdict);
        }
    }
}

/// Result of driving a run: either paused before an interrupt node or
/// finished at a terminal status.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub state: TicketState,
    /// The interrupt node the run is paused before; `None` when terminal.
    pub paused_at: Option<NodeId>,
}

impl RunOutcome {
    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }
}

/// Tracks the checkpoint sequence a run has observed, so every write is a
/// compare-and-swap against the last known value.
struct Cursor {
    stored: Option<u64>,
}

impl Cursor {
    fn fresh() -> Self {
        Self { stored: None }
    }

    fn at(sequence: u64) -> Self {
        Self {
            stored: Some(sequence),
        }
    }

    fn next(&self) -> u64 {
        self.stored.map_or(1, |s| s + 1)
    }
}

/// Removes the run key from the in-process active set when the run call
/// ends, however it ends.
struct ActiveRunGuard<'a> {
    engine: &'a WorkflowEngine,
    key: String,
}

impl Drop for ActiveRunGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut active) = self.engine.active.lock() {
            active.remove(&self.key);
        }
    }
}

/// The triage workflow engine. One instance serves all runs; per-run mutual
/// exclusion is enforced by the active set in-process and by checkpoint
/// compare-and-swap across processes.
pub struct WorkflowEngine {
    scorer: Arc<dyn Scorer>,
    llm: Arc<dyn LlmCapability>,
    tickets: Arc<dyn TicketStore>,
    notifier: Arc<dyn Notifier>,
    checkpoints: Arc<dyn CheckpointStore>,
    config: TriageConfig,
    active: Mutex<HashSet<String>>,
}

impl WorkflowEngine {
    pub fn new(
        scorer: Arc<dyn Scorer>,
        llm: Arc<dyn LlmCapability>,
        tickets: Arc<dyn TicketStore>,
        notifier: Arc<dyn Notifier>,
        checkpoints: Arc<dyn CheckpointStore>,
        config: TriageConfig,
    ) -> Self {
        Self {
            scorer,
            llm,
            tickets,
            notifier,
            checkpoints,
            config,
            active: Mutex::new(HashSet::new()),
        }
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Start a fresh run for a submitted ticket. Rejects the call when a run
    /// for the same `(user_email, ticket_id)` is active or already recorded.
    pub async fn start_run(
        &self,
        ticket_id: &str,
        user_email: &str,
        description: &str,
    ) -> Result<RunOutcome, EngineError> {
        let key = RunKey::new(user_email, ticket_id);
        let _guard = self.claim_active(&key)?;

        if self.checkpoints.get(&key).await?.is_some() {
            return Err(EngineError::Contention {
                key: key.to_string(),
            });
        }

        info!(key = %key, "starting triage run");
        self.tickets
            .upsert(Ticket::new(ticket_id, user_email, description))
            .await?;

        let state = TicketState::new(ticket_id, user_email, description);

        // Entry fan-out: the RCA branch and the L2 branch run concurrently
        // on their own snapshots and write disjoint fields, merged here.
        let mut rca_state = state.clone();
        let mut l2_state = state.clone();
        tokio::join!(
            self.execute(NodeId::RcaPm, &mut rca_state),
            self.execute(NodeId::L2Agent, &mut l2_state),
        );
        let mut state = l2_state;
        state.rca = rca_state.rca;
        state.pm = rca_state.pm;

        let mut cursor = Cursor::fresh();
        self.drive(&key, state, NodeId::L2Agent, &mut cursor).await
    }

    /// Resume a paused run with externally supplied updates. `as_node` must
    /// be the interrupt node the run is paused before. Resuming a finished
    /// run is a no-op returning the final state.
    pub async fn resume_run(
        &self,
        key: &RunKey,
        as_node: NodeId,
        updates: &StateUpdates,
    ) -> Result<RunOutcome, EngineError> {
        let _guard = self.claim_active(key)?;

        let checkpoint = self
            .checkpoints
            .get(key)
            .await?
            .ok_or_else(|| EngineError::NotPaused {
                key: key.to_string(),
            })?;

        let Some(paused) = checkpoint.paused_node else {
            info!(key = %key, "resume of a finished run is a no-op");
            return Ok(RunOutcome {
                state: checkpoint.state,
                paused_at: None,
            });
        };

        if paused != as_node {
            return Err(EngineError::WrongNode {
                expected: paused,
                found: as_node,
            });
        }

        let mut cursor = Cursor::at(checkpoint.sequence);
        let mut state = checkpoint.state;
        updates.apply(&mut state);

        // Claim the resume by bumping the checkpoint first: a concurrent
        // resumer in another process loses the compare-and-swap here
        // instead of re-running nodes.
        self.save_checkpoint(
            Checkpoint::paused(key.clone(), paused, state.clone(), cursor.next()),
            &mut cursor,
        )
        .await?;

        info!(key = %key, node = %paused, "resuming triage run");
        self.execute(paused, &mut state).await;
        self.drive(key, state, paused, &mut cursor).await
    }

    /// Drive the run forward from an already-executed node until it pauses
    /// or finishes.
    async fn drive(
        &self,
        key: &RunKey,
        mut state: TicketState,
        mut current: NodeId,
        cursor: &mut Cursor,
    ) -> Result<RunOutcome, EngineError> {
        loop {
            let next = match self.successor(current, &state) {
                Ok(next) => next,
                Err(EngineError::Routing { node, value }) => {
                    error!(key = %key, node = %node, value = %value, "no route for condition value");
                    state.status = TicketStatus::Error;
                    None
                }
                Err(e) => return Err(e),
            };

            let Some(next) = next else {
                return self.finish(key, state, cursor).await;
            };

            if next.is_interrupt() {
                return self.pause(key, state, next, cursor).await;
            }

            self.execute(next, &mut state).await;
            current = next;
        }
    }

    /// Execute one node body, applying its failure policy.
    async fn execute(&self, node: NodeId, state: &mut TicketState) {
        match node {
            NodeId::RcaPm => {
                if let Err(e) = nodes::rca_pm::run(self.llm.as_ref(), state).await {
                    error!(ticket_id = %state.ticket_id, error = %e, "rca generation failed");
                }
            }
            NodeId::L2Agent => {
                if let Err(e) =
                    nodes::l2::run(self.scorer.as_ref(), self.llm.as_ref(), state).await
                {
                    error!(
                        ticket_id = %state.ticket_id,
                        error = %e,
                        "l2 scoring failed, state left unchanged"
                    );
                }
            }
            NodeId::MailL2
            | NodeId::MailMoreInfo
            | NodeId::MailFeedback
            | NodeId::MailL3
            | NodeId::MailL4 => {
                if let Err(e) = nodes::mail::run(self.notifier.as_ref(), state).await {
                    error!(ticket_id = %state.ticket_id, error = %e, "notification failed");
                }
            }
            NodeId::Analyser => nodes::analyser::run(&self.config, state),
            NodeId::MoreInfo => nodes::interrupts::more_info(state),
            NodeId::FeedbackAgent => nodes::interrupts::feedback(state),
            NodeId::L3L4Classifier => {
                if let Err(e) = nodes::tier::run(self.llm.as_ref(), state).await {
                    error!(ticket_id = %state.ticket_id, error = %e, "tier classification failed");
                    state.status = TicketStatus::Error;
                }
            }
            NodeId::L3Agent => nodes::l3::run(state),
            NodeId::L4Agent => nodes::l4::run(state),
        }
    }

    /// The routing table: static edges plus the three conditional routers.
    /// `Ok(None)` ends the run; an unmatched condition value is an engine
    /// error, never silently ignored.
    fn successor(&self, node: NodeId, state: &TicketState) -> Result<Option<NodeId>, EngineError> {
        use NodeId::*;

        let next = match node {
            RcaPm => None,
            L2Agent => Some(MailL2),
            MailL2 => Some(Analyser),
            Analyser => match state.status {
                TicketStatus::MoreInfoNeeded => Some(MailMoreInfo),
                TicketStatus::FeedbackNeeded => Some(MailFeedback),
                TicketStatus::L3L4ClassificationNeeded => Some(L3L4Classifier),
                TicketStatus::L2Processed | TicketStatus::Error => None,
                other => {
                    return Err(EngineError::Routing {
                        node,
                        value: other.to_string(),
                    })
                }
            },
            MailMoreInfo => Some(MoreInfo),
            MoreInfo => Some(L2Agent),
            MailFeedback => Some(FeedbackAgent),
            FeedbackAgent => match state.status {
                TicketStatus::Resolved => None,
                TicketStatus::L3L4ClassificationNeeded => Some(L3L4Classifier),
                other => {
                    return Err(EngineError::Routing {
                        node,
                        value: other.to_string(),
                    })
                }
            },
            L3L4Classifier => match state.status {
                TicketStatus::L3Processing => Some(L3Agent),
                TicketStatus::L4Escalated => Some(L4Agent),
                TicketStatus::Error => None,
                other => {
                    return Err(EngineError::Routing {
                        node,
                        value: other.to_string(),
                    })
                }
            },
            L3Agent => Some(MailL3),
            MailL3 => None,
            L4Agent => Some(MailL4),
            MailL4 => None,
        };
        Ok(next)
    }

    async fn pause(
        &self,
        key: &RunKey,
        mut state: TicketState,
        node: NodeId,
        cursor: &mut Cursor,
    ) -> Result<RunOutcome, EngineError> {
        state.status = match node {
            NodeId::MoreInfo => TicketStatus::AwaitingMoreInfo,
            _ => TicketStatus::AwaitingFeedback,
        };

        self.save_checkpoint(
            Checkpoint::paused(key.clone(), node, state.clone(), cursor.next()),
            cursor,
        )
        .await?;
        self.sync_ticket(&state).await?;

        info!(key = %key, node = %node, status = %state.status, "run paused at interrupt");
        Ok(RunOutcome {
            state,
            paused_at: Some(node),
        })
    }

    async fn finish(
        &self,
        key: &RunKey,
        state: TicketState,
        cursor: &mut Cursor,
    ) -> Result<RunOutcome, EngineError> {
        self.save_checkpoint(
            Checkpoint::terminal(key.clone(), state.clone(), cursor.next()),
            cursor,
        )
        .await?;
        self.sync_ticket(&state).await?;

        info!(key = %key, status = %state.status, "run finished");
        Ok(RunOutcome {
            state,
            paused_at: None,
        })
    }

    /// Checkpoint write with bounded retries for transient IO failures.
    /// A sequence conflict is never retried: it means another writer won.
    async fn save_checkpoint(
        &self,
        checkpoint: Checkpoint,
        cursor: &mut Cursor,
    ) -> Result<(), EngineError> {
        let expected = cursor.stored;
        let mut attempt = 0;
        loop {
            match self.checkpoints.put(checkpoint.clone(), expected).await {
                Ok(()) => {
                    cursor.stored = Some(checkpoint.sequence);
                    return Ok(());
                }
                Err(e @ StoreError::Io(_)) if attempt < self.config.checkpoint_retries => {
                    attempt += 1;
                    warn!(error = %e, attempt, "checkpoint write failed, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Mirror the run state into the durable ticket row.
    async fn sync_ticket(&self, state: &TicketState) -> Result<(), EngineError> {
        let mut row = self
            .tickets
            .find_by_sys_id(&state.ticket_id)
            .await?
            .unwrap_or_else(|| {
                Ticket::new(&state.ticket_id, &state.user_email, &state.description)
            });
        row.apply_state(state);
        self.tickets.upsert(row).await?;
        Ok(())
    }

    fn claim_active(&self, key: &RunKey) -> Result<ActiveRunGuard<'_>, EngineError> {
        let mut active = self
            .active
            .lock()
            .map_err(|_| EngineError::Persistence(StoreError::LockPoisoned))?;
        if !active.insert(key.to_string()) {
            return Err(EngineError::Contention {
                key: key.to_string(),
            });
        }
        Ok(ActiveRunGuard {
            engine: self,
            key: key.to_string(),
        })
    }
}
