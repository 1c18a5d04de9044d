//! Multi-tier support ticket triage
//!
//! This library provides:
//! - A workflow engine executing a fixed directed graph of triage nodes
//!   (L2 automated resolution, L3 development escalation, L4 human
//!   escalation) over a mutable ticket state, with conditional routing,
//!   entry fan-out, and human-in-the-loop interrupt points
//! - Durable checkpointed resumption keyed by `(user_email, ticket_id)`,
//!   so a paused run survives process restarts and resumes when the user
//!   replies minutes or days later
//! - A hybrid scoring engine combining BM25 lexical retrieval, trained
//!   TF-IDF classifiers, and embedding-based nearest-neighbor search,
//!   reconciled by confidence-weighted voting with a novelty decision
//!
//! The HTTP layer, relational storage, email delivery, and LLM invocation
//! are external collaborators behind the traits in [`capabilities`].

pub mod capabilities;
pub mod config;
pub mod nodes;
pub mod scoring;
pub mod telemetry;
pub mod ticket;
pub mod workflow;

// Re-export key ticket types
pub use ticket::{RunKey, Ticket, TicketState, TicketStatus};

// Re-export key scoring types
pub use scoring::{
    Embedder, HashedBowEmbedder, LexicalIndex, NearestExample, Scorer, ScoringEngine,
    ScoringError, ScoringResult, SemanticIndex, StatisticalClassifier, TrainingCorpus,
};

// Re-export key workflow types
pub use workflow::{
    Checkpoint, CheckpointStore, EngineError, FileCheckpointStore, MemoryCheckpointStore,
    RunOutcome, StateUpdates, StoreError, WorkflowEngine,
};

// Re-export capability traits
pub use capabilities::{
    InMemoryTicketStore, LlmCapability, LlmError, Notifier, NotificationDetails, NotifyError,
    RcaOutput, TicketStore, TicketStoreError, TierLabel,
};

pub use config::TriageConfig;
