//! The triage workflow: a fixed directed graph of nodes over a mutable
//! ticket state, with conditional routing, an entry fan-out, interrupt
//! points, and checkpointed resumption.

pub mod checkpoint;
pub mod engine;
pub mod node;

pub use checkpoint::{
    Checkpoint, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore, StoreError,
    CHECKPOINT_VERSION,
};
pub use engine::{EngineError, RunOutcome, StateUpdates, WorkflowEngine};
pub use node::NodeId;
