//! Durable checkpoints: the `(paused node, state snapshot)` table keyed by
//! run identity, with compare-and-swap semantics on every write.
//!
//! A checkpoint exists from the first pause (or terminal state) of a run.
//! Resume reads it, applies external updates, and writes back with the
//! expected sequence number; a mismatch means another writer got there
//! first and the resume is rejected.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ticket::{RunKey, TicketState};

use super::node::NodeId;

/// Bumped whenever the serialized layout changes incompatibly.
pub const CHECKPOINT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("checkpoint io: {0}")]
    Io(#[from] std::io::Error),

    #[error("checkpoint serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("sequence conflict: expected {expected:?}, found {found:?}")]
    SequenceConflict {
        expected: Option<u64>,
        found: Option<u64>,
    },

    #[error("unsupported checkpoint version {found}, current is {current}")]
    VersionMismatch { found: u32, current: u32 },

    #[error("lock poisoned")]
    LockPoisoned,
}

/// One persisted run snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    pub key: RunKey,
    /// The interrupt node the run is paused before; `None` once terminal.
    pub paused_node: Option<NodeId>,
    pub state: TicketState,
    /// Monotonic write counter, the compare-and-swap token.
    pub sequence: u64,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn paused(key: RunKey, node: NodeId, state: TicketState, sequence: u64) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            key,
            paused_node: Some(node),
            state,
            sequence,
            updated_at: Utc::now(),
        }
    }

    pub fn terminal(key: RunKey, state: TicketState, sequence: u64) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            key,
            paused_node: None,
            state,
            sequence,
            updated_at: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.paused_node.is_none()
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.version != CHECKPOINT_VERSION {
            return Err(StoreError::VersionMismatch {
                found: self.version,
                current: CHECKPOINT_VERSION,
            });
        }
        Ok(())
    }
}

/// Keyed checkpoint persistence.
///
/// `put` is a compare-and-swap: it succeeds only when the stored sequence
/// matches `expected_sequence` (`None` means no checkpoint may exist yet).
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn get(&self, key: &RunKey) -> Result<Option<Checkpoint>, StoreError>;

    async fn put(
        &self,
        checkpoint: Checkpoint,
        expected_sequence: Option<u64>,
    ) -> Result<(), StoreError>;
}

/// In-memory checkpoint store for tests and single-process deployments.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    inner: RwLock<HashMap<String, Checkpoint>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn get(&self, key: &RunKey) -> Result<Option<Checkpoint>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        match inner.get(&key.to_string()) {
            Some(cp) => {
                cp.validate()?;
                Ok(Some(cp.clone()))
            }
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        checkpoint: Checkpoint,
        expected_sequence: Option<u64>,
    ) -> Result<(), StoreError> {
        checkpoint.validate()?;
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        let found = inner.get(&checkpoint.key.to_string()).map(|cp| cp.sequence);
        if found != expected_sequence {
            return Err(StoreError::SequenceConflict {
                expected: expected_sequence,
                found,
            });
        }
        inner.insert(checkpoint.key.to_string(), checkpoint);
        Ok(())
    }
}

/// File-backed checkpoint store: one JSON file per run key, written with a
/// temp-file-and-rename so readers never observe a partial snapshot.
pub struct FileCheckpointStore {
    dir: PathBuf,
    // Serializes the read-compare-write cycle across tasks in this process.
    write_lock: Mutex<()>,
}

impl FileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Stable, collision-free filename for a run key: alphanumeric bytes
    /// pass through, every other byte becomes `_` plus two hex digits. The
    /// encoding never changes, so a checkpoint written by one build stays
    /// findable by the next.
    fn path_for(&self, key: &RunKey) -> PathBuf {
        let raw = key.to_string();
        let mut name = String::with_capacity(raw.len() + 8);
        for byte in raw.bytes() {
            if byte.is_ascii_alphanumeric() {
                name.push(byte as char);
            } else {
                let _ = write!(name, "_{byte:02x}");
            }
        }
        name.push_str(".json");
        self.dir.join(name)
    }

    fn read(&self, key: &RunKey) -> Result<Option<Checkpoint>, StoreError> {
        let path = self.path_for(key);
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let checkpoint: Checkpoint = serde_json::from_slice(&bytes)?;
        checkpoint.validate()?;
        Ok(Some(checkpoint))
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn get(&self, key: &RunKey) -> Result<Option<Checkpoint>, StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        self.read(key)
    }

    async fn put(
        &self,
        checkpoint: Checkpoint,
        expected_sequence: Option<u64>,
    ) -> Result<(), StoreError> {
        checkpoint.validate()?;
        let _guard = self.write_lock.lock().map_err(|_| StoreError::LockPoisoned)?;

        let found = self.read(&checkpoint.key)?.map(|cp| cp.sequence);
        if found != expected_sequence {
            return Err(StoreError::SequenceConflict {
                expected: expected_sequence,
                found,
            });
        }

        let path = self.path_for(&checkpoint.key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(&checkpoint)?)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}
