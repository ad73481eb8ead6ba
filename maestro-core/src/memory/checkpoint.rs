//! Checkpoint data types: a single snapshot of graph state plus its metadata.
//!
//! A `Checkpoint<S>` is what `Checkpointer::put` persists and `get_tuple` returns.
//! Keyed externally by `(thread_id, checkpoint_ns, checkpoint_id)` via `RunnableConfig`.

use std::collections::HashMap;
use std::time::SystemTime;

/// Current on-disk/serialized checkpoint schema version.
pub const CHECKPOINT_VERSION: i32 = 1;

/// Channel version marker used by writers that signal an error occurred mid-step.
pub const ERROR: &str = "__error__";
/// Channel version marker used to represent a pending human-in-the-loop interrupt.
pub const INTERRUPT: &str = "__interrupt__";
/// Channel version marker used when resuming a previously interrupted run.
pub const RESUME: &str = "__resume__";
/// Channel version marker used for writes that are scheduled but not yet applied.
pub const SCHEDULED: &str = "__scheduled__";

/// Per-channel version counters, bumped each time a channel is written.
pub type ChannelVersions = HashMap<String, i64>;

/// Why a checkpoint was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointSource {
    /// Initial checkpoint created from the caller's input.
    Input,
    /// Checkpoint created after a normal step of the run loop.
    Loop,
    /// Checkpoint created by an explicit state update (e.g. resuming with edits).
    Update,
    /// Checkpoint created by forking an existing thread at a prior checkpoint.
    Fork,
}

/// Metadata attached to a checkpoint: why it was created, at what step, and when.
#[derive(Debug, Clone)]
pub struct CheckpointMetadata {
    /// Why this checkpoint exists.
    pub source: CheckpointSource,
    /// Step counter within the thread, monotonically increasing.
    pub step: i64,
    /// Wall-clock time the checkpoint was created, if known.
    pub created_at: Option<SystemTime>,
    /// Parent checkpoint ids keyed by checkpoint_ns, for branch/fork tracking.
    pub parents: HashMap<String, String>,
}

/// A pending write staged for a channel but not yet folded into `channel_values`.
#[derive(Debug, Clone)]
pub struct PendingWrite {
    /// Task id that produced this write.
    pub task_id: String,
    /// Channel the write targets.
    pub channel: String,
    /// Serialized value, opaque to the checkpointer.
    pub value: serde_json::Value,
}

/// A single state snapshot: the serialized channel values plus version bookkeeping.
#[derive(Debug, Clone)]
pub struct Checkpoint<S> {
    /// Schema version, see `CHECKPOINT_VERSION`.
    pub v: i32,
    /// Unique id for this checkpoint within its thread/namespace.
    pub id: String,
    /// ISO-8601 timestamp string, for stable ordering without a clock dependency.
    pub ts: String,
    /// The actual state snapshot.
    pub channel_values: S,
    /// Per-channel version counters at the time of this checkpoint.
    pub channel_versions: ChannelVersions,
    /// Latest version each channel was seen at, per writer task id.
    pub versions_seen: HashMap<String, ChannelVersions>,
    /// Channels updated since the previous checkpoint, if tracked.
    pub updated_channels: Option<Vec<String>>,
    /// Writes staged but not yet committed to `channel_values`.
    pub pending_sends: Vec<PendingWrite>,
    /// Metadata describing why/when this checkpoint was made.
    pub metadata: CheckpointMetadata,
}

/// A `(checkpoint_id, metadata)` pair as returned by `Checkpointer::list`.
#[derive(Debug, Clone)]
pub struct CheckpointListItem {
    /// The checkpoint id.
    pub checkpoint_id: String,
    /// Its metadata.
    pub metadata: CheckpointMetadata,
}

/// A checkpoint plus its metadata and parent config, as returned by `get_tuple`.
#[derive(Debug, Clone)]
pub struct CheckpointTuple<S> {
    /// The checkpoint itself.
    pub checkpoint: Checkpoint<S>,
    /// Its metadata (duplicated from `checkpoint.metadata` for convenience).
    pub metadata: CheckpointMetadata,
    /// Pending writes observed alongside this checkpoint, if any.
    pub pending_writes: Vec<PendingWrite>,
}

/// Builds a map from task id to the index of its most recent write, for dedup on replay.
pub fn writes_idx_map(writes: &[PendingWrite]) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, w) in writes.iter().enumerate() {
        map.insert(w.task_id.clone(), idx);
    }
    map
}
