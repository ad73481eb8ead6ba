//! Channels: per-field update semantics for graph state.
//!
//! A `Channel<T>` is a small reusable building block for fields that need update
//! semantics other than plain replace (e.g. [`EphemeralValue`] clears after read,
//! [`NamedBarrierValue`] waits for a fixed set of named writers). [`StateUpdater`]
//! is the graph-level hook that decides, for a whole state struct, how a node's
//! returned state is folded into the current one; [`ReplaceUpdater`] is the default.

mod ephemeral_value;
mod error;
mod named_barrier;
mod updater;

pub use ephemeral_value::EphemeralValue;
pub use error::ChannelError;
pub use named_barrier::{NamedBarrierUpdate, NamedBarrierValue};
pub use updater::{boxed_updater, BoxedStateUpdater, FieldBasedUpdater, ReplaceUpdater, StateUpdater};

/// A single field's update channel: how a value is read, written, and merged.
pub trait Channel<T>: std::fmt::Debug {
    /// Returns the current value, if any.
    fn read(&self) -> Option<T>;

    /// Overwrites the current value.
    fn write(&mut self, value: T);

    /// Folds a batch of updates (e.g. from parallel writers) into the channel.
    fn update(&mut self, updates: Vec<T>) -> Result<(), ChannelError>;

    /// Short name of the channel implementation, for diagnostics.
    fn channel_type(&self) -> &'static str;
}
