//! Conditional routing: choose the next node from state instead of a fixed edge.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Routing function: inspects state after a node ran, returns a routing key.
///
/// The key is either a node id directly, or looked up in a `path_map`.
pub type ConditionalRouterFn<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

/// A compiled conditional edge: the router function plus an optional key→node map.
#[derive(Clone)]
pub struct ConditionalRouter<S> {
    path: ConditionalRouterFn<S>,
    /// When present, the router's return value is looked up here; otherwise it is
    /// used directly as the next node id (or `END`).
    pub path_map: Option<HashMap<String, String>>,
}

impl<S> ConditionalRouter<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Builds a router from a routing function and optional key→node map.
    pub fn new(path: ConditionalRouterFn<S>, path_map: Option<HashMap<String, String>>) -> Self {
        Self { path, path_map }
    }

    /// Resolves the next node id (or `END`) for the given state.
    pub fn resolve(&self, state: &S) -> String {
        let key = (self.path)(state);
        match &self.path_map {
            Some(map) => map.get(&key).cloned().unwrap_or(key),
            None => key,
        }
    }
}

/// A single entry in the compiled next-node table: either a fixed edge or a router.
#[derive(Clone)]
pub enum NextEntry<S> {
    /// Unconditional edge to the named node (or `END`).
    Unconditional(String),
    /// Conditional routing, resolved from state at runtime.
    Conditional(ConditionalRouter<S>),
}
