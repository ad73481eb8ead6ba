//! `Next`: routing decision returned by a node alongside its updated state.

/// What the runner should do after a node finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    /// Follow the linear edge (or conditional router) configured for this node.
    Continue,
    /// Jump directly to the named node, bypassing the configured edge.
    Node(String),
    /// Stop the run; this node's output is the final state.
    End,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: `Next` variants compare by value, not by reference.
    #[test]
    fn next_equality() {
        assert_eq!(Next::Continue, Next::Continue);
        assert_eq!(Next::Node("a".into()), Next::Node("a".into()));
        assert_ne!(Next::Node("a".into()), Next::Node("b".into()));
        assert_ne!(Next::Continue, Next::End);
    }
}
