//! Render a `StateGraph`'s shape for debugging: Graphviz DOT or a plain text list.
//!
//! Operates on the raw edge/conditional-edge lists, not a compiled graph, so it
//! can be called before `compile()` to sanity-check a graph under construction.

use std::collections::HashMap;

/// Generates a Graphviz DOT representation of the given edges and conditional
/// edges (source node -> possible targets).
pub fn generate_dot(edges: &[(String, String)], conditional: &HashMap<String, Vec<String>>) -> String {
    let mut out = String::from("digraph G {\n");
    for (from, to) in edges {
        out.push_str(&format!("  \"{from}\" -> \"{to}\";\n"));
    }
    for (source, targets) in conditional {
        for target in targets {
            out.push_str(&format!("  \"{source}\" -> \"{target}\" [style=dashed];\n"));
        }
    }
    out.push_str("}\n");
    out
}

/// Generates a plain-text adjacency listing, one line per edge.
pub fn generate_text(edges: &[(String, String)], conditional: &HashMap<String, Vec<String>>) -> String {
    let mut lines: Vec<String> = edges.iter().map(|(f, t)| format!("{f} -> {t}")).collect();
    for (source, targets) in conditional {
        for target in targets {
            lines.push(format!("{source} -> {target} (conditional)"));
        }
    }
    lines.join("\n")
}
