//! Execution graph rendering
//!
//! Renders a translated [`ExecutionGraph`] in three formats:
//! - **DOT/Graphviz** for rendered diagrams (`dot -Tsvg graph.dot`)
//! - **Mermaid** for markdown documentation
//! - **ASCII** for a quick look in the terminal
//!
//! The graph is drawn bipartite: every [`MultiEdge`] is a box labelled with
//! its kind and transform id, every [`Node`] is a rounded shape labelled with
//! its element type and window. Arrows run from a node into each edge that
//! reads it and from an edge into each node it produces.
//!
//! ```text
//! [DataSource read] ──▶ (n0 bytes@global) ──▶ [ParDo parse] ──▶ (n1 string@global)
//! ```
//!
//! # Example
//!
//! ```rust
//! use bundle_graph::graph::ExecutionGraph;
//! use bundle_graph::visualization::{visualize, VisualizationOptions};
//!
//! let graph = ExecutionGraph::new();
//! let dot = visualize(&graph, &VisualizationOptions::dot().with_title("empty"));
//! assert!(dot.starts_with("digraph G {"));
//! ```
//!
//! # Styling
//!
//! | Edge kind | DOT fill | Mermaid fill |
//! |-----------|----------|--------------|
//! | DataSource | palegreen | `#90EE90` |
//! | DataSink | pink | `#FFB6C1` |
//! | ParDo | lightgray | `#F0F0F0` |
//! | Combine | moccasin | `#FFE4B5` |

use crate::graph::{EdgeKind, ExecutionGraph, MultiEdge, Node};
use std::fmt::Write;

/// Graph visualization format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualizationFormat {
    /// DOT format for Graphviz
    Dot,
    /// Mermaid diagram format
    Mermaid,
    /// Simple ASCII art
    Ascii,
}

/// Visualization options
#[derive(Debug, Clone)]
pub struct VisualizationOptions {
    pub format: VisualizationFormat,
    /// Include function names, ports, targets and coder ids
    pub include_details: bool,
    pub title: Option<String>,
}

impl Default for VisualizationOptions {
    fn default() -> Self {
        Self {
            format: VisualizationFormat::Dot,
            include_details: false,
            title: None,
        }
    }
}

impl VisualizationOptions {
    pub fn dot() -> Self {
        Self {
            format: VisualizationFormat::Dot,
            ..Default::default()
        }
    }

    pub fn mermaid() -> Self {
        Self {
            format: VisualizationFormat::Mermaid,
            ..Default::default()
        }
    }

    pub fn ascii() -> Self {
        Self {
            format: VisualizationFormat::Ascii,
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_details(mut self) -> Self {
        self.include_details = true;
        self
    }
}

/// Render `graph` as a string in the requested format
pub fn visualize(graph: &ExecutionGraph, options: &VisualizationOptions) -> String {
    match options.format {
        VisualizationFormat::Dot => visualize_dot(graph, options),
        VisualizationFormat::Mermaid => visualize_mermaid(graph, options),
        VisualizationFormat::Ascii => visualize_ascii(graph, options),
    }
}

fn edge_label(edge: &MultiEdge, options: &VisualizationOptions) -> String {
    let mut label = format!("{} {}", edge.kind.name(), edge.transform_id);
    if options.include_details {
        match &edge.kind {
            EdgeKind::ParDo { dofn } => {
                let _ = write!(label, "\nfn: {}", dofn.name);
            }
            EdgeKind::Combine { combine_fn } => {
                let _ = write!(label, "\nfn: {}", combine_fn.name);
            }
            EdgeKind::DataSource { port, target } | EdgeKind::DataSink { port, target } => {
                let _ = write!(label, "\nport: {}\ntarget: {}", port.url, target.name);
            }
        }
    }
    label
}

fn node_label(node: &Node, options: &VisualizationOptions) -> String {
    let mut label = format!("{} {}@{}", node.id, node.element_type, node.window);
    if options.include_details {
        let _ = write!(label, "\ncoder: {}", node.coder.id);
    }
    label
}

/// Generate DOT format visualization
fn visualize_dot(graph: &ExecutionGraph, options: &VisualizationOptions) -> String {
    let mut output = String::new();

    output.push_str("digraph G {\n");
    output.push_str("    rankdir=TB;\n");
    output.push_str("    node [shape=box, style=\"rounded,filled\"];\n");

    if let Some(title) = &options.title {
        output.push_str("    labelloc=\"t\";\n");
        let _ = writeln!(output, "    label=\"{}\";", escape_dot(title));
    }

    for edge in graph.edges() {
        let fill = match edge.kind {
            EdgeKind::DataSource { .. } => "palegreen",
            EdgeKind::DataSink { .. } => "pink",
            EdgeKind::ParDo { .. } => "lightgray",
            EdgeKind::Combine { .. } => "moccasin",
        };
        let _ = writeln!(
            output,
            "    \"{}\" [label=\"{}\", fillcolor={}];",
            edge.id,
            escape_dot(&edge_label(edge, options)),
            fill
        );
    }

    for node in graph.nodes() {
        let _ = writeln!(
            output,
            "    \"{}\" [shape=ellipse, style=solid, label=\"{}\"];",
            node.id,
            escape_dot(&node_label(node, options))
        );
    }

    for edge in graph.edges() {
        for input in &edge.inputs {
            let _ = writeln!(output, "    \"{}\" -> \"{}\";", input.from, edge.id);
        }
        for out in &edge.outputs {
            let _ = writeln!(output, "    \"{}\" -> \"{}\";", edge.id, out.to);
        }
    }

    output.push_str("}\n");
    output
}

/// Generate Mermaid format visualization
fn visualize_mermaid(graph: &ExecutionGraph, options: &VisualizationOptions) -> String {
    let mut output = String::new();

    output.push_str("graph TD\n");

    if let Some(title) = &options.title {
        let _ = writeln!(output, "    title[\"{}\"]", escape_mermaid(title));
    }

    for edge in graph.edges() {
        let style = match edge.kind {
            EdgeKind::DataSource { .. } => "fill:#90EE90,stroke:#228B22,stroke-width:2px",
            EdgeKind::DataSink { .. } => "fill:#FFB6C1,stroke:#DC143C,stroke-width:2px",
            EdgeKind::ParDo { .. } => "fill:#F0F0F0,stroke:#666,stroke-width:2px",
            EdgeKind::Combine { .. } => "fill:#FFE4B5,stroke:#FF8C00,stroke-width:2px",
        };
        let _ = writeln!(
            output,
            "    {}[\"{}\"]",
            edge.id,
            escape_mermaid(&edge_label(edge, options))
        );
        let _ = writeln!(output, "    style {} {}", edge.id, style);
    }

    for node in graph.nodes() {
        let _ = writeln!(
            output,
            "    {}([\"{}\"])",
            node.id,
            escape_mermaid(&node_label(node, options))
        );
    }

    for edge in graph.edges() {
        for input in &edge.inputs {
            let _ = writeln!(output, "    {} --> {}", input.from, edge.id);
        }
        for out in &edge.outputs {
            let _ = writeln!(output, "    {} --> {}", edge.id, out.to);
        }
    }

    output
}

/// Generate simple ASCII art visualization
fn visualize_ascii(graph: &ExecutionGraph, options: &VisualizationOptions) -> String {
    let mut output = String::new();

    let heading = options.title.as_deref().unwrap_or("Execution Graph");
    let _ = writeln!(output, "{}:", heading);
    let _ = writeln!(output, "{}\n", "=".repeat(heading.len() + 1));

    for edge in graph.edges() {
        let _ = writeln!(output, "[{}] {}", edge.id, edge_label(edge, options).replace('\n', " | "));
        for input in &edge.inputs {
            let _ = writeln!(output, "  <- {} ({})", input.from, input.element_type);
        }
        for out in &edge.outputs {
            let window = graph
                .node(out.to)
                .map(|node| node.window.to_string())
                .unwrap_or_default();
            let _ = writeln!(output, "  -> {} ({}@{})", out.to, out.element_type, window);
        }
    }

    let _ = writeln!(
        output,
        "\n{} node(s), {} edge(s)",
        graph.nodes().len(),
        graph.edges().len()
    );
    output
}

/// Escape special characters for DOT format
fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Escape special characters for Mermaid format
fn escape_mermaid(s: &str) -> String {
    s.replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\n', "<br/>")
}
