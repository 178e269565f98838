//! Execution graph produced by translation
//!
//! The [`ExecutionGraph`] is what the bundle-processing engine walks. It owns
//! every [`Node`] and every [`MultiEdge`]; edges refer to nodes by [`NodeId`]
//! rather than holding them.
//!
//! # Graph Structure
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  root scope                                              │
//! │                                                          │
//! │  [DataSource read] ──▶ (n0 bytes@global)                 │
//! │                            │                             │
//! │                            ▼                             │
//! │                      [ParDo parse] ──▶ (n1 string@global)│
//! │                                            │             │
//! │                                            ▼             │
//! │                                     [DataSink write]     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Invariants maintained by translation:
//!
//! - every node is the output of exactly one edge output slot
//! - edges appear in [`ExecutionGraph::edges`] in topological order
//! - there is exactly one edge per descriptor transform
//!
//! [`ExecutionGraph::check_invariants`] re-verifies the first and last.

use crate::coder::{Coder, FullType};
use crate::window::WindowingStrategy;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Index of a node inside its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

/// Index of an edge inside its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EdgeId(pub usize);

/// Index of a scope inside its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ScopeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Grouping sentinel; translated bundles only ever use the root scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub id: ScopeId,
    pub label: String,
}

/// Operation code carried by a function payload
///
/// Only [`Opcode::ParDo`] and [`Opcode::Combine`] are legal for legacy-dofn
/// transforms. The remaining codes exist because the upstream compiler emits
/// them for other stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Opcode {
    ParDo,
    Combine,
    GBK,
    CoGBK,
    Flatten,
    Impulse,
    DataSource,
    DataSink,
    External,
    WindowInto,
    Reshuffle,
}

impl Opcode {
    pub fn from_i32(value: i32) -> Option<Self> {
        let op = match value {
            1 => Self::ParDo,
            2 => Self::Combine,
            3 => Self::GBK,
            4 => Self::CoGBK,
            5 => Self::Flatten,
            6 => Self::Impulse,
            7 => Self::DataSource,
            8 => Self::DataSink,
            9 => Self::External,
            10 => Self::WindowInto,
            11 => Self::Reshuffle,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_i32(self) -> i32 {
        match self {
            Self::ParDo => 1,
            Self::Combine => 2,
            Self::GBK => 3,
            Self::CoGBK => 4,
            Self::Flatten => 5,
            Self::Impulse => 6,
            Self::DataSource => 7,
            Self::DataSink => 8,
            Self::External => 9,
            Self::WindowInto => 10,
            Self::Reshuffle => 11,
        }
    }
}

/// How a function consumes one of its inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum InputKind {
    #[default]
    Main,
    Singleton,
    Slice,
    Map,
    MultiMap,
    Iter,
    ReIter,
}

impl InputKind {
    pub fn from_i32(value: i32) -> Option<Self> {
        let kind = match value {
            0 => Self::Main,
            1 => Self::Singleton,
            2 => Self::Slice,
            3 => Self::Map,
            4 => Self::MultiMap,
            5 => Self::Iter,
            6 => Self::ReIter,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_i32(self) -> i32 {
        match self {
            Self::Main => 0,
            Self::Singleton => 1,
            Self::Slice => 2,
            Self::Map => 3,
            Self::MultiMap => 4,
            Self::Iter => 5,
            Self::ReIter => 6,
        }
    }
}

/// Executable user function: registered name plus serialized closure state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFn {
    pub name: String,
    pub payload: Vec<u8>,
}

/// Data-plane endpoint of a remote source or sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Port {
    pub url: String,
}

/// Data-plane routing target: the transform and its local slot name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Target {
    pub transform_id: String,
    pub name: String,
}

/// What an edge does, with the payload each variant needs
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeKind {
    ParDo { dofn: UserFn },
    Combine { combine_fn: UserFn },
    DataSource { port: Port, target: Target },
    DataSink { port: Port, target: Target },
}

impl EdgeKind {
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::ParDo { .. } => Opcode::ParDo,
            Self::Combine { .. } => Opcode::Combine,
            Self::DataSource { .. } => Opcode::DataSource,
            Self::DataSink { .. } => Opcode::DataSink,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ParDo { .. } => "ParDo",
            Self::Combine { .. } => "Combine",
            Self::DataSource { .. } => "DataSource",
            Self::DataSink { .. } => "DataSink",
        }
    }

    /// Data-plane target for source and sink edges
    pub fn target(&self) -> Option<&Target> {
        match self {
            Self::DataSource { target, .. } | Self::DataSink { target, .. } => Some(target),
            _ => None,
        }
    }
}

/// Input slot of an edge, bound to the node that feeds it
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub kind: InputKind,
    pub from: NodeId,
    pub element_type: FullType,
}

/// Output slot of an edge, bound to the node it produces
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: NodeId,
    pub element_type: FullType,
}

/// A single data endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub element_type: FullType,
    pub coder: Arc<Coder>,
    pub window: WindowingStrategy,
}

/// Execution-graph representation of one descriptor transform
#[derive(Debug, Clone, PartialEq)]
pub struct MultiEdge {
    pub id: EdgeId,
    pub transform_id: String,
    pub scope: ScopeId,
    pub kind: EdgeKind,
    pub inputs: Vec<Inbound>,
    pub outputs: Vec<Outbound>,
}

impl MultiEdge {
    pub fn is_root(&self) -> bool {
        self.inputs.is_empty()
    }
}

/// A translated bundle, ready to be walked for execution
#[derive(Debug, Clone)]
pub struct ExecutionGraph {
    root: Scope,
    nodes: Vec<Node>,
    edges: Vec<MultiEdge>,
}

impl ExecutionGraph {
    pub fn new() -> Self {
        Self {
            root: Scope {
                id: ScopeId(0),
                label: "root".to_string(),
            },
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// The root scope sentinel every edge hangs off
    pub fn root(&self) -> &Scope {
        &self.root
    }

    /// Add a node; its element type comes from its coder
    pub fn add_node(&mut self, coder: Arc<Coder>, window: WindowingStrategy) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            element_type: coder.element_type.clone(),
            coder,
            window,
        });
        id
    }

    /// Append an edge under the root scope
    pub fn add_edge(
        &mut self,
        transform_id: impl Into<String>,
        kind: EdgeKind,
        inputs: Vec<Inbound>,
        outputs: Vec<Outbound>,
    ) -> EdgeId {
        let id = EdgeId(self.edges.len());
        self.edges.push(MultiEdge {
            id,
            transform_id: transform_id.into(),
            scope: self.root.id,
            kind,
            inputs,
            outputs,
        });
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&MultiEdge> {
        self.edges.get(id.0)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Edges in the order they were translated, which is topological
    pub fn edges(&self) -> &[MultiEdge] {
        &self.edges
    }

    /// The edge whose output slot produces `node`
    pub fn producer_of(&self, node: NodeId) -> Option<&MultiEdge> {
        self.edges
            .iter()
            .find(|edge| edge.outputs.iter().any(|out| out.to == node))
    }

    /// Edges with an input slot bound to `node`
    pub fn consumers_of(&self, node: NodeId) -> Vec<&MultiEdge> {
        self.edges
            .iter()
            .filter(|edge| edge.inputs.iter().any(|input| input.from == node))
            .collect()
    }

    /// Edges with no inputs
    pub fn root_edges(&self) -> impl Iterator<Item = &MultiEdge> {
        self.edges.iter().filter(|edge| edge.is_root())
    }

    pub fn edge_for_transform(&self, transform_id: &str) -> Option<&MultiEdge> {
        self.edges
            .iter()
            .find(|edge| edge.transform_id == transform_id)
    }

    /// Verify structural invariants of the graph
    ///
    /// Checks that every node is produced by exactly one output slot, that
    /// inputs only reference nodes produced by earlier edges, and that no
    /// transform is represented twice.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut produced: HashSet<NodeId> = HashSet::new();
        let mut transforms: HashSet<&str> = HashSet::new();

        for edge in &self.edges {
            if !transforms.insert(edge.transform_id.as_str()) {
                return Err(format!(
                    "transform '{}' appears on more than one edge",
                    edge.transform_id
                ));
            }
            for input in &edge.inputs {
                if !produced.contains(&input.from) {
                    return Err(format!(
                        "edge {} reads {} before it is produced",
                        edge.id, input.from
                    ));
                }
            }
            for output in &edge.outputs {
                if self.node(output.to).is_none() {
                    return Err(format!("edge {} writes unknown node {}", edge.id, output.to));
                }
                if !produced.insert(output.to) {
                    return Err(format!("node {} has more than one producer", output.to));
                }
            }
        }

        if let Some(orphan) = self.nodes.iter().find(|node| !produced.contains(&node.id)) {
            return Err(format!("node {} has no producer", orphan.id));
        }
        Ok(())
    }

    /// Serializable overview of the graph
    pub fn summary(&self) -> GraphSummary {
        let mut edges_by_kind = BTreeMap::new();
        for edge in &self.edges {
            *edges_by_kind.entry(edge.kind.name().to_string()).or_insert(0) += 1;
        }

        GraphSummary {
            nodes: self.nodes.len(),
            edges: self.edges.len(),
            edges_by_kind,
            order: self
                .edges
                .iter()
                .map(|edge| edge.transform_id.clone())
                .collect(),
            root_transforms: self
                .root_edges()
                .map(|edge| edge.transform_id.clone())
                .collect(),
            node_types: self
                .nodes
                .iter()
                .map(|node| {
                    (
                        node.id.to_string(),
                        format!("{}@{}", node.element_type, node.window),
                    )
                })
                .collect(),
        }
    }
}

impl Default for ExecutionGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts and labels describing a translated graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
    pub edges_by_kind: BTreeMap<String, usize>,
    /// Transform ids in translation order
    pub order: Vec<String>,
    pub root_transforms: Vec<String>,
    /// Node id → `type@window`
    pub node_types: BTreeMap<String, String>,
}
