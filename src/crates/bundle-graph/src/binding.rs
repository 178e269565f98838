//! Binding resolution: wiring a transform's slots to graph nodes
//!
//! Nodes are keyed by the transform that produces them and the local name of
//! the producing output slot. Inputs are found by following the provenance
//! index back to the producer and matching its outputs against the input
//! collection; outputs get fresh nodes typed by their collection's coder.
//!
//! Both sides are bound in sorted local-name order so positional slots are
//! deterministic regardless of map iteration order.

use crate::coder::CoderRegistry;
use crate::descriptor::PTransform;
use crate::error::{Result, TranslateError};
use crate::graph::{ExecutionGraph, Inbound, InputKind, NodeId, Outbound};
use crate::provenance::ProvenanceIndex;
use crate::window::WindowingStrategy;
use std::collections::HashMap;

/// Producing transform id plus the local name of its output slot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub transform_id: String,
    pub output: String,
}

impl NodeKey {
    pub fn new(transform_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            transform_id: transform_id.into(),
            output: output.into(),
        }
    }
}

/// Nodes created so far in one translation
pub type NodeMap = HashMap<NodeKey, NodeId>;

/// Resolves input and output bindings for transforms in topological order
///
/// The resolver owns the [`NodeMap`]; outputs registered for one transform
/// are visible to every transform resolved after it.
pub struct BindingResolver<'r, 'a> {
    provenance: &'r ProvenanceIndex<'a>,
    coders: &'r dyn CoderRegistry,
    placeholder: &'r str,
    nodes: NodeMap,
}

impl<'r, 'a> BindingResolver<'r, 'a> {
    pub fn new(
        provenance: &'r ProvenanceIndex<'a>,
        coders: &'r dyn CoderRegistry,
        placeholder: &'r str,
    ) -> Self {
        Self {
            provenance,
            coders,
            placeholder,
            nodes: NodeMap::new(),
        }
    }

    pub fn nodes(&self) -> &NodeMap {
        &self.nodes
    }

    pub fn node(&self, transform_id: &str, output: &str) -> Option<NodeId> {
        self.nodes.get(&NodeKey::new(transform_id, output)).copied()
    }

    /// Nodes feeding `transform`'s input slots, in sorted input-name order
    ///
    /// Each binding is a main input typed by its node. Every producer output
    /// whose collection equals the input collection counts as one reference,
    /// so a producer exposing one collection under two names yields two
    /// references for a single slot.
    ///
    /// # Errors
    ///
    /// - [`TranslateError::UnexpectedInputCount`] when the number of
    ///   references differs from `expected`
    /// - [`TranslateError::MissingNode`] when a reference points at an output
    ///   that never produced a node (a placeholder output)
    pub fn resolve_inputs(
        &self,
        graph: &ExecutionGraph,
        transform_id: &str,
        transform: &PTransform,
        expected: usize,
    ) -> Result<Vec<Inbound>> {
        let mut keys = Vec::with_capacity(transform.inputs.len());
        for (_, collection) in transform.sorted_inputs() {
            let Some(producer) = self.provenance.producer(collection) else {
                continue;
            };
            for (output, produced) in producer.transform.sorted_outputs() {
                if produced == collection {
                    keys.push(NodeKey::new(producer.transform_id, output));
                }
            }
        }

        if keys.len() != expected {
            return Err(TranslateError::input_count(
                transform_id,
                expected,
                keys.len(),
            ));
        }

        keys.into_iter()
            .map(|key| {
                let node = self
                    .nodes
                    .get(&key)
                    .and_then(|id| graph.node(*id))
                    .ok_or_else(|| TranslateError::MissingNode {
                        transform: transform_id.to_string(),
                        producer: key.transform_id,
                        output: key.output,
                    })?;
                Ok(Inbound {
                    kind: InputKind::Main,
                    from: node.id,
                    element_type: node.element_type.clone(),
                })
            })
            .collect()
    }

    /// Create a node for each real output of `transform`
    ///
    /// Each binding is typed by the output collection's coder. Placeholder
    /// outputs are skipped and don't count toward `expected`. New nodes
    /// inherit the window of the first input node, or the global window when
    /// there are no inputs.
    ///
    /// # Errors
    ///
    /// - [`TranslateError::UnexpectedOutputCount`] when the number of real
    ///   outputs differs from `expected`
    /// - [`TranslateError::CoderResolution`] when an output's coder can't be
    ///   resolved
    pub fn resolve_outputs(
        &mut self,
        graph: &mut ExecutionGraph,
        transform_id: &str,
        transform: &PTransform,
        inputs: &[Inbound],
        expected: usize,
    ) -> Result<Vec<Outbound>> {
        let mut real = Vec::with_capacity(transform.outputs.len());
        for (name, collection) in transform.sorted_outputs() {
            if name == self.placeholder {
                tracing::warn!(
                    transform = transform_id,
                    collection,
                    "skipping placeholder output"
                );
                continue;
            }
            real.push((name, collection));
        }

        if real.len() != expected {
            return Err(TranslateError::output_count(
                transform_id,
                expected,
                real.len(),
            ));
        }

        let window = inputs
            .first()
            .and_then(|input| graph.node(input.from))
            .map(|node| node.window.clone())
            .unwrap_or_else(WindowingStrategy::global);

        let mut created = Vec::with_capacity(real.len());
        for (name, collection) in real {
            let record = self
                .provenance
                .get(collection)
                .ok_or_else(|| TranslateError::unknown_collection(transform_id, collection))?;
            let coder_id = record.collection.coder_id.as_str();
            let coder = self
                .coders
                .coder(coder_id)
                .map_err(|err| TranslateError::coder(transform_id, coder_id, err))?;

            let element_type = coder.element_type.clone();
            let id = graph.add_node(coder, window.clone());
            self.nodes.insert(NodeKey::new(transform_id, name), id);
            created.push(Outbound {
                to: id,
                element_type,
            });
        }
        Ok(created)
    }
}
