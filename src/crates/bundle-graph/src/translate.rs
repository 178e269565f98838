//! Bundle translation: descriptor in, execution graph out
//!
//! [`Translator`] drives the whole layer:
//!
//! ```text
//! BundleDescriptor
//!       │
//!       ▼
//! topological_sort ──▶ order + ProvenanceIndex
//!       │
//!       ▼  for each transform id, in order
//! TransformKind::decode ──▶ dispatch ──▶ BindingResolver
//!       │                                   │
//!       ▼                                   ▼
//!   MultiEdge ─────────────────────────▶ ExecutionGraph
//! ```
//!
//! A failure at any transform aborts the translation; no partial graph is
//! ever returned.
//!
//! # Example
//!
//! ```rust
//! use bundle_graph::descriptor::{BundleDescriptor, CoderSpec, PTransform};
//! use bundle_graph::payload::encode_port;
//! use bundle_graph::{urn, Translator};
//!
//! let descriptor = BundleDescriptor::builder("echo")
//!     .coder("bytes", CoderSpec::new(urn::CODER_BYTES))
//!     .pcollection("pc", "bytes")
//!     .transform(
//!         "read",
//!         PTransform::new(urn::DATA_SOURCE, encode_port("localhost:50000")).with_output("o", "pc"),
//!     )
//!     .transform(
//!         "write",
//!         PTransform::new(urn::DATA_SINK, encode_port("localhost:50000")).with_input("i", "pc"),
//!     )
//!     .build();
//!
//! let graph = Translator::new().translate(&descriptor).unwrap();
//! assert_eq!(graph.nodes().len(), 1);
//! assert_eq!(graph.edges().len(), 2);
//! ```

use crate::binding::BindingResolver;
use crate::coder::{CoderRegistry, CoderUnmarshaller};
use crate::config::TranslateConfig;
use crate::descriptor::{BundleDescriptor, PTransform};
use crate::error::{Result, TranslateError};
use crate::graph::{EdgeId, EdgeKind, ExecutionGraph, Inbound, Opcode, Outbound, Target};
use crate::kind::TransformKind;
use crate::payload::{
    DecodedFn, EndpointDecoder, FnPayloadDecoder, ProtoEndpointDecoder, ProtoFnDecoder,
};
use crate::sort::topological_sort;
use std::sync::Arc;

/// Translates bundle descriptors into execution graphs
///
/// Holds no per-translation state, so one translator can be shared across
/// threads and reused for any number of descriptors.
#[derive(Clone)]
pub struct Translator {
    fn_decoder: Arc<dyn FnPayloadDecoder>,
    endpoint_decoder: Arc<dyn EndpointDecoder>,
    config: TranslateConfig,
}

impl Translator {
    /// Translator with protobuf payload decoders and default config
    pub fn new() -> Self {
        Self::with_config(TranslateConfig::default())
    }

    pub fn with_config(config: TranslateConfig) -> Self {
        Self {
            fn_decoder: Arc::new(ProtoFnDecoder),
            endpoint_decoder: Arc::new(ProtoEndpointDecoder),
            config,
        }
    }

    pub fn with_fn_decoder(mut self, decoder: Arc<dyn FnPayloadDecoder>) -> Self {
        self.fn_decoder = decoder;
        self
    }

    pub fn with_endpoint_decoder(mut self, decoder: Arc<dyn EndpointDecoder>) -> Self {
        self.endpoint_decoder = decoder;
        self
    }

    pub fn config(&self) -> &TranslateConfig {
        &self.config
    }

    /// Translate `descriptor`, resolving coders from its own coder table
    ///
    /// # Errors
    ///
    /// Any [`TranslateError`] raised while sorting, decoding payloads,
    /// resolving coders or binding slots.
    ///
    /// # Panics
    ///
    /// When a legacy-dofn payload decodes to an opcode other than ParDo or
    /// Combine.
    pub fn translate(&self, descriptor: &BundleDescriptor) -> Result<ExecutionGraph> {
        let coders = CoderUnmarshaller::new(&descriptor.coders);
        self.translate_with_coders(descriptor, &coders)
    }

    /// Translate `descriptor` against an external coder registry
    #[tracing::instrument(
        skip(self, descriptor, coders),
        fields(bundle = %descriptor.id, transforms = descriptor.transforms.len())
    )]
    pub fn translate_with_coders(
        &self,
        descriptor: &BundleDescriptor,
        coders: &dyn CoderRegistry,
    ) -> Result<ExecutionGraph> {
        let sorted = topological_sort(descriptor, self.config.consumer_lookup)?;
        let mut resolver =
            BindingResolver::new(&sorted.provenance, coders, &self.config.placeholder_output);
        let mut graph = ExecutionGraph::new();

        for id in &sorted.order {
            let transform = &descriptor.transforms[*id];
            let kind = TransformKind::decode(
                id,
                transform,
                self.fn_decoder.as_ref(),
                self.endpoint_decoder.as_ref(),
            )?;
            let edge = dispatch(&mut graph, &mut resolver, id, transform, kind)?;
            let edge_kind = graph.edge(edge).map_or("unknown", |e| e.kind.name());

            tracing::debug!(
                transform = *id,
                urn = transform.urn(),
                edge = %edge,
                kind = %edge_kind,
                "translated transform"
            );
        }

        tracing::info!(
            nodes = graph.nodes().len(),
            edges = graph.edges().len(),
            "translated bundle"
        );
        Ok(graph)
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Translator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Translator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Build the edge for one transform and append it to `graph`
fn dispatch(
    graph: &mut ExecutionGraph,
    resolver: &mut BindingResolver<'_, '_>,
    id: &str,
    transform: &PTransform,
    kind: TransformKind,
) -> Result<EdgeId> {
    match kind {
        TransformKind::LegacySource(decoded) => {
            let (inputs, outputs) = bind_fn(graph, resolver, id, transform, &decoded)?;
            let kind = EdgeKind::ParDo {
                dofn: decoded.function,
            };
            Ok(graph.add_edge(id, kind, inputs, outputs))
        }
        TransformKind::LegacyDoFn(decoded) => {
            let kind = match decoded.opcode {
                Opcode::ParDo => EdgeKind::ParDo {
                    dofn: decoded.function.clone(),
                },
                Opcode::Combine => EdgeKind::Combine {
                    combine_fn: decoded.function.clone(),
                },
                other => panic!(
                    "opcode should be one of ParDo or Combine, but it is: {:?}",
                    other
                ),
            };
            let (inputs, outputs) = bind_fn(graph, resolver, id, transform, &decoded)?;
            Ok(graph.add_edge(id, kind, inputs, outputs))
        }
        TransformKind::DataSource(port) => {
            let name = sole_slot(&transform.outputs)
                .ok_or_else(|| TranslateError::output_count(id, 1, transform.outputs.len()))?;
            let target = Target {
                transform_id: id.to_string(),
                name: name.to_string(),
            };
            let outputs = resolver.resolve_outputs(graph, id, transform, &[], 1)?;
            Ok(graph.add_edge(id, EdgeKind::DataSource { port, target }, vec![], outputs))
        }
        TransformKind::DataSink(port) => {
            let name = sole_slot(&transform.inputs)
                .ok_or_else(|| TranslateError::input_count(id, 1, transform.inputs.len()))?;
            let target = Target {
                transform_id: id.to_string(),
                name: name.to_string(),
            };
            let inputs = resolver.resolve_inputs(graph, id, transform, 1)?;
            Ok(graph.add_edge(id, EdgeKind::DataSink { port, target }, inputs, vec![]))
        }
    }
}

/// Bind a function transform's slots, typed by its declared shape
fn bind_fn(
    graph: &mut ExecutionGraph,
    resolver: &mut BindingResolver<'_, '_>,
    id: &str,
    transform: &PTransform,
    decoded: &DecodedFn,
) -> Result<(Vec<Inbound>, Vec<Outbound>)> {
    let mut inputs = resolver.resolve_inputs(graph, id, transform, decoded.inbound.len())?;
    for (input, decl) in inputs.iter_mut().zip(&decoded.inbound) {
        input.kind = decl.kind;
        input.element_type = decl.element_type.clone();
    }

    let mut outputs =
        resolver.resolve_outputs(graph, id, transform, &inputs, decoded.outbound.len())?;
    for (output, declared) in outputs.iter_mut().zip(&decoded.outbound) {
        output.element_type = declared.clone();
    }
    Ok((inputs, outputs))
}

/// Local name of the only slot, if there is exactly one
fn sole_slot(slots: &std::collections::HashMap<String, String>) -> Option<&str> {
    let mut names = slots.keys();
    match (names.next(), names.next()) {
        (Some(name), None) => Some(name.as_str()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coder::{Coder, FullType};
    use crate::descriptor::CoderSpec;
    use crate::error::PayloadError;
    use crate::graph::{InputKind, NodeId, Port, UserFn};
    use crate::payload::{encode_fn, encode_port, InboundDecl};
    use crate::urn;
    use std::collections::HashMap;

    fn dofn(opcode: Opcode, name: &str, inputs: usize, outputs: usize) -> DecodedFn {
        DecodedFn {
            opcode,
            function: UserFn {
                name: name.to_string(),
                payload: vec![],
            },
            inbound: (0..inputs)
                .map(|_| InboundDecl {
                    kind: InputKind::Main,
                    element_type: FullType::Bytes,
                })
                .collect(),
            outbound: vec![FullType::String; outputs],
        }
    }

    fn pipeline(middle: PTransform) -> BundleDescriptor {
        BundleDescriptor::builder("bundle")
            .coder("bytes", CoderSpec::new(urn::CODER_BYTES))
            .pcollection("pc_in", "bytes")
            .pcollection("pc_out", "bytes")
            .transform(
                "read",
                PTransform::new(urn::DATA_SOURCE, encode_port("localhost:1"))
                    .with_output("o", "pc_in"),
            )
            .transform("middle", middle.with_input("i", "pc_in").with_output("r", "pc_out"))
            .transform(
                "write",
                PTransform::new(urn::DATA_SINK, encode_port("localhost:1"))
                    .with_input("i", "pc_out"),
            )
            .build()
    }

    #[test]
    fn test_translate_pardo_pipeline() {
        let decoded = dofn(Opcode::ParDo, "parse", 1, 1);
        let descriptor = pipeline(PTransform::new(urn::LEGACY_DOFN, encode_fn(&decoded)));

        let graph = Translator::new().translate(&descriptor).unwrap();
        assert_eq!(graph.nodes().len(), 2);
        assert_eq!(graph.edges().len(), 3);
        assert!(graph.check_invariants().is_ok());

        let order: Vec<_> = graph.edges().iter().map(|e| e.transform_id.as_str()).collect();
        assert_eq!(order, vec!["read", "middle", "write"]);

        let read = graph.edge_for_transform("read").unwrap();
        assert_eq!(
            read.kind.target(),
            Some(&Target {
                transform_id: "read".to_string(),
                name: "o".to_string()
            })
        );
        assert_eq!(read.outputs[0].element_type, FullType::Bytes);

        let middle = graph.edge_for_transform("middle").unwrap();
        assert_eq!(middle.kind.opcode(), Opcode::ParDo);
        assert_eq!(middle.inputs[0].from, NodeId(0));
        assert_eq!(middle.outputs[0].element_type, FullType::String);

        let write = graph.edge_for_transform("write").unwrap();
        assert_eq!(write.inputs[0].from, NodeId(1));
        assert_eq!(write.inputs[0].element_type, FullType::Bytes);
    }

    #[test]
    fn test_combine_opcode() {
        let decoded = dofn(Opcode::Combine, "sum", 1, 1);
        let descriptor = pipeline(PTransform::new(urn::LEGACY_DOFN, encode_fn(&decoded)));

        let graph = Translator::new().translate(&descriptor).unwrap();
        match &graph.edge_for_transform("middle").unwrap().kind {
            EdgeKind::Combine { combine_fn } => assert_eq!(combine_fn.name, "sum"),
            other => panic!("expected Combine, got {:?}", other),
        }
    }

    #[test]
    fn test_legacy_source_is_always_pardo() {
        let decoded = dofn(Opcode::GBK, "shuffle", 1, 1);
        let descriptor = pipeline(PTransform::new(urn::LEGACY_SOURCE, encode_fn(&decoded)));

        let graph = Translator::new().translate(&descriptor).unwrap();
        assert_eq!(
            graph.edge_for_transform("middle").unwrap().kind.opcode(),
            Opcode::ParDo
        );
    }

    #[test]
    #[should_panic(expected = "opcode should be one of ParDo or Combine, but it is: GBK")]
    fn test_legacy_dofn_rejects_other_opcodes() {
        let decoded = dofn(Opcode::GBK, "shuffle", 1, 1);
        let descriptor = pipeline(PTransform::new(urn::LEGACY_DOFN, encode_fn(&decoded)));
        let _ = Translator::new().translate(&descriptor);
    }

    #[test]
    fn test_declared_arity_mismatch() {
        let decoded = dofn(Opcode::ParDo, "parse", 2, 1);
        let descriptor = pipeline(PTransform::new(urn::LEGACY_DOFN, encode_fn(&decoded)));

        let err = Translator::new().translate(&descriptor).unwrap_err();
        assert_eq!(err.transform(), Some("middle"));
        assert!(matches!(
            err,
            TranslateError::UnexpectedInputCount {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_payload_errors_abort() {
        let descriptor = pipeline(PTransform::new(urn::LEGACY_DOFN, b"%%%".to_vec()));
        assert!(matches!(
            Translator::new().translate(&descriptor),
            Err(TranslateError::PayloadDecode { .. })
        ));
    }

    struct FixedFn(DecodedFn);

    impl FnPayloadDecoder for FixedFn {
        fn decode_fn(&self, _payload: &[u8]) -> std::result::Result<DecodedFn, PayloadError> {
            Ok(self.0.clone())
        }
    }

    struct FixedPort;

    impl EndpointDecoder for FixedPort {
        fn decode_port(&self, _payload: &[u8]) -> std::result::Result<Port, PayloadError> {
            Ok(Port {
                url: "fixed:0".to_string(),
            })
        }
    }

    #[test]
    fn test_custom_decoders_and_registry() {
        let descriptor = pipeline(PTransform::new(urn::LEGACY_DOFN, vec![]));
        let translator = Translator::new()
            .with_fn_decoder(Arc::new(FixedFn(dofn(Opcode::ParDo, "fixed", 1, 1))))
            .with_endpoint_decoder(Arc::new(FixedPort));
        let registry: HashMap<String, Arc<Coder>> =
            HashMap::from([("bytes".to_string(), Arc::new(Coder::bytes("bytes")))]);

        let graph = translator
            .translate_with_coders(&descriptor, &registry)
            .unwrap();
        match &graph.edge_for_transform("read").unwrap().kind {
            EdgeKind::DataSource { port, .. } => assert_eq!(port.url, "fixed:0"),
            other => panic!("expected DataSource, got {:?}", other),
        }
        assert!(Arc::ptr_eq(&graph.nodes()[0].coder, &registry["bytes"]));
    }

    #[test]
    fn test_sole_slot() {
        let mut slots = HashMap::new();
        assert_eq!(sole_slot(&slots), None);
        slots.insert("o".to_string(), "pc".to_string());
        assert_eq!(sole_slot(&slots), Some("o"));
        slots.insert("p".to_string(), "pc".to_string());
        assert_eq!(sole_slot(&slots), None);
    }
}
