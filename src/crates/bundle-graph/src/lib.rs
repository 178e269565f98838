//! # bundle-graph - Bundle descriptor to execution graph translation
//!
//! A worker receives each unit of work as a [`BundleDescriptor`]: a flat,
//! wire-format description of transforms, the collections flowing between
//! them and the coders of those collections. Before any element can be
//! processed the descriptor has to become an [`ExecutionGraph`] of typed
//! nodes and executable edges. This crate performs that translation.
//!
//! ## Overview
//!
//! ```text
//! ┌──────────────────────┐
//! │  BundleDescriptor    │  transforms, pcollections, coders
//! └──────────┬───────────┘
//!            │ sort::topological_sort
//!            ▼
//! ┌──────────────────────┐
//! │  order + provenance  │  producers before consumers
//! └──────────┬───────────┘
//!            │ kind::TransformKind::decode  (per transform)
//!            ▼
//! ┌──────────────────────┐
//! │  dispatch + binding  │  one MultiEdge per transform
//! └──────────┬───────────┘
//!            ▼
//! ┌──────────────────────┐
//! │  ExecutionGraph      │  root scope, nodes, edges
//! └──────────────────────┘
//! ```
//!
//! - **Sorting** ([`sort`]): Kahn-style topological order plus a
//!   [`ProvenanceIndex`] recording which transform produces each collection
//! - **Decoding** ([`kind`], [`payload`]): urn dispatch into a closed
//!   [`TransformKind`] with its payload decoded by pluggable decoders
//! - **Binding** ([`binding`]): inputs wired to producer nodes, outputs given
//!   fresh nodes typed by their coder and windowed like their first input
//! - **Coders** ([`coder`]): recursive, memoized resolution of the
//!   descriptor's coder table
//! - **Rendering** ([`visualization`]): DOT, Mermaid and ASCII output
//!
//! Translation is synchronous and keeps no state between calls, so a
//! [`Translator`] can be shared freely across threads.
//!
//! ## Quick Start
//!
//! ```rust
//! use bundle_graph::descriptor::{BundleDescriptor, CoderSpec, PTransform};
//! use bundle_graph::graph::{Opcode, UserFn};
//! use bundle_graph::payload::{encode_fn, encode_port, DecodedFn, InboundDecl};
//! use bundle_graph::coder::FullType;
//! use bundle_graph::graph::InputKind;
//! use bundle_graph::{translate, urn};
//!
//! let parse = DecodedFn {
//!     opcode: Opcode::ParDo,
//!     function: UserFn { name: "parse".into(), payload: vec![] },
//!     inbound: vec![InboundDecl { kind: InputKind::Main, element_type: FullType::Bytes }],
//!     outbound: vec![FullType::Bytes],
//! };
//!
//! let descriptor = BundleDescriptor::builder("bundle-1")
//!     .coder("bytes", CoderSpec::new(urn::CODER_BYTES))
//!     .pcollection("raw", "bytes")
//!     .pcollection("parsed", "bytes")
//!     .transform("S", PTransform::new(urn::DATA_SOURCE, encode_port("localhost:50000"))
//!         .with_output("o", "raw"))
//!     .transform("P", PTransform::new(urn::LEGACY_DOFN, encode_fn(&parse))
//!         .with_input("i", "raw")
//!         .with_output("r", "parsed"))
//!     .transform("K", PTransform::new(urn::DATA_SINK, encode_port("localhost:50000"))
//!         .with_input("i", "parsed"))
//!     .build();
//!
//! let graph = translate(&descriptor)?;
//! assert_eq!(graph.nodes().len(), 2);
//! assert_eq!(graph.edges().len(), 3);
//! # Ok::<(), bundle_graph::TranslateError>(())
//! ```
//!
//! ## Errors
//!
//! Malformed or unsupported descriptors produce a [`TranslateError`] naming
//! the offending transform. A legacy-dofn payload carrying an opcode other
//! than ParDo or Combine is a broken upstream contract and panics instead.

pub mod binding;
pub mod coder;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod graph;
pub mod kind;
pub mod payload;
pub mod provenance;
pub mod sort;
pub mod translate;
pub mod urn;
pub mod visualization;
pub mod window;

pub use binding::{BindingResolver, NodeKey, NodeMap};
pub use coder::{Coder, CoderKind, CoderRegistry, CoderUnmarshaller, FullType};
pub use config::{ConsumerLookup, TranslateConfig, PLACEHOLDER_OUTPUT};
pub use descriptor::{BundleDescriptor, CoderSpec, FunctionSpec, PCollection, PTransform};
pub use error::{CoderError, PayloadError, Result, TranslateError};
pub use graph::{
    EdgeId, EdgeKind, ExecutionGraph, GraphSummary, Inbound, InputKind, MultiEdge, Node, NodeId,
    Opcode, Outbound, Port, Target, UserFn,
};
pub use kind::TransformKind;
pub use payload::{EndpointDecoder, FnPayloadDecoder, ProtoEndpointDecoder, ProtoFnDecoder};
pub use provenance::{Producer, ProvenanceIndex, ProvenanceRecord};
pub use sort::{topological_sort, SortedBundle};
pub use translate::Translator;
pub use visualization::{visualize, VisualizationFormat, VisualizationOptions};
pub use window::WindowingStrategy;

/// Translate `descriptor` with a default [`Translator`]
pub fn translate(descriptor: &BundleDescriptor) -> Result<ExecutionGraph> {
    Translator::new().translate(descriptor)
}
