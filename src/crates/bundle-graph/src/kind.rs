//! Closed set of transform kinds the translator understands
//!
//! Each urn maps to one [`TransformKind`] variant holding its decoded payload.
//! Supporting a new kind means adding a variant here and one arm in the
//! dispatcher.

use crate::descriptor::PTransform;
use crate::error::{Result, TranslateError};
use crate::graph::Port;
use crate::payload::{DecodedFn, EndpointDecoder, FnPayloadDecoder};
use crate::urn;

/// A transform's kind tag with its payload decoded
#[derive(Debug, Clone, PartialEq)]
pub enum TransformKind {
    /// Legacy source: always a ParDo edge, whatever opcode the payload names
    LegacySource(DecodedFn),
    /// Legacy single-function transform: ParDo or Combine per the opcode
    LegacyDoFn(DecodedFn),
    /// Remote data source
    DataSource(Port),
    /// Remote data sink
    DataSink(Port),
}

impl TransformKind {
    /// Decode `transform`'s payload according to its urn
    ///
    /// Unknown urns fail with [`TranslateError::UnknownTransformKind`] before
    /// any payload is looked at.
    pub fn decode(
        transform_id: &str,
        transform: &PTransform,
        fns: &dyn FnPayloadDecoder,
        ports: &dyn EndpointDecoder,
    ) -> Result<Self> {
        let payload = transform.spec.payload.as_slice();
        let wrap = |err| TranslateError::payload(transform_id, err);

        let kind = match transform.urn() {
            urn::LEGACY_SOURCE => Self::LegacySource(fns.decode_fn(payload).map_err(wrap)?),
            urn::LEGACY_DOFN => Self::LegacyDoFn(fns.decode_fn(payload).map_err(wrap)?),
            urn::DATA_SOURCE => Self::DataSource(ports.decode_port(payload).map_err(wrap)?),
            urn::DATA_SINK => Self::DataSink(ports.decode_port(payload).map_err(wrap)?),
            other => {
                return Err(TranslateError::UnknownTransformKind {
                    transform: transform_id.to_string(),
                    urn: other.to_string(),
                })
            }
        };
        Ok(kind)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::LegacySource(_) => "legacy-source",
            Self::LegacyDoFn(_) => "legacy-dofn",
            Self::DataSource(_) => "data-source",
            Self::DataSink(_) => "data-sink",
        }
    }
}
