//! Function-payload and remote-endpoint decoders
//!
//! Transform payloads are opaque bytes whose meaning depends on the urn. Two
//! shapes matter to translation:
//!
//! - **Function payloads** (legacy source / legacy dofn urns): base64 text of a
//!   protobuf [`MultiEdgePayload`] carrying the opcode, the executable
//!   function and the declared input/output shape.
//! - **Endpoint payloads** (data source / data sink urns): a protobuf
//!   [`RemoteGrpcPort`] naming the data-plane address.
//!
//! Decoding goes through the [`FnPayloadDecoder`] and [`EndpointDecoder`]
//! traits so a worker embedding the translator can substitute its own wire
//! formats. [`ProtoFnDecoder`] and [`ProtoEndpointDecoder`] are the defaults,
//! and [`encode_fn`] / [`encode_port`] produce matching payloads for tooling.

use crate::coder::FullType;
use crate::error::PayloadError;
use crate::graph::{InputKind, Opcode, Port, UserFn};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use prost::Message;

/// Data-plane service address
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ApiServiceDescriptor {
    #[prost(string, tag = "1")]
    pub url: ::prost::alloc::string::String,
}

/// Endpoint payload of data source and data sink transforms
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RemoteGrpcPort {
    #[prost(message, optional, tag = "1")]
    pub api_service_descriptor: ::core::option::Option<ApiServiceDescriptor>,
    #[prost(string, tag = "2")]
    pub coder_id: ::prost::alloc::string::String,
}

/// Element type tree as encoded on the wire
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TypePayload {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "2")]
    pub components: ::prost::alloc::vec::Vec<TypePayload>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UserFnPayload {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "2")]
    pub payload: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InboundPayload {
    #[prost(int32, tag = "1")]
    pub kind: i32,
    #[prost(message, optional, tag = "2")]
    pub element_type: ::core::option::Option<TypePayload>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OutboundPayload {
    #[prost(message, optional, tag = "1")]
    pub element_type: ::core::option::Option<TypePayload>,
}

/// Function payload of legacy single-function transforms
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MultiEdgePayload {
    #[prost(message, optional, tag = "1")]
    pub function: ::core::option::Option<UserFnPayload>,
    #[prost(int32, tag = "2")]
    pub opcode: i32,
    #[prost(message, repeated, tag = "3")]
    pub inbound: ::prost::alloc::vec::Vec<InboundPayload>,
    #[prost(message, repeated, tag = "4")]
    pub outbound: ::prost::alloc::vec::Vec<OutboundPayload>,
}

/// Declared shape of one function input
#[derive(Debug, Clone, PartialEq)]
pub struct InboundDecl {
    pub kind: InputKind,
    pub element_type: FullType,
}

/// A decoded function payload
///
/// `inbound` and `outbound` fix the edge's arity: binding fails unless the
/// transform's wiring resolves to exactly that many inputs and outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFn {
    pub opcode: Opcode,
    pub function: UserFn,
    pub inbound: Vec<InboundDecl>,
    pub outbound: Vec<FullType>,
}

/// Decodes function payloads of legacy single-function transforms
pub trait FnPayloadDecoder: Send + Sync {
    fn decode_fn(&self, payload: &[u8]) -> Result<DecodedFn, PayloadError>;
}

/// Decodes endpoint payloads of data source and sink transforms
pub trait EndpointDecoder: Send + Sync {
    fn decode_port(&self, payload: &[u8]) -> Result<Port, PayloadError>;
}

/// Default function decoder: base64 text wrapping a [`MultiEdgePayload`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtoFnDecoder;

impl FnPayloadDecoder for ProtoFnDecoder {
    fn decode_fn(&self, payload: &[u8]) -> Result<DecodedFn, PayloadError> {
        let raw = STANDARD.decode(trim_whitespace(payload))?;
        let message = MultiEdgePayload::decode(raw.as_slice())?;

        let opcode =
            Opcode::from_i32(message.opcode).ok_or(PayloadError::UnknownOpcode(message.opcode))?;

        let function = match message.function {
            Some(function) if !function.name.is_empty() => UserFn {
                name: function.name,
                payload: function.payload,
            },
            _ => return Err(PayloadError::MissingFunction),
        };

        let inbound = message
            .inbound
            .into_iter()
            .map(|input| {
                let kind = InputKind::from_i32(input.kind)
                    .ok_or(PayloadError::UnknownInputKind(input.kind))?;
                let element_type = decode_type(input.element_type.as_ref())?;
                Ok(InboundDecl { kind, element_type })
            })
            .collect::<Result<Vec<_>, PayloadError>>()?;

        let outbound = message
            .outbound
            .iter()
            .map(|output| decode_type(output.element_type.as_ref()))
            .collect::<Result<Vec<_>, PayloadError>>()?;

        Ok(DecodedFn {
            opcode,
            function,
            inbound,
            outbound,
        })
    }
}

/// Default endpoint decoder: a raw [`RemoteGrpcPort`] message
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtoEndpointDecoder;

impl EndpointDecoder for ProtoEndpointDecoder {
    fn decode_port(&self, payload: &[u8]) -> Result<Port, PayloadError> {
        let port = RemoteGrpcPort::decode(payload)?;
        let descriptor = port
            .api_service_descriptor
            .ok_or(PayloadError::MissingEndpoint)?;
        Ok(Port {
            url: descriptor.url,
        })
    }
}

fn trim_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |last| last + 1);
    &bytes[start..end]
}

fn decode_type(payload: Option<&TypePayload>) -> Result<FullType, PayloadError> {
    let payload = payload.ok_or(PayloadError::MissingType)?;
    let component = |index: usize| -> Result<Box<FullType>, PayloadError> {
        let child = payload
            .components
            .get(index)
            .ok_or_else(|| PayloadError::UnknownType(payload.name.clone()))?;
        Ok(Box::new(decode_type(Some(child))?))
    };

    let full_type = match payload.name.as_str() {
        "bytes" => FullType::Bytes,
        "string" => FullType::String,
        "int64" => FullType::Int64,
        "float64" => FullType::Float64,
        "bool" => FullType::Bool,
        "GlobalWindow" => FullType::GlobalWindow,
        "IntervalWindow" => FullType::IntervalWindow,
        "KV" => FullType::KV(component(0)?, component(1)?),
        "Iterable" => FullType::Iterable(component(0)?),
        "W" => FullType::WindowedValue(component(0)?, component(1)?),
        other => return Err(PayloadError::UnknownType(other.to_string())),
    };
    Ok(full_type)
}

fn encode_type(full_type: &FullType) -> TypePayload {
    let (name, components) = match full_type {
        FullType::Bytes => ("bytes", vec![]),
        FullType::String => ("string", vec![]),
        FullType::Int64 => ("int64", vec![]),
        FullType::Float64 => ("float64", vec![]),
        FullType::Bool => ("bool", vec![]),
        FullType::GlobalWindow => ("GlobalWindow", vec![]),
        FullType::IntervalWindow => ("IntervalWindow", vec![]),
        FullType::KV(key, value) => ("KV", vec![encode_type(key), encode_type(value)]),
        FullType::Iterable(elem) => ("Iterable", vec![encode_type(elem)]),
        FullType::WindowedValue(elem, window) => {
            ("W", vec![encode_type(elem), encode_type(window)])
        }
    };
    TypePayload {
        name: name.to_string(),
        components,
    }
}

/// Encode a function payload the way [`ProtoFnDecoder`] expects it
pub fn encode_fn(decoded: &DecodedFn) -> Vec<u8> {
    let message = MultiEdgePayload {
        function: Some(UserFnPayload {
            name: decoded.function.name.clone(),
            payload: decoded.function.payload.clone(),
        }),
        opcode: decoded.opcode.as_i32(),
        inbound: decoded
            .inbound
            .iter()
            .map(|input| InboundPayload {
                kind: input.kind.as_i32(),
                element_type: Some(encode_type(&input.element_type)),
            })
            .collect(),
        outbound: decoded
            .outbound
            .iter()
            .map(|output| OutboundPayload {
                element_type: Some(encode_type(output)),
            })
            .collect(),
    };
    STANDARD.encode(message.encode_to_vec()).into_bytes()
}

/// Encode an endpoint payload the way [`ProtoEndpointDecoder`] expects it
pub fn encode_port(url: impl Into<String>) -> Vec<u8> {
    RemoteGrpcPort {
        api_service_descriptor: Some(ApiServiceDescriptor { url: url.into() }),
        coder_id: String::new(),
    }
    .encode_to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn par_do(inputs: usize, outputs: usize) -> DecodedFn {
        DecodedFn {
            opcode: Opcode::ParDo,
            function: UserFn {
                name: "main.extractFn".to_string(),
                payload: vec![7, 7],
            },
            inbound: (0..inputs)
                .map(|_| InboundDecl {
                    kind: InputKind::Main,
                    element_type: FullType::Bytes,
                })
                .collect(),
            outbound: (0..outputs)
                .map(|_| FullType::KV(Box::new(FullType::String), Box::new(FullType::Int64)))
                .collect(),
        }
    }

    #[test]
    fn test_fn_payload_decodes_encoded_shape() {
        let decoded = par_do(2, 1);
        let payload = encode_fn(&decoded);

        // Function payloads travel as base64 text.
        assert!(payload.iter().all(|b| b.is_ascii_graphic()));
        assert_eq!(ProtoFnDecoder.decode_fn(&payload).unwrap(), decoded);
    }

    #[test]
    fn test_fn_payload_tolerates_trailing_newline() {
        let mut payload = encode_fn(&par_do(1, 1));
        payload.push(b'\n');
        assert!(ProtoFnDecoder.decode_fn(&payload).is_ok());
    }

    #[test]
    fn test_fn_payload_errors() {
        assert!(matches!(
            ProtoFnDecoder.decode_fn(b"%%%"),
            Err(PayloadError::Base64(_))
        ));

        let garbage = STANDARD.encode([0xff, 0xff, 0xff]).into_bytes();
        assert!(matches!(
            ProtoFnDecoder.decode_fn(&garbage),
            Err(PayloadError::Proto(_))
        ));

        let unknown_op = MultiEdgePayload {
            function: Some(UserFnPayload {
                name: "f".to_string(),
                payload: vec![],
            }),
            opcode: 42,
            inbound: vec![],
            outbound: vec![],
        };
        let payload = STANDARD.encode(unknown_op.encode_to_vec()).into_bytes();
        assert!(matches!(
            ProtoFnDecoder.decode_fn(&payload),
            Err(PayloadError::UnknownOpcode(42))
        ));

        let no_fn = MultiEdgePayload {
            function: None,
            opcode: 1,
            inbound: vec![],
            outbound: vec![],
        };
        let payload = STANDARD.encode(no_fn.encode_to_vec()).into_bytes();
        assert!(matches!(
            ProtoFnDecoder.decode_fn(&payload),
            Err(PayloadError::MissingFunction)
        ));
    }

    #[test]
    fn test_fn_payload_rejects_bad_types() {
        let message = MultiEdgePayload {
            function: Some(UserFnPayload {
                name: "f".to_string(),
                payload: vec![],
            }),
            opcode: 1,
            inbound: vec![InboundPayload {
                kind: 0,
                element_type: Some(TypePayload {
                    name: "KV".to_string(),
                    components: vec![],
                }),
            }],
            outbound: vec![],
        };
        let payload = STANDARD.encode(message.encode_to_vec()).into_bytes();
        assert!(matches!(
            ProtoFnDecoder.decode_fn(&payload),
            Err(PayloadError::UnknownType(name)) if name == "KV"
        ));

        let message = MultiEdgePayload {
            outbound: vec![OutboundPayload { element_type: None }],
            inbound: vec![],
            ..message
        };
        let payload = STANDARD.encode(message.encode_to_vec()).into_bytes();
        assert!(matches!(
            ProtoFnDecoder.decode_fn(&payload),
            Err(PayloadError::MissingType)
        ));
    }

    #[test]
    fn test_port_payload() {
        let port = ProtoEndpointDecoder
            .decode_port(&encode_port("localhost:50000"))
            .unwrap();
        assert_eq!(port.url, "localhost:50000");

        let empty = RemoteGrpcPort::default().encode_to_vec();
        assert!(matches!(
            ProtoEndpointDecoder.decode_port(&empty),
            Err(PayloadError::MissingEndpoint)
        ));

        assert!(matches!(
            ProtoEndpointDecoder.decode_port(&[0x0a, 0x05, 0x01]),
            Err(PayloadError::Proto(_))
        ));
    }
}
