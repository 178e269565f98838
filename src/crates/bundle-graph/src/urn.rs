//! Well-known urns understood by the translator

/// Legacy single-function source transform; always translates to a ParDo edge.
pub const LEGACY_SOURCE: &str = "urn:org.apache.beam:source:java:0.1";

/// Legacy single-function transform; the payload opcode picks ParDo or Combine.
pub const LEGACY_DOFN: &str = "urn:beam:dofn:javasdk:0.1";

/// Remote data source fed by the runner over the data plane.
pub const DATA_SOURCE: &str = "urn:org.apache.beam:source:runner:0.1";

/// Remote data sink drained by the runner over the data plane.
pub const DATA_SINK: &str = "urn:org.apache.beam:sink:runner:0.1";

pub const CODER_BYTES: &str = "beam:coder:bytes:v1";
pub const CODER_STRING_UTF8: &str = "beam:coder:string_utf8:v1";
pub const CODER_VARINT: &str = "beam:coder:varint:v1";
pub const CODER_DOUBLE: &str = "beam:coder:double:v1";
pub const CODER_BOOL: &str = "beam:coder:bool:v1";
pub const CODER_KV: &str = "beam:coder:kv:v1";
pub const CODER_ITERABLE: &str = "beam:coder:iterable:v1";
pub const CODER_LENGTH_PREFIX: &str = "beam:coder:length_prefix:v1";
pub const CODER_WINDOWED_VALUE: &str = "beam:coder:windowed_value:v1";
pub const CODER_GLOBAL_WINDOW: &str = "beam:coder:global_window:v1";
pub const CODER_INTERVAL_WINDOW: &str = "beam:coder:interval_window:v1";
