//! Error types for bundle translation
//!
//! Every failure of the translation layer is reported through [`TranslateError`].
//! None of these errors are retryable: they describe a malformed or unsupported
//! descriptor, and the caller is expected to reject the whole bundle.
//!
//! # Error Hierarchy
//!
//! ```text
//! TranslateError
//! ├── RootlessBundle         - descriptor has no transforms
//! ├── BundleHasCycle         - some transforms never became ready
//! ├── UnexpectedInputCount   - resolved inputs don't match the edge arity
//! ├── UnexpectedOutputCount  - real outputs don't match the edge arity
//! ├── UnknownTransformKind   - unrecognized urn
//! ├── PayloadDecode          - malformed function or endpoint payload
//! ├── CoderResolution        - coder id missing or undecodable
//! ├── UnknownCollection      - dangling collection reference
//! ├── DuplicateProducer      - two transforms claim one collection
//! ├── MissingNode            - input wired to an output that produced no node
//! └── Json / Yaml / Toml / Io - descriptor and config loading
//! ```
//!
//! The collaborator errors [`PayloadError`] and [`CoderError`] are wrapped
//! with the id of the transform being translated when they surface.
//!
//! A legacy-dofn transform whose payload decodes to an opcode other than
//! ParDo or Combine is *not* represented here. That condition means the
//! trusted upstream compiler broke its contract, and translation panics.
//!
//! # Matching Specific Errors
//!
//! ```rust
//! use bundle_graph::error::TranslateError;
//!
//! fn describe(err: &TranslateError) -> String {
//!     match err {
//!         TranslateError::BundleHasCycle { unresolved, .. } => {
//!             format!("cycle through {}", unresolved.join(", "))
//!         }
//!         TranslateError::UnexpectedOutputCount { transform, expected, actual } => {
//!             format!("{transform}: want {expected} outputs, got {actual}")
//!         }
//!         other => other.to_string(),
//!     }
//! }
//! ```

use thiserror::Error;

/// Convenience result type using [`TranslateError`]
pub type Result<T> = std::result::Result<T, TranslateError>;

/// Errors raised while translating a bundle descriptor into an execution graph
#[derive(Error, Debug)]
pub enum TranslateError {
    /// The descriptor declares no transforms at all.
    #[error("invalid bundle: no roots supplied")]
    RootlessBundle,

    /// Some transforms never had all of their inputs satisfied.
    ///
    /// `unresolved` lists the ids of those transforms, sorted.
    #[error(
        "bundle contained a cycle: ordered {ordered} of {total} transforms, unresolved: [{}]",
        .unresolved.join(", ")
    )]
    BundleHasCycle {
        /// Number of transforms the sorter managed to order
        ordered: usize,
        /// Number of transforms declared in the descriptor
        total: usize,
        /// Transforms left waiting on an input
        unresolved: Vec<String>,
    },

    /// The resolved producer references don't match the edge's input slots.
    #[error("transform '{transform}': unexpected number of inputs: {actual}, want {expected}")]
    UnexpectedInputCount {
        /// Transform being translated
        transform: String,
        /// Input slots the edge variant expects
        expected: usize,
        /// Inputs actually resolved or declared
        actual: usize,
    },

    /// The transform's real outputs don't match the edge's output slots.
    #[error("transform '{transform}': unexpected number of outputs: {actual}, want {expected}")]
    UnexpectedOutputCount {
        /// Transform being translated
        transform: String,
        /// Output slots the edge variant expects
        expected: usize,
        /// Outputs actually declared
        actual: usize,
    },

    /// The transform's urn is not one this layer knows how to translate.
    #[error("transform '{transform}': unknown transform kind '{urn}'")]
    UnknownTransformKind {
        /// Transform being translated
        transform: String,
        /// The offending urn
        urn: String,
    },

    /// The transform's opaque payload could not be decoded.
    #[error("transform '{transform}': malformed payload: {source}")]
    PayloadDecode {
        /// Transform being translated
        transform: String,
        /// Decoder failure
        #[source]
        source: PayloadError,
    },

    /// An output collection's coder could not be resolved.
    #[error("transform '{transform}': cannot resolve coder '{coder_id}': {source}")]
    CoderResolution {
        /// Transform being translated
        transform: String,
        /// Coder referenced by the output collection
        coder_id: String,
        /// Registry failure
        #[source]
        source: CoderError,
    },

    /// A transform references a collection id the descriptor doesn't declare.
    #[error("transform '{transform}' references unknown collection '{collection}'")]
    UnknownCollection {
        /// Transform holding the dangling reference
        transform: String,
        /// The undeclared collection id
        collection: String,
    },

    /// Two transforms declare the same collection as an output.
    #[error("collection '{collection}' is produced by both '{first}' and '{second}'")]
    DuplicateProducer {
        /// Contested collection
        collection: String,
        /// Producer recorded first
        first: String,
        /// Producer that tried to claim it afterwards
        second: String,
    },

    /// An input is wired to a producer output that never became a node.
    #[error("transform '{transform}': no node for output '{output}' of '{producer}'")]
    MissingNode {
        /// Transform being translated
        transform: String,
        /// Producing transform
        producer: String,
        /// Local output name on the producer
        output: String,
    },

    /// JSON descriptor parsing failed.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML descriptor parsing failed.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML configuration parsing failed.
    #[error("Configuration error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Reading a descriptor or config file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranslateError {
    /// Create an input arity error
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bundle_graph::error::TranslateError;
    ///
    /// let err = TranslateError::input_count("sink", 1, 2);
    /// assert_eq!(
    ///     err.to_string(),
    ///     "transform 'sink': unexpected number of inputs: 2, want 1"
    /// );
    /// ```
    pub fn input_count(transform: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::UnexpectedInputCount {
            transform: transform.into(),
            expected,
            actual,
        }
    }

    /// Create an output arity error
    pub fn output_count(transform: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::UnexpectedOutputCount {
            transform: transform.into(),
            expected,
            actual,
        }
    }

    /// Wrap a payload decoder failure with the transform it came from
    pub fn payload(transform: impl Into<String>, source: PayloadError) -> Self {
        Self::PayloadDecode {
            transform: transform.into(),
            source,
        }
    }

    /// Wrap a coder registry failure with the transform and coder id
    pub fn coder(
        transform: impl Into<String>,
        coder_id: impl Into<String>,
        source: CoderError,
    ) -> Self {
        Self::CoderResolution {
            transform: transform.into(),
            coder_id: coder_id.into(),
            source,
        }
    }

    /// Create a dangling collection reference error
    pub fn unknown_collection(transform: impl Into<String>, collection: impl Into<String>) -> Self {
        Self::UnknownCollection {
            transform: transform.into(),
            collection: collection.into(),
        }
    }

    /// The transform id this error is attributed to, when there is one
    pub fn transform(&self) -> Option<&str> {
        match self {
            Self::UnexpectedInputCount { transform, .. }
            | Self::UnexpectedOutputCount { transform, .. }
            | Self::UnknownTransformKind { transform, .. }
            | Self::PayloadDecode { transform, .. }
            | Self::CoderResolution { transform, .. }
            | Self::UnknownCollection { transform, .. }
            | Self::MissingNode { transform, .. } => Some(transform),
            _ => None,
        }
    }
}

/// Failures of the function-payload and remote-endpoint decoders
#[derive(Error, Debug)]
pub enum PayloadError {
    /// The payload was expected to be base64 text and wasn't.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The protobuf message could not be decoded.
    #[error("invalid protobuf message: {0}")]
    Proto(#[from] prost::DecodeError),

    /// The function payload carries an opcode outside the opcode table.
    #[error("unknown opcode {0}")]
    UnknownOpcode(i32),

    /// An inbound declaration carries an input kind outside the table.
    #[error("unknown input kind {0}")]
    UnknownInputKind(i32),

    /// The function payload has no executable function attached.
    #[error("payload carries no function")]
    MissingFunction,

    /// An inbound or outbound declaration has no element type.
    #[error("declaration is missing an element type")]
    MissingType,

    /// A declared element type is not one the graph can represent.
    #[error("unsupported element type '{0}'")]
    UnknownType(String),

    /// The endpoint payload has no service descriptor.
    #[error("remote port carries no api service descriptor")]
    MissingEndpoint,
}

/// Failures of the coder registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoderError {
    /// No coder with this id exists in the coder table.
    #[error("coder '{0}' not found")]
    NotFound(String),

    /// The coder's urn is not one the registry understands.
    #[error("coder '{id}' has unsupported urn '{urn}'")]
    UnknownUrn {
        /// Coder id
        id: String,
        /// The unsupported urn
        urn: String,
    },

    /// The coder's components don't fit its urn.
    #[error("coder '{id}' is malformed: {reason}")]
    Malformed {
        /// Coder id
        id: String,
        /// What is wrong with it
        reason: String,
    },

    /// The coder refers back to itself through its components.
    #[error("coder '{0}' is defined in terms of itself")]
    Recursive(String),
}
