//! Coder registry: coder id → element type and codec
//!
//! The translator resolves the coder of every output collection through a
//! [`CoderRegistry`]. The default registry, [`CoderUnmarshaller`], reads the
//! descriptor's own coder table, resolves component coders recursively and
//! memoizes the result so shared components are decoded once per translation.
//!
//! # Example
//!
//! ```rust
//! use bundle_graph::coder::{CoderRegistry, CoderUnmarshaller, FullType};
//! use bundle_graph::descriptor::CoderSpec;
//! use bundle_graph::urn;
//! use std::collections::HashMap;
//!
//! let table = HashMap::from([
//!     ("k".to_string(), CoderSpec::new(urn::CODER_STRING_UTF8)),
//!     ("v".to_string(), CoderSpec::new(urn::CODER_VARINT)),
//!     ("kv".to_string(), CoderSpec::new(urn::CODER_KV).with_components(["k", "v"])),
//! ]);
//!
//! let coders = CoderUnmarshaller::new(&table);
//! let kv = coders.coder("kv").unwrap();
//! assert_eq!(kv.element_type.to_string(), "KV<string,int64>");
//! ```

use crate::descriptor::CoderSpec;
use crate::error::CoderError;
use crate::urn;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Deepest component nesting [`CoderUnmarshaller`] will follow
pub const MAX_CODER_DEPTH: usize = 64;

/// Element type carried by a node, as implied by its coder
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum FullType {
    Bytes,
    String,
    Int64,
    Float64,
    Bool,
    KV(Box<FullType>, Box<FullType>),
    Iterable(Box<FullType>),
    GlobalWindow,
    IntervalWindow,
    /// Element paired with its window
    WindowedValue(Box<FullType>, Box<FullType>),
}

impl fmt::Display for FullType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes => write!(f, "bytes"),
            Self::String => write!(f, "string"),
            Self::Int64 => write!(f, "int64"),
            Self::Float64 => write!(f, "float64"),
            Self::Bool => write!(f, "bool"),
            Self::KV(key, value) => write!(f, "KV<{},{}>", key, value),
            Self::Iterable(elem) => write!(f, "Iterable<{}>", elem),
            Self::GlobalWindow => write!(f, "GlobalWindow"),
            Self::IntervalWindow => write!(f, "IntervalWindow"),
            Self::WindowedValue(elem, window) => write!(f, "W<{};{}>", elem, window),
        }
    }
}

/// Codec family of a resolved coder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CoderKind {
    Bytes,
    StringUtf8,
    VarInt,
    Double,
    Bool,
    KV,
    Iterable,
    LengthPrefix,
    WindowedValue,
    GlobalWindow,
    IntervalWindow,
}

impl CoderKind {
    pub fn from_urn(urn: &str) -> Option<Self> {
        let kind = match urn {
            urn::CODER_BYTES => Self::Bytes,
            urn::CODER_STRING_UTF8 => Self::StringUtf8,
            urn::CODER_VARINT => Self::VarInt,
            urn::CODER_DOUBLE => Self::Double,
            urn::CODER_BOOL => Self::Bool,
            urn::CODER_KV => Self::KV,
            urn::CODER_ITERABLE => Self::Iterable,
            urn::CODER_LENGTH_PREFIX => Self::LengthPrefix,
            urn::CODER_WINDOWED_VALUE => Self::WindowedValue,
            urn::CODER_GLOBAL_WINDOW => Self::GlobalWindow,
            urn::CODER_INTERVAL_WINDOW => Self::IntervalWindow,
            _ => return None,
        };
        Some(kind)
    }

    /// Number of component coders this family requires
    pub fn arity(self) -> usize {
        match self {
            Self::KV | Self::WindowedValue => 2,
            Self::Iterable | Self::LengthPrefix => 1,
            _ => 0,
        }
    }

    pub fn is_window(self) -> bool {
        matches!(self, Self::GlobalWindow | Self::IntervalWindow)
    }
}

/// A resolved coder: codec family, element type and resolved components
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coder {
    pub id: String,
    pub kind: CoderKind,
    pub element_type: FullType,
    pub components: Vec<Arc<Coder>>,
}

impl Coder {
    /// Build a coder from already-resolved components
    ///
    /// # Panics
    ///
    /// In debug builds, when `components` doesn't hold exactly
    /// `kind.arity()` coders.
    pub fn new(id: impl Into<String>, kind: CoderKind, components: Vec<Arc<Coder>>) -> Self {
        debug_assert_eq!(
            components.len(),
            kind.arity(),
            "{:?} coder built with the wrong number of components",
            kind
        );
        let element_type = match (kind, components.as_slice()) {
            (CoderKind::Bytes, _) => FullType::Bytes,
            (CoderKind::StringUtf8, _) => FullType::String,
            (CoderKind::VarInt, _) => FullType::Int64,
            (CoderKind::Double, _) => FullType::Float64,
            (CoderKind::Bool, _) => FullType::Bool,
            (CoderKind::GlobalWindow, _) => FullType::GlobalWindow,
            (CoderKind::IntervalWindow, _) => FullType::IntervalWindow,
            (CoderKind::KV, [key, value, ..]) => FullType::KV(
                Box::new(key.element_type.clone()),
                Box::new(value.element_type.clone()),
            ),
            (CoderKind::Iterable, [elem, ..]) => {
                FullType::Iterable(Box::new(elem.element_type.clone()))
            }
            (CoderKind::LengthPrefix, [inner, ..]) => inner.element_type.clone(),
            (CoderKind::WindowedValue, [elem, window, ..]) => FullType::WindowedValue(
                Box::new(elem.element_type.clone()),
                Box::new(window.element_type.clone()),
            ),
            // Unreachable with the right arity.
            _ => FullType::Bytes,
        };
        Self {
            id: id.into(),
            kind,
            element_type,
            components,
        }
    }

    pub fn bytes(id: impl Into<String>) -> Self {
        Self::new(id, CoderKind::Bytes, Vec::new())
    }
}

/// Resolves coder ids to coders
///
/// Implementations must return the same coder for the same id for the
/// lifetime of one translation.
pub trait CoderRegistry {
    fn coder(&self, id: &str) -> Result<Arc<Coder>, CoderError>;
}

impl CoderRegistry for HashMap<String, Arc<Coder>> {
    fn coder(&self, id: &str) -> Result<Arc<Coder>, CoderError> {
        self.get(id)
            .cloned()
            .ok_or_else(|| CoderError::NotFound(id.to_string()))
    }
}

/// Default registry over a descriptor's coder table
pub struct CoderUnmarshaller<'a> {
    table: &'a HashMap<String, CoderSpec>,
    cache: RwLock<HashMap<String, Arc<Coder>>>,
}

impl<'a> CoderUnmarshaller<'a> {
    pub fn new(table: &'a HashMap<String, CoderSpec>) -> Self {
        Self {
            table,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Number of coders resolved so far
    pub fn resolved(&self) -> usize {
        self.cache.read().len()
    }

    fn resolve(&self, id: &str, visiting: &mut Vec<String>) -> Result<Arc<Coder>, CoderError> {
        if let Some(coder) = self.cache.read().get(id) {
            return Ok(Arc::clone(coder));
        }
        if visiting.iter().any(|seen| seen == id) {
            return Err(CoderError::Recursive(id.to_string()));
        }
        if visiting.len() > MAX_CODER_DEPTH {
            return Err(CoderError::Malformed {
                id: id.to_string(),
                reason: format!("coder nesting exceeds {}", MAX_CODER_DEPTH),
            });
        }

        let spec = self
            .table
            .get(id)
            .ok_or_else(|| CoderError::NotFound(id.to_string()))?;
        let kind = CoderKind::from_urn(&spec.urn).ok_or_else(|| CoderError::UnknownUrn {
            id: id.to_string(),
            urn: spec.urn.clone(),
        })?;
        if spec.component_coder_ids.len() != kind.arity() {
            return Err(CoderError::Malformed {
                id: id.to_string(),
                reason: format!(
                    "{} expects {} component(s), got {}",
                    spec.urn,
                    kind.arity(),
                    spec.component_coder_ids.len()
                ),
            });
        }

        visiting.push(id.to_string());
        let components: Result<Vec<_>, _> = spec
            .component_coder_ids
            .iter()
            .map(|component| self.resolve(component, visiting))
            .collect();
        visiting.pop();
        let components = components?;

        if kind == CoderKind::WindowedValue && !components[1].kind.is_window() {
            return Err(CoderError::Malformed {
                id: id.to_string(),
                reason: format!("component '{}' is not a window coder", components[1].id),
            });
        }

        let coder = Arc::new(Coder::new(id, kind, components));
        tracing::trace!(coder = id, element_type = %coder.element_type, "resolved coder");
        // Another thread may have resolved the same id meanwhile; keep the first.
        let cached = Arc::clone(self.cache.write().entry(id.to_string()).or_insert(coder));
        Ok(cached)
    }
}

impl CoderRegistry for CoderUnmarshaller<'_> {
    fn coder(&self, id: &str) -> Result<Arc<Coder>, CoderError> {
        self.resolve(id, &mut Vec::new())
    }
}
