//! Wire-level bundle descriptor model
//!
//! A [`BundleDescriptor`] is the flat, unordered input of translation: transforms
//! keyed by id, collection metadata keyed by id, and a coder table. It only
//! stores forward references (transform → collection ids); nothing records
//! which transform produces a collection. That relationship is rebuilt by the
//! [`sort`](crate::sort) module.
//!
//! Descriptors are normally handed over already deserialized by the control
//! channel. For tooling and tests they can also be loaded from JSON or YAML,
//! in which case opaque payloads are written as base64 text:
//!
//! ```yaml
//! id: bundle-1
//! transforms:
//!   read:
//!     spec:
//!       urn: "urn:org.apache.beam:source:runner:0.1"
//!       payload: "CgsKCWxvY2FsOjEyMw=="
//!     outputs:
//!       o: pc1
//! pcollections:
//!   pc1:
//!     coder_id: bytes
//! coders:
//!   bytes:
//!     urn: "beam:coder:bytes:v1"
//! ```

use crate::error::{Result, TranslateError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Complete wire-format input for one unit of work
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleDescriptor {
    /// Descriptor id, as registered by the runner
    #[serde(default)]
    pub id: String,

    /// All transforms keyed by transform id
    #[serde(default)]
    pub transforms: HashMap<String, PTransform>,

    /// Collection metadata keyed by collection id
    #[serde(default)]
    pub pcollections: HashMap<String, PCollection>,

    /// Coder table keyed by coder id
    #[serde(default)]
    pub coders: HashMap<String, CoderSpec>,
}

/// One processing step of the descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PTransform {
    /// Human readable name, informational only
    #[serde(default)]
    pub unique_name: String,

    /// Kind tag and opaque payload
    pub spec: FunctionSpec,

    /// Local input name → collection id
    #[serde(default)]
    pub inputs: HashMap<String, String>,

    /// Local output name → collection id
    #[serde(default)]
    pub outputs: HashMap<String, String>,
}

/// Kind tag (urn) plus a payload whose meaning depends on the urn
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub urn: String,

    #[serde(default, with = "base64_bytes")]
    pub payload: Vec<u8>,
}

/// Collection metadata as carried on the wire
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PCollection {
    #[serde(default)]
    pub unique_name: String,

    /// Id of the coder in the descriptor's coder table
    pub coder_id: String,
}

/// Coder table entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoderSpec {
    pub urn: String,

    #[serde(default)]
    pub component_coder_ids: Vec<String>,

    #[serde(default, with = "base64_bytes")]
    pub payload: Vec<u8>,
}

impl BundleDescriptor {
    /// Create an empty descriptor with the given id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Start a fluent [`DescriptorBuilder`]
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bundle_graph::descriptor::{BundleDescriptor, CoderSpec, PTransform};
    /// use bundle_graph::urn;
    ///
    /// let descriptor = BundleDescriptor::builder("b1")
    ///     .coder("bytes", CoderSpec::new(urn::CODER_BYTES))
    ///     .pcollection("pc1", "bytes")
    ///     .transform("read", PTransform::new(urn::DATA_SOURCE, vec![]).with_output("o", "pc1"))
    ///     .build();
    ///
    /// assert_eq!(descriptor.transforms.len(), 1);
    /// ```
    pub fn builder(id: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder {
            descriptor: Self::new(id),
        }
    }

    /// Parse a descriptor from JSON
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Parse a descriptor from YAML
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load a descriptor from a file
    ///
    /// Files ending in `.json` are parsed as JSON; anything else is parsed as
    /// YAML, which also accepts JSON documents.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    /// Serialize as pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serialize as YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Transform ids in ascending order
    pub fn transform_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.transforms.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Verify every collection referenced by a transform is declared
    ///
    /// Transforms and their slots are visited in sorted order so the reported
    /// error is stable across runs.
    pub fn check_references(&self) -> Result<()> {
        for id in self.transform_ids() {
            let transform = &self.transforms[id];
            for (_, collection) in transform
                .sorted_inputs()
                .into_iter()
                .chain(transform.sorted_outputs())
            {
                if !self.pcollections.contains_key(collection) {
                    return Err(TranslateError::unknown_collection(id, collection));
                }
            }
        }
        Ok(())
    }
}

impl PTransform {
    /// Create a transform with the given kind tag and payload
    pub fn new(urn: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            spec: FunctionSpec {
                urn: urn.into(),
                payload: payload.into(),
            },
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.unique_name = name.into();
        self
    }

    /// Wire a local input name to a collection
    pub fn with_input(mut self, name: impl Into<String>, collection: impl Into<String>) -> Self {
        self.inputs.insert(name.into(), collection.into());
        self
    }

    /// Wire a local output name to a collection
    pub fn with_output(mut self, name: impl Into<String>, collection: impl Into<String>) -> Self {
        self.outputs.insert(name.into(), collection.into());
        self
    }

    /// The transform's kind tag
    pub fn urn(&self) -> &str {
        &self.spec.urn
    }

    /// `(local name, collection id)` pairs ordered by local name
    pub fn sorted_inputs(&self) -> Vec<(&str, &str)> {
        sorted_slots(&self.inputs)
    }

    /// `(local name, collection id)` pairs ordered by local name
    pub fn sorted_outputs(&self) -> Vec<(&str, &str)> {
        sorted_slots(&self.outputs)
    }
}

fn sorted_slots(slots: &HashMap<String, String>) -> Vec<(&str, &str)> {
    let mut pairs: Vec<(&str, &str)> = slots
        .iter()
        .map(|(name, collection)| (name.as_str(), collection.as_str()))
        .collect();
    pairs.sort_unstable();
    pairs
}

impl PCollection {
    pub fn new(coder_id: impl Into<String>) -> Self {
        Self {
            unique_name: String::new(),
            coder_id: coder_id.into(),
        }
    }
}

impl CoderSpec {
    /// Create a coder entry with no components or payload
    pub fn new(urn: impl Into<String>) -> Self {
        Self {
            urn: urn.into(),
            ..Default::default()
        }
    }

    /// Attach component coder ids, in positional order
    pub fn with_components<I, S>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.component_coder_ids = components.into_iter().map(Into::into).collect();
        self
    }
}

/// Fluent construction of a [`BundleDescriptor`]
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    descriptor: BundleDescriptor,
}

impl DescriptorBuilder {
    pub fn coder(mut self, id: impl Into<String>, spec: CoderSpec) -> Self {
        self.descriptor.coders.insert(id.into(), spec);
        self
    }

    pub fn pcollection(mut self, id: impl Into<String>, coder_id: impl Into<String>) -> Self {
        let id = id.into();
        let collection = PCollection {
            unique_name: id.clone(),
            coder_id: coder_id.into(),
        };
        self.descriptor.pcollections.insert(id, collection);
        self
    }

    pub fn transform(mut self, id: impl Into<String>, transform: PTransform) -> Self {
        self.descriptor.transforms.insert(id.into(), transform);
        self
    }

    pub fn build(self) -> BundleDescriptor {
        self.descriptor
    }
}

/// Serde adapter writing byte payloads as standard base64 text
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD
            .decode(text.trim().as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::urn;

    fn sample() -> BundleDescriptor {
        BundleDescriptor::builder("b1")
            .coder("bytes", CoderSpec::new(urn::CODER_BYTES))
            .pcollection("pc1", "bytes")
            .transform(
                "read",
                PTransform::new(urn::DATA_SOURCE, vec![1, 2, 3]).with_output("o", "pc1"),
            )
            .transform(
                "write",
                PTransform::new(urn::DATA_SINK, vec![]).with_input("i", "pc1"),
            )
            .build()
    }

    #[test]
    fn test_sorted_slots_are_ordered_by_name() {
        let transform = PTransform::new("urn", vec![])
            .with_output("b", "pc2")
            .with_output("a", "pc1")
            .with_output("c", "pc3");

        assert_eq!(
            transform.sorted_outputs(),
            vec![("a", "pc1"), ("b", "pc2"), ("c", "pc3")]
        );
    }

    #[test]
    fn test_check_references() {
        assert!(sample().check_references().is_ok());

        let mut descriptor = sample();
        descriptor
            .transforms
            .get_mut("write")
            .unwrap()
            .inputs
            .insert("j".to_string(), "ghost".to_string());

        match descriptor.check_references() {
            Err(TranslateError::UnknownCollection {
                transform,
                collection,
            }) => {
                assert_eq!(transform, "write");
                assert_eq!(collection, "ghost");
            }
            other => panic!("expected UnknownCollection, got {:?}", other),
        }
    }

    #[test]
    fn test_payload_is_base64_in_text_formats() {
        let descriptor = sample();
        let json = descriptor.to_json_pretty().unwrap();
        assert!(json.contains("\"AQID\""));

        let parsed = BundleDescriptor::from_json_str(&json).unwrap();
        assert_eq!(parsed, descriptor);
    }

    #[test]
    fn test_yaml_with_defaults() {
        let yaml = r#"
id: minimal
transforms:
  t:
    spec:
      urn: "urn:test"
"#;
        let descriptor = BundleDescriptor::from_yaml_str(yaml).unwrap();
        let transform = &descriptor.transforms["t"];
        assert!(transform.spec.payload.is_empty());
        assert!(transform.inputs.is_empty());
        assert!(descriptor.pcollections.is_empty());
    }

    #[test]
    fn test_invalid_base64_payload_is_rejected() {
        let yaml = r#"
transforms:
  t:
    spec:
      urn: "urn:test"
      payload: "not base64!!"
"#;
        assert!(matches!(
            BundleDescriptor::from_yaml_str(yaml),
            Err(TranslateError::Yaml(_))
        ));
    }
}
