//! Translator configuration
//!
//! ```toml
//! # translate.toml
//! consumer_lookup = "scan"       # or "indexed" (default)
//! placeholder_output = "bogus"
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Output name generators use for sink-like steps with no real output
pub const PLACEHOLDER_OUTPUT: &str = "bogus";

/// How the sorter finds the consumers of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumerLookup {
    /// Scan every transform for each drained output, O(T²)
    Scan,
    /// Precompute collection → consumers once, O(T + E)
    #[default]
    Indexed,
}

/// Settings for one [`Translator`](crate::Translator)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    pub consumer_lookup: ConsumerLookup,

    /// Outputs with this local name never produce a node
    pub placeholder_output: String,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            consumer_lookup: ConsumerLookup::default(),
            placeholder_output: PLACEHOLDER_OUTPUT.to_string(),
        }
    }
}

impl TranslateConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn with_consumer_lookup(mut self, lookup: ConsumerLookup) -> Self {
        self.consumer_lookup = lookup;
        self
    }

    pub fn with_placeholder_output(mut self, name: impl Into<String>) -> Self {
        self.placeholder_output = name.into();
        self
    }

    pub fn is_placeholder(&self, output_name: &str) -> bool {
        output_name == self.placeholder_output
    }
}
