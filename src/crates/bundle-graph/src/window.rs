//! Window strategies attached to graph nodes
//!
//! This layer never computes windows. A root edge's outputs get the global
//! default, and every other edge's outputs inherit the strategy of the node
//! feeding its first input.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Policy partitioning elements into time-based groups
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WindowingStrategy {
    /// Single window spanning all time
    #[default]
    GlobalWindows,

    /// Non-overlapping windows of fixed size
    FixedWindows {
        #[serde(with = "millis")]
        size: Duration,
    },

    /// Overlapping windows of fixed size, one starting every `period`
    SlidingWindows {
        #[serde(with = "millis")]
        size: Duration,
        #[serde(with = "millis")]
        period: Duration,
    },

    /// Per-key windows closed after `gap` of inactivity
    Sessions {
        #[serde(with = "millis")]
        gap: Duration,
    },
}

impl WindowingStrategy {
    /// The unwindowed default assigned to root outputs
    pub fn global() -> Self {
        Self::GlobalWindows
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Self::GlobalWindows)
    }
}

impl fmt::Display for WindowingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GlobalWindows => write!(f, "global"),
            Self::FixedWindows { size } => write!(f, "fixed({}ms)", size.as_millis()),
            Self::SlidingWindows { size, period } => {
                write!(f, "sliding({}ms/{}ms)", size.as_millis(), period.as_millis())
            }
            Self::Sessions { gap } => write!(f, "sessions({}ms)", gap.as_millis()),
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
