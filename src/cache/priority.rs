//! Cache Priority Module
//!
//! Priority levels attached to cache entries and their eviction weight.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// == Priority ==
/// How hard the cache tries to keep an entry under memory pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Normal,
    Low,
    Background,
}

impl Priority {
    /// Base usefulness score used by eviction ranking.
    pub fn score(self) -> f64 {
        match self {
            Priority::Critical => 100.0,
            Priority::High => 75.0,
            Priority::Normal => 50.0,
            Priority::Low => 25.0,
            Priority::Background => 10.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
            Priority::Background => "background",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "critical" => Ok(Priority::Critical),
            "high" => Ok(Priority::High),
            "normal" => Ok(Priority::Normal),
            "low" => Ok(Priority::Low),
            "background" => Ok(Priority::Background),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}
