use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;

/// Transaction isolation level requested from a driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    /// Let the driver pick its default level.
    #[default]
    Unspecified,
    Chaos,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
    Snapshot,
}

impl IsolationLevel {
    pub const ALL: [IsolationLevel; 7] = [
        IsolationLevel::Unspecified,
        IsolationLevel::Chaos,
        IsolationLevel::ReadUncommitted,
        IsolationLevel::ReadCommitted,
        IsolationLevel::RepeatableRead,
        IsolationLevel::Serializable,
        IsolationLevel::Snapshot,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            IsolationLevel::Unspecified => "Unspecified",
            IsolationLevel::Chaos => "Chaos",
            IsolationLevel::ReadUncommitted => "ReadUncommitted",
            IsolationLevel::ReadCommitted => "ReadCommitted",
            IsolationLevel::RepeatableRead => "RepeatableRead",
            IsolationLevel::Serializable => "Serializable",
            IsolationLevel::Snapshot => "Snapshot",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IsolationLevel {
    type Err = AdapterError;

    /// Parse `Serializable`, `read_committed`, `read-committed` or `read committed` alike.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        IsolationLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| AdapterError::ConfigError(format!("unknown isolation level: {s}")))
    }
}
