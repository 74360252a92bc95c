use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;

/// Where the synchronous fallback path runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FallbackExecution {
    /// Run the blocking driver call on the calling task.
    Inline,
    /// Run the blocking driver call on tokio's blocking pool and race it against cancellation.
    #[default]
    Offload,
}

/// Options for an adaptive connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterOptions {
    pub fallback: FallbackExecution,
}

impl AdapterOptions {
    #[must_use]
    pub fn new(fallback: FallbackExecution) -> Self {
        Self { fallback }
    }

    #[must_use]
    pub fn builder() -> AdapterOptionsBuilder {
        AdapterOptionsBuilder::new()
    }

    /// Parse options from a JSON document such as `{"fallback": "inline"}`.
    ///
    /// # Errors
    /// Returns `AdapterError::ConfigError` if the document is malformed or names an unknown mode.
    pub fn from_json(raw: &str) -> Result<Self, AdapterError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Fluent builder for [`AdapterOptions`].
#[derive(Debug, Clone, Default)]
pub struct AdapterOptionsBuilder {
    opts: AdapterOptions,
}

impl AdapterOptionsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn fallback(mut self, fallback: FallbackExecution) -> Self {
        self.opts.fallback = fallback;
        self
    }

    #[must_use]
    pub fn finish(self) -> AdapterOptions {
        self.opts
    }
}
