//! Run configuration.
//!
//! A [`PipelineConfig`] bundles every knob of a run. It can be built in code
//! through the `with_*` builders or read from a JSON file; missing keys take
//! their defaults.
//!
//! ```json
//! {
//!   "reject_policy": "fail_fast",
//!   "sink": { "include_index": false },
//!   "context": { "batch_size": 4096 },
//!   "log": "verbose"
//! }
//! ```

use crate::core::context::EpiContextConfig;
use crate::core::metrics::RejectPolicy;
use crate::logging::{LogConfig, LogPreset};
use crate::prelude::*;
use crate::sink::SinkOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// How per-row failures are handled
    pub reject_policy: RejectPolicy,
    /// Output formatting
    pub sink: SinkOptions,
    /// DataFusion session used by the file loaders
    pub context: EpiContextConfig,
    /// Logging preset for pipeline components
    pub log: LogPreset,
}

impl PipelineConfig {
    /// Aborts on the first rejected row.
    pub fn strict() -> Self {
        Self {
            reject_policy: RejectPolicy::FailFast,
            ..Self::default()
        }
    }

    pub fn with_reject_policy(mut self, policy: RejectPolicy) -> Self {
        self.reject_policy = policy;
        self
    }

    pub fn with_sink_options(mut self, sink: SinkOptions) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_context_config(mut self, context: EpiContextConfig) -> Self {
        self.context = context;
        self
    }

    pub fn with_log_preset(mut self, log: LogPreset) -> Self {
        self.log = log;
        self
    }

    /// The [`LogConfig`] selected by the preset.
    pub fn log_config(&self) -> LogConfig {
        LogConfig::from_preset(self.log)
    }

    /// Checks values that deserialize fine but cannot run.
    pub fn validate(&self) -> Result<()> {
        if self.context.batch_size == 0 {
            return Err(EpiError::Configuration(
                "context.batch_size must be greater than zero".to_string(),
            ));
        }
        if self.context.target_partitions == 0 {
            return Err(EpiError::Configuration(
                "context.target_partitions must be greater than zero".to_string(),
            ));
        }
        if matches!(self.sink.delimiter, b'\n' | b'\r' | b'"') {
            return Err(EpiError::Configuration(format!(
                "sink.delimiter {:?} cannot separate fields",
                self.sink.delimiter as char
            )));
        }
        Ok(())
    }

    /// Reads and validates a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}
