//! Typed configuration file model
//!
//! Every section has serde defaults so a partial file works. `validate()`
//! runs before anything spawns: a missing required identifier is fatal and
//! aborts the run before any process exists.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::channel::config::ChannelConfig;

/// Configuration errors, all fatal before a run starts
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Reasoning backend endpoint is not configured (reasoning.endpoint)")]
    MissingReasoningEndpoint,

    #[error("Reasoning model is not configured (reasoning.model)")]
    MissingReasoningModel,

    #[error("Cast store table name is not configured (cast_store.table)")]
    MissingCastTable,

    #[error("Cast store key attribute is not configured (cast_store.key_attribute)")]
    MissingKeyAttribute,

    #[error("Tool server `{0}` has an empty command")]
    EmptyToolServerCommand(String),

    #[error("Tool server `{0}` is declared more than once")]
    DuplicateToolServer(String),
}

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub reasoning: ReasoningSection,
    pub retrieval: RetrievalSection,
    pub cast_store: CastStoreSection,
    pub run: RunSection,
    pub tool_servers: Vec<ToolServerSection>,
}

/// Reasoning backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningSection {
    /// Chat-completions endpoint URL.
    pub endpoint: String,
    /// Model identifier sent with each request.
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for ReasoningSection {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            model: String::new(),
            api_key_env: "CALLSHEET_API_KEY".to_string(),
        }
    }
}

/// Retrieval backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSection {
    /// Search endpoint URL; empty disables the retrieval tool.
    pub endpoint: String,
    /// Minimum relevance score for returned passages.
    pub min_score: f64,
    /// Default passage cap per search.
    pub max_results: usize,
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            min_score: 0.4,
            max_results: 5,
        }
    }
}

/// Cast store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CastStoreSection {
    /// Table identifier; lookup failures name it.
    pub table: String,
    /// Partition key attribute.
    pub key_attribute: String,
    /// Local table file; absent disables the in-process lookup tool.
    pub path: Option<PathBuf>,
}

impl Default for CastStoreSection {
    fn default() -> Self {
        Self {
            table: String::new(),
            key_attribute: "cast_id".to_string(),
            path: None,
        }
    }
}

/// Orchestration run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSection {
    /// Maximum reasoning steps before the run aborts.
    pub max_iterations: usize,
    /// Optional JSONL run-event log path.
    pub run_log: Option<PathBuf>,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            run_log: None,
        }
    }
}

/// One subprocess tool server declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolServerSection {
    /// Short name used in logs.
    pub name: String,
    /// Executable implementing the wire protocol.
    pub command: String,
    /// Arguments for the executable.
    pub args: Vec<String>,
    /// The complete environment the server will see (scoped credentials,
    /// table identifiers, region). Nothing else is inherited.
    pub env: BTreeMap<String, String>,
    /// Handshake timeout in milliseconds.
    pub handshake_timeout_ms: u64,
    /// Per-call timeout in milliseconds. Defaults well above the ~7 minute
    /// worst case observed for media-analysis calls.
    pub call_timeout_ms: u64,
    /// Grace period between close signal and forced kill, in milliseconds.
    pub shutdown_grace_ms: u64,
}

impl Default for ToolServerSection {
    fn default() -> Self {
        Self {
            name: String::new(),
            command: String::new(),
            args: Vec::new(),
            env: BTreeMap::new(),
            handshake_timeout_ms: 10_000,
            call_timeout_ms: 600_000,
            shutdown_grace_ms: 5_000,
        }
    }
}

impl ToolServerSection {
    /// Build the spawn configuration for this server.
    pub fn to_channel_config(&self) -> ChannelConfig {
        let mut config = ChannelConfig::new(&self.name, &self.command)
            .with_args(self.args.iter().cloned())
            .with_handshake_timeout(Duration::from_millis(self.handshake_timeout_ms))
            .with_call_timeout(Duration::from_millis(self.call_timeout_ms))
            .with_shutdown_grace(Duration::from_millis(self.shutdown_grace_ms));
        for (key, value) in &self.env {
            config = config.with_env(key, value);
        }
        config
    }
}

impl FileConfig {
    /// Validate required identifiers before anything spawns.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reasoning.endpoint.is_empty() {
            return Err(ConfigError::MissingReasoningEndpoint);
        }
        if self.reasoning.model.is_empty() {
            return Err(ConfigError::MissingReasoningModel);
        }
        if self.cast_store.path.is_some() {
            if self.cast_store.table.is_empty() {
                return Err(ConfigError::MissingCastTable);
            }
            if self.cast_store.key_attribute.is_empty() {
                return Err(ConfigError::MissingKeyAttribute);
            }
        }

        let mut seen = std::collections::HashSet::new();
        for server in &self.tool_servers {
            if server.command.is_empty() {
                return Err(ConfigError::EmptyToolServerCommand(server.name.clone()));
            }
            if !seen.insert(server.name.as_str()) {
                return Err(ConfigError::DuplicateToolServer(server.name.clone()));
            }
        }

        Ok(())
    }
}
