//! Tool Registry
//!
//! The [`ToolRegistry`] aggregates tool providers of every provenance —
//! in-process functions and channel-backed tool servers — and implements
//! [`ToolExecutorPort`] for the orchestration loop.
//!
//! # Usage
//!
//! ```ignore
//! let mut registry = ToolRegistry::new()
//!     .register(RetrievalToolProvider::new(backend, 0.4, 5))
//!     .register(ChannelToolProvider::connect(config).await?);
//!
//! let report = registry.discover().await?;
//! let result = registry.dispatch(&call).await;
//! ```
//!
//! # Discovery
//!
//! `discover()` must complete before the orchestration run begins; it is
//! the only mutation, and afterwards any number of concurrent callers may
//! read and dispatch. Tools are listed in registration order for schema
//! advertisement. A tool name offered by two providers is a
//! [`RegistryError::DuplicateTool`] and leaves the registry unchanged —
//! names are contracts, not a precedence contest. A provider whose
//! discovery fails is skipped and reported, and the run continues with the
//! remaining tools.
//!
//! # Dispatch
//!
//! `dispatch()` never errors. Resolution, argument validation, and
//! invocation faults all come back as `Failure` outcomes so the reasoning
//! backend can self-correct. Every dispatch logs the tool name, an
//! argument summary, the outcome kind, and the duration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use callsheet_application::ports::run_logger::{NoRunLogger, RunEvent, RunLogger};
use callsheet_application::ports::tool_executor::ToolExecutorPort;
use callsheet_domain::core::string::truncate;
use callsheet_domain::tool::entities::{ToolCall, ToolDefinition};
use callsheet_domain::tool::provider::ToolProvider;
use callsheet_domain::tool::validation::validate_arguments;
use callsheet_domain::tool::value_objects::{ToolError, ToolResult};

/// Maximum length of the argument summary recorded per dispatch.
const ARGUMENT_SUMMARY_LEN: usize = 160;

/// Errors raised during registry discovery
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Tool `{tool}` is offered by both `{existing}` and `{provider}`")]
    DuplicateTool {
        tool: String,
        existing: String,
        provider: String,
    },
}

/// A provider that discovery skipped, with the reason.
#[derive(Debug, Clone)]
pub struct SkippedProvider {
    pub id: String,
    pub reason: String,
}

/// Summary of a discovery pass.
#[derive(Debug, Clone)]
pub struct DiscoveryReport {
    /// Number of tools registered.
    pub tool_count: usize,
    /// Providers that contributed nothing, with reasons.
    pub skipped: Vec<SkippedProvider>,
}

/// Tool registry aggregating multiple providers
pub struct ToolRegistry {
    /// Registered providers, in registration order
    providers: Vec<Arc<dyn ToolProvider>>,
    /// Tool definitions, in discovery order
    definitions: Vec<ToolDefinition>,
    /// Tool name → provider index
    routes: HashMap<String, usize>,
    /// Whether discovery has been run
    discovered: bool,
    /// Structured event logger
    logger: Arc<dyn RunLogger>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            definitions: Vec::new(),
            routes: HashMap::new(),
            discovered: false,
            logger: Arc::new(NoRunLogger),
        }
    }

    /// Set a structured run logger for dispatch events
    pub fn with_logger(mut self, logger: Arc<dyn RunLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Register a tool provider
    pub fn register<P: ToolProvider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Arc::new(provider));
        self.discovered = false;
        self
    }

    /// Register a tool provider (Arc version)
    pub fn register_arc(mut self, provider: Arc<dyn ToolProvider>) -> Self {
        self.providers.push(provider);
        self.discovered = false;
        self
    }

    /// Discover tools from all providers.
    ///
    /// Builds into scratch structures and commits only on success, so a
    /// duplicate-name failure leaves the registry observably unchanged.
    pub async fn discover(&mut self) -> Result<DiscoveryReport, RegistryError> {
        let mut definitions = Vec::new();
        let mut routes: HashMap<String, usize> = HashMap::new();
        let mut skipped = Vec::new();

        for (index, provider) in self.providers.iter().enumerate() {
            if !provider.is_available().await {
                debug!(provider = provider.id(), "provider not available, skipping");
                skipped.push(SkippedProvider {
                    id: provider.id().to_string(),
                    reason: "not available".to_string(),
                });
                continue;
            }

            match provider.discover_tools().await {
                Ok(tools) => {
                    for tool in tools {
                        if let Some(&existing) = routes.get(&tool.name) {
                            return Err(RegistryError::DuplicateTool {
                                tool: tool.name.clone(),
                                existing: self.providers[existing].id().to_string(),
                                provider: provider.id().to_string(),
                            });
                        }
                        debug!(
                            tool = %tool.name,
                            provider = provider.id(),
                            "registered tool"
                        );
                        routes.insert(tool.name.clone(), index);
                        definitions.push(tool);
                    }
                }
                Err(e) => {
                    // A failed provider is a failed tool-set, not a failed
                    // run: continue with the remaining tools.
                    warn!(
                        provider = provider.id(),
                        error = %e,
                        "provider discovery failed, continuing without it"
                    );
                    skipped.push(SkippedProvider {
                        id: provider.id().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.definitions = definitions;
        self.routes = routes;
        self.discovered = true;

        Ok(DiscoveryReport {
            tool_count: self.definitions.len(),
            skipped,
        })
    }

    /// The provider that owns a tool, by name.
    pub fn provider_for(&self, tool_name: &str) -> Option<&Arc<dyn ToolProvider>> {
        self.routes
            .get(tool_name)
            .map(|&index| &self.providers[index])
    }

    /// Get a list of registered provider IDs
    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    fn definition(&self, tool_name: &str) -> Option<&ToolDefinition> {
        self.definitions.iter().find(|d| d.name == tool_name)
    }

    async fn dispatch_inner(&self, call: &ToolCall) -> ToolResult {
        if !self.discovered {
            return ToolResult::failure(
                &call.tool_name,
                ToolError::execution_failed(
                    "Registry not initialized. Call discover() before dispatching.",
                ),
            );
        }

        let Some(definition) = self.definition(&call.tool_name) else {
            return ToolResult::failure(&call.tool_name, ToolError::unknown_tool(&call.tool_name));
        };

        if let Err(e) = validate_arguments(definition, call) {
            return ToolResult::failure(&call.tool_name, e);
        }

        match self.provider_for(&call.tool_name) {
            Some(provider) => provider.execute(call).await,
            // Unreachable when definitions and routes are built together,
            // but dispatch must never panic.
            None => ToolResult::failure(&call.tool_name, ToolError::unknown_tool(&call.tool_name)),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutorPort for ToolRegistry {
    fn tools(&self) -> Vec<ToolDefinition> {
        self.definitions.clone()
    }

    async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        let started = Instant::now();
        let summary = truncate(
            &serde_json::to_string(&call.arguments).unwrap_or_default(),
            ARGUMENT_SUMMARY_LEN,
        );

        let result = self.dispatch_inner(call).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        let result = result
            .with_call_id(call.call_id.clone())
            .with_duration(duration_ms);

        info!(
            tool = %call.tool_name,
            args = %summary,
            outcome = result.outcome_kind(),
            duration_ms,
            "tool dispatched"
        );
        self.logger.log(RunEvent::new(
            "tool_dispatch",
            serde_json::json!({
                "tool": call.tool_name,
                "arguments": summary,
                "outcome": result.outcome_kind(),
                "duration_ms": duration_ms,
            }),
        ));

        result
    }
}
