//! Agent configuration structures

use super::core::AgentCore;
use super::prompt::build_system_prompt;
use crate::config::ResolvedLlmConfig;
use crate::error::{ConfigError, Result};
use crate::llm::{ChatOptions, LlmClient};
use crate::output::{AgentOutput, NullOutput};
use crate::tools::{ToolExecutor, ToolRegistry};
use crate::trajectory::TrajectoryRecorder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Configuration for the build loop, fixed for the lifetime of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Iteration budget; a run that has not finished after this many model
    /// turns fails with `BudgetExceeded`
    pub max_iterations: u32,

    /// Per-call timeout for the model, in seconds
    pub model_timeout_secs: u64,

    /// Consecutive model failures tolerated before `ModelUnavailable`
    pub max_model_retries: u32,

    /// Wait between a failed model call and its retry
    pub retry_backoff_ms: u64,

    /// Number of recent iterations rendered verbatim; older file payloads
    /// are elided. `None` disables compaction.
    pub context_window: Option<u32>,

    /// Custom guidance replacing the built-in system prompt text
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            model_timeout_secs: 120,
            max_model_retries: 3,
            retry_backoff_ms: 2000,
            context_window: Some(6),
            system_prompt: None,
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_iterations".to_string(),
                value: "0 (must be at least 1)".to_string(),
            });
        }
        if self.model_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "model_timeout_secs".to_string(),
                value: "0 (must be at least 1)".to_string(),
            });
        }
        Ok(())
    }
}

enum ClientSource {
    Config(ResolvedLlmConfig),
    Client(Arc<dyn LlmClient>, ChatOptions),
}

/// Builder for creating agents
pub struct AgentBuilder {
    client: ClientSource,
    agent_config: AgentConfig,
    registry: Option<Arc<ToolRegistry>>,
    output: Option<Box<dyn AgentOutput>>,
    trajectory_recorder: Option<TrajectoryRecorder>,
}

impl AgentBuilder {
    /// Create a builder that will construct its client from resolved config
    pub fn new(llm_config: ResolvedLlmConfig) -> Self {
        Self::with_source(ClientSource::Config(llm_config))
    }

    /// Create a builder around an existing client (shared clients, tests)
    pub fn with_client(client: Arc<dyn LlmClient>) -> Self {
        Self::with_source(ClientSource::Client(client, ChatOptions::default()))
    }

    /// Like [`AgentBuilder::with_client`], keeping request options such as
    /// temperature and max tokens
    pub fn with_client_options(client: Arc<dyn LlmClient>, options: ChatOptions) -> Self {
        Self::with_source(ClientSource::Client(client, options))
    }

    fn with_source(client: ClientSource) -> Self {
        Self {
            client,
            agent_config: AgentConfig::default(),
            registry: None,
            output: None,
            trajectory_recorder: None,
        }
    }

    /// Set agent configuration
    pub fn with_agent_config(mut self, agent_config: AgentConfig) -> Self {
        self.agent_config = agent_config;
        self
    }

    /// Share a tool registry between agents
    pub fn with_registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the output handler
    pub fn with_output(mut self, output: Box<dyn AgentOutput>) -> Self {
        self.output = Some(output);
        self
    }

    /// Record run history
    pub fn with_trajectory_recorder(mut self, recorder: TrajectoryRecorder) -> Self {
        self.trajectory_recorder = Some(recorder);
        self
    }

    /// Validate configuration and build the agent
    pub fn build(self) -> Result<AgentCore> {
        self.agent_config.validate()?;

        let (llm_client, chat_options) = match self.client {
            ClientSource::Config(llm_config) => {
                llm_config.validate()?;
                let client = crate::llm::create_client(&llm_config)?;
                (client, ChatOptions::from_params(&llm_config.params))
            }
            ClientSource::Client(client, options) => (client, options),
        };

        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(ToolRegistry::default()));
        let system_prompt =
            build_system_prompt(&registry, self.agent_config.system_prompt.as_deref())?;

        Ok(AgentCore::new(
            self.agent_config,
            llm_client,
            ToolExecutor::new(registry),
            chat_options,
            system_prompt,
            self.output.unwrap_or_else(|| Box::new(NullOutput)),
            self.trajectory_recorder,
        ))
    }
}
