//! Simple CLI configuration loader for appgen
//!
//! Implements single-source priority loading with flag overrides:
//! 1. --config file/dir (highest priority)
//! 2. Current working directory: ./appgen.json or ./.appgen/config.json
//! 3. User config directory: <config_dir>/appgen/config.json
//! 4. Environment variables only (no files)

use anyhow::{anyhow, Context, Result};
use appgen_core::{AgentConfig, ModelParams, Protocol, ResolvedLlmConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Raw configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawConfig {
    /// Protocol to use ("openai", "openai_compat" or "anthropic")
    pub protocol: String,
    /// API key (can be "env:VAR_NAME" for environment variable)
    pub api_key: String,
    /// Base URL (optional, uses protocol default if not specified)
    pub base_url: Option<String>,
    /// Model name (optional, uses protocol default if not specified)
    pub model: Option<String>,
    /// Model parameters (optional)
    #[serde(default)]
    pub params: ModelParams,
    /// Additional headers (optional)
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Build loop settings (optional)
    #[serde(default)]
    pub agent: Option<AgentConfig>,
}

/// Fully resolved configuration for a run
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub llm: ResolvedLlmConfig,
    pub agent: AgentConfig,
    /// Where the configuration came from, for diagnostics
    pub source: String,
}

/// CLI configuration loader
pub struct CliConfigLoader {
    config_override: Option<PathBuf>,
    search_root: Option<PathBuf>,
    user_config_dir: Option<PathBuf>,
    protocol_override: Option<String>,
    api_key_override: Option<String>,
    base_url_override: Option<String>,
    model_override: Option<String>,
}

impl CliConfigLoader {
    /// Create a new loader
    pub fn new() -> Self {
        Self {
            config_override: None,
            search_root: None,
            user_config_dir: dirs::config_dir(),
            protocol_override: None,
            api_key_override: None,
            base_url_override: None,
            model_override: None,
        }
    }

    /// Set config file/directory override
    pub fn with_config_override(mut self, path: PathBuf) -> Self {
        self.config_override = Some(path);
        self
    }

    /// Directory searched for project-local config (defaults to the cwd)
    pub fn with_search_root(mut self, path: PathBuf) -> Self {
        self.search_root = Some(path);
        self
    }

    /// Replace the user config directory (`None` disables that step)
    pub fn with_user_config_dir(mut self, path: Option<PathBuf>) -> Self {
        self.user_config_dir = path;
        self
    }

    /// Set protocol override
    pub fn with_protocol_override(mut self, protocol: String) -> Self {
        self.protocol_override = Some(protocol);
        self
    }

    /// Set API key override
    pub fn with_api_key_override(mut self, api_key: String) -> Self {
        self.api_key_override = Some(api_key);
        self
    }

    /// Set base URL override
    pub fn with_base_url_override(mut self, base_url: String) -> Self {
        self.base_url_override = Some(base_url);
        self
    }

    /// Set model override
    pub fn with_model_override(mut self, model: String) -> Self {
        self.model_override = Some(model);
        self
    }

    /// Load and resolve configuration
    pub async fn load(&self) -> Result<LoadedConfig> {
        // Step 1: Find and load base configuration
        let (mut config, source) = if let Some(override_path) = &self.config_override {
            let config = self.load_from_path(override_path).await.with_context(|| {
                format!(
                    "Failed to load config from override path: {}",
                    override_path.display()
                )
            })?;
            (config, override_path.display().to_string())
        } else {
            self.search_and_load().await?
        };

        // Step 2: Apply flag overrides
        if let Some(protocol) = &self.protocol_override {
            config.protocol = protocol.clone();
        }
        if let Some(api_key) = &self.api_key_override {
            config.api_key = api_key.clone();
        }
        if let Some(base_url) = &self.base_url_override {
            config.base_url = Some(base_url.clone());
        }
        if let Some(model) = &self.model_override {
            config.model = Some(model.clone());
        }

        // Step 3: Resolve to final config
        let agent = config.agent.clone().unwrap_or_default();
        let llm = resolve_llm_config(config, |name| std::env::var(name).ok())?;

        Ok(LoadedConfig { llm, agent, source })
    }

    /// Search for config in priority order
    async fn search_and_load(&self) -> Result<(RawConfig, String)> {
        let root = match &self.search_root {
            Some(root) => root.clone(),
            None => std::env::current_dir()?,
        };

        let mut candidates = vec![
            root.join("appgen.json"),
            root.join(".appgen").join("config.json"),
        ];
        if let Some(config_dir) = &self.user_config_dir {
            candidates.push(config_dir.join("appgen").join("config.json"));
        }

        for candidate in candidates {
            if candidate.is_file() {
                let config = self.load_file(&candidate).await?;
                return Ok((config, candidate.display().to_string()));
            }
        }

        let config = env_only_config(
            self.protocol_override.as_deref(),
            self.api_key_override.as_deref(),
            |name| std::env::var(name).ok(),
        )?;
        Ok((config, "environment".to_string()))
    }

    /// Load configuration from a specific path (file or directory)
    async fn load_from_path(&self, path: &Path) -> Result<RawConfig> {
        if path.is_file() {
            self.load_file(path).await
        } else if path.is_dir() {
            let config_file = path.join("config.json");
            if config_file.exists() {
                self.load_file(&config_file).await
            } else {
                Err(anyhow!(
                    "No config.json found in directory: {}",
                    path.display()
                ))
            }
        } else {
            Err(anyhow!("Config path does not exist: {}", path.display()))
        }
    }

    /// Load a single config file
    async fn load_file(&self, path: &Path) -> Result<RawConfig> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

impl Default for CliConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a config from environment variables alone
fn env_only_config<F>(
    protocol_preference: Option<&str>,
    api_key_override: Option<&str>,
    lookup: F,
) -> Result<RawConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let openai_key = lookup("OPENAI_API_KEY");
    let anthropic_key = lookup("ANTHROPIC_API_KEY");

    let available_keys: Vec<&str> = [
        openai_key.as_ref().map(|_| "openai"),
        anthropic_key.as_ref().map(|_| "anthropic"),
    ]
    .into_iter()
    .flatten()
    .collect();

    let env_protocol = lookup("APPGEN_PROTOCOL");
    let preference = protocol_preference.or(env_protocol.as_deref());

    let (protocol, api_key) = match (preference, api_key_override) {
        (Some(preferred), Some(key)) => (Protocol::parse(preferred)?, key.to_string()),
        (None, Some(key)) => (Protocol::OpenAICompat, key.to_string()),
        (Some(preferred), None) => {
            let protocol = Protocol::parse(preferred)?;
            let key = match protocol {
                Protocol::OpenAICompat => openai_key,
                Protocol::Anthropic => anthropic_key,
            };
            let key = key.ok_or_else(|| {
                anyhow!(
                    "Protocol '{}' specified but no corresponding API key found. Available keys: {}",
                    preferred,
                    available_keys.join(", ")
                )
            })?;
            (protocol, key)
        }
        (None, None) => match (openai_key, anthropic_key) {
            (Some(key), None) => (Protocol::OpenAICompat, key),
            (None, Some(key)) => (Protocol::Anthropic, key),
            (None, None) => {
                return Err(anyhow!(
                    "No configuration found. Create an appgen.json file or set OPENAI_API_KEY or ANTHROPIC_API_KEY"
                ))
            }
            (Some(_), Some(_)) => {
                return Err(anyhow!(
                    "Multiple API keys detected: {}. Choose one with APPGEN_PROTOCOL or --protocol",
                    available_keys.join(", ")
                ))
            }
        },
    };

    let base_url = lookup("APPGEN_BASE_URL").or_else(|| match protocol {
        Protocol::OpenAICompat => lookup("OPENAI_BASE_URL"),
        Protocol::Anthropic => lookup("ANTHROPIC_BASE_URL"),
    });

    Ok(RawConfig {
        protocol: protocol.as_str().to_string(),
        api_key,
        base_url,
        model: lookup("APPGEN_MODEL"),
        params: ModelParams::default(),
        headers: HashMap::new(),
        agent: None,
    })
}

/// Resolve raw config to `ResolvedLlmConfig`
fn resolve_llm_config<F>(config: RawConfig, lookup: F) -> Result<ResolvedLlmConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let protocol = Protocol::parse(&config.protocol)?;

    let api_key = match config.api_key.strip_prefix("env:") {
        Some(var_name) => lookup(var_name)
            .with_context(|| format!("Environment variable not found: {}", var_name))?,
        None => config.api_key,
    };

    let base_url = config
        .base_url
        .unwrap_or_else(|| protocol.default_base_url().to_string());
    let model = config
        .model
        .unwrap_or_else(|| protocol.default_model().to_string());

    let resolved = ResolvedLlmConfig::new(protocol, base_url, api_key, model)
        .with_params(config.params)
        .with_headers(config.headers);

    resolved
        .validate()
        .map_err(|e| anyhow!("Configuration validation failed: {}", e))?;

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    fn isolated_loader(root: &Path) -> CliConfigLoader {
        CliConfigLoader::new()
            .with_search_root(root.to_path_buf())
            .with_user_config_dir(None)
    }

    #[tokio::test]
    async fn test_loads_project_config_with_agent_section() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("appgen.json"),
            r#"{
                "protocol": "anthropic",
                "api_key": "sk-ant-file",
                "agent": {"max_iterations": 12, "retry_backoff_ms": 10}
            }"#,
        )
        .unwrap();

        let loaded = isolated_loader(dir.path()).load().await.unwrap();
        assert_eq!(loaded.llm.protocol, Protocol::Anthropic);
        assert_eq!(loaded.llm.model, "claude-3-5-sonnet-20241022");
        assert_eq!(loaded.llm.base_url, "https://api.anthropic.com");
        assert_eq!(loaded.agent.max_iterations, 12);
        assert_eq!(loaded.agent.model_timeout_secs, 120);
        assert!(loaded.source.ends_with("appgen.json"));
    }

    #[tokio::test]
    async fn test_dot_directory_and_flag_overrides() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(".appgen")).unwrap();
        std::fs::write(
            dir.path().join(".appgen").join("config.json"),
            r#"{"protocol": "openai", "api_key": "sk-file", "model": "gpt-4o-mini"}"#,
        )
        .unwrap();

        let loaded = isolated_loader(dir.path())
            .with_model_override("gpt-4.1".to_string())
            .with_base_url_override("http://localhost:8080/v1".to_string())
            .load()
            .await
            .unwrap();
        assert_eq!(loaded.llm.protocol, Protocol::OpenAICompat);
        assert_eq!(loaded.llm.model, "gpt-4.1");
        assert_eq!(loaded.llm.base_url, "http://localhost:8080/v1");
        assert_eq!(loaded.agent, AgentConfig::default());
    }

    #[tokio::test]
    async fn test_config_override_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"protocol": "openai_compat", "api_key": "sk-dir"}"#,
        )
        .unwrap();

        let loaded = CliConfigLoader::new()
            .with_config_override(dir.path().to_path_buf())
            .load()
            .await
            .unwrap();
        assert_eq!(loaded.llm.api_key, "sk-dir");

        let missing = CliConfigLoader::new()
            .with_config_override(dir.path().join("nope.json"))
            .load()
            .await;
        assert!(missing.is_err());
    }

    #[test]
    fn test_env_api_key_reference() {
        let raw = RawConfig {
            protocol: "openai".to_string(),
            api_key: "env:MY_PROXY_KEY".to_string(),
            base_url: None,
            model: None,
            params: ModelParams::default(),
            headers: HashMap::new(),
            agent: None,
        };
        let resolved =
            resolve_llm_config(raw.clone(), env(&[("MY_PROXY_KEY", "sk-from-env")])).unwrap();
        assert_eq!(resolved.api_key, "sk-from-env");
        assert_eq!(resolved.model, "gpt-4o");

        assert!(resolve_llm_config(raw, env(&[])).is_err());
    }

    #[test]
    fn test_unknown_protocol_is_rejected() {
        let raw = RawConfig {
            protocol: "google_ai".to_string(),
            api_key: "key".to_string(),
            base_url: None,
            model: None,
            params: ModelParams::default(),
            headers: HashMap::new(),
            agent: None,
        };
        assert!(resolve_llm_config(raw, env(&[])).is_err());
    }

    #[test]
    fn test_env_only_detection() {
        let config = env_only_config(
            None,
            None,
            env(&[("ANTHROPIC_API_KEY", "sk-ant"), ("APPGEN_MODEL", "claude-x")]),
        )
        .unwrap();
        assert_eq!(config.protocol, "anthropic");
        assert_eq!(config.model.as_deref(), Some("claude-x"));

        let config = env_only_config(None, None, env(&[("OPENAI_API_KEY", "sk")])).unwrap();
        assert_eq!(config.protocol, "openai_compat");
        assert_eq!(config.model, None);

        assert!(env_only_config(None, None, env(&[])).is_err());
        assert!(env_only_config(
            None,
            None,
            env(&[("OPENAI_API_KEY", "a"), ("ANTHROPIC_API_KEY", "b")])
        )
        .is_err());

        let config = env_only_config(
            None,
            None,
            env(&[
                ("OPENAI_API_KEY", "a"),
                ("ANTHROPIC_API_KEY", "b"),
                ("APPGEN_PROTOCOL", "anthropic"),
            ]),
        )
        .unwrap();
        assert_eq!(config.api_key, "b");

        let config = env_only_config(Some("openai"), Some("sk-flag"), env(&[])).unwrap();
        assert_eq!(config.api_key, "sk-flag");
    }
}
