//! Configuration for the agent binary
//!
//! Values are layered, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. a TOML file (`--config`, or `react-agent.toml` in the working directory)
//! 3. environment variables (`.env` is loaded into the environment by `main`)
//! 4. command-line flags, applied by the CLI on top of the loaded [`Config`]
//!
//! ```toml
//! [llm]
//! provider = "gemini"
//! model = "gemini-1.5-flash"   # omit for the provider's default
//! api_key_env = "GOOGLE_API_KEY"
//! temperature = 0.0
//!
//! [agent]
//! max_iterations = 25
//! parallel_tool_calls = false
//! tool_timeout_secs = 30
//! ```

use crate::agents::react::{AgentConfig, DEFAULT_MAX_ITERATIONS};
use crate::llm::client::{GenerationParams, Provider};
use crate::llm::coordinator::ToolCallingConfig;
use crate::llm::gemini::DEFAULT_GEMINI_API_BASE;
use crate::llm::ollama::DEFAULT_OLLAMA_URL;
use crate::types::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Config file picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "react-agent.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub agent: AgentSettings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    Ollama,
}

impl ProviderKind {
    /// Model used when none is configured.
    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini-1.5-flash",
            ProviderKind::Ollama => "llama3.1",
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(ProviderKind::Gemini),
            "ollama" => Ok(ProviderKind::Ollama),
            other => Err(AppError::Configuration(format!(
                "unknown provider '{}' (expected gemini or ollama)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: ProviderKind,

    /// Falls back to [`ProviderKind::default_model`]
    #[serde(default)]
    pub model: Option<String>,

    /// Environment variable containing the Gemini API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Overrides the provider's default endpoint
    #[serde(default)]
    pub api_base: Option<String>,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default)]
    pub system_prompt: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

impl LlmConfig {
    /// The configured model, or the provider's default.
    pub fn model_name(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: None,
            api_key_env: default_api_key_env(),
            api_base: None,
            temperature: 0.0,
            system_prompt: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    #[serde(default)]
    pub parallel_tool_calls: bool,

    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

fn default_tool_timeout() -> u64 {
    30
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            parallel_tool_calls: false,
            tool_timeout_secs: default_tool_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from [`DEFAULT_CONFIG_FILE`] when it
    /// exists, then apply environment overrides.
    ///
    /// An explicitly given path must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::Configuration(format!(
                        "configuration file not found: {}",
                        path.display()
                    )));
                }
                Self::from_file(path)?
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content).map_err(|e| match e {
            AppError::Configuration(msg) => {
                AppError::Configuration(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        debug!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| AppError::Configuration(format!("failed to parse TOML: {}", e)))
    }

    /// Apply `REACT_AGENT_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("REACT_AGENT_PROVIDER") {
            self.llm.provider = provider.parse()?;
        }
        if let Some(model) = lookup("REACT_AGENT_MODEL") {
            self.llm.model = Some(model);
        }
        if let Some(base) = lookup("REACT_AGENT_API_BASE") {
            self.llm.api_base = Some(base);
        }
        if let Some(value) = lookup("REACT_AGENT_MAX_ITERATIONS") {
            self.agent.max_iterations = value.trim().parse().map_err(|_| {
                AppError::Configuration(format!(
                    "REACT_AGENT_MAX_ITERATIONS must be a positive integer, got '{}'",
                    value
                ))
            })?;
        }
        Ok(())
    }

    /// Resolve the model backend, reading the API key from the process environment.
    pub fn provider(&self) -> Result<Provider> {
        self.provider_with(|key| env::var(key).ok())
    }

    /// Resolve the model backend, reading secrets through `lookup`.
    ///
    /// Fails with [`AppError::Configuration`] on a missing Gemini key, an
    /// empty model name, or a zero timeout.
    pub fn provider_with<F>(&self, lookup: F) -> Result<Provider>
    where
        F: Fn(&str) -> Option<String>,
    {
        let llm = &self.llm;
        let model = llm.model_name().to_string();
        if model.trim().is_empty() {
            return Err(AppError::Configuration("model name is empty".to_string()));
        }
        if llm.request_timeout_secs == 0 {
            return Err(AppError::Configuration(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        let params = GenerationParams {
            temperature: llm.temperature,
            system_prompt: llm.system_prompt.clone(),
            request_timeout: Duration::from_secs(llm.request_timeout_secs),
        };

        match llm.provider {
            ProviderKind::Gemini => {
                let api_key = lookup(&llm.api_key_env)
                    .filter(|key| !key.trim().is_empty())
                    .ok_or_else(|| {
                        AppError::Configuration(format!(
                            "{} is not set; export it or add it to .env",
                            llm.api_key_env
                        ))
                    })?;
                Ok(Provider::Gemini {
                    api_key,
                    api_base: llm
                        .api_base
                        .clone()
                        .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
                    model,
                    params,
                })
            }
            ProviderKind::Ollama => Ok(Provider::Ollama {
                base_url: llm
                    .api_base
                    .clone()
                    .or_else(|| lookup("OLLAMA_URL"))
                    .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
                model,
                params,
            }),
        }
    }

    /// Loop settings for [`ReactAgent`](crate::agents::react::ReactAgent).
    pub fn agent_config(&self) -> Result<AgentConfig> {
        if self.agent.max_iterations == 0 {
            return Err(AppError::Configuration(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.agent.tool_timeout_secs == 0 {
            return Err(AppError::Configuration(
                "tool_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(AgentConfig {
            max_iterations: self.agent.max_iterations,
            tool_calling: ToolCallingConfig {
                parallel_execution: self.agent.parallel_tool_calls,
                tool_timeout: Duration::from_secs(self.agent.tool_timeout_secs),
            },
        })
    }
}
