// linkedin-agent-core/src/config.rs

//! Configuration record and loading for the agent library.
//!
//! Values come from the process environment, optionally layered over a TOML
//! file. Environment variables always win over file values.

use crate::errors::AgentError;
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use url::Url;

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const MCP_SERVER_URL_VAR: &str = "MCP_SERVER_URL";
pub const LLM_MODEL_VAR: &str = "LLM_MODEL";
pub const LLM_TEMPERATURE_VAR: &str = "LLM_TEMPERATURE";
pub const AGENT_VERBOSE_VAR: &str = "AGENT_VERBOSE";
pub const MAX_ITERATIONS_VAR: &str = "AGENT_MAX_ITERATIONS";
pub const ALLOWED_TOOLS_VAR: &str = "ALLOWED_TOOLS";
pub const LLM_BASE_URL_VAR: &str = "OPENAI_BASE_URL";
pub const SYSTEM_PROMPT_VAR: &str = "AGENT_SYSTEM_PROMPT";

pub const DEFAULT_MCP_SERVER_URL: &str = "http://127.0.0.1:8000/mcp";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_LLM_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_ITERATIONS: usize = 10;
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";

/// Optional settings read from a TOML file. Every key may be omitted.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub api_key: Option<String>,
    pub mcp_server_url: Option<String>,
    pub llm_model: Option<String>,
    pub llm_temperature: Option<f32>,
    pub agent_verbose: Option<bool>,
    pub max_iterations: Option<usize>,
    pub allowed_tools: Option<Vec<String>>,
    pub llm_base_url: Option<String>,
    pub system_prompt: Option<String>,
}

impl FileConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, AgentError> {
        toml::from_str(content).map_err(|e| {
            tracing::error!(error = %e, "Failed to parse TOML configuration content");
            AgentError::config(format!("Failed to parse configuration TOML: {}", e))
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, AgentError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AgentError::config(format!(
                "Failed to read configuration file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }
}

/// Immutable settings for one agent session.
#[derive(Clone, PartialEq)]
pub struct Config {
    pub mcp_server_url: String,
    pub llm_model: String,
    pub llm_temperature: f32,
    pub api_key: String,
    pub agent_verbose: bool,
    pub max_iterations: usize,
    /// `None` exposes every discovered tool.
    pub allowed_tools: Option<BTreeSet<String>>,
    pub llm_base_url: String,
    pub system_prompt: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("mcp_server_url", &self.mcp_server_url)
            .field("llm_model", &self.llm_model)
            .field("llm_temperature", &self.llm_temperature)
            .field("api_key", &"<redacted>")
            .field("agent_verbose", &self.agent_verbose)
            .field("max_iterations", &self.max_iterations)
            .field("allowed_tools", &self.allowed_tools)
            .field("llm_base_url", &self.llm_base_url)
            .finish_non_exhaustive()
    }
}

/// Loads the configuration from the process environment.
pub fn load_config() -> Result<Config, AgentError> {
    Config::from_env()
}

impl Config {
    pub fn from_env() -> Result<Self, AgentError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves every setting through `lookup`, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AgentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::resolve(FileConfig::default(), lookup)
    }

    /// Reads `path` (if any) and then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, AgentError> {
        let file = match path {
            Some(p) => {
                tracing::info!(path = %p.display(), "Loading configuration file");
                FileConfig::from_path(p)?
            }
            None => FileConfig::default(),
        };
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    pub fn resolve<F>(file: FileConfig, lookup: F) -> Result<Self, AgentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank environment values count as unset.
        let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = env(API_KEY_VAR)
            .or(file.api_key)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                AgentError::config(format!(
                    "'{}' is not set; an API key is required for LLM calls",
                    API_KEY_VAR
                ))
            })?;

        let mcp_server_url = env(MCP_SERVER_URL_VAR)
            .or(file.mcp_server_url)
            .unwrap_or_else(|| DEFAULT_MCP_SERVER_URL.to_string());
        validate_url(MCP_SERVER_URL_VAR, &mcp_server_url)?;

        let llm_base_url = env(LLM_BASE_URL_VAR)
            .or(file.llm_base_url)
            .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string());
        validate_url(LLM_BASE_URL_VAR, &llm_base_url)?;

        let llm_model = env(LLM_MODEL_VAR)
            .or(file.llm_model)
            .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string());
        if llm_model.trim().is_empty() {
            return Err(AgentError::config("LLM model name is empty"));
        }

        let llm_temperature = match env(LLM_TEMPERATURE_VAR) {
            Some(raw) => raw.trim().parse::<f32>().map_err(|e| {
                AgentError::config(format!(
                    "'{}' must be a number, got '{}': {}",
                    LLM_TEMPERATURE_VAR, raw, e
                ))
            })?,
            None => file.llm_temperature.unwrap_or(DEFAULT_LLM_TEMPERATURE),
        };
        if !(0.0..=2.0).contains(&llm_temperature) {
            return Err(AgentError::config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                llm_temperature
            )));
        }

        let agent_verbose = match env(AGENT_VERBOSE_VAR) {
            Some(raw) => parse_bool(AGENT_VERBOSE_VAR, &raw)?,
            None => file.agent_verbose.unwrap_or(true),
        };

        let max_iterations = match env(MAX_ITERATIONS_VAR) {
            Some(raw) => raw.trim().parse::<usize>().map_err(|e| {
                AgentError::config(format!(
                    "'{}' must be a positive integer, got '{}': {}",
                    MAX_ITERATIONS_VAR, raw, e
                ))
            })?,
            None => file.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
        };
        if max_iterations == 0 {
            return Err(AgentError::config("max iterations must be at least 1"));
        }

        let allowed_tools = match env(ALLOWED_TOOLS_VAR) {
            Some(raw) => normalize_allow_list(raw.split(',')),
            None => file
                .allowed_tools
                .and_then(|names| normalize_allow_list(names.iter().map(String::as_str))),
        };

        let system_prompt = env(SYSTEM_PROMPT_VAR)
            .or(file.system_prompt)
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        Ok(Self {
            mcp_server_url,
            llm_model,
            llm_temperature,
            api_key,
            agent_verbose,
            max_iterations,
            allowed_tools,
            llm_base_url,
            system_prompt,
        })
    }

    /// Full URL of the chat-completions endpoint.
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.llm_base_url.trim_end_matches('/'))
    }
}

fn validate_url(key: &str, value: &str) -> Result<(), AgentError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| AgentError::config(format!("Invalid URL for '{}' ('{}'): {}", key, value, e)))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, AgentError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AgentError::config(format!(
            "'{}' must be a boolean, got '{}'",
            key, other
        ))),
    }
}

fn normalize_allow_list<'a>(names: impl Iterator<Item = &'a str>) -> Option<BTreeSet<String>> {
    let set: BTreeSet<String> = names
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from)
        .collect();
    if set.is_empty() {
        None
    } else {
        Some(set)
    }
}
