//! Structural configuration: experts, tool servers, and orchestrator policy.
//!
//! Loaded from a single TOML document (see crate-level docs). `.env`/XDG
//! secrets (API keys, guardrail toggles) are loaded separately via
//! `config::load_and_apply`, the way `maestro-core`'s binaries already split
//! "structure" (serde TOML) from "secrets" (environment).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How an expert's conversation memory is persisted across calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPolicy {
    InMemory,
    FileBacked,
    None,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self::None
    }
}

fn default_enabled() -> bool {
    true
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

/// One configured expert: an LLM configuration bundle plus optional tool
/// bindings. Immutable for the lifetime of a config generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpertDescriptor {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub session_policy: SessionPolicy,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub capability_tags: Vec<String>,
    #[serde(default)]
    pub tool_server: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

impl ExpertDescriptor {
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }

    /// Resolves the system prompt: explicit `instructions`, else a built-in
    /// per-capability-tag default, mirroring the engine's
    /// `REACT_SYSTEM_PROMPT` fallback.
    pub fn resolved_instructions(&self) -> String {
        if let Some(instructions) = &self.instructions {
            return instructions.clone();
        }
        default_instructions_for_tags(&self.capability_tags)
    }
}

fn default_instructions_for_tags(tags: &[String]) -> String {
    if tags.iter().any(|t| t == "smalltalk" || t == "general") {
        return "You are a friendly, concise conversational assistant.".to_string();
    }
    if tags.iter().any(|t| t.contains("search") || t.contains("local")) {
        return "You find and summarize information from your tools, citing sources.".to_string();
    }
    "You are a helpful assistant. Answer clearly and only use facts you can support."
        .to_string()
}

/// Transport an external tool server is reached over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolServerTransport {
    Stdio,
    StreamableHttp,
}

/// Config for one external tool server, resolved by name from an expert's
/// `tool_server` reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolServerConfig {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub transport: ToolServerTransport,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

fn default_selection_count() -> usize {
    3
}

fn default_per_expert_timeout_ms() -> u64 {
    8_000
}

fn default_cache_ttl_s() -> u64 {
    300
}

fn default_cache_max_entries() -> usize {
    512
}

fn default_guardrail_enabled() -> bool {
    true
}

fn default_guardrail_timeout_ms() -> u64 {
    200
}

fn default_guardrail_model() -> String {
    "gpt-4.1-nano".to_string()
}

fn default_smartrouter_fanout_limit() -> usize {
    4
}

/// Orchestrator-wide policy: selection size, timeouts, cache bounds, guardrail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorPolicy {
    #[serde(default = "default_selection_count")]
    pub selection_count: usize,
    #[serde(default = "default_per_expert_timeout_ms")]
    pub per_expert_timeout_ms: u64,
    #[serde(default = "default_cache_ttl_s")]
    pub cache_ttl_s: u64,
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,
    #[serde(default = "default_guardrail_enabled")]
    pub guardrail_enabled: bool,
    #[serde(default = "default_guardrail_timeout_ms")]
    pub guardrail_timeout_ms: u64,
    #[serde(default = "default_guardrail_model")]
    pub guardrail_model: String,
    #[serde(default = "default_smartrouter_fanout_limit")]
    pub smartrouter_fanout_limit: usize,
}

impl Default for OrchestratorPolicy {
    fn default() -> Self {
        Self {
            selection_count: default_selection_count(),
            per_expert_timeout_ms: default_per_expert_timeout_ms(),
            cache_ttl_s: default_cache_ttl_s(),
            cache_max_entries: default_cache_max_entries(),
            guardrail_enabled: default_guardrail_enabled(),
            guardrail_timeout_ms: default_guardrail_timeout_ms(),
            guardrail_model: default_guardrail_model(),
            smartrouter_fanout_limit: default_smartrouter_fanout_limit(),
        }
    }
}

/// Top-level config document: `[orchestrator]`, `[[experts]]`, `[[tool_servers]]`.
///
/// Unknown TOML keys are ignored — `#[serde(deny_unknown_fields)]` is
/// deliberately not used, so older/newer config documents keep loading.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpertsConfig {
    #[serde(default)]
    pub orchestrator: OrchestratorPolicy,
    #[serde(default)]
    pub experts: Vec<ExpertDescriptor>,
    #[serde(default)]
    pub tool_servers: Vec<ToolServerConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config toml: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("duplicate expert id '{0}'")]
    DuplicateExpertId(String),
    #[error("expert '{expert}' references unknown tool server '{tool_server}'")]
    UnknownToolServer { expert: String, tool_server: String },
}

impl ExpertsConfig {
    /// Loads and validates the config document at `path`.
    pub fn load_from_path(path: &std::path::Path) -> Result<Self, ConfigLoadError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        let mut seen = std::collections::HashSet::new();
        for expert in &self.experts {
            if !seen.insert(expert.id.clone()) {
                return Err(ConfigLoadError::DuplicateExpertId(expert.id.clone()));
            }
            if let Some(tool_server) = &expert.tool_server {
                if !self.tool_servers.iter().any(|ts| &ts.name == tool_server) {
                    return Err(ConfigLoadError::UnknownToolServer {
                        expert: expert.id.clone(),
                        tool_server: tool_server.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Enabled experts only — disabled experts are never surfaced to orchestrators.
    pub fn enabled_experts(&self) -> impl Iterator<Item = &ExpertDescriptor> {
        self.experts.iter().filter(|e| e.enabled)
    }

    pub fn expert(&self, id: &str) -> Option<&ExpertDescriptor> {
        self.experts.iter().find(|e| e.id == id)
    }

    pub fn tool_server(&self, name: &str) -> Option<&ToolServerConfig> {
        self.tool_servers.iter().find(|ts| ts.name == name)
    }
}
