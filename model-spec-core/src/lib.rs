//! Shared model/provider spec types: context window and pricing metadata used
//! to validate expert descriptors (`model_name`, `max_tokens`) before an
//! orchestrator ever calls out to a provider.

use serde::{Deserialize, Serialize};

/// Static facts about one LLM model: how much context it accepts and what it
/// costs, independent of any one provider account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub id: String,
    pub context_window: u32,
    pub max_output_tokens: u32,
    #[serde(default)]
    pub input_cost_per_1k: Option<f64>,
    #[serde(default)]
    pub output_cost_per_1k: Option<f64>,
}

impl ModelSpec {
    /// `max_tokens` is within range for this model: positive and not larger
    /// than the model's output ceiling.
    pub fn validate_max_tokens(&self, max_tokens: u32) -> Result<(), ModelSpecError> {
        if max_tokens == 0 {
            return Err(ModelSpecError::InvalidMaxTokens {
                model: self.id.clone(),
                max_tokens,
                limit: self.max_output_tokens,
            });
        }
        if max_tokens > self.max_output_tokens {
            return Err(ModelSpecError::InvalidMaxTokens {
                model: self.id.clone(),
                max_tokens,
                limit: self.max_output_tokens,
            });
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelSpecError {
    #[error("unknown model '{0}'")]
    UnknownModel(String),
    #[error("max_tokens {max_tokens} out of range for model '{model}' (limit {limit})")]
    InvalidMaxTokens {
        model: String,
        max_tokens: u32,
        limit: u32,
    },
}

/// Resolves a model id to its [`ModelSpec`]. Implementations may hold a
/// static table, a refreshable remote source, or both layered together.
pub trait ModelLimitResolver: Send + Sync {
    fn resolve(&self, model_id: &str) -> Option<ModelSpec>;
}

/// A small built-in table covering the models commonly referenced in example
/// configs. Not exhaustive; callers needing live data should layer a remote
/// resolver in front of this one.
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    specs: Vec<ModelSpec>,
}

impl StaticResolver {
    pub fn new(specs: Vec<ModelSpec>) -> Self {
        Self { specs }
    }

    /// Built-in defaults for the handful of models referenced by example
    /// configs in this workspace.
    pub fn with_builtin_defaults() -> Self {
        Self::new(vec![
            ModelSpec {
                id: "gpt-4.1-mini".to_string(),
                context_window: 1_047_576,
                max_output_tokens: 32_768,
                input_cost_per_1k: Some(0.0004),
                output_cost_per_1k: Some(0.0016),
            },
            ModelSpec {
                id: "gpt-4.1-nano".to_string(),
                context_window: 1_047_576,
                max_output_tokens: 32_768,
                input_cost_per_1k: Some(0.0001),
                output_cost_per_1k: Some(0.0004),
            },
            ModelSpec {
                id: "gpt-4.1".to_string(),
                context_window: 1_047_576,
                max_output_tokens: 32_768,
                input_cost_per_1k: Some(0.002),
                output_cost_per_1k: Some(0.008),
            },
        ])
    }
}

impl ModelLimitResolver for StaticResolver {
    fn resolve(&self, model_id: &str) -> Option<ModelSpec> {
        self.specs.iter().find(|s| s.id == model_id).cloned()
    }
}

/// Layers resolvers in order, returning the first hit.
pub struct CompositeResolver {
    resolvers: Vec<Box<dyn ModelLimitResolver>>,
}

impl CompositeResolver {
    pub fn new(resolvers: Vec<Box<dyn ModelLimitResolver>>) -> Self {
        Self { resolvers }
    }
}

impl ModelLimitResolver for CompositeResolver {
    fn resolve(&self, model_id: &str) -> Option<ModelSpec> {
        self.resolvers.iter().find_map(|r| r.resolve(model_id))
    }
}
