//! Orchestration core: tool-server supervisor, agent factory, expert runner,
//! MoE/SmartRouter/single-expert orchestrators, result cache, and
//! hallucination guardrail, wired together behind one [`Orchestrator`]
//! handle that `maestro-server` holds and calls into per request.

pub mod cache;
pub mod config;
pub mod error;
pub mod expert_runner;
pub mod factory;
pub mod guardrail;
pub mod moe;
pub mod single;
pub mod smartrouter;
pub mod stream;
pub mod tool_server;
pub mod trace;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub use cache::ResultCache;
pub use config::ExpertsConfig;
pub use error::OrchestratorError;
pub use factory::AgentFactory;
pub use guardrail::GuardrailConfig;
pub use moe::MoeResult;
pub use single::SingleExpertResult;
pub use smartrouter::SmartRouterResult;
pub use stream::{StreamChunk, StreamMetadataInit, StreamableResult};
pub use tool_server::ToolServerSupervisor;
pub use trace::TraceSnapshot;

/// Live handle to one running configuration generation. Config reloads swap
/// both the config document and the `AgentFactory` built from it atomically
/// under a lock; in-flight requests keep whichever `Arc` they already
/// cloned, so a reload never tears a request's config out from under it.
pub struct Orchestrator {
    config: RwLock<Arc<ExpertsConfig>>,
    factory: RwLock<Arc<AgentFactory>>,
    cache: ResultCache,
    guardrail_config: GuardrailConfig,
    tool_servers: Arc<ToolServerSupervisor>,
    data_dir: PathBuf,
}

impl Orchestrator {
    pub fn new(config: ExpertsConfig, data_dir: PathBuf) -> Self {
        let tool_servers = Arc::new(ToolServerSupervisor::new());
        let cache = ResultCache::new(
            Duration::from_secs(config.orchestrator.cache_ttl_s),
            config.orchestrator.cache_max_entries,
        );
        let config = Arc::new(config);
        let factory = Arc::new(AgentFactory::new(
            (*config).clone(),
            tool_servers.clone(),
            data_dir.clone(),
        ));
        Self {
            config: RwLock::new(config),
            factory: RwLock::new(factory),
            cache,
            guardrail_config: GuardrailConfig::from_env(),
            tool_servers,
            data_dir,
        }
    }

    /// Swaps in a freshly loaded config document, rebuilding the agent
    /// factory (and therefore discarding cached session checkpointers —
    /// session rows on disk are untouched, only the in-process handle cache
    /// is reset) so expert descriptors take effect immediately.
    pub fn reload_config(&self, config: ExpertsConfig) {
        let config = Arc::new(config);
        let factory = Arc::new(AgentFactory::new(
            (*config).clone(),
            self.tool_servers.clone(),
            self.data_dir.clone(),
        ));
        *self.config.write() = config;
        *self.factory.write() = factory;
    }

    pub fn config(&self) -> Arc<ExpertsConfig> {
        self.config.read().clone()
    }

    fn factory(&self) -> Arc<AgentFactory> {
        self.factory.read().clone()
    }

    pub fn new_request_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub async fn chat_single(
        &self,
        expert_id: &str,
        input: &str,
        session_id: Option<&str>,
        max_steps: u32,
    ) -> Result<SingleExpertResult, OrchestratorError> {
        let config = self.config();
        let factory = self.factory();
        let request_id = Self::new_request_id();
        single::run_single_expert(
            &config,
            &factory,
            &self.guardrail_config,
            expert_id,
            input,
            session_id,
            max_steps,
            &request_id,
        )
        .await
    }

    pub async fn chat_moe(
        &self,
        query: &str,
        session_id: Option<&str>,
        max_steps: u32,
        cancel: CancellationToken,
    ) -> Result<MoeResult, OrchestratorError> {
        let config = self.config();
        let factory = self.factory();
        let request_id = Self::new_request_id();
        moe::run_moe(
            &config,
            &factory,
            &self.cache,
            &self.guardrail_config,
            query,
            session_id,
            max_steps,
            &request_id,
            cancel,
        )
        .await
    }

    pub async fn chat_smartrouter(
        &self,
        query: &str,
        session_id: &str,
        max_steps: u32,
        cancel: CancellationToken,
    ) -> Result<SmartRouterResult, OrchestratorError> {
        let config = self.config();
        let factory = self.factory();
        let request_id = Self::new_request_id();
        smartrouter::run_smartrouter(
            &config,
            &factory,
            &self.guardrail_config,
            query,
            session_id,
            max_steps,
            &request_id,
            cancel,
        )
        .await
    }

    pub fn tool_servers(&self) -> Arc<ToolServerSupervisor> {
        self.tool_servers.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OrchestratorPolicy, SessionPolicy};

    fn sample_config() -> ExpertsConfig {
        ExpertsConfig {
            orchestrator: OrchestratorPolicy::default(),
            experts: vec![config::ExpertDescriptor {
                id: "chitchat".to_string(),
                display_name: None,
                model: "gpt-4.1-mini".to_string(),
                temperature: 0.7,
                max_tokens: 256,
                session_policy: SessionPolicy::None,
                enabled: true,
                capability_tags: vec!["smalltalk".to_string()],
                tool_server: None,
                instructions: None,
            }],
            tool_servers: vec![],
        }
    }

    #[test]
    fn reload_config_swaps_the_visible_snapshot() {
        let tmp = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(sample_config(), tmp.path().to_path_buf());
        assert_eq!(orchestrator.config().experts.len(), 1);

        let mut reloaded = sample_config();
        reloaded.experts.push(config::ExpertDescriptor {
            id: "weather".to_string(),
            display_name: None,
            model: "gpt-4.1-mini".to_string(),
            temperature: 0.7,
            max_tokens: 256,
            session_policy: SessionPolicy::None,
            enabled: true,
            capability_tags: vec!["weather".to_string()],
            tool_server: None,
            instructions: None,
        });
        orchestrator.reload_config(reloaded);
        assert_eq!(orchestrator.config().experts.len(), 2);
    }

    #[tokio::test]
    async fn chat_single_rejects_unknown_expert() {
        let tmp = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(sample_config(), tmp.path().to_path_buf());
        let result = orchestrator.chat_single("no-such-expert", "hi", None, 10).await;
        assert!(matches!(result, Err(OrchestratorError::UnknownExpert(_))));
    }
}
