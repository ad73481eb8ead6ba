//! Tool-server supervisor: a process-wide registry of external tool servers.
//!
//! Stdio transport is *not* spawned here — the expert runtime spawns it
//! inside its own scoped context (`maestro_core::McpToolSource::new`) so the
//! child's lifetime equals the call's lifetime, matching `McpSession`'s
//! spawn-on-construct, drop-on-scope-exit discipline. HTTP transport needs a
//! shared long-lived child because multiple calls multiplex onto it, so the
//! supervisor owns that subprocess directly, the way `McpSession` owns a
//! stdio child but scoped to the whole process instead of one call.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

use crate::config::{ToolServerConfig, ToolServerTransport};

const STDERR_TAIL_LINES: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum ToolServerError {
    #[error("tool server '{0}' is disabled in config")]
    DisabledConfig(String),
    #[error("tool server '{0}' has no command configured")]
    MissingCommand(String),
    #[error("tool server '{0}' working directory '{1}' is not a directory")]
    BadWorkingDir(String, String),
    #[error("tool server '{name}' failed to start: {reason}\nstderr tail:\n{stderr_tail}")]
    SpawnError {
        name: String,
        reason: String,
        stderr_tail: String,
    },
    #[error("tool server '{0}' is not registered")]
    NotRegistered(String),
}

/// Liveness status of a registered tool server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolServerStatus {
    Registered,
    Running,
    Stopped,
}

struct RunningProcess {
    child: Child,
    stderr_tail: Arc<Mutex<VecDeque<String>>>,
}

struct ToolServerEntry {
    config: ToolServerConfig,
    process: Option<RunningProcess>,
}

/// Process-wide registry of tool servers, addressable by name.
///
/// Stdio entries are registered but never hold a `Child`: `is_running`
/// always reports `Stopped` for them since the subprocess is scoped to the
/// caller. HTTP entries own their `Child` directly.
pub struct ToolServerSupervisor {
    entries: DashMap<String, ToolServerEntry>,
}

impl Default for ToolServerSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolServerSupervisor {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Registers `config`; for `Stdio` transport this is a no-op beyond the
    /// registry entry. For `StreamableHttp`, spawns the child in
    /// `project_root`-relative `working_dir` (or `project_root` itself),
    /// waits a short grace period, then verifies it is still alive. Reuses
    /// an already-running process of the same name; replaces a dead one.
    pub async fn start(
        &self,
        config: ToolServerConfig,
        project_root: &std::path::Path,
    ) -> Result<(), ToolServerError> {
        if config.command.trim().is_empty() {
            return Err(ToolServerError::MissingCommand(config.name.clone()));
        }

        if config.transport == ToolServerTransport::Stdio {
            self.entries.insert(
                config.name.clone(),
                ToolServerEntry {
                    config,
                    process: None,
                },
            );
            return Ok(());
        }

        if self.is_running(&config.name) {
            return Ok(());
        }

        let working_dir = match &config.working_dir {
            Some(dir) => project_root.join(dir),
            None => project_root.to_path_buf(),
        };
        if !working_dir.is_dir() {
            return Err(ToolServerError::BadWorkingDir(
                config.name.clone(),
                working_dir.display().to_string(),
            ));
        }

        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .current_dir(&working_dir)
            .envs(&config.env)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::piped());

        let mut child = command.spawn().map_err(|e| ToolServerError::SpawnError {
            name: config.name.clone(),
            reason: e.to_string(),
            stderr_tail: String::new(),
        })?;

        let stderr_tail = Arc::new(Mutex::new(VecDeque::with_capacity(STDERR_TAIL_LINES)));
        if let Some(stderr) = child.stderr.take() {
            let tail = Arc::clone(&stderr_tail);
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let mut buf = tail.lock();
                    if buf.len() >= STDERR_TAIL_LINES {
                        buf.pop_front();
                    }
                    buf.push_back(line);
                }
            });
        }

        tokio::time::sleep(Duration::from_millis(150)).await;
        if let Ok(Some(status)) = child.try_wait() {
            let tail = stderr_tail.lock().iter().cloned().collect::<Vec<_>>().join("\n");
            return Err(ToolServerError::SpawnError {
                name: config.name.clone(),
                reason: format!("process exited immediately with {status}"),
                stderr_tail: tail,
            });
        }

        self.entries.insert(
            config.name.clone(),
            ToolServerEntry {
                config,
                process: Some(RunningProcess { child, stderr_tail }),
            },
        );
        Ok(())
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.entries
            .get(name)
            .map(|e| e.process.is_some())
            .unwrap_or(false)
    }

    pub fn status(&self, name: &str) -> Option<ToolServerStatus> {
        self.entries.get(name).map(|e| {
            if e.process.is_some() {
                ToolServerStatus::Running
            } else {
                ToolServerStatus::Registered
            }
        })
    }

    pub fn get_config(&self, name: &str) -> Option<ToolServerConfig> {
        self.entries.get(name).map(|e| e.config.clone())
    }

    pub fn list(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    /// Graceful terminate, then force-kill after `timeout`. Always
    /// deregisters, even if termination itself errors.
    pub async fn stop(&self, name: &str, timeout: Duration) -> Result<(), ToolServerError> {
        let Some((_, mut entry)) = self.entries.remove(name) else {
            return Err(ToolServerError::NotRegistered(name.to_string()));
        };
        if let Some(mut process) = entry.process.take() {
            let _ = process.child.start_kill();
            let _ = tokio::time::timeout(timeout, process.child.wait()).await;
            let _ = process.child.kill().await;
        }
        Ok(())
    }

    /// Stops every registered server concurrently. Safe on an empty
    /// registry; per-server errors are logged but never abort the sweep.
    pub async fn shutdown_all(&self, timeout: Duration) {
        let names: Vec<String> = self.list();
        let stops = names.into_iter().map(|name| async move {
            if let Err(e) = self.stop(&name, timeout).await {
                tracing::warn!(tool_server = %name, error = %e, "tool server shutdown failed");
            }
        });
        futures::future::join_all(stops).await;
    }
}
