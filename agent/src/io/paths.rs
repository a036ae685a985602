//! Well-known locations under a project root.

use std::path::PathBuf;

/// Paths used by the agent, all under `<root>/.agent/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentPaths {
    pub agent_dir: PathBuf,
    pub state_path: PathBuf,
    pub config_path: PathBuf,
}

impl AgentPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let agent_dir = root.into().join(".agent");
        Self {
            state_path: agent_dir.join("agent_memory.json"),
            config_path: agent_dir.join("config.toml"),
            agent_dir,
        }
    }
}
