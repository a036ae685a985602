//! Per-process agent context handed to every node.

use anyhow::Result;

use crate::io::completion::Completion;
use crate::io::config::AgentConfig;
use crate::io::prompt::PromptEngine;
use crate::state::AgentState;

/// Loop settings taken from [`AgentConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    /// Maximum dispatch ticks per invocation.
    pub max_ticks: u32,
    pub planner_max_tokens: u32,
    pub estimator_max_tokens: u32,
}

impl From<&AgentConfig> for LoopSettings {
    fn from(cfg: &AgentConfig) -> Self {
        Self {
            max_ticks: cfg.max_ticks,
            planner_max_tokens: cfg.completion.planner_max_tokens,
            estimator_max_tokens: cfg.completion.estimator_max_tokens,
        }
    }
}

/// Everything a node needs besides the state itself. Built once per process.
pub struct AgentContext<C: Completion> {
    completion: C,
    prompts: PromptEngine,
    settings: LoopSettings,
}

impl<C: Completion> AgentContext<C> {
    pub fn new(completion: C, settings: LoopSettings) -> Result<Self> {
        Ok(Self {
            completion,
            prompts: PromptEngine::new()?,
            settings,
        })
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    /// Ask for a day estimate. `Err` carries a printable failure reason.
    pub fn ask_estimate(&self, goal: &str) -> Result<String, String> {
        let request = self
            .prompts
            .estimator_request(goal, self.settings.estimator_max_tokens)
            .map_err(|err| format!("{err:#}"))?;
        self.completion
            .complete(&request)
            .map_err(|err| err.to_string())
    }

    /// Ask for the next subtask. `Err` carries a printable failure reason.
    pub fn ask_next_task(&self, state: &AgentState) -> Result<String, String> {
        let request = self
            .prompts
            .planner_request(state, self.settings.planner_max_tokens)
            .map_err(|err| format!("{err:#}"))?;
        self.completion
            .complete(&request)
            .map_err(|err| err.to_string())
    }
}
