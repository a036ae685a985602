//! The persisted agent record (`.agent/agent_memory.json`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Version stamped into every persisted state file.
pub const STATE_VERSION: u32 = 1;

/// Day estimate used until (or instead of) a successful estimation.
pub const DEFAULT_MAX_ROUNDS: u32 = 3;

/// Current step of the plan/execute/review cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Planner,
    Executor,
    Reviewer,
    End,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Planner => "planner",
            Role::Executor => "executor",
            Role::Reviewer => "reviewer",
            Role::End => "end",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Role::End
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    /// Schema version of the persisted file.
    pub version: u32,
    /// User objective. Empty until the goal is acquired on a fresh run.
    pub goal: String,
    pub role: Role,
    /// Current day, 1-indexed. Only the reviewer advances it.
    pub round: u32,
    /// Estimated total days.
    pub max_rounds: u32,
    /// Subtask produced by the planner and consumed by the executor.
    pub task: Option<String>,
    /// Outcome of the last executed task.
    pub result: Option<String>,
    /// Completed subtasks, oldest first.
    pub subtask_progress: Vec<String>,
    /// Human-readable trace, one line per step.
    pub log: Vec<String>,
}

impl Default for AgentState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            goal: String::new(),
            role: Role::Planner,
            round: 1,
            max_rounds: DEFAULT_MAX_ROUNDS,
            task: None,
            result: None,
            subtask_progress: Vec::new(),
            log: Vec::new(),
        }
    }
}

impl AgentState {
    /// Fresh state for `goal`, before estimation.
    pub fn with_goal(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            ..Self::default()
        }
    }

    /// True until a goal has been acquired and estimated.
    pub fn is_fresh(&self) -> bool {
        self.goal.trim().is_empty()
    }

    pub fn push_log(&mut self, line: impl Into<String>) {
        self.log.push(line.into());
    }
}
