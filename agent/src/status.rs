//! Read-only summary of the persisted agent state for `goal-agent status`.

use std::path::Path;

use serde::Serialize;

use crate::io::paths::AgentPaths;
use crate::io::state_store::{StateOrigin, StateStore};
use crate::state::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub state_path: String,
    /// `fresh`, `resumed`, or `discarded`.
    pub source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discarded_reason: Option<String>,
    pub goal: String,
    pub role: Role,
    pub round: u32,
    pub max_rounds: u32,
    pub completed: Vec<String>,
    pub last_task: Option<String>,
    pub last_result: Option<String>,
    pub log_entries: usize,
}

/// Summarize the state persisted under `root` without modifying it.
pub fn status_from_root(root: &Path) -> StatusReport {
    let paths = AgentPaths::new(root);
    let store = StateStore::new(&paths.state_path);
    let (state, origin) = store.load_with_origin();
    let (source, discarded_reason) = match origin {
        StateOrigin::Fresh => ("fresh", None),
        StateOrigin::Resumed => ("resumed", None),
        StateOrigin::Discarded(reason) => ("discarded", Some(reason)),
    };
    StatusReport {
        state_path: paths.state_path.display().to_string(),
        source,
        discarded_reason,
        goal: state.goal,
        role: state.role,
        round: state.round,
        max_rounds: state.max_rounds,
        completed: state.subtask_progress,
        last_task: state.task,
        last_result: state.result,
        log_entries: state.log.len(),
    }
}
