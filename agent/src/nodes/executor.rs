//! Executor node: performs the planned task through the safe action set.

use tracing::info;

use crate::core::action::Action;
use crate::state::{AgentState, Role};

/// Perform `state.task` and hand over to the reviewer.
///
/// Always sets `result`, whether the action succeeded or not.
pub fn execute(state: &mut AgentState) {
    let task = state.task.clone().unwrap_or_default();
    let action = Action::classify(&task);
    let result = match action.perform() {
        Ok(value) => value,
        Err(reason) => format!("Error: {reason}"),
    };
    info!(kind = action.kind(), %task, %result, "executed task");
    state.push_log(format!("Executed: {task} -> {result}"));
    state.result = Some(result);
    state.role = Role::Reviewer;
}
