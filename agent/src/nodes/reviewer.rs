//! Reviewer node: closes the current round.

use tracing::info;

use crate::state::{AgentState, Role};

/// Record the finished task, advance the round, and hand back to the planner.
///
/// This is the only place the round counter moves.
pub fn review(state: &mut AgentState) {
    let round = state.round;
    info!(round, "reviewing day");
    state.push_log(format!("Reviewed result of Day {round}"));
    state
        .subtask_progress
        .push(state.task.clone().unwrap_or_default());
    state.round = round.saturating_add(1);
    state.role = Role::Planner;
}
