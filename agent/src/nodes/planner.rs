//! Planner node: asks for the next subtask or the completion marker.

use tracing::{info, warn};

use crate::context::AgentContext;
use crate::core::action::PLANNER_ERROR_PREFIX;
use crate::core::reply::contains_completion_marker;
use crate::io::completion::Completion;
use crate::state::{AgentState, Role};

/// Plan the next subtask for the current round.
///
/// Moves to [`Role::End`] when the reply contains the completion marker and
/// to [`Role::Executor`] otherwise. A failed call (or a blank reply) becomes
/// an error task so the cycle keeps moving. Appends exactly one log line.
pub fn plan<C: Completion>(ctx: &AgentContext<C>, state: &mut AgentState) {
    let round = state.round;
    info!(round, goal = %state.goal, "planning task");

    let reply = ctx.ask_next_task(state).and_then(|reply| {
        let trimmed = reply.trim();
        if trimmed.is_empty() {
            Err("empty completion".to_string())
        } else {
            Ok(trimmed.to_string())
        }
    });

    match reply {
        Ok(text) if contains_completion_marker(&text) => {
            info!(round, "planner reported goal complete");
            state.push_log(format!("Planned task {round}: {text}"));
            state.role = Role::End;
        }
        Ok(text) => {
            state.push_log(format!("Planned task {round}: {text}"));
            state.task = Some(text);
            state.role = Role::Executor;
        }
        Err(err) => {
            warn!(round, error = %err, "planning failed");
            let task = format!("{PLANNER_ERROR_PREFIX} {err}");
            state.push_log(format!("Planned task {round}: {task}"));
            state.task = Some(task);
            state.role = Role::Executor;
        }
    }
}
