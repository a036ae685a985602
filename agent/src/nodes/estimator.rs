//! One-shot difficulty estimate for a fresh goal.

use tracing::{info, warn};

use crate::context::AgentContext;
use crate::core::reply::parse_day_estimate;
use crate::io::completion::Completion;
use crate::state::{AgentState, DEFAULT_MAX_ROUNDS, Role};

/// Estimate the number of days for `state.goal` and hand over to the planner.
///
/// Falls back to [`DEFAULT_MAX_ROUNDS`] when the call fails or the reply has
/// no usable number.
pub fn estimate<C: Completion>(ctx: &AgentContext<C>, state: &mut AgentState) {
    info!(goal = %state.goal, "estimating difficulty");
    let days = match ctx.ask_estimate(&state.goal) {
        Ok(reply) => parse_day_estimate(&reply).unwrap_or_else(|| {
            warn!(%reply, "unusable estimate, using default");
            DEFAULT_MAX_ROUNDS
        }),
        Err(err) => {
            warn!(error = %err, "estimate failed, using default");
            DEFAULT_MAX_ROUNDS
        }
    };
    info!(days, "estimated days");
    state.max_rounds = days;
    state.push_log(format!("Estimated {days} day(s) for goal: {}", state.goal));
    state.role = Role::Planner;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::completion::CompletionError;
    use crate::test_support::{ScriptedCompletion, context_with};

    fn run(reply: Result<&str, CompletionError>) -> AgentState {
        let completion = ScriptedCompletion::new(vec![reply.map(str::to_string)]);
        let ctx = context_with(&completion, 25);
        let mut state = AgentState::with_goal("Write a haiku");
        estimate(&ctx, &mut state);
        state
    }

    #[test]
    fn uses_parsed_estimate() {
        let state = run(Ok("2"));
        assert_eq!(state.max_rounds, 2);
        assert_eq!(state.role, Role::Planner);
        assert_eq!(state.log, vec!["Estimated 2 day(s) for goal: Write a haiku"]);
    }

    #[test]
    fn falls_back_on_unparseable_reply() {
        assert_eq!(run(Ok("a couple of days")).max_rounds, 3);
        assert_eq!(run(Ok("99999999999999999999")).max_rounds, 3);
    }

    #[test]
    fn keeps_estimates_outside_the_requested_range() {
        assert_eq!(run(Ok("42")).max_rounds, 42);
        assert_eq!(run(Ok("1 or 2")).max_rounds, 12);
    }

    #[test]
    fn falls_back_on_call_failure() {
        let state = run(Err(CompletionError::Timeout));
        assert_eq!(state.max_rounds, 3);
        assert_eq!(state.role, Role::Planner);
    }
}
