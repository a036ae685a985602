//! Round-robin controller for `goal-agent run`.
//!
//! Loads the persisted state, runs the one-time estimation prelude for a fresh
//! goal, then dispatches planner → executor → reviewer until the planner
//! reports completion or the tick ceiling is reached. State is persisted after
//! every tick.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::context::AgentContext;
use crate::io::completion::Completion;
use crate::io::state_store::{StateOrigin, StateStore};
use crate::nodes::{estimator, executor, planner, reviewer};
use crate::state::{AgentState, Role};

/// Reason why `run_loop` stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopStop {
    /// The planner reported the goal complete during this invocation.
    Completed,
    /// The persisted state was already terminal; nothing was dispatched.
    AlreadyComplete,
    /// The invocation used up its tick budget without reaching `end`.
    CeilingReached { ticks: u32, max_ticks: u32 },
}

/// Summary of a loop invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    pub origin: StateOrigin,
    /// Whether the estimation prelude ran.
    pub estimated: bool,
    /// Dispatch ticks executed (the prelude is not counted).
    pub ticks: u32,
    pub stop: LoopStop,
    /// State as last persisted.
    pub state: AgentState,
}

/// Node selected for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Plan,
    Execute,
    Review,
    Finish,
}

/// Map the current role to the node that handles it.
pub fn route(role: Role) -> Node {
    match role {
        Role::Planner => Node::Plan,
        Role::Executor => Node::Execute,
        Role::Reviewer => Node::Review,
        Role::End => Node::Finish,
    }
}

/// Run the node for the current role once.
///
/// `Finish` is terminal and leaves the state unchanged.
pub fn dispatch<C: Completion>(ctx: &AgentContext<C>, state: &mut AgentState) -> Node {
    let node = route(state.role);
    match node {
        Node::Plan => planner::plan(ctx, state),
        Node::Execute => executor::execute(state),
        Node::Review => reviewer::review(state),
        Node::Finish => finish(state),
    }
    node
}

fn finish(state: &AgentState) {
    info!(
        rounds = state.round.saturating_sub(1),
        completed = state.subtask_progress.len(),
        "finished"
    );
    debug!(log = ?state.log, "final log");
}

/// Set the goal on a fresh state and estimate it.
fn prelude<C: Completion>(ctx: &AgentContext<C>, state: &mut AgentState, goal: &str) {
    info!(%goal, "user goal provided");
    state.goal = goal.to_string();
    estimator::estimate(ctx, state);
}

/// Drive the agent until completion or the tick ceiling.
///
/// `goal` is only used when no usable state was persisted. `on_tick` observes
/// the state after every persist, including the one after estimation. Stops
/// with an error only when the state cannot be persisted; the last
/// successfully saved file is left intact.
pub fn run_loop<C: Completion, F: FnMut(&AgentState)>(
    ctx: &AgentContext<C>,
    store: &StateStore,
    goal: &str,
    mut on_tick: F,
) -> Result<LoopOutcome> {
    let (mut state, origin) = store.load_with_origin();
    let max_ticks = ctx.settings().max_ticks;

    if state.role.is_terminal() {
        info!("agent has already completed its tasks");
        return Ok(LoopOutcome {
            origin,
            estimated: false,
            ticks: 0,
            stop: LoopStop::AlreadyComplete,
            state,
        });
    }

    let estimated = state.is_fresh();
    if estimated {
        prelude(ctx, &mut state, goal);
        persist(store, &state)?;
        on_tick(&state);
    } else {
        info!(goal = %state.goal, round = state.round, role = %state.role, "resuming");
    }

    let mut ticks = 0u32;
    loop {
        if route(state.role) == Node::Finish {
            finish(&state);
            return Ok(LoopOutcome {
                origin,
                estimated,
                ticks,
                stop: LoopStop::Completed,
                state,
            });
        }
        if ticks >= max_ticks {
            warn!(ticks, max_ticks, "tick ceiling reached, stopping");
            return Ok(LoopOutcome {
                origin,
                estimated,
                ticks,
                stop: LoopStop::CeilingReached { ticks, max_ticks },
                state,
            });
        }

        let before = state.role;
        dispatch(ctx, &mut state);
        ticks += 1;
        persist(store, &state)?;
        debug!(from = %before, to = %state.role, tick = ticks, "switching role");
        on_tick(&state);
    }
}

fn persist(store: &StateStore, state: &AgentState) -> Result<()> {
    store
        .save(state)
        .with_context(|| format!("persist agent state {}", store.path().display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedCompletion, TestProject, context_with};

    #[test]
    fn route_is_exhaustive_and_end_is_terminal() {
        assert_eq!(route(Role::Planner), Node::Plan);
        assert_eq!(route(Role::Executor), Node::Execute);
        assert_eq!(route(Role::Reviewer), Node::Review);
        assert_eq!(route(Role::End), Node::Finish);
    }

    #[test]
    fn dispatch_on_end_leaves_state_unchanged() {
        let completion = ScriptedCompletion::failing();
        let ctx = context_with(&completion, 25);
        let mut state = AgentState::with_goal("g");
        state.role = Role::End;
        let before = state.clone();

        assert_eq!(dispatch(&ctx, &mut state), Node::Finish);
        assert_eq!(state, before);
        assert_eq!(completion.calls(), 0);
    }

    #[test]
    fn fresh_run_estimates_then_completes() {
        let project = TestProject::new().expect("project");
        let store = project.store();
        let completion = ScriptedCompletion::replies(&["4", "Pick a season", "GOAL COMPLETE"]);
        let ctx = context_with(&completion, 25);

        let mut seen = Vec::new();
        let outcome =
            run_loop(&ctx, &store, "Write a haiku", |s| seen.push(s.role)).expect("loop");

        assert_eq!(outcome.stop, LoopStop::Completed);
        assert_eq!(outcome.origin, StateOrigin::Fresh);
        assert!(outcome.estimated);
        assert_eq!(outcome.ticks, 4);
        assert_eq!(
            seen,
            vec![
                Role::Planner,
                Role::Executor,
                Role::Reviewer,
                Role::Planner,
                Role::End
            ]
        );
        assert_eq!(outcome.state.max_rounds, 4);
        assert_eq!(outcome.state.subtask_progress, vec!["Pick a season"]);
        assert_eq!(store.load(), outcome.state);
    }

    #[test]
    fn terminal_state_is_not_dispatched() {
        let project = TestProject::new().expect("project");
        let store = project.store();
        let mut done = AgentState::with_goal("g");
        done.role = Role::End;
        store.save(&done).expect("save");

        let completion = ScriptedCompletion::failing();
        let ctx = context_with(&completion, 25);
        let outcome = run_loop(&ctx, &store, "ignored", |_| {}).expect("loop");

        assert_eq!(outcome.stop, LoopStop::AlreadyComplete);
        assert_eq!(outcome.ticks, 0);
        assert_eq!(completion.calls(), 0);
        assert_eq!(store.load(), done);
    }

    #[test]
    fn resume_skips_estimation_and_keeps_goal() {
        let project = TestProject::new().expect("project");
        let store = project.store();
        let mut saved = AgentState::with_goal("Learn Rust");
        saved.max_rounds = 5;
        saved.round = 2;
        store.save(&saved).expect("save");

        let completion = ScriptedCompletion::replies(&["GOAL COMPLETE"]);
        let ctx = context_with(&completion, 25);
        let outcome = run_loop(&ctx, &store, "Other goal", |_| {}).expect("loop");

        assert!(!outcome.estimated);
        assert_eq!(outcome.origin, StateOrigin::Resumed);
        assert_eq!(outcome.state.goal, "Learn Rust");
        assert_eq!(outcome.state.max_rounds, 5);
        assert_eq!(completion.calls(), 1);
    }

    #[test]
    fn ceiling_stops_without_extra_writes() {
        let project = TestProject::new().expect("project");
        let store = project.store();
        let completion = ScriptedCompletion::failing();
        let ctx = context_with(&completion, 4);

        let mut last_seen = None;
        let outcome =
            run_loop(&ctx, &store, "g", |s| last_seen = Some(s.clone())).expect("loop");

        assert_eq!(
            outcome.stop,
            LoopStop::CeilingReached {
                ticks: 4,
                max_ticks: 4
            }
        );
        let persisted = store.load();
        assert_eq!(Some(&persisted), last_seen.as_ref());
        assert_eq!(persisted, outcome.state);
        // plan, execute, review, plan
        assert_eq!(persisted.role, Role::Executor);
        assert_eq!(persisted.round, 2);
    }
}
