//! Prompt rendering for the estimator and planner requests.

use anyhow::Result;
use minijinja::{Environment, context};

use crate::core::reply::{COMPLETION_MARKER, MAX_ESTIMATE_DAYS, MIN_ESTIMATE_DAYS};
use crate::io::completion::CompletionRequest;
use crate::state::AgentState;

const ESTIMATOR_TEMPLATE: &str = include_str!("prompts/estimator.md");
const PLANNER_TEMPLATE: &str = include_str!("prompts/planner.md");

const PLANNER_QUESTION: &str = "What should I do next?";

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("estimator", ESTIMATOR_TEMPLATE)?;
        env.add_template("planner", PLANNER_TEMPLATE)?;
        Ok(Self { env })
    }

    /// Request asking for a day estimate for `goal`.
    pub fn estimator_request(&self, goal: &str, max_tokens: u32) -> Result<CompletionRequest> {
        let system = self.env.get_template("estimator")?.render(context! {
            min_days => MIN_ESTIMATE_DAYS,
            max_days => MAX_ESTIMATE_DAYS,
        })?;
        Ok(CompletionRequest {
            system,
            user: format!("My goal is: {}", goal.trim()),
            max_tokens,
        })
    }

    /// Request asking for the next subtask (or the completion marker).
    pub fn planner_request(&self, state: &AgentState, max_tokens: u32) -> Result<CompletionRequest> {
        let system = self.env.get_template("planner")?.render(context! {
            goal => state.goal.trim(),
            round => state.round,
            max_rounds => state.max_rounds,
            completed => &state.subtask_progress,
            marker => COMPLETION_MARKER,
        })?;
        Ok(CompletionRequest {
            system,
            user: PLANNER_QUESTION.to_string(),
            max_tokens,
        })
    }
}
