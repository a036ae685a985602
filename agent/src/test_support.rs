//! Test-only helpers: scripted completions and throwaway project directories.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::context::{AgentContext, LoopSettings};
use crate::io::completion::{Completion, CompletionError, CompletionRequest};
use crate::io::paths::AgentPaths;
use crate::io::state_store::StateStore;

/// Completion that replays a fixed queue of replies and records every request.
///
/// Once the queue is empty every call fails with a network error.
pub struct ScriptedCompletion {
    replies: RefCell<VecDeque<Result<String, CompletionError>>>,
    requests: RefCell<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn new(replies: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Queue of successful replies.
    pub fn replies(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok((*r).to_string())).collect())
    }

    /// Every call fails.
    pub fn failing() -> Self {
        Self::new(Vec::new())
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.borrow().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl Completion for ScriptedCompletion {
    fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        self.requests.borrow_mut().push(request.clone());
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::Network("connection refused".to_string())))
    }
}

/// Build a context around `completion` with the given tick ceiling.
pub fn context_with<C: Completion>(completion: C, max_ticks: u32) -> AgentContext<C> {
    AgentContext::new(
        completion,
        LoopSettings {
            max_ticks,
            planner_max_tokens: 50,
            estimator_max_tokens: 10,
        },
    )
    .expect("context")
}

/// A temporary project directory with agent paths.
pub struct TestProject {
    _temp: tempfile::TempDir,
    root: PathBuf,
}

impl TestProject {
    pub fn new() -> std::io::Result<Self> {
        let temp = tempfile::tempdir()?;
        let root = temp.path().to_path_buf();
        Ok(Self { _temp: temp, root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn paths(&self) -> AgentPaths {
        AgentPaths::new(&self.root)
    }

    pub fn store(&self) -> StateStore {
        StateStore::new(self.paths().state_path)
    }
}
