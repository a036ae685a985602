//! Persistence for [`AgentState`] (`.agent/agent_memory.json`).
//!
//! Loading never fails: a missing file means a fresh start, and a file that
//! cannot be read, parsed, or validated is discarded with a warning. Saving
//! is atomic (temp file + rename), so an interrupted or failed write leaves
//! the previous state intact.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;
use tracing::{debug, warn};

use crate::state::{AgentState, STATE_VERSION};

const STATE_SCHEMA: &str = include_str!("../../schemas/agent_state.v1.schema.json");

/// Where a loaded state came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateOrigin {
    /// No persisted file existed.
    Fresh,
    /// The persisted file was loaded.
    Resumed,
    /// A persisted file existed but was unusable; carries the reason.
    Discarded(String),
}

/// File-backed store for a single [`AgentState`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state, or the default state when none is usable.
    pub fn load(&self) -> AgentState {
        self.load_with_origin().0
    }

    /// Like [`StateStore::load`], also reporting where the state came from.
    pub fn load_with_origin(&self) -> (AgentState, StateOrigin) {
        debug!(path = %self.path.display(), "loading agent state");
        match read_state(&self.path) {
            Ok(Some(state)) => {
                debug!(role = %state.role, round = state.round, "agent state loaded");
                (state, StateOrigin::Resumed)
            }
            Ok(None) => {
                debug!("no saved state found, starting fresh");
                (AgentState::default(), StateOrigin::Fresh)
            }
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(path = %self.path.display(), %reason, "discarding unusable agent state");
                (AgentState::default(), StateOrigin::Discarded(reason))
            }
        }
    }

    /// Atomically write `state`, replacing any previous file.
    pub fn save(&self, state: &AgentState) -> Result<()> {
        debug!(path = %self.path.display(), role = %state.role, round = state.round, "saving agent state");
        let mut buf = serde_json::to_string_pretty(state).context("serialize agent state")?;
        buf.push('\n');
        write_atomic(&self.path, &buf)
    }

    /// Delete the persisted state. Returns whether a file was removed.
    pub fn reset(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => {
                Err(err).with_context(|| format!("remove agent state {}", self.path.display()))
            }
        }
    }
}

fn read_state(path: &Path) -> Result<Option<AgentState>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("read agent state {}", path.display()));
        }
    };
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse agent state {}", path.display()))?;
    let version = value.get("version").and_then(Value::as_u64);
    if version != Some(u64::from(STATE_VERSION)) {
        return Err(anyhow!(
            "unsupported state version {} (expected {STATE_VERSION})",
            version.map_or_else(|| "<missing>".to_string(), |v| v.to_string())
        ));
    }
    validate_schema(&value)?;
    let state: AgentState = serde_json::from_value(value)
        .with_context(|| format!("deserialize agent state {}", path.display()))?;
    Ok(Some(state))
}

fn validate_schema(state: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(STATE_SCHEMA).context("parse state schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(state) {
        let messages = compiled
            .iter_errors(state)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "state schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("state path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp agent state {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("replace agent state {}", path.display()))?;
    Ok(())
}
