//! Agent configuration stored under `.agent/config.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::backoff::RetryPolicy;

/// Goal used when neither the CLI, `USER_GOAL`, nor the config provide one.
pub const FALLBACK_GOAL: &str = "Default Goal";

/// Agent configuration (TOML).
///
/// Intended to be edited by humans. Missing fields default to the values the
/// loop was designed around.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum dispatch ticks per process invocation.
    pub max_ticks: u32,

    /// Goal used on a fresh run when none is supplied.
    pub default_goal: String,

    pub completion: CompletionConfig,

    pub health: HealthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CompletionConfig {
    /// OpenAI-compatible API root (without `/chat/completions`).
    pub base_url: String,
    pub model: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Extra attempts after a retryable failure.
    pub max_retries: u32,
    /// First backoff delay; doubled for each further retry.
    pub retry_backoff_ms: u64,
    pub planner_max_tokens: u32,
    pub estimator_max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HealthConfig {
    /// Serve `/health` and `/ready` while the loop runs.
    pub enabled: bool,
    pub bind: String,
    pub port: u16,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            request_timeout_secs: 60,
            max_retries: 2,
            retry_backoff_ms: 500,
            planner_max_tokens: 50,
            estimator_max_tokens: 10,
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_ticks: 25,
            default_goal: FALLBACK_GOAL.to_string(),
            completion: CompletionConfig::default(),
            health: HealthConfig::default(),
        }
    }
}

impl CompletionConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.retry_backoff_ms),
        )
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_ticks == 0 {
            return Err(anyhow!("max_ticks must be > 0"));
        }
        if self.completion.base_url.trim().is_empty() {
            return Err(anyhow!("completion.base_url must not be empty"));
        }
        if self.completion.model.trim().is_empty() {
            return Err(anyhow!("completion.model must not be empty"));
        }
        if self.completion.request_timeout_secs == 0 {
            return Err(anyhow!("completion.request_timeout_secs must be > 0"));
        }
        if self.completion.planner_max_tokens == 0 || self.completion.estimator_max_tokens == 0 {
            return Err(anyhow!("completion max_tokens settings must be > 0"));
        }
        if self.health.bind.trim().is_empty() {
            return Err(anyhow!("health.bind must not be empty"));
        }
        Ok(())
    }

    /// Goal for a fresh run: explicit input first, then the configured default.
    pub fn resolve_goal(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::trim)
            .filter(|goal| !goal.is_empty())
            .or_else(|| Some(self.default_goal.trim()).filter(|goal| !goal.is_empty()))
            .unwrap_or(FALLBACK_GOAL)
            .to_string()
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AgentConfig::default()`.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    if !path.exists() {
        let cfg = AgentConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AgentConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AgentConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

/// Write the default config to `path` for `goal-agent init`.
///
/// Fails if a config already exists unless `force` is set.
pub fn init_config(path: &Path, force: bool) -> Result<AgentConfig> {
    if path.exists() && !force {
        return Err(anyhow!(
            "goal-agent init: {} already exists (use --force to overwrite)",
            path.display()
        ));
    }
    let cfg = AgentConfig::default();
    write_config(path, &cfg)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, AgentConfig::default());
        assert_eq!(cfg.max_ticks, 25);
        assert_eq!(cfg.health.port, 8000);
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".agent/config.toml");
        let cfg = AgentConfig {
            max_ticks: 7,
            ..AgentConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn init_writes_defaults_once() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".agent/config.toml");
        let cfg = init_config(&path, false).expect("init");
        assert_eq!(cfg, AgentConfig::default());
        assert_eq!(load_config(&path).expect("load"), cfg);

        fs::write(&path, "max_ticks = 4\n").expect("write");
        let err = init_config(&path, false).unwrap_err();
        assert!(err.to_string().contains("--force"));
        assert_eq!(load_config(&path).expect("load").max_ticks, 4);

        init_config(&path, true).expect("force init");
        assert_eq!(load_config(&path).expect("load").max_ticks, 25);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "max_ticks = 9\n\n[completion]\nmodel = \"gpt-4o-mini\"\n")
            .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.max_ticks, 9);
        assert_eq!(cfg.completion.model, "gpt-4o-mini");
        assert_eq!(cfg.completion.max_retries, 2);
        assert!(cfg.health.enabled);
    }

    #[test]
    fn rejects_zero_ticks() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "max_ticks = 0\n").expect("write");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("max_ticks must be > 0"));
    }

    #[test]
    fn resolve_goal_prefers_explicit_then_config() {
        let cfg = AgentConfig {
            default_goal: "Learn Rust".to_string(),
            ..AgentConfig::default()
        };
        assert_eq!(cfg.resolve_goal(Some("Write a haiku")), "Write a haiku");
        assert_eq!(cfg.resolve_goal(Some("   ")), "Learn Rust");
        assert_eq!(cfg.resolve_goal(None), "Learn Rust");

        let blank = AgentConfig {
            default_goal: String::new(),
            ..AgentConfig::default()
        };
        assert_eq!(blank.resolve_goal(None), FALLBACK_GOAL);
    }
}
