//! Completion-service abstraction.
//!
//! The [`Completion`] trait decouples the agent nodes from the actual model
//! backend (an OpenAI-compatible chat-completions endpoint). Tests use
//! scripted completions that return predetermined replies without network I/O.

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::core::backoff::RetryPolicy;
use crate::io::config::CompletionConfig;

/// Environment variable holding the bearer token for the completion service.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// A single-turn completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("rate limited by completion service")]
    RateLimited,
    #[error("completion service returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("malformed completion response: {0}")]
    Parse(String),
    #[error("completion response had no content")]
    MissingContent,
}

impl CompletionError {
    /// Transport failures, 429 and 5xx are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            CompletionError::Timeout
            | CompletionError::Network(_)
            | CompletionError::RateLimited => true,
            CompletionError::Api { status, .. } => *status >= 500,
            CompletionError::Parse(_) | CompletionError::MissingContent => false,
        }
    }
}

/// Abstraction over completion backends.
pub trait Completion {
    /// Return the reply text for `request`.
    fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

impl<C: Completion + ?Sized> Completion for &C {
    fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        (**self).complete(request)
    }
}

/// Run `attempt` until it succeeds, fails with a non-retryable error, or the
/// policy's retry budget is spent. `sleep` is called between attempts.
pub fn retry_with_policy<F, S>(
    policy: RetryPolicy,
    mut attempt: F,
    mut sleep: S,
) -> Result<String, CompletionError>
where
    F: FnMut(u32) -> Result<String, CompletionError>,
    S: FnMut(Duration),
{
    let mut n = 0;
    loop {
        match attempt(n) {
            Ok(reply) => return Ok(reply),
            Err(err) if err.is_retryable() => match policy.delay_after(n) {
                Some(delay) => {
                    warn!(attempt = n + 1, delay_ms = delay.as_millis() as u64, error = %err, "completion failed, retrying");
                    sleep(delay);
                    n += 1;
                }
                None => return Err(err),
            },
            Err(err) => return Err(err),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Completion backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiCompletion {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl OpenAiCompletion {
    pub fn new(config: &CompletionConfig, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            retry: config.retry_policy(),
        })
    }

    /// Build from config, reading the key from [`API_KEY_ENV`].
    pub fn from_env(config: &CompletionConfig) -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV).ok();
        if api_key.is_none() {
            warn!(
                "{API_KEY_ENV} is not set; completion requests will likely be rejected"
            );
        }
        Self::new(config, api_key)
    }

    fn send_once(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            max_tokens: request.max_tokens,
        };

        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().map_err(|err| {
            if err.is_timeout() {
                CompletionError::Timeout
            } else {
                CompletionError::Network(err.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CompletionError::RateLimited);
        }
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response.json().map_err(|err| {
            if err.is_timeout() {
                CompletionError::Timeout
            } else {
                CompletionError::Parse(err.to_string())
            }
        })?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(CompletionError::MissingContent)
    }
}

impl Completion for OpenAiCompletion {
    #[instrument(skip_all, fields(model = %self.model, max_tokens = request.max_tokens))]
    fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let reply = retry_with_policy(self.retry, |_| self.send_once(request), thread::sleep)?;
        debug!(reply_len = reply.len(), "completion received");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(retries: u32) -> RetryPolicy {
        RetryPolicy::new(retries, Duration::from_millis(100))
    }

    #[test]
    fn retries_transient_failures_until_success() {
        let mut slept = Vec::new();
        let reply = retry_with_policy(
            policy(2),
            |n| {
                if n < 2 {
                    Err(CompletionError::Timeout)
                } else {
                    Ok("3".to_string())
                }
            },
            |d| slept.push(d),
        );
        assert_eq!(reply, Ok("3".to_string()));
        assert_eq!(
            slept,
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
    }

    #[test]
    fn gives_up_after_retry_budget() {
        let mut calls = 0;
        let reply = retry_with_policy(
            policy(1),
            |_| {
                calls += 1;
                Err(CompletionError::Api {
                    status: 503,
                    message: "unavailable".to_string(),
                })
            },
            |_| {},
        );
        assert_eq!(calls, 2);
        assert!(matches!(reply, Err(CompletionError::Api { status: 503, .. })));
    }

    #[test]
    fn client_errors_are_not_retried() {
        let mut calls = 0;
        let reply = retry_with_policy(
            policy(3),
            |_| {
                calls += 1;
                Err(CompletionError::Api {
                    status: 401,
                    message: "bad key".to_string(),
                })
            },
            |_| panic!("must not sleep"),
        );
        assert_eq!(calls, 1);
        assert!(reply.is_err());
    }

    #[test]
    fn retryable_classification() {
        assert!(CompletionError::RateLimited.is_retryable());
        assert!(CompletionError::Network("reset".to_string()).is_retryable());
        assert!(!CompletionError::MissingContent.is_retryable());
        assert!(
            !CompletionError::Api {
                status: 400,
                message: String::new()
            }
            .is_retryable()
        );
    }

    #[test]
    fn endpoint_joins_base_url() {
        let config = CompletionConfig {
            base_url: "http://localhost:11434/v1/".to_string(),
            ..CompletionConfig::default()
        };
        let client = OpenAiCompletion::new(&config, Some("  ".to_string())).expect("client");
        assert_eq!(client.endpoint, "http://localhost:11434/v1/chat/completions");
        assert!(client.api_key.is_none());
    }

    #[test]
    fn chat_request_serializes_openai_shape() {
        let body = ChatRequest {
            model: "gpt-4o",
            messages: [
                ChatMessage {
                    role: "system",
                    content: "sys",
                },
                ChatMessage {
                    role: "user",
                    content: "hi",
                },
            ],
            max_tokens: 10,
        };
        let value = serde_json::to_value(&body).expect("serialize");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hi");
        assert_eq!(value["max_tokens"], 10);
    }
}
