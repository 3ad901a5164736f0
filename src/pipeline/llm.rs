//! Chat-completion calls: the client seam, provider resolution and the
//! timeout/retry loop.
//!
//! Prompt wording lives in [`crate::prompts`]; this module only moves
//! messages to the provider and classifies what comes back.
//!
//! ## Retry Strategy
//!
//! Each attempt runs under its own deadline (`api_timeout_secs`). Rate-limit,
//! network and timeout failures are retried with exponential backoff
//! (`retry_backoff_ms * 2^(attempt-1)`): with the 500 ms default and three
//! attempts the waits are 500 ms then 1 s. Authentication, invalid-request
//! and malformed-response failures are returned after the first attempt.

use crate::config::DocmindConfig;
use crate::error::{DocmindError, RemoteErrorKind};
use crate::request::{Message, Role, TaskKind};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// One call's worth of input for a [`ChatClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub task: TaskKind,
    pub messages: Vec<Message>,
    pub max_tokens: usize,
    /// Unset for the templated tasks.
    pub temperature: Option<f32>,
}

/// Text of the first candidate plus token accounting.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Completion {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// A single failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFailure {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteFailure {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify a provider error by its message.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: RemoteErrorKind::classify(&message),
            message,
        }
    }
}

/// A remote chat-completion endpoint.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Model identifier reported in results.
    fn model(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, RemoteFailure>;
}

/// [`ChatClient`] backed by an `edgequake_llm` provider.
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
    model: String,
}

impl ProviderClient {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Resolve a provider from the configuration.
    pub fn from_config(config: &DocmindConfig) -> Result<Self, DocmindError> {
        Ok(Self::new(resolve_provider(config)?, config.model.clone()))
    }
}

fn to_chat_message(message: &Message) -> ChatMessage {
    match message.role {
        Role::System => ChatMessage::system(&message.content),
        Role::User => ChatMessage::user(&message.content),
        Role::Assistant => ChatMessage::assistant(&message.content),
    }
}

fn build_options(request: &CompletionRequest) -> CompletionOptions {
    CompletionOptions {
        temperature: request.temperature,
        max_tokens: Some(request.max_tokens),
        ..Default::default()
    }
}

#[async_trait]
impl ChatClient for ProviderClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, RemoteFailure> {
        let messages: Vec<ChatMessage> = request.messages.iter().map(to_chat_message).collect();
        let options = build_options(request);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| RemoteFailure::from_message(e.to_string()))?;

        Ok(Completion {
            content: response.content,
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }
}

// ── Retry ────────────────────────────────────────────────────────────────

/// Timeout and retry settings for remote calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; at least 1.
    pub max_attempts: u32,
    /// Deadline for each attempt.
    pub timeout: Duration,
    /// Delay before the second attempt; doubles after each retry.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout: Duration::from_secs(60),
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &DocmindConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            timeout: config.api_timeout(),
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// Delay before attempt number `attempt` (1-based; the first attempt has none).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        self.backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(2)))
    }
}

/// Run a completion under the retry policy.
///
/// Returns the completion and the number of attempts it took. An empty
/// reply counts as a malformed response.
pub async fn complete_with_retry(
    client: &dyn ChatClient,
    request: &CompletionRequest,
    policy: &RetryPolicy,
) -> Result<(Completion, u32), DocmindError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let delay = policy.delay_before(attempt);
        if !delay.is_zero() {
            warn!(
                "{}: retry {}/{} after {}ms",
                request.task,
                attempt - 1,
                max_attempts - 1,
                delay.as_millis()
            );
            sleep(delay).await;
        }

        let failure = match timeout(policy.timeout, client.complete(request)).await {
            Ok(Ok(completion)) if completion.content.trim().is_empty() => {
                RemoteFailure::new(RemoteErrorKind::Malformed, "model returned an empty response")
            }
            Ok(Ok(completion)) => {
                debug!(
                    "{}: {} input tokens, {} output tokens, attempt {}",
                    request.task, completion.input_tokens, completion.output_tokens, attempt
                );
                return Ok((completion, attempt));
            }
            Ok(Err(failure)) => failure,
            Err(_) => RemoteFailure::new(
                RemoteErrorKind::Timeout,
                format!("no response within {}s", policy.timeout.as_secs_f32()),
            ),
        };

        warn!(
            "{}: attempt {} failed ({}): {}",
            request.task, attempt, failure.kind, failure.message
        );

        if !failure.kind.is_transient() || attempt >= max_attempts {
            return Err(DocmindError::Remote {
                task: request.task,
                kind: failure.kind,
                attempts: attempt,
                message: failure.message,
            });
        }
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

fn create_named_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, DocmindError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        DocmindError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`, `DOCMIND_PROVIDER`).
///    The factory reads that provider's own API key variable.
/// 3. **OpenAI key** (`config.api_key`, which `OPENAI_API_KEY` overrides when
///    the config was built with `apply_env`).
/// 4. **Auto-detection** (`ProviderFactory::from_env`): the first provider
///    whose API key is present.
pub fn resolve_provider(config: &DocmindConfig) -> Result<Arc<dyn LLMProvider>, DocmindError> {
    // 1) User-provided provider takes priority
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    // 2) Provider name + model
    if let Some(ref name) = config.provider_name {
        info!("Using provider '{}' with model '{}'", name, config.model);
        return create_named_provider(name, &config.model);
    }

    // 3) OpenAI with an explicit key
    if let Some(ref key) = config.api_key {
        if !key.trim().is_empty() {
            info!("Using OpenAI with model '{}'", config.model);
            let provider = edgequake_llm::OpenAIProvider::new(key.as_str())
                .with_model(config.model.as_str());
            return Ok(Arc::new(provider));
        }
    }

    // 4) Auto-detect
    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| DocmindError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, or DOCMIND_PROVIDER with that provider's API key.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_leaves_temperature_unset_for_tasks() {
        let req = CompletionRequest {
            task: TaskKind::Summarize,
            messages: vec![],
            max_tokens: 500,
            temperature: None,
        };
        let opts = build_options(&req);
        assert_eq!(opts.temperature, None);
        assert_eq!(opts.max_tokens, Some(500));
    }

    #[test]
    fn backoff_doubles() {
        let p = RetryPolicy {
            max_attempts: 4,
            timeout: Duration::from_secs(1),
            backoff: Duration::from_millis(500),
        };
        assert_eq!(p.delay_before(1), Duration::ZERO);
        assert_eq!(p.delay_before(2), Duration::from_millis(500));
        assert_eq!(p.delay_before(3), Duration::from_millis(1000));
        assert_eq!(p.delay_before(4), Duration::from_millis(2000));
    }

    #[test]
    fn policy_from_config() {
        let config = DocmindConfig::builder()
            .api_timeout_secs(10)
            .max_attempts(2)
            .retry_backoff_ms(100)
            .build()
            .unwrap();
        let p = RetryPolicy::from_config(&config);
        assert_eq!(p.max_attempts, 2);
        assert_eq!(p.timeout, Duration::from_secs(10));
        assert_eq!(p.backoff, Duration::from_millis(100));
    }

    #[test]
    fn failure_from_message_classifies() {
        let f = RemoteFailure::from_message("429 Too Many Requests");
        assert_eq!(f.kind, RemoteErrorKind::RateLimited);
    }
}
