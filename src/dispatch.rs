//! Generation dispatch: prompt assembly plus the remote call.
//!
//! Templated tasks (summarize, generate, analyze) send exactly two messages:
//! the task's fixed persona as the system turn, then
//! `"<instruction>\n\n<text>"` as the user turn. Translation and the
//! accessibility rewrite use the same shape with their own prompts. Chat forwards the caller's conversation with
//! an optional system prompt in front.

use crate::config::DocmindConfig;
use crate::error::DocmindError;
use crate::output::GenerationResult;
use crate::pipeline::llm::{complete_with_retry, ChatClient, CompletionRequest, ProviderClient, RetryPolicy};
use crate::prompts::{self, Preset};
use crate::request::{ChatRequest, GenerationRequest, Message, TaskKind, AUTO_LANGUAGE};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Sends generation requests to a chat-completion service.
#[derive(Clone)]
pub struct Dispatcher {
    client: Arc<dyn ChatClient>,
    retry: RetryPolicy,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn ChatClient>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Resolve the provider and retry policy from the configuration.
    pub fn from_config(config: &DocmindConfig) -> Result<Self, DocmindError> {
        Ok(Self::new(
            Arc::new(ProviderClient::from_config(config)?),
            RetryPolicy::from_config(config),
        ))
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// The system/user pair a request is sent as. Validates the request first.
    pub fn build_messages(request: &GenerationRequest) -> Result<Vec<Message>, DocmindError> {
        request.validate()?;
        let user = match request.task {
            TaskKind::Translate => {
                let source = request.source_language.trim();
                let source = if source.is_empty() { AUTO_LANGUAGE } else { source };
                // validate() guarantees a target language
                let target = request.target_language.as_deref().unwrap_or_default();
                prompts::translate_prompt(&request.text, source, target.trim())
            }
            TaskKind::Accessibility => prompts::accessibility_prompt(&request.text),
            task => prompts::user_prompt(task, &request.text, request.target_words, request.preset),
        };
        let mut messages = Vec::with_capacity(2);
        if let Some(persona) = prompts::persona(request.task) {
            messages.push(Message::system(persona));
        }
        messages.push(Message::user(user));
        Ok(messages)
    }

    /// Run any non-chat task.
    pub async fn run(&self, request: &GenerationRequest) -> Result<GenerationResult, DocmindError> {
        let messages = Self::build_messages(request)?;
        info!(
            "Dispatching {} ({} chars, preset={}, words={:?})",
            request.task,
            request.text.len(),
            request.preset.map(|p| p.name()).unwrap_or("none"),
            request.target_words
        );
        self.send(CompletionRequest {
            task: request.task,
            messages,
            max_tokens: request.max_tokens,
            temperature: None,
        })
        .await
    }

    pub async fn summarize(
        &self,
        text: &str,
        target_words: Option<u32>,
        preset: Option<Preset>,
    ) -> Result<GenerationResult, DocmindError> {
        self.run(&templated(GenerationRequest::summarize(text), target_words, preset))
            .await
    }

    pub async fn generate_answers(
        &self,
        text: &str,
        target_words: Option<u32>,
        preset: Option<Preset>,
    ) -> Result<GenerationResult, DocmindError> {
        self.run(&templated(GenerationRequest::generate(text), target_words, preset))
            .await
    }

    pub async fn analyze(
        &self,
        text: &str,
        target_words: Option<u32>,
        preset: Option<Preset>,
    ) -> Result<GenerationResult, DocmindError> {
        self.run(&templated(GenerationRequest::analyze(text), target_words, preset))
            .await
    }

    /// Translate `text`; `source_language` of `None` means auto-detect.
    pub async fn translate(
        &self,
        text: &str,
        source_language: Option<&str>,
        target_language: &str,
    ) -> Result<GenerationResult, DocmindError> {
        let mut request = GenerationRequest::translate(text, target_language);
        if let Some(source) = source_language {
            request = request.with_source_language(source);
        }
        self.run(&request).await
    }

    /// Rewrite `text` in plain, accessible language.
    pub async fn accessibility(&self, text: &str) -> Result<GenerationResult, DocmindError> {
        self.run(&GenerationRequest::accessibility(text)).await
    }

    /// Free-form conversation. The system prompt, if any, is sent first.
    pub async fn chat(&self, request: &ChatRequest) -> Result<GenerationResult, DocmindError> {
        let messages = request.dispatched_messages();
        if messages.is_empty() {
            return Err(DocmindError::InvalidRequest(
                "chat needs at least one message".into(),
            ));
        }
        if request.max_tokens == 0 {
            return Err(DocmindError::InvalidRequest(
                "max_tokens must be at least 1".into(),
            ));
        }
        info!("Dispatching chat ({} messages)", messages.len());
        self.send(CompletionRequest {
            task: TaskKind::Chat,
            messages,
            max_tokens: request.max_tokens,
            temperature: Some(request.temperature),
        })
        .await
    }

    async fn send(&self, request: CompletionRequest) -> Result<GenerationResult, DocmindError> {
        let start = Instant::now();
        let (completion, attempts) =
            complete_with_retry(self.client.as_ref(), &request, &self.retry).await?;
        let result = GenerationResult {
            text: completion.content,
            task: request.task,
            model: self.client.model().to_string(),
            input_tokens: completion.input_tokens,
            output_tokens: completion.output_tokens,
            attempts,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            "{} done: {} tokens in / {} out, {} attempt(s), {}ms",
            result.task, result.input_tokens, result.output_tokens, attempts, result.duration_ms
        );
        Ok(result)
    }
}

fn templated(
    mut request: GenerationRequest,
    target_words: Option<u32>,
    preset: Option<Preset>,
) -> GenerationRequest {
    request.target_words = target_words;
    request.preset = preset;
    request
}

fn runtime() -> Result<tokio::runtime::Runtime, DocmindError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DocmindError::Internal(format!("Failed to create tokio runtime: {}", e)))
}

/// Synchronous wrapper around [`Dispatcher::run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_sync(
    request: &GenerationRequest,
    config: &DocmindConfig,
) -> Result<GenerationResult, DocmindError> {
    let dispatcher = Dispatcher::from_config(config)?;
    runtime()?.block_on(dispatcher.run(request))
}

/// Synchronous wrapper around [`Dispatcher::chat`].
pub fn chat_sync(
    request: &ChatRequest,
    config: &DocmindConfig,
) -> Result<GenerationResult, DocmindError> {
    let dispatcher = Dispatcher::from_config(config)?;
    runtime()?.block_on(dispatcher.chat(request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Role;

    #[test]
    fn templated_tasks_send_persona_then_prompt() {
        let req = GenerationRequest::summarize("Rust is a language.").with_target_words(150);
        let msgs = Dispatcher::build_messages(&req).unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, Role::System);
        assert_eq!(msgs[0].content, prompts::SUMMARIZE_PERSONA);
        assert_eq!(msgs[1].role, Role::User);
        assert!(msgs[1].content.contains("approximately 150 words"));
        assert!(msgs[1].content.ends_with("\n\nRust is a language."));
    }

    #[test]
    fn translate_defaults_source_to_auto() {
        let req = GenerationRequest::translate("Bonjour", "en").with_source_language("");
        let msgs = Dispatcher::build_messages(&req).unwrap();
        assert_eq!(msgs[0].content, prompts::TRANSLATE_PERSONA);
        assert!(msgs[1].content.starts_with("Please translate the following text from auto to en:"));
    }

    #[test]
    fn cross_task_preset_never_reaches_the_wire() {
        let req = GenerationRequest::analyze("x").with_preset(Preset::BulletPoints);
        assert!(matches!(
            Dispatcher::build_messages(&req),
            Err(DocmindError::InvalidPreset { .. })
        ));
    }
}
