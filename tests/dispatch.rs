//! Integration tests for the generation side: prompt shape, presets, chat
//! ordering, and the timeout/retry policy, against a scripted `ChatClient`.

use async_trait::async_trait;
use docmind::prompts::{self, Preset};
use docmind::{
    ChatClient, ChatRequest, Completion, CompletionRequest, Dispatcher, DocmindError, ErrorKind,
    ExtractionRequest, Extractor, DocmindConfig, FileKind, GenerationRequest, Message, Pipeline,
    RemoteErrorKind, RemoteFailure, RetryPolicy, Role, TaskKind,
};
use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

// ── Test helpers ─────────────────────────────────────────────────────────────

enum Step {
    Reply(&'static str),
    Fail(RemoteErrorKind, &'static str),
    /// A provider error classified from its message alone.
    Raw(&'static str),
    Hang,
}

/// Replays a script of outcomes and records every request it receives.
struct ScriptedChat {
    script: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedChat {
    fn new(script: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn replying(text: &'static str) -> Arc<Self> {
        Self::new(vec![Step::Reply(text)])
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last(&self) -> CompletionRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl ChatClient for ScriptedChat {
    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, RemoteFailure> {
        self.requests.lock().unwrap().push(request.clone());
        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Step::Reply(text)) => Ok(Completion {
                content: text.to_string(),
                input_tokens: 12,
                output_tokens: 3,
            }),
            Some(Step::Fail(kind, msg)) => Err(RemoteFailure::new(kind, msg)),
            Some(Step::Raw(msg)) => Err(RemoteFailure::from_message(msg)),
            Some(Step::Hang) => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Completion::default())
            }
            None => Err(RemoteFailure::new(RemoteErrorKind::Malformed, "script exhausted")),
        }
    }
}

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        timeout: Duration::from_millis(200),
        backoff: Duration::from_millis(5),
    }
}

fn dispatcher(client: Arc<ScriptedChat>) -> Dispatcher {
    Dispatcher::new(client, fast_policy(3))
}

// ── Templated tasks ──────────────────────────────────────────────────────────

#[tokio::test]
async fn summarize_sends_persona_and_instruction() {
    let chat = ScriptedChat::replying("A short summary.");
    let result = assert_ok!(
        dispatcher(chat.clone())
            .summarize("Long text about borrowing.", Some(150), None)
            .await
    );
    assert_eq!(result.text, "A short summary.");
    assert_eq!(result.task, TaskKind::Summarize);
    assert_eq!(result.model, "scripted-model");
    assert_eq!(result.attempts, 1);
    assert_eq!((result.input_tokens, result.output_tokens), (12, 3));

    let req = chat.last();
    assert_eq!(req.max_tokens, 500);
    assert_eq!(req.temperature, None);
    assert_eq!(req.messages.len(), 2);
    assert_eq!(req.messages[0], Message::system(prompts::SUMMARIZE_PERSONA));
    assert_eq!(
        req.messages[1].content,
        "Summarize the following text in approximately 150 words. Avoid omitting key points.\n\n\
Long text about borrowing."
    );
}

#[tokio::test]
async fn no_word_count_means_no_word_fragment() {
    let chat = ScriptedChat::replying("answers");
    assert_ok!(dispatcher(chat.clone()).generate_answers("Q1?", None, None).await);
    let user = &chat.last().messages[1].content;
    assert!(!user.contains("approximately"), "got: {user}");
    assert!(user.starts_with("Generate clear, step-by-step answers to the following"));
    assert!(user.starts_with(
        "Generate clear, step-by-step answers to the following questions or content:\n\nQ1?"
    ));
}

#[tokio::test]
async fn every_preset_fragment_reaches_the_model() {
    for preset in Preset::ALL {
        let chat = ScriptedChat::replying("ok");
        let request = GenerationRequest::new(preset.task(), "content").with_preset(preset);
        assert_ok!(dispatcher(chat.clone()).run(&request).await);
        let user = &chat.last().messages[1].content;
        assert!(
            user.contains(preset.instruction()),
            "{preset}: fragment missing from {user:?}"
        );
    }
}

#[tokio::test]
async fn preset_from_another_task_is_rejected_without_a_call() {
    let chat = ScriptedChat::replying("never");
    let err = assert_err!(
        dispatcher(chat.clone())
            .analyze("text", None, Some(Preset::StudyPlan))
            .await
    );
    assert!(matches!(
        err,
        DocmindError::InvalidPreset { task: TaskKind::Analyze, ref preset } if preset == "study_plan"
    ));
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert_eq!(chat.calls(), 0);
}

#[tokio::test]
async fn translate_prompt_and_default_source() {
    let chat = ScriptedChat::replying("Hello");
    let result = assert_ok!(dispatcher(chat.clone()).translate("Hola", None, "en").await);
    assert_eq!(result.text, "Hello");
    let req = chat.last();
    assert_eq!(req.messages[0], Message::system(prompts::TRANSLATE_PERSONA));
    assert_eq!(
        req.messages[1].content,
        "Please translate the following text from auto to en:\n\nHola"
    );

    assert_ok!(dispatcher(chat.clone()).translate("Hola", Some("es"), "fr").await);
    assert!(chat.last().messages[1].content.contains("from es to fr"));
}

#[tokio::test]
async fn accessibility_sends_persona_and_rewrite_instruction() {
    let chat = ScriptedChat::replying("Plants use light to make food.");
    let result = assert_ok!(
        dispatcher(chat.clone())
            .accessibility("Photosynthesis converts light energy into chemical energy.")
            .await
    );
    assert_eq!(result.task, TaskKind::Accessibility);
    assert_eq!(result.text, "Plants use light to make food.");

    let req = chat.last();
    assert_eq!(req.temperature, None);
    assert_eq!(req.max_tokens, 500);
    assert_eq!(req.messages.len(), 2);
    assert_eq!(req.messages[0], Message::system(prompts::ACCESSIBILITY_PERSONA));
    let user = &req.messages[1].content;
    assert!(user.starts_with("Rewrite the following text in plain, accessible language."));
    assert!(user.ends_with(":\n\nPhotosynthesis converts light energy into chemical energy."));
}

#[tokio::test]
async fn accessibility_rejects_presets_and_names_itself_on_failure() {
    let chat = ScriptedChat::new(vec![Step::Fail(RemoteErrorKind::Auth, "401 bad key")]);
    let request = GenerationRequest::accessibility("text").with_preset(Preset::BulletPoints);
    assert_err!(dispatcher(chat.clone()).run(&request).await);
    assert_eq!(chat.calls(), 0);

    let err = assert_err!(dispatcher(chat.clone()).accessibility("text").await);
    assert_eq!(err.user_message(), "Error making text accessible: 401 bad key");
}

// ── Chat ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn chat_puts_system_prompt_first() {
    let chat = ScriptedChat::replying("Hi!");
    let request = ChatRequest::new(vec![
        Message::user("hello"),
        Message::assistant("hi, how can I help?"),
        Message::user("tell me a joke"),
    ])
    .with_system_prompt("Be terse.");

    let result = assert_ok!(dispatcher(chat.clone()).chat(&request).await);
    assert_eq!(result.task, TaskKind::Chat);

    let req = chat.last();
    assert_eq!(req.messages.len(), 4);
    assert_eq!(req.messages[0], Message::system("Be terse."));
    assert_eq!(req.messages[1], Message::user("hello"));
    assert_eq!(req.messages[3].content, "tell me a joke");
    assert_eq!(req.temperature, Some(0.3));
    assert_eq!(req.max_tokens, 800);
}

#[tokio::test]
async fn chat_without_system_prompt_starts_with_caller_message() {
    let chat = ScriptedChat::replying("Sure.");
    let request = ChatRequest::new(vec![Message::user("first"), Message::user("second")]);
    assert_ok!(dispatcher(chat.clone()).chat(&request).await);
    let req = chat.last();
    assert_eq!(req.messages.len(), 2);
    assert_eq!(req.messages[0].role, Role::User);
    assert_eq!(req.messages[0].content, "first");
}

#[tokio::test]
async fn empty_chat_is_invalid() {
    let chat = ScriptedChat::replying("never");
    let err = assert_err!(dispatcher(chat.clone()).chat(&ChatRequest::new(vec![])).await);
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert_eq!(chat.calls(), 0);
}

// ── Failures and retry ───────────────────────────────────────────────────────

#[tokio::test]
async fn network_failure_is_an_error_not_content() {
    let chat = ScriptedChat::new(vec![
        Step::Fail(RemoteErrorKind::Network, "connection reset by peer"),
        Step::Fail(RemoteErrorKind::Network, "connection reset by peer"),
        Step::Fail(RemoteErrorKind::Network, "connection reset by peer"),
    ]);
    let err = assert_err!(dispatcher(chat.clone()).summarize("text", None, None).await);
    match err {
        DocmindError::Remote {
            task,
            kind,
            attempts,
            ref message,
        } => {
            assert_eq!(task, TaskKind::Summarize);
            assert_eq!(kind, RemoteErrorKind::Network);
            assert_eq!(attempts, 3);
            assert_eq!(message, "connection reset by peer");
        }
        other => panic!("expected Remote, got {other:?}"),
    }
    assert_eq!(
        err.user_message(),
        "Error summarizing text: connection reset by peer"
    );
    assert_eq!(chat.calls(), 3);
}

#[tokio::test]
async fn transient_failure_then_success_is_retried() {
    let chat = ScriptedChat::new(vec![
        Step::Fail(RemoteErrorKind::RateLimited, "429 Too Many Requests"),
        Step::Fail(RemoteErrorKind::Network, "502 Bad Gateway"),
        Step::Reply("finally"),
    ]);
    let result = assert_ok!(dispatcher(chat.clone()).analyze("text", None, None).await);
    assert_eq!(result.text, "finally");
    assert_eq!(result.attempts, 3);
    assert_eq!(chat.calls(), 3);
}

#[tokio::test]
async fn auth_failure_is_attempted_once() {
    let chat = ScriptedChat::new(vec![
        Step::Fail(RemoteErrorKind::Auth, "401 Incorrect API key provided"),
        Step::Reply("should not be reached"),
    ]);
    let err = assert_err!(dispatcher(chat.clone()).summarize("text", None, None).await);
    assert!(matches!(
        err,
        DocmindError::Remote { kind: RemoteErrorKind::Auth, attempts: 1, .. }
    ));
    assert!(!err.is_retryable());
    assert_eq!(chat.calls(), 1);
}

#[tokio::test]
async fn unrecognised_provider_error_is_attempted_once() {
    let chat = ScriptedChat::new(vec![
        Step::Raw("The model `gpt-5-turbo` does not exist or you do not have access to it"),
        Step::Reply("should not be reached"),
    ]);
    let err = assert_err!(dispatcher(chat.clone()).summarize("text", None, None).await);
    assert!(matches!(
        err,
        DocmindError::Remote { kind: RemoteErrorKind::InvalidRequest, attempts: 1, .. }
    ));
    assert_eq!(chat.calls(), 1);

    let chat = ScriptedChat::new(vec![Step::Raw("something odd happened"), Step::Reply("unused")]);
    let err = assert_err!(dispatcher(chat.clone()).analyze("text", None, None).await);
    assert!(matches!(
        err,
        DocmindError::Remote { kind: RemoteErrorKind::Other, attempts: 1, .. }
    ));
    assert_eq!(chat.calls(), 1);
}

#[tokio::test]
async fn transport_error_text_is_retried() {
    let chat = ScriptedChat::new(vec![
        Step::Raw("error sending request: connection refused"),
        Step::Raw("503 Service Unavailable"),
        Step::Reply("recovered"),
    ]);
    let result = assert_ok!(dispatcher(chat.clone()).summarize("text", None, None).await);
    assert_eq!(result.text, "recovered");
    assert_eq!(result.attempts, 3);
}

#[tokio::test]
async fn hung_call_times_out() {
    let chat = ScriptedChat::new(vec![Step::Hang]);
    let dispatcher = Dispatcher::new(chat.clone(), fast_policy(1));
    let err = assert_err!(dispatcher.summarize("text", None, None).await);
    assert!(matches!(
        err,
        DocmindError::Remote { kind: RemoteErrorKind::Timeout, attempts: 1, .. }
    ));
}

#[tokio::test]
async fn timeout_is_retried_like_other_transient_failures() {
    let chat = ScriptedChat::new(vec![Step::Hang, Step::Reply("second time lucky")]);
    let result = assert_ok!(dispatcher(chat.clone()).summarize("text", None, None).await);
    assert_eq!(result.attempts, 2);
}

#[tokio::test]
async fn empty_reply_is_malformed_and_not_retried() {
    let chat = ScriptedChat::new(vec![Step::Reply("   "), Step::Reply("unused")]);
    let err = assert_err!(dispatcher(chat.clone()).summarize("text", None, None).await);
    assert!(matches!(
        err,
        DocmindError::Remote { kind: RemoteErrorKind::Malformed, .. }
    ));
    assert_eq!(chat.calls(), 1);
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pipeline_extracts_then_generates() {
    let mut f = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    f.write_all(b"Ownership moves values between bindings.").unwrap();

    let chat = ScriptedChat::replying("- Ownership moves values");
    let extractor = Extractor::new(&DocmindConfig::default()).unwrap();
    let pipeline = Pipeline::new(extractor, dispatcher(chat.clone()));

    let source = ExtractionRequest::new(f.path().to_string_lossy(), FileKind::Txt);
    let task = GenerationRequest::summarize("").with_preset(Preset::BulletPoints);
    let out = assert_ok!(pipeline.process(&source, &task).await);

    assert_eq!(out.extracted.text, "Ownership moves values between bindings.");
    assert_eq!(out.generated.text, "- Ownership moves values");
    assert!(chat.last().messages[1]
        .content
        .ends_with("\n\nOwnership moves values between bindings."));
}

#[tokio::test]
async fn pipeline_rejects_bad_task_before_extracting() {
    let chat = ScriptedChat::replying("never");
    let extractor = Extractor::new(&DocmindConfig::default()).unwrap();
    let pipeline = Pipeline::new(extractor, dispatcher(chat.clone()));

    // The source does not exist: a task error proves validation ran first.
    let source = ExtractionRequest::new("/missing.txt", FileKind::Txt);
    let task = GenerationRequest::summarize("").with_preset(Preset::ExamAnswers);
    let err = assert_err!(pipeline.process(&source, &task).await);
    assert!(matches!(err, DocmindError::InvalidPreset { .. }));
}
