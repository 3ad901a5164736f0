//! Request types: what to extract and what to generate from it.
//!
//! Requests are plain values built per call. Nothing here performs I/O; the
//! [`crate::extract::Extractor`] and [`crate::dispatch::Dispatcher`] consume
//! them.

use crate::error::DocmindError;
use crate::prompts::Preset;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Default completion budget for summarize / generate / analyze / translate.
pub const DEFAULT_MAX_TOKENS: usize = 500;

/// Default completion budget for free-form chat.
pub const DEFAULT_CHAT_MAX_TOKENS: usize = 800;

/// Default sampling temperature for free-form chat.
pub const DEFAULT_CHAT_TEMPERATURE: f32 = 0.3;

/// Source language used when the caller does not name one.
pub const AUTO_LANGUAGE: &str = "auto";

// ── Extraction ───────────────────────────────────────────────────────────

/// The declared kind of an input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Pdf,
    Docx,
    Image,
    Txt,
    /// A YouTube URL; the transcript is the extracted text.
    YoutubeUrl,
}

impl FileKind {
    pub const ALL: [FileKind; 5] = [
        FileKind::Pdf,
        FileKind::Docx,
        FileKind::Image,
        FileKind::Txt,
        FileKind::YoutubeUrl,
    ];

    /// Wire name, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Docx => "docx",
            FileKind::Image => "image",
            FileKind::Txt => "txt",
            FileKind::YoutubeUrl => "youtube",
        }
    }

    /// Infer the kind from a file extension (case-insensitive).
    pub fn from_path(path: impl AsRef<Path>) -> Option<FileKind> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(FileKind::Pdf),
            "docx" => Some(FileKind::Docx),
            "png" | "jpg" | "jpeg" | "gif" | "bmp" | "tif" | "tiff" | "webp" => {
                Some(FileKind::Image)
            }
            "txt" | "text" | "md" => Some(FileKind::Txt),
            _ => None,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileKind {
    type Err = DocmindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(FileKind::Pdf),
            "docx" => Ok(FileKind::Docx),
            "image" => Ok(FileKind::Image),
            "txt" | "text" => Ok(FileKind::Txt),
            "youtube" | "youtube_url" | "youtubeurl" | "video" => Ok(FileKind::YoutubeUrl),
            other => Err(DocmindError::UnsupportedKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// A single extraction job: where the content lives and how to read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    /// Local file path, or the video URL for [`FileKind::YoutubeUrl`].
    pub source: String,
    pub kind: FileKind,
}

impl ExtractionRequest {
    pub fn new(source: impl Into<String>, kind: FileKind) -> Self {
        Self {
            source: source.into(),
            kind,
        }
    }

    /// Build a request, inferring the kind from the source.
    ///
    /// HTTP(S) sources are treated as video URLs; everything else is
    /// classified by file extension.
    pub fn infer(source: impl Into<String>) -> Result<Self, DocmindError> {
        let source = source.into();
        if crate::pipeline::input::is_url(&source) {
            return Ok(Self::new(source, FileKind::YoutubeUrl));
        }
        match FileKind::from_path(&source) {
            Some(kind) => Ok(Self::new(source, kind)),
            None => {
                let ext = Path::new(&source)
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("")
                    .to_string();
                Err(DocmindError::UnsupportedKind { kind: ext })
            }
        }
    }
}

// ── Generation ───────────────────────────────────────────────────────────

/// The generation task to run over extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Summarize,
    Generate,
    Analyze,
    Translate,
    /// Rewrite text in plain, accessible language.
    Accessibility,
    Chat,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Summarize => "summarize",
            TaskKind::Generate => "generate",
            TaskKind::Analyze => "analyze",
            TaskKind::Translate => "translate",
            TaskKind::Accessibility => "accessibility",
            TaskKind::Chat => "chat",
        }
    }

    /// Phrase used in user-facing failure messages ("Error summarizing text: …").
    pub fn failure_phrase(&self) -> &'static str {
        match self {
            TaskKind::Summarize => "summarizing text",
            TaskKind::Generate => "generating answers",
            TaskKind::Analyze => "analyzing text",
            TaskKind::Translate => "translating text",
            TaskKind::Accessibility => "making text accessible",
            TaskKind::Chat => "chatting with the model",
        }
    }

    /// Whether the task accepts word-count and preset options.
    pub fn is_templated(&self) -> bool {
        matches!(
            self,
            TaskKind::Summarize | TaskKind::Generate | TaskKind::Analyze
        )
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = DocmindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summarize" | "summarise" => Ok(TaskKind::Summarize),
            "generate" => Ok(TaskKind::Generate),
            "analyze" | "analyse" => Ok(TaskKind::Analyze),
            "translate" => Ok(TaskKind::Translate),
            "accessibility" | "accessible" => Ok(TaskKind::Accessibility),
            "chat" => Ok(TaskKind::Chat),
            other => Err(DocmindError::InvalidRequest(format!(
                "unknown task '{other}'"
            ))),
        }
    }
}

/// A templated generation job over a block of text.
///
/// Build one with [`GenerationRequest::new`] or the per-task constructors and
/// refine it with the `with_*` methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub text: String,
    pub task: TaskKind,
    /// Inserted as "in approximately N words".
    pub target_words: Option<u32>,
    pub max_tokens: usize,
    pub preset: Option<Preset>,
    /// Translate only.
    pub source_language: String,
    /// Translate only; required.
    pub target_language: Option<String>,
}

impl GenerationRequest {
    pub fn new(task: TaskKind, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            task,
            target_words: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            preset: None,
            source_language: AUTO_LANGUAGE.to_string(),
            target_language: None,
        }
    }

    pub fn summarize(text: impl Into<String>) -> Self {
        Self::new(TaskKind::Summarize, text)
    }

    pub fn generate(text: impl Into<String>) -> Self {
        Self::new(TaskKind::Generate, text)
    }

    pub fn analyze(text: impl Into<String>) -> Self {
        Self::new(TaskKind::Analyze, text)
    }

    pub fn translate(text: impl Into<String>, target_language: impl Into<String>) -> Self {
        let mut req = Self::new(TaskKind::Translate, text);
        req.target_language = Some(target_language.into());
        req
    }

    pub fn accessibility(text: impl Into<String>) -> Self {
        Self::new(TaskKind::Accessibility, text)
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_target_words(mut self, words: u32) -> Self {
        self.target_words = Some(words);
        self
    }

    pub fn with_max_tokens(mut self, n: usize) -> Self {
        self.max_tokens = n;
        self
    }

    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.preset = Some(preset);
        self
    }

    pub fn with_source_language(mut self, lang: impl Into<String>) -> Self {
        self.source_language = lang.into();
        self
    }

    /// Reject option combinations the task cannot honour.
    pub fn validate(&self) -> Result<(), DocmindError> {
        if let Some(preset) = self.preset {
            if preset.task() != self.task {
                return Err(DocmindError::InvalidPreset {
                    task: self.task,
                    preset: preset.name().to_string(),
                });
            }
        }
        match self.task {
            TaskKind::Translate => {
                let target = self.target_language.as_deref().unwrap_or("").trim();
                if target.is_empty() {
                    return Err(DocmindError::InvalidRequest(
                        "translation requires a target language".into(),
                    ));
                }
            }
            TaskKind::Chat => {
                return Err(DocmindError::InvalidRequest(
                    "chat takes a ChatRequest, not a GenerationRequest".into(),
                ));
            }
            _ => {}
        }
        if self.max_tokens == 0 {
            return Err(DocmindError::InvalidRequest(
                "max_tokens must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// ── Chat ─────────────────────────────────────────────────────────────────

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl FromStr for Role {
    type Err = DocmindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(DocmindError::InvalidRequest(format!(
                "unknown chat role '{other}'"
            ))),
        }
    }
}

/// One role/content pair in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A free-form conversation with an optional steering system prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    /// Prepended as the first message when present and non-empty.
    pub system_prompt: Option<String>,
    pub max_tokens: usize,
    pub temperature: f32,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            system_prompt: None,
            max_tokens: DEFAULT_CHAT_MAX_TOKENS,
            temperature: DEFAULT_CHAT_TEMPERATURE,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_max_tokens(mut self, n: usize) -> Self {
        self.max_tokens = n;
        self
    }

    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = t.clamp(0.0, 2.0);
        self
    }

    /// The message sequence actually sent: system prompt first, then the
    /// caller's messages in order.
    pub fn dispatched_messages(&self) -> Vec<Message> {
        let mut out = Vec::with_capacity(self.messages.len() + 1);
        if let Some(prompt) = self.system_prompt.as_deref() {
            if !prompt.is_empty() {
                out.push(Message::system(prompt));
            }
        }
        out.extend(self.messages.iter().cloned());
        out
    }
}
