//! # docmind
//!
//! Extract text from PDFs, Word documents, images and YouTube videos, then
//! summarise, answer, analyse, translate or rewrite it for accessibility with
//! a chat-completion model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! source (path / URL)
//!  │
//!  ├─ 1. Input     validate path, kind and magic bytes
//!  ├─ 2. Extract   pdfium │ docx-rs │ preprocess + tesseract │ UTF-8 │ captions
//!  ├─ 3. Prompt    persona + instruction (+ word count, + preset) + text
//!  └─ 4. Generate  chat completion with timeout and transient-failure retry
//! ```
//!
//! Every operation returns `Result<_, DocmindError>`. Use
//! [`DocmindError::user_message`] for the one-line status shown to end users
//! and [`DocmindError::kind`] to branch programmatically.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docmind::{DocmindConfig, ExtractionRequest, GenerationRequest, Pipeline, Preset};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // OPENAI_API_KEY, TESSERACT_CMD, DOCMIND_MODEL, … are read once here.
//!     let config = DocmindConfig::from_env()?;
//!     let pipeline = Pipeline::from_config(&config).await?;
//!
//!     let source = ExtractionRequest::infer("lecture.pdf")?;
//!     let task = GenerationRequest::summarize("")
//!         .with_target_words(150)
//!         .with_preset(Preset::StudyNotes);
//!
//!     let out = pipeline.process(&source, &task).await?;
//!     println!("{}", out.generated.text);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docmind` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! docmind = { version = "0.1", default-features = false }
//! ```
//!
//! ## External Requirements
//!
//! | Input | Needs |
//! |-------|-------|
//! | PDF   | libpdfium (system, or `PDFIUM_LIB_PATH`) |
//! | Image | `tesseract` on `PATH` (or `TESSERACT_CMD`) |
//! | Video | network access to youtube.com |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod prompts;
pub mod request;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{DocmindConfig, DocmindConfigBuilder};
pub use dispatch::{chat_sync, run_sync, Dispatcher};
pub use error::{DocmindError, ErrorKind, ErrorReport, RemoteErrorKind};
pub use extract::{extract_sync, Extractor};
pub use output::{ExtractedText, GenerationResult, ProcessOutput};
pub use pipeline::llm::{ChatClient, Completion, CompletionRequest, RemoteFailure, RetryPolicy};
pub use pipeline::ocr::{preprocess, OcrEngine, TesseractCli};
pub use pipeline::transcript::{extract_video_id, fetch_transcript, TranscriptSegment, TranscriptSource};
pub use process::{process_sync, Pipeline};
pub use prompts::{Preset, SUPPORTED_LANGUAGES};
pub use request::{ChatRequest, ExtractionRequest, FileKind, GenerationRequest, Message, Role, TaskKind};
