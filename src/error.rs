//! Error types for the docmind library.
//!
//! Every public operation returns `Result<_, DocmindError>`; a failure is
//! never smuggled through as text that looks like extracted or generated
//! content. Presentation layers pick how to show a failure:
//!
//! * [`DocmindError::kind`]: coarse, stable category for branching
//!   (retry? show a form error? report a bug?).
//! * [`DocmindError::user_message`]: the short status line shown to an end
//!   user ("Error summarizing text: …").
//! * [`DocmindError::report`]: a serialisable `{kind, message}` pair for JSON
//!   APIs and the CLI's `--json` mode.

use crate::request::TaskKind;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

static HTTP_STATUS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(4[0-2]\d|5\d\d)\b").unwrap());

/// Coarse failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The declared input kind is not one we can read.
    UnsupportedKind,
    /// The source could not be read or decoded.
    Extraction,
    /// The OCR binary could not be found or started.
    OcrEngineMissing,
    /// The remote generation service failed.
    Remote,
    /// Nothing to work with: no video ID, no captions.
    NotFound,
    /// The caller asked for an impossible combination of options.
    InvalidRequest,
    /// Provider or configuration problem detected before any work started.
    Configuration,
}

/// Why a remote chat call failed. Drives the retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    /// 401/403, bad or missing API key.
    Auth,
    /// 429 or quota exhaustion.
    RateLimited,
    /// Connection refused/reset, DNS, 5xx.
    Network,
    /// The per-attempt deadline elapsed.
    Timeout,
    /// The service answered but the reply was unusable (empty, unparsable).
    Malformed,
    /// The service rejected the request (4xx, unknown model, context length,
    /// content filter).
    InvalidRequest,
    /// Anything we could not recognise. Not retried.
    Other,
}

impl RemoteErrorKind {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RemoteErrorKind::RateLimited | RemoteErrorKind::Network | RemoteErrorKind::Timeout
        )
    }

    /// Best-effort classification of a provider error message.
    ///
    /// Providers surface HTTP status and transport failures only as text, so
    /// we look for a status code first and then for well-known phrases. A
    /// message matching nothing is [`RemoteErrorKind::Other`].
    pub fn classify(message: &str) -> RemoteErrorKind {
        let m = message.to_ascii_lowercase();

        if let Some(status) = HTTP_STATUS_RE
            .captures(&m)
            .and_then(|c| c[1].parse::<u16>().ok())
        {
            return match status {
                401 | 403 => RemoteErrorKind::Auth,
                408 => RemoteErrorKind::Timeout,
                429 => RemoteErrorKind::RateLimited,
                500..=599 => RemoteErrorKind::Network,
                _ => RemoteErrorKind::InvalidRequest,
            };
        }

        let has = |needles: &[&str]| needles.iter().any(|n| m.contains(n));
        if has(&["unauthorized", "forbidden", "api key", "api_key", "authentication", "permission denied"]) {
            RemoteErrorKind::Auth
        } else if has(&["rate limit", "rate_limit", "ratelimit", "quota", "too many requests"]) {
            RemoteErrorKind::RateLimited
        } else if has(&["timed out", "timeout", "deadline"]) {
            RemoteErrorKind::Timeout
        } else if has(&[
            "error sending request",
            "connection",
            "dns",
            "reset by peer",
            "broken pipe",
            "server error",
            "bad gateway",
            "service unavailable",
            "overloaded",
        ]) {
            RemoteErrorKind::Network
        } else if has(&[
            "invalid request",
            "invalid_request",
            "invalid value",
            "does not exist",
            "not found",
            "context length",
            "content_filter",
            "content filter",
        ]) {
            RemoteErrorKind::InvalidRequest
        } else if has(&["parse", "deserializ", "unexpected response", "malformed", "missing field", "empty response"]) {
            RemoteErrorKind::Malformed
        } else {
            RemoteErrorKind::Other
        }
    }
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RemoteErrorKind::Auth => "authentication",
            RemoteErrorKind::RateLimited => "rate limit",
            RemoteErrorKind::Network => "network",
            RemoteErrorKind::Timeout => "timeout",
            RemoteErrorKind::Malformed => "malformed response",
            RemoteErrorKind::InvalidRequest => "invalid request",
            RemoteErrorKind::Other => "provider error",
        };
        f.write_str(s)
    }
}

/// All errors returned by the docmind library.
#[derive(Debug, Error)]
pub enum DocmindError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The declared or inferred file kind is not supported.
    #[error("Unsupported file type: '{kind}'")]
    UnsupportedKind { kind: String },

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// The file's leading bytes do not match its declared kind.
    #[error("File '{path}' is not a valid {expected} (first bytes: {magic:?})")]
    WrongFormat {
        path: PathBuf,
        expected: &'static str,
        magic: [u8; 4],
    },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The document parser rejected the file.
    #[error("{format} '{path}' could not be parsed: {detail}")]
    CorruptDocument {
        path: PathBuf,
        format: &'static str,
        detail: String,
    },

    /// The PDF is password protected.
    #[error("PDF '{path}' is encrypted and cannot be read without a password")]
    EncryptedDocument { path: PathBuf },

    /// A text file was not valid UTF-8, or an image could not be decoded.
    #[error("Could not decode '{path}': {detail}")]
    Decode { path: PathBuf, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Install pdfium or set PDFIUM_LIB_PATH to the directory containing libpdfium."
    )]
    PdfiumBindingFailed(String),

    /// The OCR binary is not installed or not at the configured path.
    #[error(
        "Tesseract OCR engine not found (tried '{command}').\n\
Install tesseract (e.g. `apt install tesseract-ocr` or `brew install tesseract`) \
or set TESSERACT_CMD to the full path of the tesseract binary."
    )]
    OcrEngineMissing { command: String },

    /// Tesseract ran but failed.
    #[error("OCR failed: {detail}")]
    OcrFailed { detail: String },

    /// Tesseract did not finish in time and was killed.
    #[error("OCR timed out after {secs}s")]
    OcrTimeout { secs: u64 },

    // ── Video errors ──────────────────────────────────────────────────────
    /// No YouTube video ID could be found in the URL.
    #[error("No YouTube video ID found in '{url}'")]
    VideoIdNotFound { url: String },

    /// The video exists but has no caption tracks.
    #[error("No transcript available for video '{video_id}'")]
    NoTranscript { video_id: String },

    /// The caption service could not be reached or returned garbage.
    #[error("Could not fetch transcript for video '{video_id}': {detail}")]
    TranscriptFetchFailed { video_id: String, detail: String },

    // ── Generation errors ─────────────────────────────────────────────────
    /// The preset belongs to a different task.
    #[error("Preset '{preset}' is not valid for task '{task}'")]
    InvalidPreset { task: TaskKind, preset: String },

    /// The request cannot be dispatched as given.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The remote chat call failed (after retries, when the failure was transient).
    #[error("{kind} error after {attempts} attempt(s): {message}")]
    Remote {
        task: TaskKind,
        kind: RemoteErrorKind,
        attempts: u32,
        message: String,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DocmindError {
    /// Coarse category of this error.
    pub fn kind(&self) -> ErrorKind {
        use DocmindError::*;
        match self {
            UnsupportedKind { .. } => ErrorKind::UnsupportedKind,
            FileNotFound { .. }
            | PermissionDenied { .. }
            | WrongFormat { .. }
            | CorruptDocument { .. }
            | EncryptedDocument { .. }
            | Decode { .. }
            | PdfiumBindingFailed(_)
            | OcrFailed { .. }
            | OcrTimeout { .. }
            | TranscriptFetchFailed { .. }
            | Internal(_) => ErrorKind::Extraction,
            OcrEngineMissing { .. } => ErrorKind::OcrEngineMissing,
            VideoIdNotFound { .. } | NoTranscript { .. } => ErrorKind::NotFound,
            InvalidPreset { .. } | InvalidRequest(_) => ErrorKind::InvalidRequest,
            Remote { .. } => ErrorKind::Remote,
            ProviderNotConfigured { .. } | InvalidConfig(_) => ErrorKind::Configuration,
        }
    }

    /// Whether retrying the whole operation later might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            DocmindError::Remote { kind, .. } => kind.is_transient(),
            DocmindError::OcrTimeout { .. } | DocmindError::TranscriptFetchFailed { .. } => true,
            _ => false,
        }
    }

    /// One-line status text for end users.
    ///
    /// Keeps the familiar "Error <doing> text: <cause>" shape while the
    /// typed error stays available to programmatic callers.
    pub fn user_message(&self) -> String {
        use DocmindError::*;
        match self {
            UnsupportedKind { .. } => "Unsupported file type".to_string(),
            OcrEngineMissing { .. } | ProviderNotConfigured { .. } | InvalidConfig(_) => {
                self.to_string()
            }
            VideoIdNotFound { .. } => "Invalid YouTube URL: no video ID found".to_string(),
            NoTranscript { .. } | TranscriptFetchFailed { .. } => {
                format!("Error getting transcript: {self}")
            }
            Remote { task, message, .. } => {
                format!("Error {}: {}", task.failure_phrase(), message)
            }
            InvalidPreset { .. } | InvalidRequest(_) => self.to_string(),
            _ => format!("Error extracting text: {self}"),
        }
    }

    /// Serialisable `{kind, message}` view of this error.
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.user_message(),
            detail: self.to_string(),
        }
    }
}

/// Structured failure handed to presentation layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    /// End-user text.
    pub message: String,
    /// Full diagnostic text.
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ocr_missing_message_is_actionable() {
        let e = DocmindError::OcrEngineMissing {
            command: "/opt/tess/bin/tesseract".into(),
        };
        let msg = e.user_message();
        assert!(msg.contains("/opt/tess/bin/tesseract"), "got: {msg}");
        assert!(msg.contains("TESSERACT_CMD"), "got: {msg}");
        assert!(msg.contains("Install tesseract"), "got: {msg}");
        assert_eq!(e.kind(), ErrorKind::OcrEngineMissing);
    }

    #[test]
    fn remote_user_message_names_the_task() {
        let e = DocmindError::Remote {
            task: TaskKind::Summarize,
            kind: RemoteErrorKind::Network,
            attempts: 3,
            message: "connection reset".into(),
        };
        assert_eq!(e.user_message(), "Error summarizing text: connection reset");
        assert!(e.to_string().contains("3 attempt"));
        assert!(e.is_retryable());
    }

    #[test]
    fn extraction_failures_use_generic_prefix() {
        let e = DocmindError::Decode {
            path: "notes.txt".into(),
            detail: "invalid utf-8".into(),
        };
        assert!(e.user_message().starts_with("Error extracting text: "));
        assert_eq!(e.kind(), ErrorKind::Extraction);
    }

    #[test]
    fn unsupported_kind_keeps_sentinel_text() {
        let e = DocmindError::UnsupportedKind { kind: "xlsx".into() };
        assert_eq!(e.user_message(), "Unsupported file type");
        assert_eq!(e.report().kind, ErrorKind::UnsupportedKind);
    }

    #[test]
    fn classify_common_provider_messages() {
        assert_eq!(
            RemoteErrorKind::classify("HTTP 401 Unauthorized: Incorrect API key"),
            RemoteErrorKind::Auth
        );
        assert_eq!(
            RemoteErrorKind::classify("Rate limit reached for gpt-3.5-turbo"),
            RemoteErrorKind::RateLimited
        );
        assert_eq!(
            RemoteErrorKind::classify("error sending request: connection refused"),
            RemoteErrorKind::Network
        );
        assert_eq!(
            RemoteErrorKind::classify("operation timed out"),
            RemoteErrorKind::Timeout
        );
        assert!(!RemoteErrorKind::Auth.is_transient());
        assert!(RemoteErrorKind::RateLimited.is_transient());
    }

    #[test]
    fn status_codes_decide_before_phrases() {
        assert_eq!(RemoteErrorKind::classify("HTTP 404 Not Found"), RemoteErrorKind::InvalidRequest);
        assert_eq!(RemoteErrorKind::classify("503 Service Unavailable"), RemoteErrorKind::Network);
        assert_eq!(RemoteErrorKind::classify("502 Bad Gateway"), RemoteErrorKind::Network);
        assert_eq!(
            RemoteErrorKind::classify("error sending request for url (https://api.openai.com:443/v1/chat)"),
            RemoteErrorKind::Network
        );
        // Token counts are not status codes.
        assert_eq!(
            RemoteErrorKind::classify("Invalid value for 'max_tokens': 5000 exceeds 4096"),
            RemoteErrorKind::InvalidRequest
        );
    }

    #[test]
    fn unrecognised_failures_are_not_transient() {
        let kind = RemoteErrorKind::classify("The model `gpt-5-turbo` does not exist");
        assert_eq!(kind, RemoteErrorKind::InvalidRequest);
        assert!(!kind.is_transient());

        let kind = RemoteErrorKind::classify("something odd happened");
        assert_eq!(kind, RemoteErrorKind::Other);
        assert!(!kind.is_transient());
    }

    #[test]
    fn report_serialises_kind_in_snake_case() {
        let e = DocmindError::VideoIdNotFound {
            url: "https://example.com".into(),
        };
        let json = serde_json::to_string(&e.report()).unwrap();
        assert!(json.contains("\"kind\":\"not_found\""), "got: {json}");
    }
}
