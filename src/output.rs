//! Result types returned by extraction and generation.

use crate::request::{FileKind, TaskKind};
use serde::{Deserialize, Serialize};

/// Text read from a source, with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text: String,
    pub kind: FileKind,
    /// Path or URL as given in the request.
    pub source: String,
    pub char_count: usize,
    pub duration_ms: u64,
}

impl ExtractedText {
    pub fn new(text: String, kind: FileKind, source: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            char_count: text.chars().count(),
            text,
            kind,
            source: source.into(),
            duration_ms,
        }
    }
}

/// Model output for one generation task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Content of the first candidate, verbatim.
    pub text: String,
    pub task: TaskKind,
    pub model: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    /// Attempts made, including the successful one.
    pub attempts: u32,
    pub duration_ms: u64,
}

/// Output of [`crate::process::Pipeline::process`]: the extracted source and
/// what the model made of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutput {
    pub extracted: ExtractedText,
    pub generated: GenerationResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_count_counts_chars_not_bytes() {
        let t = ExtractedText::new("héllo".into(), FileKind::Txt, "a.txt", 3);
        assert_eq!(t.char_count, 5);
    }

    #[test]
    fn serialises_kind_and_task_names() {
        let r = GenerationResult {
            text: "ok".into(),
            task: TaskKind::Summarize,
            model: "gpt-3.5-turbo".into(),
            input_tokens: 10,
            output_tokens: 2,
            attempts: 1,
            duration_ms: 5,
        };
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"task\":\"summarize\""));
    }
}
