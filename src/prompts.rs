//! System personas, task instructions and formatting presets.
//!
//! Every prompt string the crate sends lives here so wording changes happen
//! in one place and unit tests can inspect prompts without a live model.
//!
//! A templated user turn is assembled as
//!
//! ```text
//! <lead><word fragment><closing><preset fragment>
//!
//! <text>
//! ```
//!
//! where the word fragment is `" in approximately N words"` and the preset
//! fragment comes from the closed [`Preset`] table.

use crate::error::DocmindError;
use crate::request::TaskKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const SUMMARIZE_PERSONA: &str =
    "You are a helpful assistant that summarizes text clearly and faithfully.";

pub const GENERATE_PERSONA: &str =
    "You are a helpful assistant that generates accurate, well-structured answers.";

pub const ANALYZE_PERSONA: &str =
    "You are a helpful assistant that analyzes text and ranks topics by importance.";

pub const TRANSLATE_PERSONA: &str = "You are a helpful assistant that translates text.";

pub const ACCESSIBILITY_PERSONA: &str = "You are a helpful assistant that rewrites text so \
it is easy to read for people with dyslexia, low vision or cognitive disabilities.";

const ACCESSIBILITY_INSTRUCTION: &str = "Rewrite the following text in plain, accessible \
language. Use short sentences and common words, explain any jargon, break long passages into \
short paragraphs or lists, and keep every key point:";

/// Translation languages offered to end users: `(code, display name)`.
///
/// `auto` is only meaningful as a source language. Codes outside this table
/// are still passed through to the model verbatim.
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("auto", "Auto-detect"),
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("zh", "Chinese"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("hi", "Hindi"),
    ("ar", "Arabic"),
];

/// Display name for a language code, if it is one we list.
pub fn language_name(code: &str) -> Option<&'static str> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
}

// ── Presets ──────────────────────────────────────────────────────────────

/// A named formatting variant. Each preset belongs to exactly one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    // summarize
    BulletPoints,
    DetailedSummary,
    StudyNotes,
    BriefSummary,
    // generate
    ExamAnswers,
    PracticeQuestions,
    StudyPlan,
    // analyze
    QuestionPatterns,
    PredictQuestions,
    TopicImportance,
}

impl Preset {
    pub const ALL: [Preset; 10] = [
        Preset::BulletPoints,
        Preset::DetailedSummary,
        Preset::StudyNotes,
        Preset::BriefSummary,
        Preset::ExamAnswers,
        Preset::PracticeQuestions,
        Preset::StudyPlan,
        Preset::QuestionPatterns,
        Preset::PredictQuestions,
        Preset::TopicImportance,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::BulletPoints => "bullet_points",
            Preset::DetailedSummary => "detailed_summary",
            Preset::StudyNotes => "study_notes",
            Preset::BriefSummary => "brief_summary",
            Preset::ExamAnswers => "exam_answers",
            Preset::PracticeQuestions => "practice_questions",
            Preset::StudyPlan => "study_plan",
            Preset::QuestionPatterns => "question_patterns",
            Preset::PredictQuestions => "predict_questions",
            Preset::TopicImportance => "topic_importance",
        }
    }

    /// The task this preset shapes.
    pub fn task(&self) -> TaskKind {
        match self {
            Preset::BulletPoints
            | Preset::DetailedSummary
            | Preset::StudyNotes
            | Preset::BriefSummary => TaskKind::Summarize,
            Preset::ExamAnswers | Preset::PracticeQuestions | Preset::StudyPlan => {
                TaskKind::Generate
            }
            Preset::QuestionPatterns | Preset::PredictQuestions | Preset::TopicImportance => {
                TaskKind::Analyze
            }
        }
    }

    /// Instruction fragment appended to the task's base instruction.
    pub fn instruction(&self) -> &'static str {
        match self {
            Preset::BulletPoints => {
                " Format the summary strictly as a markdown bullet list using '- ' items, \
with no introduction or conclusion."
            }
            Preset::DetailedSummary => {
                " Write a comprehensive summary in well-organised paragraphs that covers \
every major point and its supporting detail."
            }
            Preset::StudyNotes => {
                " Format the output as study notes: a markdown heading for each main topic \
with concise sub-bullets beneath it."
            }
            Preset::BriefSummary => {
                " Keep it brief: a short summary of only the essentials, suitable for quick revision."
            }
            Preset::ExamAnswers => {
                " Write exam-ready answers: a markdown heading for each question followed by \
numbered, step-by-step points."
            }
            Preset::PracticeQuestions => {
                " Produce between 6 and 10 numbered practice questions based on the content, \
each written as 'Q:' followed by its 'A:' answer."
            }
            Preset::StudyPlan => {
                " Organise the output as a study plan grouped by day or week, each group \
a markdown bullet list of tasks."
            }
            Preset::QuestionPatterns => {
                " Present the analysis as a markdown bullet list of recurring question patterns, \
with an example for each pattern."
            }
            Preset::PredictQuestions => {
                " Present a numbered list of the questions most likely to be asked about this material."
            }
            Preset::TopicImportance => {
                " Rank the topics in a numbered list from most to least important, \
with a one-line justification for each."
            }
        }
    }

    /// Presets available for a task, in table order.
    pub fn for_task(task: TaskKind) -> impl Iterator<Item = Preset> {
        Preset::ALL.into_iter().filter(move |p| p.task() == task)
    }

    /// Look up a preset by name within a task.
    ///
    /// Unknown names and names belonging to another task are rejected.
    pub fn lookup(task: TaskKind, name: &str) -> Result<Preset, DocmindError> {
        let preset: Preset = name.parse()?;
        if preset.task() != task {
            return Err(DocmindError::InvalidPreset {
                task,
                preset: preset.name().to_string(),
            });
        }
        Ok(preset)
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = DocmindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Preset::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| DocmindError::InvalidRequest(format!("unknown preset '{s}'")))
    }
}

// ── Composition ──────────────────────────────────────────────────────────

/// `" in approximately N words"`, or nothing.
pub fn word_instruction(target_words: Option<u32>) -> String {
    match target_words {
        Some(n) if n > 0 => format!(" in approximately {n} words"),
        _ => String::new(),
    }
}

/// Fixed system persona for a task. Chat takes its system prompt from the caller.
pub fn persona(task: TaskKind) -> Option<&'static str> {
    match task {
        TaskKind::Summarize => Some(SUMMARIZE_PERSONA),
        TaskKind::Generate => Some(GENERATE_PERSONA),
        TaskKind::Analyze => Some(ANALYZE_PERSONA),
        TaskKind::Translate => Some(TRANSLATE_PERSONA),
        TaskKind::Accessibility => Some(ACCESSIBILITY_PERSONA),
        TaskKind::Chat => None,
    }
}

/// `(lead, closing)` around the word fragment for a templated task.
fn base_instruction(task: TaskKind) -> (&'static str, &'static str) {
    match task {
        TaskKind::Summarize => (
            "Summarize the following text",
            ". Avoid omitting key points.",
        ),
        TaskKind::Generate => (
            "Generate clear, step-by-step answers",
            " to the following questions or content.",
        ),
        TaskKind::Analyze => (
            "Analyze the following text, identify key insights, and rank topics by importance",
            ".",
        ),
        TaskKind::Translate | TaskKind::Accessibility | TaskKind::Chat => ("", ""),
    }
}

/// The instruction line for summarize / generate / analyze.
pub fn instruction(task: TaskKind, target_words: Option<u32>, preset: Option<Preset>) -> String {
    let (lead, closing) = match (task, preset) {
        // Without a preset the generate instruction leads straight into the text.
        (TaskKind::Generate, None) => (
            base_instruction(task).0,
            " to the following questions or content:",
        ),
        _ => base_instruction(task),
    };
    let preset_fragment = preset.map(|p| p.instruction()).unwrap_or("");
    format!(
        "{lead}{words}{closing}{preset_fragment}",
        words = word_instruction(target_words)
    )
}

/// Full user turn for a templated task: instruction, blank line, text.
pub fn user_prompt(
    task: TaskKind,
    text: &str,
    target_words: Option<u32>,
    preset: Option<Preset>,
) -> String {
    format!("{}\n\n{}", instruction(task, target_words, preset), text)
}

/// Full user turn for a translation.
pub fn translate_prompt(text: &str, source_language: &str, target_language: &str) -> String {
    format!(
        "Please translate the following text from {source_language} to {target_language}:\n\n{text}"
    )
}

/// Full user turn for an accessibility rewrite.
pub fn accessibility_prompt(text: &str) -> String {
    format!("{ACCESSIBILITY_INSTRUCTION}\n\n{text}")
}
