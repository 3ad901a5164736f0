//! Pipeline stages for extraction and generation.
//!
//! Each submodule wraps exactly one external collaborator so it can be
//! tested, or replaced behind its trait, without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//!            ┌─▶ pdf ─────────┐
//!            ├─▶ docx ────────┤
//! input ─────┼─▶ ocr ─────────┼──▶ text ──▶ llm
//! (path/URL) ├─▶ (txt) ───────┤            (chat API)
//!            └─▶ transcript ──┘
//! ```
//!
//! 1. [`input`]: validate a local path (existence, permission, magic bytes)
//! 2. [`pdf`]: page text via pdfium; runs in `spawn_blocking`
//! 3. [`docx`]: body paragraphs via docx-rs
//! 4. [`ocr`]: grayscale / unsharp / autocontrast, then tesseract
//! 5. [`transcript`]: YouTube video ID and caption track
//! 6. [`llm`]: chat completion with per-attempt timeout and retry

pub mod docx;
pub mod input;
pub mod llm;
pub mod ocr;
pub mod pdf;
pub mod transcript;
