//! DOCX text extraction using docx-rs.
//!
//! Only body paragraphs contribute text; tables, headers and footers are
//! skipped. Every paragraph, empty ones included, is followed by `\n`.

use crate::error::DocmindError;
use docx_rs::{Docx, DocumentChild, Paragraph, ParagraphChild, RunChild};
use std::path::Path;
use tracing::debug;

/// Read and parse a DOCX file on the blocking pool.
pub async fn extract_docx(path: &Path) -> Result<String, DocmindError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let bytes = std::fs::read(&path).map_err(|e| DocmindError::Decode {
            path: path.clone(),
            detail: e.to_string(),
        })?;
        let docx = docx_rs::read_docx(&bytes).map_err(|e| DocmindError::CorruptDocument {
            path: path.clone(),
            format: "DOCX",
            detail: e.to_string(),
        })?;
        let text = paragraphs_to_text(&docx);
        debug!("DOCX {} → {} chars", path.display(), text.len());
        Ok(text)
    })
    .await
    .map_err(|e| DocmindError::Internal(format!("DOCX task panicked: {}", e)))?
}

/// Body paragraphs in document order, each terminated by a newline.
pub fn paragraphs_to_text(docx: &Docx) -> String {
    let mut out = String::new();
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(p) = child {
            out.push_str(&paragraph_text(p));
            out.push('\n');
        }
    }
    out
}

fn paragraph_text(p: &Paragraph) -> String {
    let mut text = String::new();
    for child in &p.children {
        match child {
            ParagraphChild::Run(r) => push_run(&mut text, &r.children),
            ParagraphChild::Hyperlink(h) => {
                for child in &h.children {
                    if let ParagraphChild::Run(r) = child {
                        push_run(&mut text, &r.children);
                    }
                }
            }
            _ => {}
        }
    }
    text
}

fn push_run(text: &mut String, children: &[RunChild]) {
    for run_child in children {
        match run_child {
            RunChild::Text(t) => text.push_str(&t.text),
            RunChild::Tab(_) => text.push('\t'),
            RunChild::Break(_) => text.push('\n'),
            _ => {}
        }
    }
}
