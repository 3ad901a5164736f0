//! PDF text extraction via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and blocks while parsing. `tokio::task::spawn_blocking` moves the
//! work onto the blocking pool so Tokio worker threads keep serving other
//! requests during a large document.

use crate::error::DocmindError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extract the text of every page, in order, concatenated with no separator.
pub async fn extract_pdf(
    pdf_path: &Path,
    pdfium_lib_path: Option<&Path>,
) -> Result<String, DocmindError> {
    let path = pdf_path.to_path_buf();
    let lib = pdfium_lib_path.map(Path::to_path_buf);

    tokio::task::spawn_blocking(move || extract_pdf_blocking(&path, lib.as_deref()))
        .await
        .map_err(|e| DocmindError::Internal(format!("PDF task panicked: {}", e)))?
}

/// Bind to pdfium at `lib_dir` when given, otherwise to the system library.
fn bind_pdfium(lib_dir: Option<&Path>) -> Result<Pdfium, DocmindError> {
    let bindings = match lib_dir {
        Some(dir) => {
            let lib = Pdfium::pdfium_platform_library_name_at_path(dir);
            debug!("Binding pdfium at {}", lib.display());
            Pdfium::bind_to_library(&lib).map_err(|e| {
                DocmindError::PdfiumBindingFailed(format!("{}: {:?}", lib.display(), e))
            })?
        }
        None => Pdfium::bind_to_system_library()
            .map_err(|e| DocmindError::PdfiumBindingFailed(format!("{:?}", e)))?,
    };
    Ok(Pdfium::new(bindings))
}

fn extract_pdf_blocking(pdf_path: &Path, lib_dir: Option<&Path>) -> Result<String, DocmindError> {
    let pdfium = bind_pdfium(lib_dir)?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| classify_load_error(pdf_path.to_path_buf(), format!("{:?}", e)))?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut texts = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| DocmindError::CorruptDocument {
                path: pdf_path.to_path_buf(),
                format: "PDF",
                detail: format!("page {}: {:?}", idx + 1, e),
            })?
            .all();
        debug!("Page {} → {} chars", idx + 1, text.chars().count());
        texts.push(text);
    }

    Ok(join_pages(texts))
}

fn classify_load_error(path: PathBuf, detail: String) -> DocmindError {
    if detail.contains("Password") || detail.contains("password") {
        DocmindError::EncryptedDocument { path }
    } else {
        DocmindError::CorruptDocument {
            path,
            format: "PDF",
            detail,
        }
    }
}

/// Page texts in page order with no separator.
pub fn join_pages<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    pages.into_iter().fold(String::new(), |mut acc, page| {
        acc.push_str(page.as_ref());
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_concatenate_in_order_without_separator() {
        assert_eq!(join_pages(["Intro ", "Body", " End"]), "Intro Body End");
    }

    #[test]
    fn single_page_is_verbatim() {
        assert_eq!(join_pages(["only page\n"]), "only page\n");
        assert_eq!(join_pages(Vec::<String>::new()), "");
    }

    #[test]
    fn password_errors_map_to_encrypted() {
        let e = classify_load_error("a.pdf".into(), "PdfiumLibraryInternalError(PasswordError)".into());
        assert!(matches!(e, DocmindError::EncryptedDocument { .. }));
        let e = classify_load_error("a.pdf".into(), "PdfiumLibraryInternalError(FormatError)".into());
        assert!(matches!(e, DocmindError::CorruptDocument { format: "PDF", .. }));
    }
}
