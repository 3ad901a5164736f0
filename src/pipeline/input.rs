//! Input resolution: validate a user-supplied local path before any backend
//! touches it.
//!
//! pdfium and the DOCX parser both report mislabelled files with opaque
//! errors, so PDF and DOCX sources are checked for their magic bytes here
//! (`%PDF` and the ZIP local-file header `PK\x03\x04`) and fail with a
//! [`DocmindError::WrongFormat`] that names the expected format.

use crate::error::DocmindError;
use crate::request::FileKind;
use std::io::Read;
use std::path::PathBuf;
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";
const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Leading bytes a file of this kind must start with, if any.
fn expected_magic(kind: FileKind) -> Option<(&'static [u8; 4], &'static str)> {
    match kind {
        FileKind::Pdf => Some((PDF_MAGIC, "PDF")),
        FileKind::Docx => Some((ZIP_MAGIC, "DOCX")),
        _ => None,
    }
}

/// Resolve a local file path, validating existence, read permission and,
/// for PDF and DOCX, the magic bytes.
pub fn resolve_local(path_str: &str, kind: FileKind) -> Result<PathBuf, DocmindError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(DocmindError::FileNotFound { path });
    }
    if path.is_dir() {
        return Err(DocmindError::Decode {
            path,
            detail: "is a directory".into(),
        });
    }

    let mut file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(DocmindError::PermissionDenied { path });
        }
        Err(_) => return Err(DocmindError::FileNotFound { path }),
    };

    if let Some((magic_expected, format)) = expected_magic(kind) {
        let mut magic = [0u8; 4];
        // Files shorter than four bytes cannot be valid either.
        if file.read_exact(&mut magic).is_err() || &magic != magic_expected {
            return Err(DocmindError::WrongFormat {
                path,
                expected: format,
                magic,
            });
        }
    }

    debug!("Resolved local {} input: {}", kind, path.display());
    Ok(path)
}
