//! Text extraction entry points.
//!
//! [`Extractor`] dispatches an [`ExtractionRequest`] to the matching
//! pipeline stage and wraps the text in an [`ExtractedText`]. A failure is
//! always an `Err`; extracted text never carries an error message.

use crate::config::DocmindConfig;
use crate::error::DocmindError;
use crate::output::ExtractedText;
use crate::pipeline::ocr::{OcrEngine, TesseractCli};
use crate::pipeline::transcript::{TranscriptSource, YouTubeTranscripts};
use crate::pipeline::{docx, input, ocr, pdf, transcript};
use crate::request::{ExtractionRequest, FileKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Reads text out of documents, images and videos.
///
/// # Example
/// ```rust,no_run
/// use docmind::{DocmindConfig, ExtractionRequest, Extractor};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = DocmindConfig::from_env()?;
/// let extractor = Extractor::new(&config)?;
/// let out = extractor.extract(&ExtractionRequest::infer("notes.pdf")?).await?;
/// println!("{} chars", out.char_count);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Extractor {
    ocr: Arc<dyn OcrEngine>,
    transcripts: Arc<dyn TranscriptSource>,
    pdfium_lib_path: Option<PathBuf>,
}

impl Extractor {
    /// Tesseract for OCR and youtube.com for transcripts, as configured.
    pub fn new(config: &DocmindConfig) -> Result<Self, DocmindError> {
        Ok(Self {
            ocr: Arc::new(TesseractCli::from_config(config)),
            transcripts: Arc::new(YouTubeTranscripts::from_config(config)?),
            pdfium_lib_path: config.pdfium_lib_path.clone(),
        })
    }

    /// Replace the OCR engine.
    pub fn with_ocr(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.ocr = engine;
        self
    }

    /// Replace the transcript source.
    pub fn with_transcripts(mut self, source: Arc<dyn TranscriptSource>) -> Self {
        self.transcripts = source;
        self
    }

    /// Fail fast if the OCR engine cannot run.
    pub async fn check_ocr(&self) -> Result<(), DocmindError> {
        self.ocr.check_available().await
    }

    /// Extract plain text from the request's source.
    pub async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractedText, DocmindError> {
        let start = Instant::now();
        info!("Extracting {} from {}", request.kind, request.source);

        let text = match request.kind {
            FileKind::YoutubeUrl => {
                transcript::transcript_for_url(self.transcripts.as_ref(), &request.source).await?
            }
            FileKind::Pdf => {
                let path = input::resolve_local(&request.source, FileKind::Pdf)?;
                pdf::extract_pdf(&path, self.pdfium_lib_path.as_deref()).await?
            }
            FileKind::Docx => {
                let path = input::resolve_local(&request.source, FileKind::Docx)?;
                docx::extract_docx(&path).await?
            }
            FileKind::Image => {
                let path = input::resolve_local(&request.source, FileKind::Image)?;
                ocr::extract_image(&path, self.ocr.as_ref()).await?
            }
            FileKind::Txt => {
                let path = input::resolve_local(&request.source, FileKind::Txt)?;
                read_text(&path).await?
            }
        };

        let out = ExtractedText::new(
            text,
            request.kind,
            request.source.clone(),
            start.elapsed().as_millis() as u64,
        );
        info!(
            "Extracted {} chars from {} in {}ms",
            out.char_count, out.kind, out.duration_ms
        );
        Ok(out)
    }
}

/// The whole file as UTF-8, verbatim.
async fn read_text(path: &Path) -> Result<String, DocmindError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| DocmindError::Decode {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    String::from_utf8(bytes).map_err(|e| DocmindError::Decode {
        path: path.to_path_buf(),
        detail: format!("not valid UTF-8: {e}"),
    })
}

/// Extract with a default [`Extractor`], creating a temporary tokio runtime.
pub fn extract_sync(
    request: &ExtractionRequest,
    config: &DocmindConfig,
) -> Result<ExtractedText, DocmindError> {
    let extractor = Extractor::new(config)?;
    tokio::runtime::Runtime::new()
        .map_err(|e| DocmindError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extractor.extract(request))
}
