//! Extract-then-generate over a single source.

use crate::config::DocmindConfig;
use crate::dispatch::Dispatcher;
use crate::error::DocmindError;
use crate::extract::Extractor;
use crate::output::ProcessOutput;
use crate::request::{ExtractionRequest, GenerationRequest};
use tracing::debug;

/// An [`Extractor`] and a [`Dispatcher`] sharing one configuration.
#[derive(Clone)]
pub struct Pipeline {
    pub extractor: Extractor,
    pub dispatcher: Dispatcher,
}

impl Pipeline {
    pub fn new(extractor: Extractor, dispatcher: Dispatcher) -> Self {
        Self {
            extractor,
            dispatcher,
        }
    }

    /// Build both halves from the configuration.
    ///
    /// With `validate_ocr_eagerly` set, a missing OCR engine fails here
    /// instead of on the first image.
    pub async fn from_config(config: &DocmindConfig) -> Result<Self, DocmindError> {
        let extractor = Extractor::new(config)?;
        if config.validate_ocr_eagerly {
            debug!("Checking OCR engine at startup");
            extractor.check_ocr().await?;
        }
        Ok(Self::new(extractor, Dispatcher::from_config(config)?))
    }

    /// Extract `source`, then run `task` over the extracted text.
    ///
    /// `task.text` is replaced by the extracted text; every other field
    /// (word count, preset, languages) is used as given.
    pub async fn process(
        &self,
        source: &ExtractionRequest,
        task: &GenerationRequest,
    ) -> Result<ProcessOutput, DocmindError> {
        // Reject bad options before paying for extraction.
        task.validate()?;
        let extracted = self.extractor.extract(source).await?;
        let request = task.clone().with_text(extracted.text.clone());
        let generated = self.dispatcher.run(&request).await?;
        Ok(ProcessOutput {
            extracted,
            generated,
        })
    }
}

/// Synchronous wrapper around [`Pipeline::process`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_sync(
    source: &ExtractionRequest,
    task: &GenerationRequest,
    config: &DocmindConfig,
) -> Result<ProcessOutput, DocmindError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DocmindError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(async {
            let pipeline = Pipeline::from_config(config).await?;
            pipeline.process(source, task).await
        })
}
