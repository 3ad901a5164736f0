//! Configuration shared by the extractor and the dispatcher.
//!
//! [`DocmindConfig`] is built once by the process entry point, usually via
//! [`DocmindConfig::from_env`], and then passed to every component. Nothing in
//! the library reads environment variables after that point.
//!
//! Environment values take precedence over values already set on the builder,
//! so a config object can carry defaults that an operator overrides per
//! deployment without code changes.

use crate::error::DocmindError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Model used when neither the caller nor the environment picks one.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Tesseract page-segmentation mode 6: a single uniform block of text.
pub const DEFAULT_OCR_PSM: u8 = 6;

/// Default tesseract binary, resolved through `PATH`.
pub const DEFAULT_TESSERACT_CMD: &str = "tesseract";

/// Environment variable names read by [`DocmindConfig::from_env`].
pub mod env {
    pub const API_KEY: &str = "OPENAI_API_KEY";
    pub const TESSERACT_CMD: &str = "TESSERACT_CMD";
    pub const MODEL: &str = "DOCMIND_MODEL";
    pub const PROVIDER: &str = "DOCMIND_PROVIDER";
    pub const PDFIUM_LIB_PATH: &str = "PDFIUM_LIB_PATH";
    pub const OCR_LANG: &str = "DOCMIND_OCR_LANG";
    pub const API_TIMEOUT: &str = "DOCMIND_API_TIMEOUT";
    pub const MAX_ATTEMPTS: &str = "DOCMIND_MAX_ATTEMPTS";
}

/// Configuration for extraction and generation.
///
/// # Example
/// ```rust
/// use docmind::DocmindConfig;
///
/// let config = DocmindConfig::builder()
///     .model("gpt-4o-mini")
///     .api_timeout_secs(30)
///     .max_attempts(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "gpt-4o-mini");
/// ```
#[derive(Clone)]
pub struct DocmindConfig {
    /// LLM model identifier. Default: `gpt-3.5-turbo`.
    pub model: String,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is resolved from the API key
    /// or auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over everything else.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// OpenAI API key used when `OPENAI_API_KEY` is not set.
    pub api_key: Option<String>,

    /// Path to the tesseract binary. None searches `PATH`.
    pub tesseract_cmd: Option<PathBuf>,

    /// Tesseract `--psm` value. Default: 6 (single uniform block).
    pub ocr_psm: u8,

    /// Tesseract `-l` language, e.g. "eng" or "eng+fra". None uses the engine default.
    pub ocr_language: Option<String>,

    /// Directory containing libpdfium. None binds to the system library.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Per-attempt timeout for a chat completion, in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Total attempts for a chat completion, including the first. Default: 3.
    ///
    /// Only transient failures (network, timeout, rate limit) are retried.
    pub max_attempts: u32,

    /// Initial retry delay in milliseconds; doubles after each attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Timeout for one tesseract run, in seconds. Default: 120.
    pub ocr_timeout_secs: u64,

    /// Timeout for each caption-service HTTP request, in seconds. Default: 30.
    pub transcript_timeout_secs: u64,

    /// Caption languages to prefer, most preferred first. Default: `["en"]`.
    pub transcript_languages: Vec<String>,

    /// Check the OCR binary when a pipeline is built instead of on first use.
    /// Default: false.
    pub validate_ocr_eagerly: bool,
}

impl Default for DocmindConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            provider_name: None,
            provider: None,
            api_key: None,
            tesseract_cmd: None,
            ocr_psm: DEFAULT_OCR_PSM,
            ocr_language: None,
            pdfium_lib_path: None,
            api_timeout_secs: 60,
            max_attempts: 3,
            retry_backoff_ms: 500,
            ocr_timeout_secs: 120,
            transcript_timeout_secs: 30,
            transcript_languages: vec!["en".to_string()],
            validate_ocr_eagerly: false,
        }
    }
}

impl fmt::Debug for DocmindConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocmindConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("tesseract_cmd", &self.tesseract_cmd)
            .field("ocr_psm", &self.ocr_psm)
            .field("ocr_language", &self.ocr_language)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("ocr_timeout_secs", &self.ocr_timeout_secs)
            .field("transcript_timeout_secs", &self.transcript_timeout_secs)
            .field("transcript_languages", &self.transcript_languages)
            .field("validate_ocr_eagerly", &self.validate_ocr_eagerly)
            .finish()
    }
}

impl DocmindConfig {
    /// Create a new builder for `DocmindConfig`.
    pub fn builder() -> DocmindConfigBuilder {
        DocmindConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<DocmindConfig, DocmindError> {
        Self::builder().apply_env().build()
    }

    /// The tesseract command to run.
    pub fn tesseract_command(&self) -> PathBuf {
        self.tesseract_cmd
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TESSERACT_CMD))
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_secs(self.ocr_timeout_secs)
    }
}

/// Builder for [`DocmindConfig`].
#[derive(Debug)]
pub struct DocmindConfigBuilder {
    config: DocmindConfig,
}

impl DocmindConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn tesseract_cmd(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_cmd = Some(path.into());
        self
    }

    pub fn ocr_psm(mut self, psm: u8) -> Self {
        self.config.ocr_psm = psm;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = Some(lang.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs;
        self
    }

    pub fn transcript_timeout_secs(mut self, secs: u64) -> Self {
        self.config.transcript_timeout_secs = secs;
        self
    }

    pub fn transcript_languages<I, S>(mut self, langs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.transcript_languages = langs.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate_ocr_eagerly(mut self, v: bool) -> Self {
        self.config.validate_ocr_eagerly = v;
        self
    }

    /// Overlay values from the process environment.
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary lookup. Empty values are ignored.
    ///
    /// Numeric variables that fail to parse are ignored with a warning rather
    /// than aborting startup.
    pub fn apply_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(env::API_KEY) {
            self.config.api_key = Some(v);
        }
        if let Some(v) = get(env::TESSERACT_CMD) {
            self.config.tesseract_cmd = Some(PathBuf::from(v));
        }
        if let Some(v) = get(env::MODEL) {
            self.config.model = v;
        }
        if let Some(v) = get(env::PROVIDER) {
            self.config.provider_name = Some(v);
        }
        if let Some(v) = get(env::PDFIUM_LIB_PATH) {
            self.config.pdfium_lib_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get(env::OCR_LANG) {
            self.config.ocr_language = Some(v);
        }
        if let Some(v) = get(env::API_TIMEOUT) {
            match v.trim().parse() {
                Ok(secs) => self.config.api_timeout_secs = secs,
                Err(_) => tracing::warn!("Ignoring {}={:?}: not a number", env::API_TIMEOUT, v),
            }
        }
        if let Some(v) = get(env::MAX_ATTEMPTS) {
            match v.trim().parse() {
                Ok(n) => self.config.max_attempts = n,
                Err(_) => tracing::warn!("Ignoring {}={:?}: not a number", env::MAX_ATTEMPTS, v),
            }
        }
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<DocmindConfig, DocmindError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(DocmindError::InvalidConfig("model must not be empty".into()));
        }
        if c.max_attempts == 0 {
            return Err(DocmindError::InvalidConfig(
                "max_attempts must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 || c.ocr_timeout_secs == 0 || c.transcript_timeout_secs == 0 {
            return Err(DocmindError::InvalidConfig(
                "timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.ocr_psm > 13 {
            return Err(DocmindError::InvalidConfig(format!(
                "tesseract --psm must be 0–13, got {}",
                c.ocr_psm
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults() {
        let c = DocmindConfig::default();
        assert_eq!(c.model, "gpt-3.5-turbo");
        assert_eq!(c.ocr_psm, 6);
        assert_eq!(c.max_attempts, 3);
        assert!(!c.validate_ocr_eagerly);
        assert_eq!(c.tesseract_command(), PathBuf::from("tesseract"));
    }

    #[test]
    fn env_overrides_config_object() {
        let c = DocmindConfig::builder()
            .api_key("from-config")
            .tesseract_cmd("/usr/bin/tesseract")
            .apply_env_from(lookup(&[
                ("OPENAI_API_KEY", "from-env"),
                ("TESSERACT_CMD", "/opt/tesseract/bin/tesseract"),
            ]))
            .build()
            .unwrap();
        assert_eq!(c.api_key.as_deref(), Some("from-env"));
        assert_eq!(
            c.tesseract_command(),
            PathBuf::from("/opt/tesseract/bin/tesseract")
        );
    }

    #[test]
    fn config_object_is_the_fallback() {
        let c = DocmindConfig::builder()
            .api_key("from-config")
            .apply_env_from(lookup(&[("OPENAI_API_KEY", "  ")]))
            .build()
            .unwrap();
        assert_eq!(c.api_key.as_deref(), Some("from-config"));
    }

    #[test]
    fn bad_numeric_env_is_ignored() {
        let c = DocmindConfig::builder()
            .apply_env_from(lookup(&[
                ("DOCMIND_API_TIMEOUT", "soon"),
                ("DOCMIND_MAX_ATTEMPTS", "5"),
            ]))
            .build()
            .unwrap();
        assert_eq!(c.api_timeout_secs, 60);
        assert_eq!(c.max_attempts, 5);
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = DocmindConfig::builder().api_key("sk-secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
        assert!(dbg.contains("transcript_timeout_secs: 30"), "got: {dbg}");
        assert!(dbg.contains("transcript_languages: [\"en\"]"), "got: {dbg}");
        assert!(dbg.contains("retry_backoff_ms: 500"), "got: {dbg}");
    }

    #[test]
    fn build_rejects_zero_attempts() {
        assert!(matches!(
            DocmindConfig::builder().max_attempts(0).build(),
            Err(DocmindError::InvalidConfig(_))
        ));
    }

    #[test]
    fn build_rejects_zero_transcript_timeout() {
        assert!(matches!(
            DocmindConfig::builder().transcript_timeout_secs(0).build(),
            Err(DocmindError::InvalidConfig(_))
        ));
        assert!(DocmindConfig::builder().transcript_timeout_secs(1).build().is_ok());
    }
}
