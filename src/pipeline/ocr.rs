//! Image OCR: fixed preprocessing followed by a tesseract run.
//!
//! ## Preprocessing
//!
//! 1. Grayscale (`to_luma8`).
//! 2. Unsharp mask, radius 1.2, amount 150 %, threshold 3. A pixel is
//!    sharpened only where it differs from its Gaussian-blurred value by more
//!    than the threshold, which keeps flat paper texture from turning into
//!    noise.
//! 3. Autocontrast with a 2 % cutoff: the darkest and lightest 2 % of pixels
//!    are clipped and the remaining range is stretched to 0–255.
//!
//! The engine then runs with `--psm 6` (a single uniform block of text) and
//! the result is trimmed.

use crate::config::DocmindConfig;
use crate::error::DocmindError;
use async_trait::async_trait;
use image::{DynamicImage, GrayImage, ImageFormat};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

pub const UNSHARP_RADIUS: f32 = 1.2;
pub const UNSHARP_PERCENT: i32 = 150;
pub const UNSHARP_THRESHOLD: i32 = 3;
pub const AUTOCONTRAST_CUTOFF_PERCENT: f64 = 2.0;

// ── Preprocessing ────────────────────────────────────────────────────────

/// Grayscale, sharpen and autocontrast an image for OCR.
pub fn preprocess(image: &DynamicImage) -> GrayImage {
    let gray = image.to_luma8();
    let sharpened = unsharp_mask(&gray, UNSHARP_RADIUS, UNSHARP_PERCENT, UNSHARP_THRESHOLD);
    autocontrast(&sharpened, AUTOCONTRAST_CUTOFF_PERCENT)
}

/// Sharpen by adding back `percent`% of the difference from a blurred copy
/// wherever that difference exceeds `threshold`.
pub fn unsharp_mask(image: &GrayImage, radius: f32, percent: i32, threshold: i32) -> GrayImage {
    let blurred = image::imageops::blur(image, radius);
    let mut out = image.clone();
    for (dst, (src, blur)) in out
        .pixels_mut()
        .zip(image.pixels().zip(blurred.pixels()))
    {
        let orig = src.0[0] as i32;
        let diff = orig - blur.0[0] as i32;
        if diff.abs() > threshold {
            let v = orig as f32 + diff as f32 * percent as f32 / 100.0;
            dst.0[0] = v.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Clip `cutoff_percent` of pixels from each end of the histogram and
/// stretch what remains to the full 0–255 range.
pub fn autocontrast(image: &GrayImage, cutoff_percent: f64) -> GrayImage {
    let mut histogram = [0u64; 256];
    for p in image.pixels() {
        histogram[p.0[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    let cut = (total as f64 * cutoff_percent / 100.0) as u64;

    // Remove `cut` pixels from the low end.
    let mut h = histogram;
    let mut remaining = cut;
    for bin in h.iter_mut() {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(*bin);
        *bin -= take;
        remaining -= take;
    }
    // And from the high end.
    let mut remaining = cut;
    for bin in h.iter_mut().rev() {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(*bin);
        *bin -= take;
        remaining -= take;
    }

    let lo = h.iter().position(|&c| c > 0);
    let hi = h.iter().rposition(|&c| c > 0);
    let (lo, hi) = match (lo, hi) {
        (Some(lo), Some(hi)) if hi > lo => (lo as f64, hi as f64),
        _ => return image.clone(),
    };

    let mut lut = [0u8; 256];
    for (ix, slot) in lut.iter_mut().enumerate() {
        *slot = ((ix as f64 - lo) * 255.0 / (hi - lo)).clamp(0.0, 255.0) as u8;
    }

    let mut out = image.clone();
    for p in out.pixels_mut() {
        p.0[0] = lut[p.0[0] as usize];
    }
    out
}

// ── Engine ───────────────────────────────────────────────────────────────

/// An OCR backend.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognise text in a preprocessed single-channel image.
    async fn recognize(&self, image: &GrayImage) -> Result<String, DocmindError>;

    /// Fail with [`DocmindError::OcrEngineMissing`] if the engine cannot run.
    async fn check_available(&self) -> Result<(), DocmindError>;
}

/// Runs the `tesseract` binary as a subprocess.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    pub command: PathBuf,
    pub psm: u8,
    pub language: Option<String>,
    pub timeout: Duration,
}

impl TesseractCli {
    pub fn from_config(config: &DocmindConfig) -> Self {
        Self {
            command: config.tesseract_command(),
            psm: config.ocr_psm,
            language: config.ocr_language.clone(),
            timeout: config.ocr_timeout(),
        }
    }

    fn missing(&self) -> DocmindError {
        DocmindError::OcrEngineMissing {
            command: self.command.display().to_string(),
        }
    }

    fn spawn_error(&self, e: std::io::Error) -> DocmindError {
        match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => self.missing(),
            _ => DocmindError::OcrFailed {
                detail: format!("could not start {}: {}", self.command.display(), e),
            },
        }
    }

    fn args(&self, image_path: &Path) -> Vec<String> {
        let mut args = vec![
            image_path.display().to_string(),
            "stdout".to_string(),
            "--psm".to_string(),
            self.psm.to_string(),
        ];
        if let Some(ref lang) = self.language {
            args.push("-l".to_string());
            args.push(lang.clone());
        }
        args
    }
}

#[async_trait]
impl OcrEngine for TesseractCli {
    async fn recognize(&self, image: &GrayImage) -> Result<String, DocmindError> {
        // tesseract reads from a path; the file is removed when `tmp` drops.
        let image = image.clone();
        let tmp = tokio::task::spawn_blocking(move || -> Result<_, DocmindError> {
            let tmp = tempfile::Builder::new()
                .prefix("docmind-ocr-")
                .suffix(".png")
                .tempfile()
                .map_err(|e| DocmindError::Internal(format!("tempfile: {e}")))?;
            image
                .save_with_format(tmp.path(), ImageFormat::Png)
                .map_err(|e| DocmindError::Internal(format!("writing OCR input: {e}")))?;
            Ok(tmp)
        })
        .await
        .map_err(|e| DocmindError::Internal(format!("OCR task panicked: {}", e)))??;

        debug!(
            "Running {} --psm {} on {}",
            self.command.display(),
            self.psm,
            tmp.path().display()
        );

        let child = Command::new(&self.command)
            .args(self.args(tmp.path()))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| DocmindError::OcrTimeout {
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DocmindError::OcrFailed {
                detail: format!("tesseract exited with {}: {}", output.status, stderr.trim()),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        info!("OCR extracted {} characters", text.len());
        Ok(text)
    }

    async fn check_available(&self) -> Result<(), DocmindError> {
        let output = Command::new(&self.command)
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(self.missing())
        }
    }
}

/// Decode an image file, preprocess it and OCR it. The result is trimmed.
pub async fn extract_image(path: &Path, engine: &dyn OcrEngine) -> Result<String, DocmindError> {
    let owned = path.to_path_buf();
    let gray = tokio::task::spawn_blocking(move || {
        let img = image::open(&owned).map_err(|e| DocmindError::Decode {
            path: owned.clone(),
            detail: e.to_string(),
        })?;
        debug!("Decoded {} ({}x{})", owned.display(), img.width(), img.height());
        Ok::<_, DocmindError>(preprocess(&img))
    })
    .await
    .map_err(|e| DocmindError::Internal(format!("image task panicked: {}", e)))??;

    let text = engine.recognize(&gray).await?;
    Ok(text.trim().to_string())
}
