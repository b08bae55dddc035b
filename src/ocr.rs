//! # OCR Processing Module
//!
//! Text detection for nutrition-label photos using the Tesseract OCR engine.
//!
//! ## Features
//!
//! - [`TextDetector`] trait so the pipeline can run against any detector
//! - [`TesseractDetector`], backed by one lazily created Tesseract instance
//! - Image validation with format sniffing and format-specific size limits
//! - Retries with exponential backoff, per-attempt timeouts and a circuit breaker
//!
//! ## Supported Image Formats
//!
//! PNG, JPEG, BMP and TIFF. Other formats fall back to the general size limit
//! and are left for Tesseract to accept or reject.

use async_trait::async_trait;
use leptess::LepTess;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufReader, Read};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn, Instrument};

use crate::circuit_breaker::CircuitBreaker;
use crate::errors::error_logging;
use crate::observability;
use crate::ocr_config::{OcrConfig, RecoveryConfig};
use crate::ocr_errors::OcrError;

/// Turns a label photo into a transcription
///
/// Implementations return [`OcrError::NoTextFound`] when recognition worked
/// but produced no text.
#[async_trait]
pub trait TextDetector: Send + Sync {
    async fn detect(&self, image_path: &str) -> Result<String, OcrError>;
}

/// Validate an image before it is handed to Tesseract
///
/// Returns the file size in bytes.
pub fn validate_image_with_format_limits(
    image_path: &str,
    config: &OcrConfig,
) -> Result<u64, OcrError> {
    crate::validation::validate_image_path(image_path)
        .map_err(|e| OcrError::Validation(e.to_string()))?;

    let path = std::path::Path::new(image_path);
    if !path.exists() {
        return Err(OcrError::Validation(format!(
            "file does not exist ({})",
            image_path
        )));
    }
    if !path.is_file() {
        return Err(OcrError::Validation(format!(
            "path is not a file ({})",
            image_path
        )));
    }

    let file_size = path
        .metadata()
        .map_err(|e| OcrError::Validation(format!("cannot read file metadata: {}", e)))?
        .len();

    if file_size == 0 {
        return Err(OcrError::Validation(format!("file is empty ({})", image_path)));
    }

    if file_size > config.format_limits.quick_reject {
        info!(
            image_path = %image_path,
            file_size,
            "Quick rejecting file above threshold"
        );
        return Err(OcrError::Validation(format!(
            "file too large for processing: {} bytes (quick reject threshold {} bytes)",
            file_size, config.format_limits.quick_reject
        )));
    }

    let file = File::open(image_path)
        .map_err(|e| OcrError::Validation(format!("cannot open image file: {}", e)))?;
    let mut reader = BufReader::new(file);
    let mut buffer = vec![0; config.buffer_size];
    let bytes_read = reader
        .read(&mut buffer)
        .map_err(|e| OcrError::Validation(format!("cannot read image header: {}", e)))?;
    buffer.truncate(bytes_read);

    let sniffed = if bytes_read >= config.min_format_bytes {
        image::guess_format(&buffer).ok()
    } else {
        None
    };

    let limit = match sniffed.and_then(|format| config.format_limits.limit_for(format)) {
        Some(format_limit) => format_limit,
        None => {
            debug!(
                image_path = %image_path,
                format = ?sniffed,
                "No format-specific limit, using general size limit"
            );
            config.max_file_size
        }
    };

    if file_size > limit {
        return Err(OcrError::Validation(format!(
            "image file too large for {:?} format: {} bytes (maximum allowed: {} bytes)",
            sniffed, file_size, limit
        )));
    }

    debug!(image_path = %image_path, format = ?sniffed, file_size, "Image validated");
    Ok(file_size)
}

/// Calculate retry delay with exponential backoff
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay)
/// final_delay = delay + random(0, delay/4)
/// ```
///
/// `attempt` is 1-based (first retry = 1).
///
/// ```rust
/// use just_nutrition::ocr::calculate_retry_delay;
/// use just_nutrition::ocr_config::RecoveryConfig;
///
/// let config = RecoveryConfig::default();
/// let delay = calculate_retry_delay(2, &config);
/// assert!(delay >= 1000 && delay <= 1250);
/// ```
pub fn calculate_retry_delay(attempt: u32, recovery: &RecoveryConfig) -> u64 {
    let exponent = attempt.saturating_sub(1).min(31);
    let delay = recovery
        .base_retry_delay_ms
        .saturating_mul(1u64 << exponent)
        .min(recovery.max_retry_delay_ms);

    let jitter_range = delay / 4;
    if jitter_range == 0 {
        return delay;
    }
    delay + rand::random::<u64>() % jitter_range
}

/// Trim every line and drop blank ones
///
/// ```rust
/// use just_nutrition::ocr::clean_transcription;
///
/// assert_eq!(clean_transcription("  Calories 250 \n\n  Fat 3g  "), "Calories 250\nFat 3g");
/// ```
pub fn clean_transcription(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<&str>>()
        .join("\n")
}

/// Clean raw engine output; blank output is [`OcrError::NoTextFound`]
fn finish_transcription(raw: &str, image_path: &str) -> Result<String, OcrError> {
    let text = clean_transcription(raw);
    if text.is_empty() {
        return Err(OcrError::NoTextFound(format!(
            "no text recognized in {}",
            image_path
        )));
    }
    Ok(text)
}

/// Metrics label for a finished recognition run
fn outcome_label(result: &Result<String, OcrError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(OcrError::NoTextFound(_)) => "no_text",
        Err(_) => "failure",
    }
}

fn create_engine(config: &OcrConfig) -> Result<LepTess, OcrError> {
    info!(
        languages = %config.languages,
        tessdata_path = ?config.tessdata_path,
        "Creating Tesseract instance"
    );

    let mut tess = LepTess::new(config.tessdata_path.as_deref(), &config.languages)
        .map_err(|e| OcrError::Initialization(format!("failed to initialize Tesseract: {}", e)))?;

    tess.set_variable(leptess::Variable::TesseditPagesegMode, config.psm_mode.as_str())
        .map_err(|e| OcrError::Initialization(format!("failed to set PSM mode: {}", e)))?;

    if let Some(whitelist) = &config.character_whitelist {
        tess.set_variable(leptess::Variable::TesseditCharWhitelist, whitelist)
            .map_err(|e| {
                OcrError::Initialization(format!("failed to set character whitelist: {}", e))
            })?;
    }

    Ok(tess)
}

/// Tesseract-backed [`TextDetector`]
pub struct TesseractDetector {
    config: OcrConfig,
    engine: Arc<Mutex<Option<LepTess>>>,
    circuit_breaker: CircuitBreaker,
}

impl TesseractDetector {
    /// Create a detector; the Tesseract instance is created on first use
    pub fn new(config: OcrConfig) -> Self {
        let circuit_breaker = CircuitBreaker::new("ocr", config.recovery.clone());
        Self {
            config,
            engine: Arc::new(Mutex::new(None)),
            circuit_breaker,
        }
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    /// One recognition attempt under the configured timeout
    async fn run_attempt(&self, image_path: &str) -> Result<String, OcrError> {
        let engine = Arc::clone(&self.engine);
        let config = self.config.clone();
        let path = image_path.to_string();
        let timeout_secs = self.config.recovery.operation_timeout_secs;

        let task = tokio::task::spawn_blocking(move || -> Result<String, OcrError> {
            let mut guard = engine.lock();
            if guard.is_none() {
                *guard = Some(create_engine(&config)?);
            }
            let Some(tess) = guard.as_mut() else {
                return Err(OcrError::Initialization(
                    "Tesseract instance missing after creation".to_string(),
                ));
            };

            tess.set_image(&path)
                .map_err(|e| OcrError::ImageLoad(format!("failed to load image: {}", e)))?;
            tess.get_utf8_text()
                .map_err(|e| OcrError::Extraction(format!("failed to extract text: {}", e)))
        });

        match tokio::time::timeout(Duration::from_secs(timeout_secs), task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(OcrError::Extraction(format!(
                "OCR worker failed: {}",
                join_error
            ))),
            Err(_) => Err(OcrError::Timeout(format!(
                "OCR operation timed out after {} seconds",
                timeout_secs
            ))),
        }
    }

    async fn detect_with_retries(&self, image_path: &str) -> Result<String, OcrError> {
        let start_time = Instant::now();

        if self.circuit_breaker.is_open() {
            warn!(image_path = %image_path, "Circuit breaker is open, rejecting OCR request");
            return Err(OcrError::Unavailable(
                "OCR is temporarily unavailable due to repeated failures".to_string(),
            ));
        }

        let image_size = validate_image_with_format_limits(image_path, &self.config)?;

        let max_attempts = self.config.recovery.max_retries + 1;
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.run_attempt(image_path).await {
                Ok(raw) => {
                    self.circuit_breaker.record_success();
                    let result = finish_transcription(&raw, image_path);
                    let duration = start_time.elapsed();
                    observability::record_ocr_metrics(
                        outcome_label(&result),
                        duration,
                        image_size,
                        attempt,
                    );

                    match &result {
                        Ok(text) => info!(
                            attempt,
                            duration_ms = duration.as_millis() as u64,
                            characters = text.len(),
                            "OCR extraction completed"
                        ),
                        Err(_) => {
                            info!(image_path = %image_path, attempt, "OCR finished without text")
                        }
                    }
                    return result;
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay_ms = calculate_retry_delay(attempt, &self.config.recovery);
                    warn!(attempt, delay_ms, error = %err, "OCR attempt failed, retrying");
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(err) => {
                    let duration = start_time.elapsed();
                    if err.is_retryable() {
                        self.circuit_breaker.record_failure();
                    }
                    observability::record_ocr_metrics("failure", duration, image_size, attempt);
                    error_logging::log_ocr_error(
                        &err,
                        "detect",
                        Some(image_size),
                        Some(duration),
                    );
                    return Err(err);
                }
            }
        }
    }
}

#[async_trait]
impl TextDetector for TesseractDetector {
    async fn detect(&self, image_path: &str) -> Result<String, OcrError> {
        let span = observability::ocr_span("detect");
        self.detect_with_retries(image_path).instrument(span).await
    }
}
