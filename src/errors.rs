//! # Application Error Types
//!
//! This module defines the error types surfaced by the JustNutrition pipeline.
//! The label extractor and the nutrition comparator never fail; every variant
//! here originates in a collaborator (OCR, product search), in configuration,
//! or in caller-supplied input.

use std::fmt;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Configuration validation errors
    Config(String),
    /// Malformed request payload (image path, search query, transcription)
    InvalidInput(String),
    /// The text-detection collaborator recognized no text at all
    NoTextDetected(String),
    /// The product-search collaborator did not complete successfully
    UpstreamUnavailable(String),
    /// OCR processing errors other than "no text"
    Ocr(String),
    /// Internal application errors
    Internal(String),
}

impl AppError {
    /// Stable machine-readable category for the error
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::NoTextDetected(_) => "no_text_detected",
            AppError::UpstreamUnavailable(_) => "upstream_unavailable",
            AppError::Ocr(_) => "ocr_failed",
            AppError::Internal(_) => "internal",
        }
    }

    /// Message suitable for showing to the person who submitted the label
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Config(_) => "The service is misconfigured. Please contact the operator.",
            AppError::InvalidInput(_) => "The request was invalid. Please check the image and search text.",
            AppError::NoTextDetected(_) => {
                "No text was detected in the image. Please try a clearer photo of the nutrition label."
            }
            AppError::UpstreamUnavailable(_) => {
                "Product search is currently unavailable. Please try again later."
            }
            AppError::Ocr(_) => "The image could not be read. Please try another photo.",
            AppError::Internal(_) => "Something went wrong while analyzing the label.",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            AppError::InvalidInput(msg) => write!(f, "[INVALID_INPUT] {}", msg),
            AppError::NoTextDetected(msg) => write!(f, "[NO_TEXT] {}", msg),
            AppError::UpstreamUnavailable(msg) => write!(f, "[UPSTREAM] {}", msg),
            AppError::Ocr(msg) => write!(f, "[OCR] {}", msg),
            AppError::Internal(msg) => write!(f, "[INTERNAL] {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<crate::ocr_errors::OcrError> for AppError {
    fn from(err: crate::ocr_errors::OcrError) -> Self {
        use crate::ocr_errors::OcrError;
        match err {
            OcrError::NoTextFound(_) => AppError::NoTextDetected(err.to_string()),
            OcrError::Validation(_) => AppError::InvalidInput(err.to_string()),
            _ => AppError::Ocr(err.to_string()),
        }
    }
}

impl From<crate::product_search::SearchError> for AppError {
    fn from(err: crate::product_search::SearchError) -> Self {
        AppError::UpstreamUnavailable(err.to_string())
    }
}

impl From<crate::validation::InputError> for AppError {
    fn from(err: crate::validation::InputError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Standardized error logging utilities for consistent error reporting across the application
pub mod error_logging {
    use tracing::error;

    /// Log OCR processing errors with image and processing context
    pub fn log_ocr_error(
        error: &impl std::fmt::Display,
        operation: &str,
        image_size: Option<u64>,
        processing_duration: Option<std::time::Duration>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            image_size_bytes = ?image_size,
            processing_duration_ms = ?processing_duration.map(|d| d.as_millis()),
            "OCR processing failed"
        );
    }

    /// Log product search errors with endpoint context
    pub fn log_search_error(
        error: &impl std::fmt::Display,
        operation: &str,
        endpoint: Option<&str>,
        attempt_count: Option<u32>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            endpoint = ?endpoint,
            attempt_count = ?attempt_count,
            "Product search failed"
        );
    }

    /// Log validation errors with input context
    pub fn log_validation_error(
        error: &impl std::fmt::Display,
        operation: &str,
        input_type: &str,
        input_value: Option<&str>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            input_type = %input_type,
            input_value = ?input_value.map(|v| v.chars().take(100).collect::<String>()),
            "Validation failed"
        );
    }

    /// Log configuration errors during startup/initialization
    pub fn log_config_error(error: &impl std::fmt::Display, config_key: &str, operation: &str) {
        error!(
            error = %error,
            config_key = %config_key,
            operation = %operation,
            "Configuration error"
        );
    }
}
