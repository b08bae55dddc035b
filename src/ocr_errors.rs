//! # OCR Error Types Module
//!
//! Error type returned by text-detection collaborators.

/// Failure modes of a text-detection call
#[derive(Debug, Clone, PartialEq)]
pub enum OcrError {
    /// Image path or file validation errors
    Validation(String),
    /// OCR engine initialization errors
    Initialization(String),
    /// Image loading errors
    ImageLoad(String),
    /// Text extraction errors
    Extraction(String),
    /// Recognition succeeded but produced no text
    NoTextFound(String),
    /// Timeout errors
    Timeout(String),
    /// Circuit breaker is open
    Unavailable(String),
}

impl OcrError {
    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OcrError::Initialization(_)
                | OcrError::ImageLoad(_)
                | OcrError::Extraction(_)
                | OcrError::Timeout(_)
        )
    }
}

impl std::fmt::Display for OcrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcrError::Validation(msg) => write!(f, "[VALIDATION] Image validation failed: {}", msg),
            OcrError::Initialization(msg) => write!(f, "[OCR_INIT] OCR engine initialization failed: {}", msg),
            OcrError::ImageLoad(msg) => write!(f, "[IMAGE_LOAD] Failed to load image for OCR processing: {}", msg),
            OcrError::Extraction(msg) => write!(f, "[OCR_EXTRACT] Text extraction from image failed: {}", msg),
            OcrError::NoTextFound(msg) => write!(f, "[OCR_NO_TEXT] No text detected: {}", msg),
            OcrError::Timeout(msg) => write!(f, "[OCR_TIMEOUT] OCR processing timed out: {}", msg),
            OcrError::Unavailable(msg) => write!(f, "[OCR_UNAVAILABLE] OCR temporarily unavailable: {}", msg),
        }
    }
}

impl std::error::Error for OcrError {}

impl From<anyhow::Error> for OcrError {
    fn from(err: anyhow::Error) -> Self {
        OcrError::Extraction(err.to_string())
    }
}
