//! # OCR Configuration Module
//!
//! Configuration for the Tesseract-backed text detector: language and page
//! segmentation, image size limits, and the retry/circuit-breaker policy that
//! is shared with the product-search client.

use crate::errors::{AppError, AppResult};

pub const DEFAULT_LANGUAGES: &str = "eng";
pub const FORMAT_DETECTION_BUFFER_SIZE: usize = 32;
pub const MIN_FORMAT_BYTES: usize = 8;
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB limit for label photos

/// Retry and circuit-breaker settings for a remote or expensive collaborator
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Maximum number of retry attempts after the first one
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    pub base_retry_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_retry_delay_ms: u64,
    /// Timeout for a single attempt in seconds
    pub operation_timeout_secs: u64,
    /// Consecutive failures before the breaker opens
    pub circuit_breaker_threshold: u32,
    /// Seconds the breaker stays open
    pub circuit_breaker_reset_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_retry_delay_ms: 500,
            max_retry_delay_ms: 5000,
            operation_timeout_secs: 30,
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60,
        }
    }
}

impl RecoveryConfig {
    /// Validate recovery configuration parameters
    pub fn validate(&self) -> AppResult<()> {
        if self.base_retry_delay_ms == 0 {
            return Err(AppError::Config(
                "base_retry_delay_ms must be greater than 0".to_string(),
            ));
        }
        if self.max_retry_delay_ms < self.base_retry_delay_ms {
            return Err(AppError::Config(format!(
                "max_retry_delay_ms ({}) must be >= base_retry_delay_ms ({})",
                self.max_retry_delay_ms, self.base_retry_delay_ms
            )));
        }
        if self.operation_timeout_secs == 0 {
            return Err(AppError::Config(
                "operation_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.operation_timeout_secs > 300 {
            return Err(AppError::Config(
                "operation_timeout_secs cannot be greater than 300 seconds".to_string(),
            ));
        }
        if self.circuit_breaker_threshold == 0 {
            return Err(AppError::Config(
                "circuit_breaker_threshold must be greater than 0".to_string(),
            ));
        }
        if self.circuit_breaker_reset_secs == 0 {
            return Err(AppError::Config(
                "circuit_breaker_reset_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Format-specific file size limits for label photos
#[derive(Debug, Clone)]
pub struct FormatSizeLimits {
    pub png_max: u64,
    pub jpeg_max: u64,
    pub bmp_max: u64,
    pub tiff_max: u64,
    /// Files above this size are rejected before format sniffing
    pub quick_reject: u64,
}

impl Default for FormatSizeLimits {
    fn default() -> Self {
        Self {
            png_max: 15 * 1024 * 1024,
            jpeg_max: 10 * 1024 * 1024,
            bmp_max: 5 * 1024 * 1024,
            tiff_max: 20 * 1024 * 1024,
            quick_reject: 50 * 1024 * 1024,
        }
    }
}

impl FormatSizeLimits {
    /// Validate format size limits
    pub fn validate(&self) -> AppResult<()> {
        let limits = [
            ("png_max", self.png_max),
            ("jpeg_max", self.jpeg_max),
            ("bmp_max", self.bmp_max),
            ("tiff_max", self.tiff_max),
            ("quick_reject", self.quick_reject),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(AppError::Config(format!("{} must be greater than 0", name)));
            }
            if name != "quick_reject" && value > self.quick_reject {
                return Err(AppError::Config(format!(
                    "{} ({}) should not exceed quick_reject ({})",
                    name, value, self.quick_reject
                )));
            }
        }
        Ok(())
    }

    /// Size limit for a sniffed image format, `None` when Tesseract cannot read it
    pub fn limit_for(&self, format: image::ImageFormat) -> Option<u64> {
        match format {
            image::ImageFormat::Png => Some(self.png_max),
            image::ImageFormat::Jpeg => Some(self.jpeg_max),
            image::ImageFormat::Bmp => Some(self.bmp_max),
            image::ImageFormat::Tiff => Some(self.tiff_max),
            _ => None,
        }
    }
}

/// Tesseract page segmentation modes useful for nutrition panels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PageSegMode {
    /// Fully automatic page segmentation
    #[default]
    Auto = 3,
    /// Assume a single column of text (narrow vertical panels)
    SingleColumn = 4,
    /// Assume a single uniform block of text
    SingleBlock = 6,
    /// Find as much text as possible in no particular order
    SparseText = 11,
}

impl PageSegMode {
    /// Convert PSM mode to string value for Tesseract
    pub fn as_str(&self) -> &'static str {
        match self {
            PageSegMode::Auto => "3",
            PageSegMode::SingleColumn => "4",
            PageSegMode::SingleBlock => "6",
            PageSegMode::SparseText => "11",
        }
    }

    /// Parse the numeric Tesseract value
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "3" => Some(PageSegMode::Auto),
            "4" => Some(PageSegMode::SingleColumn),
            "6" => Some(PageSegMode::SingleBlock),
            "11" => Some(PageSegMode::SparseText),
            _ => None,
        }
    }
}

/// Configuration structure for OCR processing
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Tesseract language codes
    pub languages: String,
    /// Optional tessdata directory; Tesseract's default lookup when `None`
    pub tessdata_path: Option<String>,
    /// Buffer size for format detection in bytes
    pub buffer_size: usize,
    /// Minimum bytes required for format detection
    pub min_format_bytes: usize,
    /// Maximum allowed file size in bytes (general limit)
    pub max_file_size: u64,
    pub format_limits: FormatSizeLimits,
    pub recovery: RecoveryConfig,
    pub psm_mode: PageSegMode,
    /// Character whitelist restricting OCR output to label-relevant characters
    pub character_whitelist: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: DEFAULT_LANGUAGES.to_string(),
            tessdata_path: None,
            buffer_size: FORMAT_DETECTION_BUFFER_SIZE,
            min_format_bytes: MIN_FORMAT_BYTES,
            max_file_size: MAX_FILE_SIZE,
            format_limits: FormatSizeLimits::default(),
            recovery: RecoveryConfig::default(),
            psm_mode: PageSegMode::default(),
            character_whitelist: Some(
                "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz%/.,:;-()& "
                    .to_string(),
            ),
        }
    }
}

impl OcrConfig {
    /// Validate OCR configuration parameters
    pub fn validate(&self) -> AppResult<()> {
        if self.languages.trim().is_empty() {
            return Err(AppError::Config("languages cannot be empty".to_string()));
        }
        if self.buffer_size == 0 {
            return Err(AppError::Config(
                "buffer_size must be greater than 0".to_string(),
            ));
        }
        if self.min_format_bytes == 0 || self.min_format_bytes > self.buffer_size {
            return Err(AppError::Config(format!(
                "min_format_bytes ({}) must be between 1 and buffer_size ({})",
                self.min_format_bytes, self.buffer_size
            )));
        }
        if self.max_file_size == 0 {
            return Err(AppError::Config(
                "max_file_size must be greater than 0".to_string(),
            ));
        }
        if let Some(whitelist) = &self.character_whitelist {
            if whitelist.is_empty() {
                return Err(AppError::Config(
                    "character_whitelist cannot be empty if provided".to_string(),
                ));
            }
        }

        self.format_limits.validate()?;
        self.recovery.validate()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(unused_assignments)]
    fn test_recovery_config_validation() {
        let mut config = RecoveryConfig::default();
        assert!(config.validate().is_ok());

        config.base_retry_delay_ms = 0;
        assert!(config.validate().is_err());
        config.base_retry_delay_ms = 500;

        config.max_retry_delay_ms = 100;
        assert!(config.validate().is_err());
        config.max_retry_delay_ms = 5000;

        config.operation_timeout_secs = 0;
        assert!(config.validate().is_err());
        config.operation_timeout_secs = 301;
        assert!(config.validate().is_err());
        config.operation_timeout_secs = 30;

        config.circuit_breaker_threshold = 0;
        assert!(config.validate().is_err());
        config.circuit_breaker_threshold = 5;

        // zero retries is a valid "single attempt" policy
        config.max_retries = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_format_size_limits_validation() {
        let mut limits = FormatSizeLimits::default();
        assert!(limits.validate().is_ok());

        limits.png_max = 0;
        assert!(limits.validate().is_err());
        limits.png_max = 15 * 1024 * 1024;

        limits.tiff_max = 60 * 1024 * 1024;
        assert!(limits.validate().is_err());
    }

    #[test]
    fn test_limit_for_supported_formats() {
        let limits = FormatSizeLimits::default();
        assert_eq!(limits.limit_for(image::ImageFormat::Jpeg), Some(10 * 1024 * 1024));
        assert_eq!(limits.limit_for(image::ImageFormat::Gif), None);
    }

    #[test]
    fn test_page_seg_mode_round_trip() {
        for mode in [
            PageSegMode::Auto,
            PageSegMode::SingleColumn,
            PageSegMode::SingleBlock,
            PageSegMode::SparseText,
        ] {
            assert_eq!(PageSegMode::from_code(mode.as_str()), Some(mode));
        }
        assert_eq!(PageSegMode::from_code("13"), None);
    }

    #[test]
    fn test_ocr_config_validation() {
        let mut config = OcrConfig::default();
        assert!(config.validate().is_ok());

        config.languages = "  ".to_string();
        assert!(config.validate().is_err());
        config.languages = "eng".to_string();

        config.min_format_bytes = 64;
        assert!(config.validate().is_err());
        config.min_format_bytes = 8;

        config.character_whitelist = Some(String::new());
        assert!(config.validate().is_err());
    }
}
