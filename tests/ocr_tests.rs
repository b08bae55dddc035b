//! # OCR Tests Module
//!
//! Configuration defaults, image validation, circuit breaker behavior and
//! error mapping of the Tesseract text detector.

#[cfg(test)]
mod tests {
    use just_nutrition::circuit_breaker::CircuitBreaker;
    use just_nutrition::errors::AppError;
    use just_nutrition::ocr::{
        calculate_retry_delay, clean_transcription, validate_image_with_format_limits,
        TesseractDetector, TextDetector,
    };
    use just_nutrition::ocr_config::{FormatSizeLimits, OcrConfig, PageSegMode, RecoveryConfig};
    use just_nutrition::ocr_errors::OcrError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const JPEG_HEADER: [u8; 12] = [
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01,
    ];

    fn write_temp(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    /// Test OCR configuration defaults
    #[test]
    fn test_ocr_config_defaults() {
        let config = OcrConfig::default();

        assert_eq!(config.languages, "eng");
        assert_eq!(config.tessdata_path, None);
        assert_eq!(config.buffer_size, 32);
        assert_eq!(config.min_format_bytes, 8);
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.psm_mode, PageSegMode::Auto);
        assert!(config.character_whitelist.is_some());
        assert!(config.validate().is_ok());
    }

    /// Test recovery configuration defaults
    #[test]
    fn test_recovery_config_defaults() {
        let recovery = RecoveryConfig::default();

        assert_eq!(recovery.max_retries, 2);
        assert_eq!(recovery.base_retry_delay_ms, 500);
        assert_eq!(recovery.max_retry_delay_ms, 5000);
        assert_eq!(recovery.operation_timeout_secs, 30);
        assert_eq!(recovery.circuit_breaker_threshold, 5);
        assert_eq!(recovery.circuit_breaker_reset_secs, 60);
    }

    /// Test format size limits defaults
    #[test]
    fn test_format_size_limits_defaults() {
        let limits = FormatSizeLimits::default();

        assert_eq!(limits.png_max, 15 * 1024 * 1024);
        assert_eq!(limits.jpeg_max, 10 * 1024 * 1024);
        assert_eq!(limits.bmp_max, 5 * 1024 * 1024);
        assert_eq!(limits.tiff_max, 20 * 1024 * 1024);
        assert_eq!(limits.quick_reject, 50 * 1024 * 1024);
    }

    #[test]
    fn test_page_seg_mode_codes() {
        assert_eq!(PageSegMode::SparseText.as_str(), "11");
        assert_eq!(PageSegMode::from_code(" 4 "), Some(PageSegMode::SingleColumn));
        assert_eq!(PageSegMode::from_code("13"), None);
    }

    /// Invalid configurations are rejected before the detector is built
    #[test]
    fn test_ocr_config_validation() {
        let mut config = OcrConfig {
            languages: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        config.languages = "eng".to_string();
        config.min_format_bytes = 64;
        assert!(config.validate().is_err());

        config.min_format_bytes = 8;
        config.character_whitelist = Some(String::new());
        assert!(config.validate().is_err());
    }

    /// The breaker opens at the threshold and closes again on success
    #[test]
    fn test_circuit_breaker_transitions() {
        let breaker = CircuitBreaker::new(
            "ocr",
            RecoveryConfig {
                circuit_breaker_threshold: 2,
                ..Default::default()
            },
        );

        breaker.record_failure();
        assert!(!breaker.is_open());
        breaker.record_failure();
        assert!(breaker.is_open());
        assert_eq!(breaker.failure_count(), 2);

        breaker.record_success();
        assert!(!breaker.is_open());
        assert_eq!(breaker.failure_count(), 0);
    }

    /// JPEG files use the JPEG limit, unknown formats the general one
    #[test]
    fn test_format_specific_limits() {
        let mut jpeg = JPEG_HEADER.to_vec();
        jpeg.extend(std::iter::repeat(0u8).take(4096));
        let jpeg_file = write_temp(&jpeg);
        let jpeg_path = jpeg_file.path().to_str().unwrap();

        let mut config = OcrConfig::default();
        config.format_limits.jpeg_max = 1024;
        assert!(matches!(
            validate_image_with_format_limits(jpeg_path, &config),
            Err(OcrError::Validation(_))
        ));

        let unknown_file = write_temp(&[0x42u8; 4096]);
        let unknown_path = unknown_file.path().to_str().unwrap();
        config.max_file_size = 8192;
        assert_eq!(
            validate_image_with_format_limits(unknown_path, &config).unwrap(),
            4096
        );
        config.max_file_size = 1024;
        assert!(validate_image_with_format_limits(unknown_path, &config).is_err());
    }

    #[test]
    fn test_quick_reject() {
        let file = write_temp(&[0u8; 2048]);
        let path = file.path().to_str().unwrap();
        let mut config = OcrConfig::default();
        config.format_limits.quick_reject = 1024;

        let err = validate_image_with_format_limits(path, &config).unwrap_err();
        assert!(err.to_string().contains("quick reject"));
    }

    #[test]
    fn test_traversal_path_rejected() {
        let config = OcrConfig::default();
        let result = validate_image_with_format_limits("../../etc/passwd", &config);
        assert!(matches!(result, Err(OcrError::Validation(_))));
    }

    #[test]
    fn test_clean_transcription() {
        let raw = "\n  Nutrition Facts  \n\n\tCalories 250 kcal\n   \nSodium 5mg\n";
        assert_eq!(
            clean_transcription(raw),
            "Nutrition Facts\nCalories 250 kcal\nSodium 5mg"
        );
        assert_eq!(clean_transcription(" \n\t\n"), "");
    }

    #[test]
    fn test_retry_delay_is_capped() {
        let recovery = RecoveryConfig::default();
        let delay = calculate_retry_delay(20, &recovery);
        assert!((5000..=6250).contains(&delay));
    }

    /// OCR errors map onto application categories
    #[test]
    fn test_ocr_error_mapping() {
        let no_text: AppError = OcrError::NoTextFound("blank".to_string()).into();
        assert_eq!(no_text.category(), "no_text_detected");

        let validation: AppError = OcrError::Validation("too big".to_string()).into();
        assert_eq!(validation.category(), "invalid_input");

        let extraction: AppError = OcrError::Extraction("engine".to_string()).into();
        assert_eq!(extraction.category(), "ocr_failed");

        let timeout: AppError = OcrError::Timeout("30s".to_string()).into();
        assert!(timeout.to_string().contains("[OCR_TIMEOUT]"));
    }

    #[test]
    fn test_retryable_errors() {
        assert!(OcrError::Timeout(String::new()).is_retryable());
        assert!(OcrError::ImageLoad(String::new()).is_retryable());
        assert!(!OcrError::Validation(String::new()).is_retryable());
        assert!(!OcrError::NoTextFound(String::new()).is_retryable());
        assert!(!OcrError::Unavailable(String::new()).is_retryable());
    }

    /// Missing files fail validation without touching Tesseract
    #[tokio::test]
    async fn test_detector_rejects_missing_file() {
        let detector = TesseractDetector::new(OcrConfig::default());
        let result = detector.detect("/nonexistent/label.jpg").await;

        assert!(matches!(result, Err(OcrError::Validation(_))));
        assert_eq!(detector.circuit_breaker().failure_count(), 0);
    }
}
