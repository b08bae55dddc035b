//! # Unified Application Configuration
//!
//! Collects the OCR, product-search, extractor and observability settings
//! into one object loaded from environment variables and validated before
//! anything is constructed from it.

use crate::errors::{AppError, AppResult};
use crate::label_extractor::ExtractorConfig;
use crate::observability_config::ObservabilityConfig;
use crate::ocr_config::{OcrConfig, PageSegMode, DEFAULT_LANGUAGES, MAX_FILE_SIZE};
use crate::product_search::{
    SearchConfig, DEFAULT_PAGE_SIZE, DEFAULT_SEARCH_ENDPOINT, DEFAULT_SEARCH_TIMEOUT_SECS,
};
use std::env;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub ocr: OcrConfig,
    pub search: SearchConfig,
    pub extractor: ExtractorConfig,
    pub observability: ObservabilityConfig,
}

/// Parse an optional variable, falling back to `default` when unset
fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> AppResult<T> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} must be a valid value, got '{}'", key, raw))),
        None => Ok(default),
    }
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> AppResult<bool> {
    match lookup(key).map(|raw| raw.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(value) => match value.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(AppError::Config(format!(
                "{} must be true or false, got '{}'",
                key, value
            ))),
        },
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let mut config = Self::default();

        // OCR
        config.ocr.languages =
            lookup("OCR_LANGUAGES").unwrap_or_else(|| DEFAULT_LANGUAGES.to_string());
        config.ocr.max_file_size = parse_var(&lookup, "OCR_MAX_FILE_SIZE", MAX_FILE_SIZE)?;
        config.ocr.recovery.operation_timeout_secs = parse_var(
            &lookup,
            "OCR_TIMEOUT_SECS",
            config.ocr.recovery.operation_timeout_secs,
        )?;
        config.ocr.recovery.max_retries =
            parse_var(&lookup, "OCR_MAX_RETRIES", config.ocr.recovery.max_retries)?;
        if let Some(raw) = lookup("OCR_PSM") {
            config.ocr.psm_mode = PageSegMode::from_code(&raw).ok_or_else(|| {
                AppError::Config(format!(
                    "OCR_PSM must be one of 3, 4, 6 or 11, got '{}'",
                    raw
                ))
            })?;
        }

        // Product search
        config.search.endpoint = lookup("PRODUCT_SEARCH_ENDPOINT")
            .unwrap_or_else(|| DEFAULT_SEARCH_ENDPOINT.to_string());
        config.search.api_key = lookup("PRODUCT_SEARCH_API_KEY");
        config.search.timeout_secs = parse_var(
            &lookup,
            "PRODUCT_SEARCH_TIMEOUT_SECS",
            DEFAULT_SEARCH_TIMEOUT_SECS,
        )?;
        config.search.page_size =
            parse_var(&lookup, "PRODUCT_SEARCH_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;

        // Extraction
        config.extractor.normalize_ocr_units = parse_flag(&lookup, "NORMALIZE_OCR_UNITS")?;

        // Observability
        config.observability = ObservabilityConfig::from_lookup(&lookup);

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> AppResult<()> {
        self.ocr.validate()?;
        self.search.validate()?;
        self.extractor.validate()?;
        self.observability.validate()?;
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: ocr_languages={}, ocr_psm={}, ocr_timeout_secs={}, search_endpoint={}, search_api_key={}, page_size={}, normalize_ocr_units={}, environment={}",
            self.ocr.languages,
            self.ocr.psm_mode.as_str(),
            self.ocr.recovery.operation_timeout_secs,
            self.search.endpoint,
            if self.search.api_key.is_some() { "[REDACTED]" } else { "none" },
            self.search.page_size,
            self.extractor.normalize_ocr_units,
            self.observability.environment
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppResult<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = config_from(&[]).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.ocr.languages, "eng");
        assert_eq!(config.search.page_size, DEFAULT_PAGE_SIZE);
        assert!(!config.extractor.normalize_ocr_units);
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = config_from(&[
            ("OCR_LANGUAGES", "eng+fra"),
            ("OCR_TIMEOUT_SECS", "45"),
            ("OCR_MAX_RETRIES", "0"),
            ("PRODUCT_SEARCH_ENDPOINT", "https://catalog.example/search"),
            ("PRODUCT_SEARCH_PAGE_SIZE", "12"),
            ("NORMALIZE_OCR_UNITS", "true"),
            ("LOG_LEVEL", "debug"),
        ])
        .unwrap();
        assert_eq!(config.ocr.languages, "eng+fra");
        assert_eq!(config.ocr.recovery.operation_timeout_secs, 45);
        assert_eq!(config.ocr.recovery.max_retries, 0);
        assert_eq!(config.search.endpoint, "https://catalog.example/search");
        assert_eq!(config.search.page_size, 12);
        assert!(config.extractor.normalize_ocr_units);
        assert_eq!(config.observability.log_level, "debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unparsable_number_is_config_error() {
        let result = config_from(&[("PRODUCT_SEARCH_TIMEOUT_SECS", "soon")]);
        assert!(matches!(result, Err(AppError::Config(_))));

        let result = config_from(&[("NORMALIZE_OCR_UNITS", "maybe")]);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_page_segmentation_mode_from_env() {
        let config = config_from(&[("OCR_PSM", "11")]).unwrap();
        assert_eq!(config.ocr.psm_mode, PageSegMode::SparseText);

        let config = config_from(&[]).unwrap();
        assert_eq!(config.ocr.psm_mode, PageSegMode::Auto);

        let result = config_from(&[("OCR_PSM", "13")]);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_validation_catches_bad_sections() {
        let config = config_from(&[("OCR_TIMEOUT_SECS", "0")]).unwrap();
        assert!(config.validate().is_err());

        let config = config_from(&[("PRODUCT_SEARCH_ENDPOINT", "catalog.local")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_summary_redacts_api_key() {
        let config = config_from(&[("PRODUCT_SEARCH_API_KEY", "secret-key-123")]).unwrap();
        let summary = config.summary();
        assert!(summary.contains("search_api_key=[REDACTED]"));
        assert!(!summary.contains("secret-key-123"));
    }
}
