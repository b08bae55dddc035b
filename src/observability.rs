//! Observability module for tracing setup and metrics recording.
//!
//! This module provides:
//! - Structured logging with configurable level and format
//! - Span helpers for the OCR, search and pipeline stages
//! - `metrics` counters and histograms for each stage
//!
//! No metrics exporter is installed here; without a recorder the `metrics`
//! macros are no-ops.

use std::time::Duration;

use anyhow::Result;
use tracing_subscriber::prelude::*;

use crate::observability_config::ObservabilityConfig;

/// Initialize structured logging with tracing and configuration
pub fn init_tracing_with_config(config: &ObservabilityConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("just_nutrition={}", config.log_level).parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("hyper=warn".parse()?);

    if config.use_pretty_output() {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        "Tracing initialized with structured logging"
    );
    Ok(())
}

/// Create a span for OCR operations
pub fn ocr_span(operation: &str) -> tracing::Span {
    tracing::info_span!("ocr_operation", operation = operation, component = "ocr")
}

/// Create a span for product search requests
pub fn search_span(operation: &str, query: &str) -> tracing::Span {
    tracing::info_span!(
        "search_operation",
        operation = operation,
        query = query,
        component = "product_search"
    )
}

/// Create a span for one end-to-end label analysis
pub fn pipeline_span(source: &str) -> tracing::Span {
    tracing::info_span!("label_analysis", source = source, component = "pipeline")
}

/// Record OCR operation metrics
///
/// `result` is `success`, `no_text` (recognition ran but found nothing) or
/// `failure`.
pub fn record_ocr_metrics(
    result: &'static str,
    duration: Duration,
    image_size: u64,
    attempt_count: u32,
) {
    metrics::counter!("ocr_operations_total", "result" => result).increment(1);
    metrics::histogram!("ocr_duration_seconds").record(duration.as_secs_f64());
    metrics::histogram!("ocr_image_size_bytes").record(image_size as f64);
    metrics::histogram!("ocr_retry_attempts").record(attempt_count as f64);
}

/// Record product search metrics
pub fn record_search_metrics(
    success: bool,
    duration: Duration,
    products_returned: usize,
    attempt_count: u32,
) {
    metrics::counter!("product_search_requests_total", "result" => if success { "success" } else { "failure" }).increment(1);
    metrics::histogram!("product_search_duration_seconds").record(duration.as_secs_f64());
    metrics::histogram!("product_search_results").record(products_returned as f64);
    metrics::histogram!("product_search_attempts").record(attempt_count as f64);
}

/// Record label extraction metrics
pub fn record_extraction_metrics(duration: Duration, text_length: usize, fields_found: usize) {
    metrics::counter!("label_extractions_total").increment(1);
    metrics::histogram!("label_extraction_duration_seconds").record(duration.as_secs_f64());
    metrics::histogram!("label_extraction_input_length").record(text_length as f64);
    metrics::histogram!("label_extraction_fields_found").record(fields_found as f64);

    // Characters processed per second
    let throughput = if duration.as_secs_f64() > 0.0 {
        text_length as f64 / duration.as_secs_f64()
    } else {
        0.0
    };
    metrics::histogram!("label_extraction_throughput_chars_per_sec").record(throughput);
}

/// Record nutrition comparison metrics
pub fn record_comparison_metrics(
    duration: Duration,
    candidates: usize,
    computed_dimensions: usize,
) {
    metrics::counter!("nutrition_comparisons_total").increment(1);
    metrics::histogram!("nutrition_comparison_duration_seconds").record(duration.as_secs_f64());
    metrics::histogram!("nutrition_comparison_candidates").record(candidates as f64);
    metrics::histogram!("nutrition_comparison_computed_dimensions")
        .record(computed_dimensions as f64);
}

/// Record a failure by category and component
pub fn record_error_metrics(category: &'static str, component: &'static str) {
    metrics::counter!("errors_total", "category" => category, "component" => component)
        .increment(1);
}

/// Update circuit breaker state metric
pub fn update_circuit_breaker_state(breaker: &'static str, is_open: bool) {
    metrics::gauge!("circuit_breaker_state", "breaker" => breaker)
        .set(if is_open { 1.0 } else { 0.0 });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_ocr_metrics("no_text", Duration::from_millis(120), 2048, 1);
        record_search_metrics(false, Duration::from_millis(30), 0, 3);
        record_extraction_metrics(Duration::ZERO, 0, 0);
        record_comparison_metrics(Duration::from_micros(5), 2, 7);
        record_error_metrics("ocr_failed", "ocr");
        update_circuit_breaker_state("ocr", true);
    }

    #[test]
    fn test_spans_carry_names() {
        let span = search_span("search", "granola");
        // Disabled without a subscriber, but the metadata is still attached
        if let Some(metadata) = span.metadata() {
            assert_eq!(metadata.name(), "search_operation");
        }
        let _ = ocr_span("detect");
        let _ = pipeline_span("image");
    }
}
