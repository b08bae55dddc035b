//! # Label Analysis Pipeline
//!
//! Runs one label through detection, extraction, analysis, product search and
//! comparison, and maps collaborator failures onto [`AppError`] categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn, Instrument};

use crate::analysis;
use crate::comparator::{self, ComparedProduct};
use crate::config::AppConfig;
use crate::errors::{error_logging, AppError, AppResult};
use crate::label_extractor::{ExtractorConfig, LabelExtractor, NutritionRecord};
use crate::observability;
use crate::ocr::{TesseractDetector, TextDetector};
use crate::product_search::{HttpProductSearch, ProductSearch};
use crate::validation;

/// Everything learned from one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelReport {
    pub transcription: String,
    pub record: NutritionRecord,
    pub ingredients: Option<String>,
    pub allergens: Vec<String>,
    pub concerns: Vec<String>,
    pub summary: String,
    pub candidates: Vec<ComparedProduct>,
    pub generated_at: DateTime<Utc>,
}

/// Orchestrates the text detector, extractor and product search
pub struct NutritionPipeline {
    detector: Arc<dyn TextDetector>,
    search: Arc<dyn ProductSearch>,
    extractor: LabelExtractor,
}

impl NutritionPipeline {
    pub fn new(
        detector: Arc<dyn TextDetector>,
        search: Arc<dyn ProductSearch>,
        extractor_config: ExtractorConfig,
    ) -> AppResult<Self> {
        Ok(Self {
            detector,
            search,
            extractor: LabelExtractor::with_config(extractor_config)?,
        })
    }

    /// Build the pipeline with Tesseract and the HTTP product search
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        config.validate()?;
        let detector = Arc::new(TesseractDetector::new(config.ocr.clone()));
        let search = Arc::new(HttpProductSearch::new(config.search.clone())?);
        Self::new(detector, search, config.extractor.clone())
    }

    /// Analyze a label photo
    pub async fn analyze_image(
        &self,
        image_path: &str,
        query: Option<&str>,
    ) -> AppResult<LabelReport> {
        let span = observability::pipeline_span("image");
        async {
            let query = Self::validated_query(query)?;
            if let Err(err) = validation::validate_image_path(image_path) {
                error_logging::log_validation_error(
                    &err,
                    "analyze_image",
                    "image_path",
                    Some(image_path),
                );
                return Err(Self::fail(err.into()));
            }

            let transcription = self
                .detector
                .detect(image_path)
                .await
                .map_err(|err| Self::fail(err.into()))?;

            self.build_report(transcription, query).await
        }
        .instrument(span)
        .await
    }

    /// Analyze a transcription that was produced elsewhere
    pub async fn analyze_text(
        &self,
        transcription: &str,
        query: Option<&str>,
    ) -> AppResult<LabelReport> {
        let span = observability::pipeline_span("text");
        async {
            let query = Self::validated_query(query)?;
            if let Err(err) = validation::validate_transcription(transcription) {
                error_logging::log_validation_error(&err, "analyze_text", "transcription", None);
                return Err(Self::fail(err.into()));
            }

            self.build_report(transcription.to_string(), query).await
        }
        .instrument(span)
        .await
    }

    fn validated_query(query: Option<&str>) -> AppResult<Option<&str>> {
        query
            .map(|raw| {
                validation::validate_search_query(raw).map_err(|err| {
                    error_logging::log_validation_error(&err, "search_query", "query", Some(raw));
                    Self::fail(err.into())
                })
            })
            .transpose()
    }

    fn fail(err: AppError) -> AppError {
        observability::record_error_metrics(err.category(), "pipeline");
        err
    }

    async fn build_report(
        &self,
        transcription: String,
        query: Option<&str>,
    ) -> AppResult<LabelReport> {
        let start_time = Instant::now();

        if !analysis::has_nutrition_keywords(&transcription) {
            warn!("Transcription does not look like a nutrition label");
        }

        let record = self.extractor.extract(&transcription);
        let ingredients = analysis::extract_ingredients(&transcription);
        let allergens = ingredients
            .as_deref()
            .map(analysis::detect_allergens)
            .unwrap_or_default();
        let concerns = analysis::nutritional_concerns(&record);
        let summary = analysis::summarize(&record, ingredients.as_deref());

        let candidates = match query {
            Some(query) => {
                let products = self
                    .search
                    .search(query)
                    .await
                    .map_err(|err| Self::fail(err.into()))?;
                comparator::compare(&record, &products)
            }
            None => Vec::new(),
        };

        info!(
            fields_found = record.found_count(),
            allergens = allergens.len(),
            candidates = candidates.len(),
            duration_ms = start_time.elapsed().as_millis() as u64,
            "Label analysis completed"
        );

        Ok(LabelReport {
            transcription,
            record,
            ingredients,
            allergens,
            concerns,
            summary,
            candidates,
            generated_at: Utc::now(),
        })
    }
}
