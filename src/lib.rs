//! # JustNutrition
//!
//! Reads nutrition facts from a label photo (OCR), extracts the standard
//! nutrition fields, checks ingredients for allergens and compares the label
//! against catalog products returned by a product search.

pub mod analysis;
pub mod circuit_breaker;
pub mod comparator;
pub mod config;
pub mod errors;
pub mod label_extractor;
pub mod observability;
pub mod observability_config;
pub mod ocr;
pub mod ocr_config;
pub mod ocr_errors;
pub mod pipeline;
pub mod product_search;
pub mod validation;

// Re-export types for easier access
pub use comparator::{compare, CandidateProduct, ComparedProduct, ComparisonResult};
pub use label_extractor::{extract, LabelExtractor, NutritionField, NutritionRecord};
pub use pipeline::{LabelReport, NutritionPipeline};
