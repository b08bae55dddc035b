//! # Label Extractor Module
//!
//! Converts a raw OCR transcription of a nutrition-facts panel into a
//! [`NutritionRecord`] using one regex rule per field.
//!
//! ## Features
//!
//! - Twelve named field rules of the form `<label phrase>.*?(<value>)`
//! - Case-insensitive matching (input is lower-cased once, rules are written in lower case)
//! - Label and value may sit on different OCR lines
//! - Per-field accepted unit sets; values without a unit are not matched
//! - Optional repair of common OCR unit misreads (`m9` → `mg`, `9` → `g`, `ozz` → `oz`)
//!
//! Extraction never fails: a field whose rule does not match stays `None`.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, trace, warn};

use crate::errors::{AppError, AppResult};

/// Number with an optional decimal part
const NUMBER_PATTERN: &str = r"\d+(?:\.\d+)?";

const ENERGY_UNITS: &[&str] = &["kcal", "calories", "cal"];
const MASS_UNITS: &[&str] = &["mg", "g"];
const SERVING_UNITS: &[&str] = &["tbsp", "cups", "cup", "ml", "oz", "g"];

/// One named slot of a nutrition-facts panel
///
/// Declaration order is also the order rules are applied in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NutritionField {
    Calories,
    TotalFat,
    SaturatedFat,
    TransFat,
    Cholesterol,
    Sodium,
    TotalCarbohydrates,
    DietaryFiber,
    Sugars,
    Protein,
    ServingSize,
    ServingsPerContainer,
}

impl NutritionField {
    pub const ALL: [NutritionField; 12] = [
        NutritionField::Calories,
        NutritionField::TotalFat,
        NutritionField::SaturatedFat,
        NutritionField::TransFat,
        NutritionField::Cholesterol,
        NutritionField::Sodium,
        NutritionField::TotalCarbohydrates,
        NutritionField::DietaryFiber,
        NutritionField::Sugars,
        NutritionField::Protein,
        NutritionField::ServingSize,
        NutritionField::ServingsPerContainer,
    ];

    /// Serialized field name
    pub fn name(&self) -> &'static str {
        match self {
            NutritionField::Calories => "calories",
            NutritionField::TotalFat => "total_fat",
            NutritionField::SaturatedFat => "saturated_fat",
            NutritionField::TransFat => "trans_fat",
            NutritionField::Cholesterol => "cholesterol",
            NutritionField::Sodium => "sodium",
            NutritionField::TotalCarbohydrates => "total_carbohydrates",
            NutritionField::DietaryFiber => "dietary_fiber",
            NutritionField::Sugars => "sugars",
            NutritionField::Protein => "protein",
            NutritionField::ServingSize => "serving_size",
            NutritionField::ServingsPerContainer => "servings_per_container",
        }
    }

    /// Lower-case textual cue printed on the label
    pub fn label_phrase(&self) -> &'static str {
        match self {
            NutritionField::Calories => "calories",
            NutritionField::TotalFat => "total fat",
            NutritionField::SaturatedFat => "saturated fat",
            NutritionField::TransFat => "trans fat",
            NutritionField::Cholesterol => "cholesterol",
            NutritionField::Sodium => "sodium",
            NutritionField::TotalCarbohydrates => "total carbohydrate",
            NutritionField::DietaryFiber => "dietary fiber",
            NutritionField::Sugars => "sugars",
            NutritionField::Protein => "protein",
            NutritionField::ServingSize => "serving size",
            NutritionField::ServingsPerContainer => "servings per container",
        }
    }

    /// Units accepted after the number; empty means a bare number
    pub fn accepted_units(&self) -> &'static [&'static str] {
        match self {
            NutritionField::Calories => ENERGY_UNITS,
            NutritionField::ServingSize => SERVING_UNITS,
            NutritionField::ServingsPerContainer => &[],
            _ => MASS_UNITS,
        }
    }
}

/// Build the extraction rule for a single field
///
/// The rule is `(?s)<label>.*?(<number>\s?(?:<units>)\b)`: `(?s)` lets `.`
/// cross OCR line breaks, `.*?` keeps the value as close to the first label
/// occurrence as possible, and the trailing `\b` stops `g` from matching the
/// start of `grams`. Units are listed longest first so alternation never
/// settles on a prefix.
pub fn build_field_pattern(field: NutritionField) -> String {
    let label = regex::escape(field.label_phrase());
    let units = field.accepted_units();

    let value = if units.is_empty() {
        NUMBER_PATTERN.to_string()
    } else {
        let alternation = units
            .iter()
            .map(|unit| regex::escape(unit))
            .collect::<Vec<_>>()
            .join("|");
        format!(r"{}\s?(?:{})\b", NUMBER_PATTERN, alternation)
    };

    format!(r"(?s){}.*?({})", label, value)
}

lazy_static! {
    static ref FIELD_RULES: Vec<(NutritionField, Regex)> = NutritionField::ALL
        .iter()
        .map(|field| {
            let regex = Regex::new(&build_field_pattern(*field))
                .expect("Nutrition field pattern should be valid");
            (*field, regex)
        })
        .collect();

    static ref OCR_UNIT_FIXES: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"\b(\d+)\s*m9\b").expect("m9 fix pattern should be valid"), "$1 mg"),
        (Regex::new(r"\b(\d+)\s*9\b").expect("9 fix pattern should be valid"), "$1 g"),
        (Regex::new(r"\b(\d+)\s*ozz\b").expect("ozz fix pattern should be valid"), "$1 oz"),
    ];
}

/// Structured nutrition facts extracted from one transcription
///
/// Each field holds the raw matched text (e.g. `"12g"`, `"250 kcal"`) or
/// `None` when the label was not found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionRecord {
    pub calories: Option<String>,
    pub total_fat: Option<String>,
    pub saturated_fat: Option<String>,
    pub trans_fat: Option<String>,
    pub cholesterol: Option<String>,
    pub sodium: Option<String>,
    pub total_carbohydrates: Option<String>,
    pub dietary_fiber: Option<String>,
    pub sugars: Option<String>,
    pub protein: Option<String>,
    pub serving_size: Option<String>,
    pub servings_per_container: Option<String>,
}

impl NutritionRecord {
    /// Raw value of a field
    pub fn get(&self, field: NutritionField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    fn slot(&self, field: NutritionField) -> &Option<String> {
        match field {
            NutritionField::Calories => &self.calories,
            NutritionField::TotalFat => &self.total_fat,
            NutritionField::SaturatedFat => &self.saturated_fat,
            NutritionField::TransFat => &self.trans_fat,
            NutritionField::Cholesterol => &self.cholesterol,
            NutritionField::Sodium => &self.sodium,
            NutritionField::TotalCarbohydrates => &self.total_carbohydrates,
            NutritionField::DietaryFiber => &self.dietary_fiber,
            NutritionField::Sugars => &self.sugars,
            NutritionField::Protein => &self.protein,
            NutritionField::ServingSize => &self.serving_size,
            NutritionField::ServingsPerContainer => &self.servings_per_container,
        }
    }

    fn slot_mut(&mut self, field: NutritionField) -> &mut Option<String> {
        match field {
            NutritionField::Calories => &mut self.calories,
            NutritionField::TotalFat => &mut self.total_fat,
            NutritionField::SaturatedFat => &mut self.saturated_fat,
            NutritionField::TransFat => &mut self.trans_fat,
            NutritionField::Cholesterol => &mut self.cholesterol,
            NutritionField::Sodium => &mut self.sodium,
            NutritionField::TotalCarbohydrates => &mut self.total_carbohydrates,
            NutritionField::DietaryFiber => &mut self.dietary_fiber,
            NutritionField::Sugars => &mut self.sugars,
            NutritionField::Protein => &mut self.protein,
            NutritionField::ServingSize => &mut self.serving_size,
            NutritionField::ServingsPerContainer => &mut self.servings_per_container,
        }
    }

    /// Fields in declaration order with their values
    pub fn iter(&self) -> impl Iterator<Item = (NutritionField, Option<&str>)> + '_ {
        NutritionField::ALL
            .into_iter()
            .map(move |field| (field, self.get(field)))
    }

    /// Number of fields that were found
    pub fn found_count(&self) -> usize {
        self.iter().filter(|(_, value)| value.is_some()).count()
    }

    /// True when the transcription contained no recognizable nutrition facts
    pub fn is_empty(&self) -> bool {
        self.found_count() == 0
    }
}

/// Configuration options for label extraction
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Repair common OCR unit misreads before matching
    pub normalize_ocr_units: bool,
    /// Input longer than this many characters is truncated before matching
    pub max_input_length: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            normalize_ocr_units: false,
            max_input_length: 100_000,
        }
    }
}

impl ExtractorConfig {
    /// Validate extractor configuration parameters
    pub fn validate(&self) -> AppResult<()> {
        if self.max_input_length == 0 {
            return Err(AppError::Config(
                "max_input_length must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Repair OCR unit misreads in lower-cased text
///
/// `"5 m9"` → `"5 mg"`, `"12 9"` → `"12 g"`, `"8 ozz"` → `"8 oz"`.
/// The `9` → `g` rule also rewrites a trailing digit 9 of a bare number
/// (`"129"` → `"12 g"`), which is why it is opt-in.
pub fn normalize_ocr_units(text: &str) -> String {
    let mut result = text.to_string();
    for (pattern, replacement) in OCR_UNIT_FIXES.iter() {
        let replaced = pattern.replace_all(&result, *replacement).into_owned();
        if replaced != result {
            trace!(pattern = pattern.as_str(), "Applied OCR unit fix");
            result = replaced;
        }
    }
    result
}

/// Extractor applying the field rules to transcriptions
#[derive(Debug, Clone, Default)]
pub struct LabelExtractor {
    config: ExtractorConfig,
}

impl LabelExtractor {
    /// Create an extractor with the reference behavior
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor with custom configuration
    ///
    /// # Examples
    ///
    /// ```rust
    /// use just_nutrition::label_extractor::{ExtractorConfig, LabelExtractor};
    ///
    /// let extractor = LabelExtractor::with_config(ExtractorConfig {
    ///     normalize_ocr_units: true,
    ///     ..Default::default()
    /// })?;
    /// let record = extractor.extract("Sodium 160 m9");
    /// assert_eq!(record.sodium.as_deref(), Some("160 mg"));
    /// # Ok::<(), just_nutrition::errors::AppError>(())
    /// ```
    pub fn with_config(config: ExtractorConfig) -> AppResult<Self> {
        config.validate()?;
        debug!(
            normalize_ocr_units = config.normalize_ocr_units,
            max_input_length = config.max_input_length,
            "Creating LabelExtractor with custom config"
        );
        Ok(Self { config })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract every field from a transcription
    ///
    /// Rules run in [`NutritionField`] declaration order. Each rule keeps only
    /// its first match in text order; a value sitting between two labels can
    /// be claimed by the earlier label's rule even when it belongs to the
    /// later one, and that is kept as-is.
    pub fn extract(&self, text: &str) -> NutritionRecord {
        let start_time = Instant::now();

        let bounded = truncate_chars(text, self.config.max_input_length);
        if bounded.len() < text.len() {
            warn!(
                original_length = text.len(),
                max_input_length = self.config.max_input_length,
                "Transcription truncated before extraction"
            );
        }

        let mut normalized = bounded.to_lowercase();
        if self.config.normalize_ocr_units {
            normalized = normalize_ocr_units(&normalized);
        }

        let mut record = NutritionRecord::default();
        for (field, rule) in FIELD_RULES.iter() {
            if let Some(value) = rule.captures(&normalized).and_then(|caps| caps.get(1)) {
                trace!(field = field.name(), value = value.as_str(), "Field matched");
                *record.slot_mut(*field) = Some(value.as_str().to_string());
            }
        }

        let fields_found = record.found_count();
        debug!(
            text_length = text.len(),
            fields_found,
            "Label extraction completed"
        );
        crate::observability::record_extraction_metrics(
            start_time.elapsed(),
            text.len(),
            fields_found,
        );

        record
    }
}

/// Extract a [`NutritionRecord`] with the default configuration
///
/// # Examples
///
/// ```rust
/// use just_nutrition::label_extractor::extract;
///
/// let record = extract("Nutrition Facts\nCalories 250 kcal\nTotal Fat 12g");
/// assert_eq!(record.calories.as_deref(), Some("250 kcal"));
/// assert_eq!(record.total_fat.as_deref(), Some("12g"));
/// assert_eq!(record.protein, None);
/// ```
pub fn extract(text: &str) -> NutritionRecord {
    LabelExtractor::new().extract(text)
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
