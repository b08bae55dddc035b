//! # Label Analysis Module
//!
//! Secondary checks run on a transcription once the nutrition fields are
//! extracted: locating the ingredient list, flagging allergens, and applying
//! simple per-serving thresholds. [`summarize`] turns the results into a short
//! human-readable reply.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::comparator::coerce_numeric;
use crate::label_extractor::{NutritionField, NutritionRecord};

/// Ingredient lists shorter than this are treated as OCR noise
const MIN_INGREDIENTS_LENGTH: usize = 10;

/// Phrases that end an ingredient list, matched case-insensitively
const INGREDIENT_END_MARKERS: &[&str] = &[
    "\n\n",
    "nutrition facts",
    "nutritional",
    "allergen",
    "contains",
    "storage",
    "best before",
    "dist.",
    "keep refrigerated",
    "how2recycle.info",
    "plastic",
    "bottle",
    "ca crv",
    "ctrv",
    "hi 5¢",
    "me 5¢",
    "% daily value",
    "serving size",
    "amount per serving",
    "calories",
    "total fat",
    "cholesterol",
];

/// Words that mark a comma-separated line as a probable ingredient list
const INGREDIENT_INDICATORS: &[&str] = &[
    "water",
    "sugar",
    "salt",
    "oil",
    "extract",
    "acid",
    "flour",
    "starch",
    "natural",
    "artificial",
];

/// A fallback ingredient line needs at least this many commas
const MIN_LIST_COMMAS: usize = 2;

/// ... and must be longer than this many characters
const MIN_LIST_LINE_LENGTH: usize = 30;

/// Allergen groups in reporting order, with the ingredient terms that imply them
const ALLERGEN_GROUPS: &[(&str, &[&str])] = &[
    ("milk", &["milk", "dairy", "lactose", "whey", "casein"]),
    ("eggs", &["egg", "eggs"]),
    ("peanuts", &["peanut", "peanuts"]),
    (
        "tree nuts",
        &[
            "tree nut", "tree nuts", "almond", "almonds", "walnut", "walnuts", "cashew",
            "cashews", "pistachio", "pistachios", "hazelnut", "hazelnuts", "pecan", "pecans",
        ],
    ),
    ("soy", &["soy", "soya", "tofu", "edamame"]),
    (
        "wheat/gluten",
        &["wheat", "gluten", "barley", "rye", "spelt", "triticale"],
    ),
    ("fish", &["fish"]),
    (
        "shellfish",
        &["shellfish", "crustacean", "crustaceans", "shrimp", "crab", "lobster"],
    ),
    ("sulfites", &["sulfite", "sulfites"]),
    ("sesame", &["sesame"]),
    ("mustard", &["mustard"]),
];

/// Nutrient thresholds per serving above which a concern is reported
const CONCERN_THRESHOLDS: &[(NutritionField, f64, &str)] = &[
    (NutritionField::Sodium, 500.0, "high sodium"),
    (NutritionField::Sugars, 20.0, "high sugars"),
    (NutritionField::TotalFat, 15.0, "high total fat"),
];

const NUTRITION_KEYWORDS: &[&str] = &[
    "nutrition",
    "serving",
    "calories",
    "fat",
    "protein",
    "carbohydrate",
    "sodium",
    "sugar",
    "vitamin",
    "mineral",
];

lazy_static! {
    static ref INGREDIENTS_CUE: Regex =
        Regex::new(r"(?i)ingredients?[:\s]").expect("Ingredients cue pattern should be valid");
    static ref CONTAINS_STATEMENT: Regex = Regex::new(r"(?i)contains[:\s]\s*([^.]*)")
        .expect("Contains statement pattern should be valid");
    static ref MAY_CONTAIN: Regex =
        Regex::new(r"(?i)may\s+contain\s+([^.]*)").expect("May-contain pattern should be valid");
    static ref ALLERGEN_RULES: Vec<(&'static str, Regex)> = ALLERGEN_GROUPS
        .iter()
        .map(|(group, terms)| {
            let alternation = terms
                .iter()
                .map(|term| regex::escape(term))
                .collect::<Vec<_>>()
                .join("|");
            let regex = Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))
                .expect("Allergen pattern should be valid");
            (*group, regex)
        })
        .collect();
    static ref NUTRITION_KEYWORD_RULE: Regex = Regex::new(&format!(
        r"(?i)\b(?:{})\b",
        NUTRITION_KEYWORDS.join("|")
    ))
    .expect("Nutrition keyword pattern should be valid");
}

/// Locate the ingredient list in a transcription
///
/// Tried in order:
///
/// 1. the text after the first `ingredient(s)` cue, cut at the earliest end
///    marker and kept when longer than 10 characters;
/// 2. the first line with at least two commas, more than 30 characters and a
///    common ingredient word (`water`, `sugar`, `flour`, ...);
/// 3. a `Contains: ...` statement, returned as `"Contains: <list>"`.
///
/// Returns `None` when all three fail.
///
/// ```rust
/// use just_nutrition::analysis::extract_ingredients;
///
/// let text = "INGREDIENTS: oats, honey, almonds.\n\nNutrition Facts";
/// assert_eq!(extract_ingredients(text).as_deref(), Some("oats, honey, almonds."));
///
/// let declared = "Calories 200 kcal\nContains: milk, peanuts.";
/// assert_eq!(extract_ingredients(declared).as_deref(), Some("Contains: milk, peanuts"));
/// assert_eq!(extract_ingredients("no list here"), None);
/// ```
pub fn extract_ingredients(text: &str) -> Option<String> {
    section_after_cue(text)
        .or_else(|| comma_separated_line(text))
        .or_else(|| contains_statement(text))
}

fn section_after_cue(text: &str) -> Option<String> {
    let cue = INGREDIENTS_CUE.find(text)?;
    let remainder = text[cue.end()..].trim();

    // ASCII lowering keeps byte offsets aligned with `remainder`
    let lowered = remainder.to_ascii_lowercase();
    let end = INGREDIENT_END_MARKERS
        .iter()
        .filter_map(|marker| lowered.find(marker))
        .min()
        .unwrap_or(remainder.len());

    let ingredients = remainder[..end].trim();
    if ingredients.chars().count() > MIN_INGREDIENTS_LENGTH {
        Some(ingredients.to_string())
    } else {
        debug!(
            length = ingredients.len(),
            "Ingredient section too short, ignoring"
        );
        None
    }
}

fn comma_separated_line(text: &str) -> Option<String> {
    let line = text.lines().find(|line| {
        let lowered = line.to_lowercase();
        line.matches(',').count() >= MIN_LIST_COMMAS
            && line.chars().count() > MIN_LIST_LINE_LENGTH
            && INGREDIENT_INDICATORS
                .iter()
                .any(|indicator| lowered.contains(indicator))
    })?;
    debug!("Using comma-separated line as ingredient list");
    Some(line.trim().to_string())
}

fn contains_statement(text: &str) -> Option<String> {
    let statement = CONTAINS_STATEMENT.captures(text)?.get(1)?.as_str().trim();
    if statement.is_empty() {
        return None;
    }
    debug!("Using contains statement as ingredient list");
    Some(format!("Contains: {}", statement))
}

fn matching_groups(text: &str) -> impl Iterator<Item = &'static str> + '_ {
    ALLERGEN_RULES
        .iter()
        .filter(move |(_, rule)| rule.is_match(text))
        .map(|(group, _)| *group)
}

/// Allergen groups named in a "may contain" statement
pub fn may_contain_allergens(ingredients: &str) -> Vec<String> {
    MAY_CONTAIN
        .captures(ingredients)
        .and_then(|caps| caps.get(1))
        .map(|statement| matching_groups(statement.as_str()).map(str::to_string).collect())
        .unwrap_or_default()
}

/// Allergen groups found in an ingredient list, in fixed group order
///
/// Related terms collapse into one group ("almonds" and "walnuts" both report
/// `tree nuts`). Precautionary "may contain" statements count as well.
///
/// ```rust
/// use just_nutrition::analysis::detect_allergens;
///
/// let found = detect_allergens("Whey protein, soy lecithin, almonds. May contain peanuts.");
/// assert_eq!(found, vec!["milk", "peanuts", "tree nuts", "soy"]);
/// ```
pub fn detect_allergens(ingredients: &str) -> Vec<String> {
    if ingredients.trim().is_empty() {
        return Vec::new();
    }

    let direct: Vec<&str> = matching_groups(ingredients).collect();
    let precautionary = may_contain_allergens(ingredients);
    let allergens: Vec<String> = ALLERGEN_GROUPS
        .iter()
        .map(|(group, _)| *group)
        .filter(|group| {
            direct.contains(group) || precautionary.iter().any(|found| found.as_str() == *group)
        })
        .map(str::to_string)
        .collect();

    debug!(allergens = ?allergens, "Allergen detection completed");
    allergens
}

/// Nutrients exceeding the per-serving concern thresholds
pub fn nutritional_concerns(record: &NutritionRecord) -> Vec<String> {
    CONCERN_THRESHOLDS
        .iter()
        .filter(|(field, threshold, _)| {
            coerce_numeric(record.get(*field)).is_some_and(|value| value > *threshold)
        })
        .map(|(_, _, label)| label.to_string())
        .collect()
}

/// Whether a transcription mentions any nutrition vocabulary at all
pub fn has_nutrition_keywords(text: &str) -> bool {
    NUTRITION_KEYWORD_RULE.is_match(text)
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Build the reply text for an analyzed label
///
/// ```rust
/// use just_nutrition::analysis::summarize;
/// use just_nutrition::label_extractor::NutritionRecord;
///
/// let empty = NutritionRecord::default();
/// assert!(summarize(&empty, None).starts_with("Sorry"));
/// ```
pub fn summarize(record: &NutritionRecord, ingredients: Option<&str>) -> String {
    if record.is_empty() {
        return "Sorry, I couldn't detect clear nutrition information from the image. \
                Please try a clearer photo of the nutrition label."
            .to_string();
    }

    let ingredients = ingredients.filter(|list| !list.trim().is_empty());
    let allergens = ingredients.map(detect_allergens).unwrap_or_default();
    let concerns = nutritional_concerns(record);
    let mut response = String::new();

    if !allergens.is_empty() {
        response.push_str(&format!(
            "Alert: This product contains potential allergens ({}). ",
            allergens.join(", ")
        ));
    } else if ingredients.is_some() {
        response.push_str("No common allergens detected in the ingredients. ");
    } else {
        response.push_str("Could not detect ingredients, unable to check for allergens. ");
    }

    if !concerns.is_empty() {
        response.push_str(&format!(
            "Nutritional note: {}. ",
            capitalize_first(&concerns.join(", "))
        ));
    }

    if let Some(serving_size) = record.serving_size.as_deref() {
        response.push_str(&format!("Serving size is {}. ", serving_size));
    }

    if let Some(calories) = record.calories.as_deref() {
        response.push_str(&format!("Calories per serving: {}. ", calories));
    }

    response.push_str("How much did you eat (whole package, half can, etc.)?");
    response
}
