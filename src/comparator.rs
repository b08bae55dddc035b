//! # Nutrition Comparator Module
//!
//! Aligns a label's [`NutritionRecord`] with catalog products and computes a
//! signed percentage difference per nutrient, using the label's value as the
//! baseline.
//!
//! Label values are raw text (`"12.5 g"`); they are reduced to their first
//! numeric token and the unit is discarded. Catalog values are already numeric.
//! A dimension is only computed when the catalog product has a value for it and
//! the label value is strictly positive, so a missing label value and a label
//! value of zero behave the same. [`ComparisonResult::computed`] records which
//! dimensions were actually computed.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, trace};

use crate::label_extractor::{NutritionField, NutritionRecord};

lazy_static! {
    static ref NUMERIC_TOKEN: Regex =
        Regex::new(r"\d+(?:\.\d+)?").expect("Numeric token pattern should be valid");
}

/// A single catalog nutrient value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nutrient {
    pub value: f64,
    #[serde(default)]
    pub unit: String,
}

/// A product returned by the product-search collaborator
///
/// Catalogs may send `code` next to (or instead of) `id`, and `product_name`
/// next to `name`. The canonical key wins when both are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCandidateProduct")]
pub struct CandidateProduct {
    pub id: String,
    pub name: String,
    /// Nutrient name (`energy`, `fat`, `proteins`, ...) to value
    pub nutrients: BTreeMap<String, Nutrient>,
}

/// Wire shape of [`CandidateProduct`] with every accepted key kept apart
#[derive(Deserialize)]
struct RawCandidateProduct {
    id: Option<String>,
    code: Option<String>,
    name: Option<String>,
    product_name: Option<String>,
    #[serde(default)]
    nutrients: BTreeMap<String, Nutrient>,
}

impl TryFrom<RawCandidateProduct> for CandidateProduct {
    type Error = String;

    fn try_from(raw: RawCandidateProduct) -> Result<Self, Self::Error> {
        let id = raw
            .id
            .or(raw.code)
            .ok_or_else(|| "missing field `id` (or `code`)".to_string())?;
        Ok(Self {
            id,
            name: raw.name.or(raw.product_name).unwrap_or_default(),
            nutrients: raw.nutrients,
        })
    }
}

impl CandidateProduct {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            nutrients: BTreeMap::new(),
        }
    }

    /// Builder-style helper used by tests and fakes
    pub fn with_nutrient(mut self, key: &str, value: f64, unit: &str) -> Self {
        self.nutrients.insert(
            key.to_string(),
            Nutrient {
                value,
                unit: unit.to_string(),
            },
        );
        self
    }

    /// Finite numeric value under a nutrient key
    pub fn nutrient_value(&self, key: &str) -> Option<f64> {
        self.nutrients
            .get(key)
            .map(|nutrient| nutrient.value)
            .filter(|value| value.is_finite())
    }
}

/// One compared nutrient dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Calories,
    Fat,
    Protein,
    Carbohydrates,
    Sugars,
    Sodium,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Calories,
        Dimension::Fat,
        Dimension::Protein,
        Dimension::Carbohydrates,
        Dimension::Sugars,
        Dimension::Sodium,
    ];

    /// Key of this dimension in [`CandidateProduct::nutrients`]
    pub fn nutrient_key(&self) -> &'static str {
        match self {
            Dimension::Calories => "energy",
            Dimension::Fat => "fat",
            Dimension::Protein => "proteins",
            Dimension::Carbohydrates => "carbohydrates",
            Dimension::Sugars => "sugars",
            Dimension::Sodium => "sodium",
        }
    }

    /// Field of the label record holding the baseline
    pub fn record_field(&self) -> NutritionField {
        match self {
            Dimension::Calories => NutritionField::Calories,
            Dimension::Fat => NutritionField::TotalFat,
            Dimension::Protein => NutritionField::Protein,
            Dimension::Carbohydrates => NutritionField::TotalCarbohydrates,
            Dimension::Sugars => NutritionField::Sugars,
            Dimension::Sodium => NutritionField::Sodium,
        }
    }
}

/// Percentage differences of one candidate against the label
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub calories_diff: f64,
    pub fat_diff: f64,
    pub protein_diff: f64,
    pub carbohydrates_diff: f64,
    pub sugars_diff: f64,
    pub sodium_diff: f64,
    /// Dimensions that had data on both sides, in [`Dimension`] order
    pub computed: Vec<Dimension>,
}

impl ComparisonResult {
    /// Difference for a dimension; `0.0` when it was not computed
    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Calories => self.calories_diff,
            Dimension::Fat => self.fat_diff,
            Dimension::Protein => self.protein_diff,
            Dimension::Carbohydrates => self.carbohydrates_diff,
            Dimension::Sugars => self.sugars_diff,
            Dimension::Sodium => self.sodium_diff,
        }
    }

    pub fn is_computed(&self, dimension: Dimension) -> bool {
        self.computed.contains(&dimension)
    }

    fn set(&mut self, dimension: Dimension, diff: f64) {
        let slot = match dimension {
            Dimension::Calories => &mut self.calories_diff,
            Dimension::Fat => &mut self.fat_diff,
            Dimension::Protein => &mut self.protein_diff,
            Dimension::Carbohydrates => &mut self.carbohydrates_diff,
            Dimension::Sugars => &mut self.sugars_diff,
            Dimension::Sodium => &mut self.sodium_diff,
        };
        *slot = diff;
        self.computed.push(dimension);
    }
}

/// A candidate product decorated with its comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparedProduct {
    #[serde(flatten)]
    pub product: CandidateProduct,
    pub comparison: Option<ComparisonResult>,
}

/// Extract the first numeric token of a raw field value, discarding its unit
///
/// ```rust
/// use just_nutrition::comparator::coerce_numeric;
///
/// assert_eq!(coerce_numeric(Some("12.5 g")), Some(12.5));
/// assert_eq!(coerce_numeric(Some("trace")), None);
/// assert_eq!(coerce_numeric(None), None);
/// ```
pub fn coerce_numeric(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|value| NUMERIC_TOKEN.find(value))
        .and_then(|token| token.as_str().parse::<f64>().ok())
}

/// Coerced value, with absence collapsed to zero
pub fn coerce_or_zero(raw: Option<&str>) -> f64 {
    coerce_numeric(raw).unwrap_or(0.0)
}

/// Signed difference of `candidate` relative to `user`, in percent
///
/// Callers must ensure `user > 0`.
pub fn percent_diff(candidate: f64, user: f64) -> f64 {
    ((candidate - user) / user) * 100.0
}

/// Label baselines for the six dimensions, `None` when not usable as a divisor
fn user_baselines(user: &NutritionRecord) -> [(Dimension, Option<f64>); 6] {
    Dimension::ALL.map(|dimension| {
        let baseline = coerce_or_zero(user.get(dimension.record_field()));
        (dimension, Some(baseline).filter(|value| *value > 0.0))
    })
}

fn compare_candidate(
    baselines: &[(Dimension, Option<f64>); 6],
    candidate: &CandidateProduct,
) -> Option<ComparisonResult> {
    if candidate.nutrients.is_empty() {
        return None;
    }

    let mut result = ComparisonResult::default();
    for (dimension, baseline) in baselines {
        let Some(user_value) = baseline else {
            continue;
        };
        let Some(candidate_value) = candidate.nutrient_value(dimension.nutrient_key()) else {
            continue;
        };
        let diff = percent_diff(candidate_value, *user_value);
        trace!(
            product_id = %candidate.id,
            dimension = ?dimension,
            candidate_value,
            user_value,
            diff,
            "Dimension compared"
        );
        result.set(*dimension, diff);
    }
    Some(result)
}

/// Compare a label against candidate products
///
/// Output order matches input order; inputs are not modified.
///
/// # Examples
///
/// ```rust
/// use just_nutrition::comparator::{compare, CandidateProduct, Dimension};
/// use just_nutrition::label_extractor::NutritionRecord;
///
/// let user = NutritionRecord {
///     calories: Some("250".to_string()),
///     ..Default::default()
/// };
/// let candidates = vec![CandidateProduct::new("1", "Oat bar").with_nutrient("energy", 300.0, "kcal")];
///
/// let compared = compare(&user, &candidates);
/// let result = compared[0].comparison.as_ref().unwrap();
/// assert_eq!(result.get(Dimension::Calories), 20.0);
/// assert!(!result.is_computed(Dimension::Fat));
/// ```
pub fn compare(user: &NutritionRecord, candidates: &[CandidateProduct]) -> Vec<ComparedProduct> {
    let start_time = Instant::now();
    let baselines = user_baselines(user);

    let compared: Vec<ComparedProduct> = candidates
        .iter()
        .map(|candidate| ComparedProduct {
            product: candidate.clone(),
            comparison: compare_candidate(&baselines, candidate),
        })
        .collect();

    let computed_dimensions: usize = compared
        .iter()
        .filter_map(|c| c.comparison.as_ref())
        .map(|r| r.computed.len())
        .sum();
    debug!(
        candidates = candidates.len(),
        computed_dimensions,
        "Nutrition comparison completed"
    );
    crate::observability::record_comparison_metrics(
        start_time.elapsed(),
        candidates.len(),
        computed_dimensions,
    );

    compared
}
