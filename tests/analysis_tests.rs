//! # Label Analysis Tests Module
//!
//! Ingredient extraction, allergen detection and summaries on full
//! transcriptions.

#[cfg(test)]
mod tests {
    use just_nutrition::analysis::{
        detect_allergens, extract_ingredients, has_nutrition_keywords, nutritional_concerns,
        summarize,
    };
    use just_nutrition::label_extractor::extract;

    const CEREAL_BOX: &str = "Nutrition Facts
Serving Size 40g
Calories 160 kcal
Total Fat 2.5g
Sodium 210mg
Sugars 12g
Protein 4g

INGREDIENTS: Whole grain oats, sugar, wheat starch, salt, almonds, honey.
Contains wheat and almonds. May contain peanuts.
Best before: see top of box";

    #[test]
    fn test_ingredients_from_full_label() {
        let ingredients = extract_ingredients(CEREAL_BOX).unwrap();
        assert_eq!(
            ingredients,
            "Whole grain oats, sugar, wheat starch, salt, almonds, honey."
        );
    }

    #[test]
    fn test_ingredients_absent() {
        assert_eq!(extract_ingredients("Calories 100 kcal\nSodium 5mg"), None);
    }

    /// The full transcription reports groups from the list and the warnings
    #[test]
    fn test_allergens_from_full_label() {
        let allergens = detect_allergens(CEREAL_BOX);
        assert_eq!(allergens, vec!["peanuts", "tree nuts", "wheat/gluten"]);
    }

    #[test]
    fn test_allergens_on_empty_input() {
        assert!(detect_allergens("").is_empty());
        assert!(detect_allergens("   ").is_empty());
    }

    #[test]
    fn test_no_concerns_for_moderate_label() {
        let record = extract(CEREAL_BOX);
        assert!(nutritional_concerns(&record).is_empty());
    }

    #[test]
    fn test_all_concerns() {
        let record = extract("Total Fat 22g\nSodium 980mg\nSugars 31g");
        assert_eq!(
            nutritional_concerns(&record),
            vec!["high sodium", "high sugars", "high total fat"]
        );
    }

    #[test]
    fn test_keywords() {
        assert!(has_nutrition_keywords(CEREAL_BOX));
        assert!(!has_nutrition_keywords("Lorem ipsum dolor sit amet"));
    }

    #[test]
    fn test_summary_for_full_label() {
        let record = extract(CEREAL_BOX);
        let ingredients = extract_ingredients(CEREAL_BOX);
        let summary = summarize(&record, ingredients.as_deref());

        assert_eq!(
            summary,
            "Alert: This product contains potential allergens (tree nuts, wheat/gluten). \
             Serving size is 40g. \
             Calories per serving: 160 kcal. \
             How much did you eat (whole package, half can, etc.)?"
        );
    }

    /// A label declaring allergens only in a contains line still raises an alert
    #[test]
    fn test_summary_uses_contains_statement() {
        let text = "Nutrition Facts\nCalories 200 kcal\nContains: milk, peanuts.";
        let record = extract(text);
        let ingredients = extract_ingredients(text);

        let summary = summarize(&record, ingredients.as_deref());
        assert!(summary.starts_with(
            "Alert: This product contains potential allergens (milk, peanuts)."
        ));
    }

    /// Without any ingredient information the reply says so
    #[test]
    fn test_summary_without_ingredient_information() {
        let text = "Nutrition Facts\nCalories 200 kcal\nProtein 4g";
        let record = extract(text);
        let ingredients = extract_ingredients(text);
        assert_eq!(ingredients, None);

        let summary = summarize(&record, ingredients.as_deref());
        assert!(summary.starts_with("Could not detect ingredients, unable to check for allergens."));
        assert!(!summary.contains("No common allergens"));
    }

    #[test]
    fn test_summary_apology_when_nothing_found() {
        let record = extract("just a photo of a cat");
        assert_eq!(
            summarize(&record, Some("milk, sugar, cocoa")),
            "Sorry, I couldn't detect clear nutrition information from the image. \
             Please try a clearer photo of the nutrition label."
        );
    }
}
