//! # Label Extractor Tests Module
//!
//! Field extraction from realistic label transcriptions, including the
//! documented first-match and bleed-through behavior.

#[cfg(test)]
mod tests {
    use just_nutrition::label_extractor::{
        extract, ExtractorConfig, LabelExtractor, NutritionField, NutritionRecord,
    };

    const FULL_LABEL: &str = "Nutrition Facts
Serving Size 1 cup (240ml)
Servings Per Container About 2
Calories 250 kcal
Total Fat 12g
Saturated Fat 3g
Trans Fat 0g
Cholesterol 30mg
Sodium 470mg
Total Carbohydrate 31g
Dietary Fiber 0g
Sugars 5g
Protein 5g";

    /// Every field is read from a complete US-style panel
    #[test]
    fn test_full_label() {
        let record = extract(FULL_LABEL);

        assert_eq!(record.serving_size.as_deref(), Some("1 cup"));
        assert_eq!(record.servings_per_container.as_deref(), Some("2"));
        assert_eq!(record.calories.as_deref(), Some("250 kcal"));
        assert_eq!(record.total_fat.as_deref(), Some("12g"));
        assert_eq!(record.saturated_fat.as_deref(), Some("3g"));
        assert_eq!(record.trans_fat.as_deref(), Some("0g"));
        assert_eq!(record.cholesterol.as_deref(), Some("30mg"));
        assert_eq!(record.sodium.as_deref(), Some("470mg"));
        assert_eq!(record.total_carbohydrates.as_deref(), Some("31g"));
        assert_eq!(record.dietary_fiber.as_deref(), Some("0g"));
        assert_eq!(record.sugars.as_deref(), Some("5g"));
        assert_eq!(record.protein.as_deref(), Some("5g"));
        assert_eq!(record.found_count(), 12);
    }

    /// Text without any label cue yields an all-empty record
    #[test]
    fn test_no_cues() {
        let record = extract("best enjoyed chilled. recycle me.");
        assert_eq!(record, NutritionRecord::default());
        assert!(record.is_empty());

        assert!(extract("").is_empty());
    }

    #[test]
    fn test_single_fields() {
        assert_eq!(extract("Total Fat 12g").total_fat.as_deref(), Some("12g"));
        assert_eq!(
            extract("calories 250 kcal").calories.as_deref(),
            Some("250 kcal")
        );
        assert_eq!(extract("SODIUM 0.5 G").sodium.as_deref(), Some("0.5 g"));
    }

    /// A value without an accepted unit is not captured
    #[test]
    fn test_missing_unit_is_no_match() {
        let record = extract("Calories 250\nTotal Fat 12g");
        assert_eq!(record.calories, None);
        assert_eq!(record.total_fat.as_deref(), Some("12g"));

        assert_eq!(extract("Protein 12 grams").protein, None);
    }

    /// The value may sit on a later OCR line than its label
    #[test]
    fn test_label_and_value_on_different_lines() {
        let record = extract("Dietary Fiber\n\n4g");
        assert_eq!(record.dietary_fiber.as_deref(), Some("4g"));
    }

    /// A label without its own value borrows the next accepted value
    #[test]
    fn test_cross_field_bleed_through() {
        let record = extract("Total Fat\nSodium 140mg");
        assert_eq!(record.total_fat.as_deref(), Some("140mg"));
        assert_eq!(record.sodium.as_deref(), Some("140mg"));
    }

    /// The first occurrence of a label wins
    #[test]
    fn test_first_match_wins() {
        let record = extract("Sugars 5g\nIncludes 3g Added Sugars 3g");
        assert_eq!(record.sugars.as_deref(), Some("5g"));
    }

    #[test]
    fn test_serving_units() {
        assert_eq!(
            extract("Serving size 2 tbsp (32g)").serving_size.as_deref(),
            Some("2 tbsp")
        );
        assert_eq!(
            extract("Serving size 30g").serving_size.as_deref(),
            Some("30g")
        );
        // "fl" sits between the number and the unit
        assert_eq!(extract("serving size 8 fl oz").serving_size, None);
    }

    /// Output keys are the twelve field names, values string or null
    #[test]
    fn test_record_serialization_shape() {
        let record = extract("Protein 7g");
        let json = serde_json::to_value(&record).unwrap();
        let object = json.as_object().unwrap();

        assert_eq!(object.len(), 12);
        for field in NutritionField::ALL {
            assert!(object.contains_key(field.name()), "missing {}", field.name());
        }
        assert_eq!(json["protein"], "7g");
        assert!(json["sodium"].is_null());
    }

    /// Extraction is deterministic
    #[test]
    fn test_deterministic() {
        let first = serde_json::to_string(&extract(FULL_LABEL)).unwrap();
        let second = serde_json::to_string(&extract(FULL_LABEL)).unwrap();
        assert_eq!(first, second);
    }

    /// OCR unit repair only happens when enabled
    #[test]
    fn test_unit_normalization_is_opt_in() {
        let text = "Sodium 160 m9\nProtein 3 9";
        let plain = LabelExtractor::new().extract(text);
        assert_eq!(plain.sodium, None);
        assert_eq!(plain.protein, None);

        let repairing = LabelExtractor::with_config(ExtractorConfig {
            normalize_ocr_units: true,
            ..Default::default()
        })
        .unwrap();
        let fixed = repairing.extract(text);
        assert_eq!(fixed.sodium.as_deref(), Some("160 mg"));
        assert_eq!(fixed.protein.as_deref(), Some("3 g"));
    }

    /// Values past the configured input cap are never reached
    #[test]
    fn test_input_length_cap() {
        let text = "Calories 250 kcal\nProtein 5g";
        let capped = LabelExtractor::with_config(ExtractorConfig {
            max_input_length: 20,
            ..Default::default()
        })
        .unwrap();

        let record = capped.extract(text);
        assert_eq!(record.calories.as_deref(), Some("250 kcal"));
        assert_eq!(record.protein, None);

        assert_eq!(extract(text).protein.as_deref(), Some("5g"));
    }

    #[test]
    fn test_iter_follows_declaration_order() {
        let record = extract("Protein 2g Calories 90 kcal");
        let found: Vec<NutritionField> = record
            .iter()
            .filter(|(_, value)| value.is_some())
            .map(|(field, _)| field)
            .collect();
        assert_eq!(found, vec![NutritionField::Calories, NutritionField::Protein]);
    }
}
