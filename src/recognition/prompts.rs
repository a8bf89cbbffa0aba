const RESPONSE_SCHEMA: &str = r#"{
    "detected_items": [
        {
            "calories": 350,
            "food_name": "Grilled Chicken Breast",
            "food_type": "protein",
            "quantity": 1,
            "unit": "serving",
            "source": "estimation",
            "notes": "Approximately 200g, lightly seasoned"
        }
    ],
    "estimated_calories": 500,
    "confidence_score": 0.8
}"#;

pub fn label_prompt() -> String {
    format!(
        "Read the nutrition facts label in this image. Report every product it describes \
         with the calories per stated serving, the serving quantity and unit as printed. \
         Set confidence_score between 0 and 1 according to how legible the label is. \
         Respond in this exact JSON format, no other text:\n{RESPONSE_SCHEMA}"
    )
}

pub fn visual_prompt() -> String {
    format!(
        "Identify every food item on the plate in this photo and estimate its calories \
         from the visible portion size. Set confidence_score between 0 and 1 according \
         to how certain the estimate is. \
         Respond in this exact JSON format, no other text:\n{RESPONSE_SCHEMA}"
    )
}
