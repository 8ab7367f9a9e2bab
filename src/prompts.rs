use serde_json::{json, Value};

use crate::models::Suggestion;

pub const SYSTEM_INSTRUCTION: &str = r#"
You are an expert floral designer and botanist with impeccable taste. Your goal is to assist users in creating beautiful floral arrangements.

1.  **Analyze**: Look at the provided image (if any) to identify the main flowers. Read the user's text (if any) to understand the occasion, mood, or specific needs.
2.  **Identify**: If an image is provided, list the dominant flowers found.
3.  **Recommend**: Based on the identified flowers AND/OR the user's request, provide 3 distinct floral arrangement suggestions.
    *   Consider color theory, texture, seasonality, and symbolism.
    *   Suggestions should range from simple to elaborate.
    *   **Crucial**: Include the "Language of Flowers" (symbolism) for the main flowers chosen.
    *   **Crucial**: Provide a "Blessing" message. This message must be concise, literary, poetic, and emotionally resonant (e.g., "May your days be as bright as these sunflowers").
4.  **Format**: Return the result strictly as JSON.

Your tone should be elegant, helpful, and inspiring.
"#;

/// Sent in place of the user's text when only a photo was supplied.
pub const FALLBACK_PROMPT: &str = "Please analyze this flower image and suggest pairings.";

pub const IMAGE_ASPECT_RATIO: &str = "4:3";

pub const SUGGESTION_FIELDS: [&str; 7] =
    ["title", "description", "flowerList", "colorPalette", "vibe", "flowerLanguage", "blessing"];

pub fn user_prompt(text: &str) -> &str {
    if text.trim().is_empty() { FALLBACK_PROMPT } else { text }
}

/// Declared output schema for the analysis call, in Gemini's OpenAPI subset.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "analysis": {
                "type": "STRING",
                "description": "A brief, elegant analysis of the user's request and image"
            },
            "identifiedFlowers": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "List of flowers identified in the image (if any). Empty if no image."
            },
            "suggestions": {
                "type": "ARRAY",
                "description": "3 distinct floral arrangement suggestions",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING", "description": "A creative title for the arrangement" },
                        "description": { "type": "STRING", "description": "Why this works and how to arrange it" },
                        "flowerList": {
                            "type": "ARRAY",
                            "items": { "type": "STRING" },
                            "description": "List of specific flowers and greenery to buy"
                        },
                        "colorPalette": {
                            "type": "ARRAY",
                            "items": { "type": "STRING" },
                            "description": "List of 3-4 hex color codes representing the palette"
                        },
                        "vibe": { "type": "STRING", "description": "One or two words describing the mood (e.g., Romantic, Rustic)" },
                        "flowerLanguage": { "type": "STRING", "description": "Concise symbolic meaning of the main flowers." },
                        "blessing": {
                            "type": "STRING",
                            "description": "A short, concise, literary, and poetic blessing or wish suitable for a card accompanying the flowers."
                        }
                    },
                    "required": SUGGESTION_FIELDS
                }
            }
        },
        "required": ["analysis", "identifiedFlowers", "suggestions"]
    })
}

pub fn build_image_prompt(suggestion: &Suggestion) -> String {
    format!(
        "A professional, photorealistic 3D visualization of a floral arrangement based on the following details:\n\n\
        - Vibe/Style: {vibe}\n\
        - Arrangement Description: {description}\n\
        - Flowers included: {flowers}\n\
        - Color Palette: {palette}\n\n\
        Directives:\n\
        1. The image must contain ONLY the floral arrangement in a studio setting.\n\
        2. High quality, clear focus, neutral soft background.\n\
        3. CRITICAL: Do NOT include any text, titles, descriptions, watermarks, or overlays in the generated image. Purely visual.",
        vibe = suggestion.vibe,
        description = suggestion.description,
        flowers = suggestion.flower_list.join(", "),
        palette = suggestion.color_palette.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_suggestion;

    #[test]
    fn blank_text_falls_back() {
        assert_eq!(user_prompt("  "), FALLBACK_PROMPT);
        assert_eq!(user_prompt("birthday for mum"), "birthday for mum");
    }

    #[test]
    fn image_prompt_lists_suggestion_details() {
        let prompt = build_image_prompt(&sample_suggestion("Dawn"));
        assert!(prompt.contains("Vibe/Style: Romantic"));
        assert!(prompt.contains("Flowers included: Peony, Eucalyptus"));
        assert!(prompt.contains("Color Palette: #F4C2C2, #8FBC8F, #FFFFFF"));
        assert!(prompt.contains("Do NOT include any text"));
    }

    #[test]
    fn schema_requires_all_suggestion_fields() {
        let schema = response_schema();
        let required = schema.pointer("/properties/suggestions/items/required").unwrap();
        assert_eq!(required.as_array().unwrap().len(), 7);
        assert_eq!(schema["required"], json!(["analysis", "identifiedFlowers", "suggestions"]));
    }
}
