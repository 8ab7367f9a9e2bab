use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    #[default]
    Zh,
}

impl Language {
    /// Instruction appended as the last content part of every analysis request.
    pub fn output_directive(self) -> &'static str {
        match self {
            Language::En => " IMPORTANT: Output all content in English.",
            Language::Zh => " IMPORTANT: Output all content in Chinese (Simplified).",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Language::En => Language::Zh,
            Language::Zh => Language::En,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// A reference photo as uploaded by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: Bytes,
}

impl ImagePayload {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self { mime_type: mime_type.into(), data: data.into() }
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserInput {
    pub text: String,
    pub image: Option<ImagePayload>,
}

impl UserInput {
    pub fn new(text: impl Into<String>, image: Option<ImagePayload>) -> Self {
        Self { text: text.into(), image }
    }

    /// At least one of a non-blank text or an image is required.
    pub fn can_submit(&self) -> bool {
        !self.text.trim().is_empty() || self.image.is_some()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub title: String,
    pub description: String,
    pub flower_list: Vec<String>,
    pub color_palette: Vec<String>, // hex codes or color names
    pub vibe: String,
    pub flower_language: String,
    pub blessing: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FloralAnalysisResponse {
    pub analysis: String,
    pub identified_flowers: Vec<String>,
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoadingState {
    Idle,
    Loading,
    Success,
    Error,
}

#[cfg(test)]
pub(crate) fn sample_suggestion(title: &str) -> Suggestion {
    Suggestion {
        title: title.to_string(),
        description: format!("{title} arranged low and loose"),
        flower_list: vec!["Peony".into(), "Eucalyptus".into()],
        color_palette: vec!["#F4C2C2".into(), "#8FBC8F".into(), "#FFFFFF".into()],
        vibe: "Romantic".into(),
        flower_language: "Peony stands for prosperity".into(),
        blessing: "May your days bloom softly".into(),
    }
}
