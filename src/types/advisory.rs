//! Types exchanged with the generative advisory upstream.

use serde::{Deserialize, Serialize};

/// Marker separating identification from treatment in pest responses.
pub const TREATMENT_MARKER: &str = "---TREATMENT---";

/// Marker separating the crop list from the analysis in recommendations.
pub const ANALYSIS_MARKER: &str = "---ANALYSIS---";

/// Inline image attached to a prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    /// MIME type, e.g. `image/jpeg`.
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl InlineImage {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }
}

/// Prompt text, optionally with one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub text: String,
    pub image: Option<InlineImage>,
}

impl Prompt {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: InlineImage) -> Self {
        self.image = Some(image);
        self
    }
}

/// Pest/disease identification split into its two sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PestDiagnosis {
    pub identification: String,
    pub treatment: String,
}

impl PestDiagnosis {
    /// Split a model response on [`TREATMENT_MARKER`].
    pub fn parse(text: &str) -> Self {
        match text.split_once(TREATMENT_MARKER) {
            Some((identification, treatment)) => Self {
                identification: identification.trim().to_string(),
                treatment: treatment.trim().to_string(),
            },
            None => Self {
                identification: text.trim().to_string(),
                treatment: "AI did not provide a separate treatment section. \
                            The full response is above."
                    .to_string(),
            },
        }
    }
}

/// Field conditions for a crop recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConditions {
    pub soil: String,
    pub season: String,
    pub state: String,
    /// Average rainfall in mm.
    pub rainfall_mm: f64,
    /// Average temperature in °C.
    pub temperature_c: f64,
}

/// Crop recommendation split into its two sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropRecommendation {
    pub crops: String,
    pub analysis: String,
}

impl CropRecommendation {
    /// Split a model response on [`ANALYSIS_MARKER`].
    pub fn parse(text: &str) -> Self {
        match text.split_once(ANALYSIS_MARKER) {
            Some((crops, analysis)) => Self {
                crops: crops.trim().to_string(),
                analysis: analysis.trim().to_string(),
            },
            None => Self {
                crops: "Could not determine specific crops.".to_string(),
                analysis: format!(
                    "AI response was not in the expected format, but here is the full text:\n\n{text}"
                ),
            },
        }
    }
}
