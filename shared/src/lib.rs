use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone)]
pub struct LivenessRequest {
    /// Base64-encoded image bytes.
    pub image_data: String,
    /// Declared format ("jpeg", "png", ...). Advisory only; the server
    /// decodes from the bytes themselves.
    pub image_format: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct LivenessProbabilities {
    pub fake: f32,
    pub live: f32,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LivenessResponse {
    pub is_live: bool,
    pub confidence: f32,
    pub predicted_class: String,
    pub probabilities: LivenessProbabilities,
    pub success: bool,
    pub error_message: String,
}

impl LivenessResponse {
    pub fn failure(message: String) -> Self {
        Self {
            is_live: false,
            confidence: 0.0,
            predicted_class: "error".into(),
            probabilities: LivenessProbabilities::default(),
            success: false,
            error_message: message,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ModelStatusResponse {
    pub status: String,
    pub model_name: String,
    pub model_type: String,
    pub local_path: String,
    pub is_loaded: bool,
}
