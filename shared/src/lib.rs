use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};

/// Diagnostic categories every classifier scores, in output-vector order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumIter,
    strum_macros::EnumCount,
)]
pub enum ClassLabel {
    Healthy,
    Osteopenia,
    Osteoporosis,
}

/// Name reported for a class index outside the label set.
pub const UNKNOWN_CLASS: &str = "Unknown";

/// Name reported in `Predicted_Class` for the combined record.
pub const ENSEMBLE_NAME: &str = "Ensemble";

impl ClassLabel {
    pub const COUNT: usize = <Self as EnumCount>::COUNT;

    pub fn from_index(index: usize) -> Option<Self> {
        Self::iter().nth(index)
    }

    pub fn names() -> Vec<String> {
        Self::iter().map(|label| label.to_string()).collect()
    }
}

/// Index of the largest score; the first one wins a tie and NaN never wins.
/// Returns 0 for an empty slice.
pub fn argmax(scores: &[f32]) -> usize {
    let mut best = 0;
    for (i, &score) in scores.iter().enumerate() {
        if score > scores[best] || scores[best].is_nan() {
            best = i;
        }
    }
    best
}

pub fn class_name(index: usize) -> String {
    ClassLabel::from_index(index)
        .map(|label| label.to_string())
        .unwrap_or_else(|| UNKNOWN_CLASS.to_string())
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PredictRequest {
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(rename = "useEnsemble", default)]
    pub use_ensemble: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ModelPrediction {
    #[serde(rename = "Predicted_Class")]
    pub predicted_class: String,
    #[serde(rename = "Probabilities")]
    pub probabilities: Vec<f32>,
    #[serde(
        rename = "Winning_Class",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub winning_class: Option<String>,
}

impl ModelPrediction {
    pub fn is_ensemble(&self) -> bool {
        self.winning_class.is_some() && self.predicted_class == ENSEMBLE_NAME
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PredictResponse {
    pub models: Vec<ModelPrediction>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UploadResponse {
    pub file_path: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}
