use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Area as it arrives on the wire: form fields are always text, JSON
/// bodies may carry either a number or a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AreaInput {
    Number(f64),
    Text(String),
}

impl AreaInput {
    /// Plain float parse used by the request boundary. Surrounding
    /// whitespace is accepted, thousands separators are not.
    pub fn parse_float(&self) -> Option<f64> {
        match self {
            AreaInput::Number(v) => Some(*v),
            AreaInput::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }
}

// Both surfaces deserialize into all-optional structs so that a missing
// field is reported by our own validation instead of an extractor rejection.

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictForm {
    #[serde(rename = "State_Name")]
    pub state: Option<String>,
    #[serde(rename = "District_Name")]
    pub district: Option<String>,
    #[serde(rename = "Season")]
    pub season: Option<String>,
    #[serde(rename = "Crop")]
    pub crop: Option<String>,
    #[serde(rename = "Area")]
    pub area: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiPredictRequest {
    #[serde(rename = "State_Name")]
    pub state: Option<String>,
    #[serde(rename = "District_Name")]
    pub district: Option<String>,
    #[serde(rename = "Season")]
    pub season: Option<String>,
    #[serde(rename = "Crop")]
    pub crop: Option<String>,
    #[serde(rename = "Area")]
    pub area: Option<AreaInput>,
}

/// A request whose named fields have all been supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    pub state: String,
    pub district: String,
    pub season: String,
    pub crop: String,
    pub area: AreaInput,
}

impl PredictionRequest {
    /// VALIDATE_AREA step: the raw Area must parse as a float.
    pub fn validated_area(&self) -> Result<f64, ApiError> {
        self.area.parse_float().ok_or(ApiError::InvalidArea)
    }
}

fn require(value: Option<String>, field: &'static str) -> Result<String, ApiError> {
    value.ok_or(ApiError::MissingField(field))
}

impl TryFrom<PredictForm> for PredictionRequest {
    type Error = ApiError;

    fn try_from(form: PredictForm) -> Result<Self, Self::Error> {
        Ok(Self {
            state: require(form.state, "State_Name")?,
            district: require(form.district, "District_Name")?,
            season: require(form.season, "Season")?,
            crop: require(form.crop, "Crop")?,
            area: AreaInput::Text(form.area.ok_or(ApiError::InvalidArea)?),
        })
    }
}

impl TryFrom<ApiPredictRequest> for PredictionRequest {
    type Error = ApiError;

    fn try_from(body: ApiPredictRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            state: require(body.state, "State_Name")?,
            district: require(body.district, "District_Name")?,
            season: require(body.season, "Season")?,
            crop: require(body.crop, "Crop")?,
            area: body.area.ok_or(ApiError::InvalidArea)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct PredictionOut {
    #[serde(rename = "Predicted_Production")]
    pub predicted_production: f64,
}

impl PredictionOut {
    pub fn rounded(value: f64) -> Self {
        Self {
            predicted_production: round2(value),
        }
    }
}

pub fn round2(value: f64) -> f64 {
    let scaled = value * 100.0;
    if !scaled.is_finite() {
        // already far beyond two-decimal precision
        return value;
    }
    scaled.round() / 100.0
}
