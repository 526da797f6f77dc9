//! Error types for prediction and the HTTP surfaces

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Why the pipeline refused a record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictError {
    #[error("{0}")]
    ShapeMismatch(String),

    #[error("Found unknown category '{value}' in column {column} during transform")]
    UnseenCategory { column: String, value: String },

    #[error("{0}")]
    Internal(String),
}

impl PredictError {
    /// True when the caller can fix the failure by changing the input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PredictError::UnseenCategory { .. })
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("JSON body required")]
    MissingBody,

    #[error("Invalid Area value!")]
    InvalidArea,

    #[error("missing field {0}")]
    MissingField(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Predict(#[from] PredictError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingBody
            | ApiError::InvalidArea
            | ApiError::MissingField(_)
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Predict(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Predict(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Predict(e) if !e.is_client_error() => {
                tracing::error!(detail = %e, "Prediction failed");
            }
            ApiError::Predict(e) => {
                tracing::warn!(detail = %e, "Prediction rejected input");
            }
            _ => {}
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_failure_origin() {
        assert_eq!(ApiError::MissingBody.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidArea.status(), StatusCode::BAD_REQUEST);
        let unseen = PredictError::UnseenCategory {
            column: "Crop".into(),
            value: "Kiwi".into(),
        };
        assert_eq!(ApiError::from(unseen).status(), StatusCode::BAD_REQUEST);
        let internal = PredictError::Internal("boom".into());
        assert_eq!(
            ApiError::from(internal).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let shape = PredictError::ShapeMismatch("Input contains NaN".into());
        assert_eq!(
            ApiError::from(shape).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn messages_match_wire_text() {
        assert_eq!(ApiError::MissingBody.to_string(), "JSON body required");
        assert_eq!(ApiError::InvalidArea.to_string(), "Invalid Area value!");
        assert_eq!(
            ApiError::from(PredictError::Internal("boom".into())).to_string(),
            "boom"
        );
    }
}
