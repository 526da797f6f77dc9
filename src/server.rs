//! HTTP surfaces: the form page and the JSON API.

use axum::{
    extract::{rejection::FormRejection, rejection::JsonRejection, State},
    http::{header, Method, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::error::{ApiError, Result};
use crate::page::render_index;
use crate::service::PredictionService;
use crate::types::{ApiPredictRequest, AreaInput, PredictForm, PredictionOut, PredictionRequest};

#[derive(Clone)]
pub struct AppState {
    pub service: PredictionService,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let api_routes = Router::new()
        .route("/predict", post(predict_api))
        .route("/health", get(health))
        .layer(cors);

    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict_page))
        .nest("/api", api_routes)
        .fallback(handle_404)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn handle_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

async fn index() -> Html<String> {
    Html(render_index(None, None))
}

/// Run one validated request through the service.
fn run_prediction(service: &PredictionService, request: &PredictionRequest) -> Result<f64> {
    let area = request.validated_area()?;
    let value = service.predict_production(
        &request.state,
        &request.district,
        &request.season,
        &request.crop,
        &AreaInput::Number(area),
    )?;
    Ok(value)
}

async fn predict_page(
    State(state): State<AppState>,
    form: std::result::Result<Form<PredictForm>, FormRejection>,
) -> Html<String> {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            let text = format!("Error: {}", rejection.body_text());
            return Html(render_index(Some(&text), None));
        }
    };

    let outcome = PredictionRequest::try_from(form.clone())
        .and_then(|request| run_prediction(&state.service, &request));

    let text = match outcome {
        Ok(value) => format!("Predicted Production: {:.2}", value),
        Err(ApiError::InvalidArea) => ApiError::InvalidArea.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "page prediction failed");
            format!("Error: {}", e)
        }
    };
    Html(render_index(Some(&text), Some(&form)))
}

async fn predict_api(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Option<ApiPredictRequest>>, JsonRejection>,
) -> Result<Json<PredictionOut>> {
    let body = match payload {
        Ok(Json(Some(body))) => body,
        // a literal `null` carries no payload
        Ok(Json(None)) => return Err(ApiError::MissingBody),
        Err(JsonRejection::JsonDataError(e)) => return Err(ApiError::BadRequest(e.body_text())),
        Err(_) => return Err(ApiError::MissingBody),
    };

    let request = PredictionRequest::try_from(body)?;
    let value = run_prediction(&state.service, &request)?;
    tracing::debug!(prediction = value, "api prediction");
    Ok(Json(PredictionOut::rounded(value)))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "model": state.service.info(),
    }))
}
