//! Crop production prediction service.
//!
//! Serves a pre-fitted regression pipeline over HTTP, as a form page and as
//! a JSON API.

pub mod config;
pub mod error;
pub mod features;
pub mod model;
pub mod page;
pub mod server;
pub mod service;
pub mod types;

pub use config::Config;
pub use error::{ApiError, PredictError};
pub use model::Pipeline;
pub use server::{create_router, AppState};
pub use service::{PredictionService, Regressor};
