use std::sync::Arc;

use crate::error::PredictError;
use crate::features::FeatureRecord;
use crate::model::ModelInfo;
use crate::types::AreaInput;

/// Anything that maps one assembled record to one number.
///
/// Implementations are shared read-only across request tasks.
pub trait Regressor: Send + Sync {
    fn predict(&self, record: &FeatureRecord) -> Result<f64, PredictError>;

    fn info(&self) -> ModelInfo;
}

/// Handle to the process-wide model, cloned into every handler.
#[derive(Clone)]
pub struct PredictionService {
    model: Arc<dyn Regressor>,
}

impl PredictionService {
    pub fn new(model: Arc<dyn Regressor>) -> Self {
        Self { model }
    }

    /// Assemble the single-row record and run it through the model.
    pub fn predict_production(
        &self,
        state: &str,
        district: &str,
        season: &str,
        crop: &str,
        area: &AreaInput,
    ) -> Result<f64, PredictError> {
        let record = FeatureRecord::assemble(state, district, season, crop, area);
        tracing::debug!(
            state = %record.state_name,
            district = %record.district_name,
            season = %record.season,
            crop = %record.crop,
            area = ?record.area,
            "predicting"
        );
        self.model.predict(&record)
    }

    pub fn info(&self) -> ModelInfo {
        self.model.info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct AreaEcho {
        calls: AtomicUsize,
    }

    impl Regressor for AreaEcho {
        fn predict(&self, record: &FeatureRecord) -> Result<f64, PredictError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            record
                .area
                .ok_or_else(|| PredictError::ShapeMismatch("missing Area".into()))
        }

        fn info(&self) -> ModelInfo {
            ModelInfo {
                name: "echo".into(),
                version: "0".into(),
                estimator: "echo",
                features: vec!["Area".into()],
                encoded_width: 1,
            }
        }
    }

    #[test]
    fn normalizes_area_before_the_model() {
        let model = Arc::new(AreaEcho {
            calls: AtomicUsize::new(0),
        });
        let svc = PredictionService::new(model.clone());
        let y = svc
            .predict_production("Assam", "NAGAON", "Kharif", "Rice", &AreaInput::Text("1,234".into()))
            .unwrap();
        assert_eq!(y, 1234.0);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
        assert_eq!(svc.info().name, "echo");
    }
}
