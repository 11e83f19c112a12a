//! Weighted-mean model.
//!
//! Each hour-matched sample contributes `wait * weight` to a running sum,
//! with weights from [`QueryWindow::weight`].

use crate::estimation::model::Estimator;
use crate::estimation::{EstimationError, Prediction, QueryWindow};
use crate::history::{AttractionId, Observation, SampleStore};
use time::PrimitiveDateTime;

#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedModel;

/// Weighted mean over the samples that share the window's hour, or `None` if none do.
pub fn weighted_mean(observations: &[Observation], window: &QueryWindow) -> Option<f64> {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0u64;

    for observation in observations.iter().filter(|o| window.matches_hour(o)) {
        let weight = window.weight(observation);
        weighted_sum += observation.wait_minutes * f64::from(weight);
        total_weight += u64::from(weight);
    }

    if total_weight == 0 {
        None
    } else {
        Some(weighted_sum / total_weight as f64)
    }
}

impl Estimator for WeightedModel {
    fn estimate(
        &self,
        store: &SampleStore,
        attraction_id: &AttractionId,
        query_time: PrimitiveDateTime,
    ) -> Prediction {
        let observations =
            store
                .observations(attraction_id)
                .ok_or_else(|| EstimationError::UnknownAttraction {
                    attraction: attraction_id.clone(),
                })?;
        let window = QueryWindow::new(query_time);
        weighted_mean(observations, &window).ok_or_else(|| EstimationError::NoHistory {
            attraction: attraction_id.clone(),
            hour: window.hour,
        })
    }

    fn name(&self) -> &'static str {
        "weighted"
    }
}
