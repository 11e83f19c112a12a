//! Pooled-duplication model.
//!
//! Each hour-matched sample is repeated `weight` times into a combined pool and
//! the pool's plain mean is returned. Numerically this is the same weighted
//! mean as [`crate::estimation::weighted`].

use crate::estimation::model::Estimator;
use crate::estimation::{EstimationError, Prediction, QueryWindow};
use crate::history::{AttractionId, Observation, SampleStore};
use time::PrimitiveDateTime;

#[derive(Debug, Clone, Copy, Default)]
pub struct PooledModel;

fn build_pool(observations: &[Observation], window: &QueryWindow) -> Vec<f64> {
    let mut pool = Vec::new();
    for observation in observations.iter().filter(|o| window.matches_hour(o)) {
        let copies = window.weight(observation) as usize;
        pool.extend(std::iter::repeat_n(observation.wait_minutes, copies));
    }
    pool
}

pub fn pooled_mean(observations: &[Observation], window: &QueryWindow) -> Option<f64> {
    let pool = build_pool(observations, window);
    if pool.is_empty() {
        return None;
    }
    Some(pool.iter().sum::<f64>() / pool.len() as f64)
}

impl Estimator for PooledModel {
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
        pooled_mean(observations, &window).ok_or_else(|| EstimationError::NoHistory {
            attraction: attraction_id.clone(),
            hour: window.hour,
        })
    }

    fn name(&self) -> &'static str {
        "pooled"
    }
}
