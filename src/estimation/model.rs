//! Estimation model trait.
//!
//! Models are selected via `[estimation].model` in the config file and built
//! once at startup.

use crate::estimation::Prediction;
use crate::history::{AttractionId, SampleStore};
use time::PrimitiveDateTime;

/// Produces an expected wait for an attraction at a query time.
pub trait Estimator: Send + Sync + std::fmt::Debug {
    /// `query_time` must already carry any configured hour offset.
    fn estimate(
        &self,
        store: &SampleStore,
        attraction_id: &AttractionId,
        query_time: PrimitiveDateTime,
    ) -> Prediction;

    /// Short name used in logs and status output.
    fn name(&self) -> &'static str;
}
