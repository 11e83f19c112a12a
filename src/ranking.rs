//! "Which attraction is the best deal right now" ordering across monitors.

use crate::history::AttractionId;
use crate::state::{MonitorSnapshot, TickStatus};
use std::cmp::Ordering;

pub const DEFAULT_RANKING_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct RankedAttraction {
    pub attraction_id: AttractionId,
    pub prediction_minutes: f64,
    pub actual_minutes: u32,
    /// `actual - predicted`; lower means a shorter line than usual.
    pub value: f64,
}

/// Rank attractions whose latest tick was classified, most favourable first.
pub fn rank<'a>(
    snapshots: impl IntoIterator<Item = &'a MonitorSnapshot>,
    limit: usize,
) -> Vec<RankedAttraction> {
    let mut ranked: Vec<RankedAttraction> = snapshots
        .into_iter()
        .filter(|snapshot| snapshot.status == TickStatus::Classified)
        .filter_map(|snapshot| {
            let prediction_minutes = snapshot.prediction_minutes?;
            let actual_minutes = snapshot.actual_minutes?;
            Some(RankedAttraction {
                attraction_id: snapshot.attraction_id.clone(),
                prediction_minutes,
                actual_minutes,
                value: f64::from(actual_minutes) - prediction_minutes,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.value
            .partial_cmp(&b.value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.attraction_id.cmp(&b.attraction_id))
    });
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Category;

    fn snapshot(name: &str, prediction: Option<f64>, actual: Option<u32>, status: TickStatus) -> MonitorSnapshot {
        MonitorSnapshot {
            attraction_id: AttractionId::new(name),
            category: Some(Category::Average),
            prediction_minutes: prediction,
            actual_minutes: actual,
            status,
            notifications_sent: 0,
            last_tick: None,
        }
    }

    #[test]
    fn orders_by_actual_minus_predicted() {
        let snapshots = vec![
            snapshot("Autopia", Some(30.0), Some(35), TickStatus::Classified),
            snapshot("Space Mountain", Some(60.0), Some(40), TickStatus::Classified),
            snapshot("Haunted Mansion", Some(25.0), Some(25), TickStatus::Classified),
        ];

        let ranked = rank(&snapshots, DEFAULT_RANKING_LIMIT);

        let names: Vec<&str> = ranked.iter().map(|r| r.attraction_id.as_str()).collect();
        assert_eq!(names, vec!["Space Mountain", "Haunted Mansion", "Autopia"]);
        assert_eq!(ranked[0].value, -20.0);
    }

    #[test]
    fn skips_attractions_without_a_fresh_reading() {
        let snapshots = vec![
            snapshot("Autopia", Some(30.0), None, TickStatus::NoReading),
            snapshot("Star Tours", None, None, TickStatus::NoHistory),
            snapshot("Matterhorn Bobsleds", Some(30.0), Some(45), TickStatus::Classified),
            snapshot("Dumbo", None, None, TickStatus::Pending),
        ];

        let ranked = rank(&snapshots, DEFAULT_RANKING_LIMIT);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].attraction_id.as_str(), "Matterhorn Bobsleds");
    }

    #[test]
    fn limit_truncates() {
        let snapshots: Vec<MonitorSnapshot> = (0..8)
            .map(|i| snapshot(&format!("Ride {i}"), Some(30.0), Some(20 + i), TickStatus::Classified))
            .collect();

        let ranked = rank(&snapshots, 3);

        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[2].attraction_id.as_str(), "Ride 2");
    }
}
