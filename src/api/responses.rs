use crate::classify::Category;
use serde::Serialize;

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
    Ko,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthSuccessResponse {
    pub status: HealthStatus,
    pub monitors: usize,
    pub classified: usize,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum TickStatusResponse {
    Pending,
    Classified,
    NoHistory,
    NoReading,
    SourceError,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct MonitorResponse {
    pub attraction: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction_minutes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_minutes: Option<u32>,
    pub status: TickStatusResponse,
    pub notifications_sent: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_tick: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct MonitorsSuccessResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduler_mode: Option<String>,
    pub monitors: Vec<MonitorResponse>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RankingEntryResponse {
    pub rank: usize,
    pub attraction: String,
    pub prediction_minutes: f64,
    pub actual_minutes: u32,
    pub value: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RankingsSuccessResponse {
    pub rankings: Vec<RankingEntryResponse>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LaneResponse {
    pub attraction: String,
    /// Return time such as "6:35 PM", or "Sold Out" / "Closed"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes_until: Option<i64>,
    pub in_window: bool,
    pub notifications_sent: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_tick: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LanesSuccessResponse {
    pub lanes: Vec<LaneResponse>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ErrorResponse {
    pub error_code: ErrorCode,
    pub error_message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    UnknownAttraction,
    InvalidLimit,
    InternalError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pending_monitor_omits_missing_fields() {
        let response = MonitorResponse {
            attraction: "Autopia".to_string(),
            category: None,
            prediction_minutes: None,
            actual_minutes: None,
            status: TickStatusResponse::Pending,
            notifications_sent: 0,
            last_tick: None,
        };

        let value = serde_json::to_value(response).expect("serialize monitor response");
        assert_eq!(
            value,
            json!({
                "attraction": "Autopia",
                "status": "pending",
                "notifications_sent": 0
            })
        );
    }

    #[test]
    fn classified_monitor_serializes_category_in_caps() {
        let response = MonitorResponse {
            attraction: "Space Mountain".to_string(),
            category: Some(Category::NotGood),
            prediction_minutes: Some(44.5),
            actual_minutes: Some(60),
            status: TickStatusResponse::Classified,
            notifications_sent: 2,
            last_tick: Some("2026-01-11T12:30:00Z".to_string()),
        };

        let value = serde_json::to_value(response).expect("serialize monitor response");
        assert_eq!(value["category"], json!("NOT_GOOD"));
        assert_eq!(value["status"], json!("classified"));
        assert_eq!(value["last_tick"], json!("2026-01-11T12:30:00Z"));
    }

    #[test]
    fn error_response_uses_screaming_codes() {
        let response = ErrorResponse {
            error_code: ErrorCode::UnknownAttraction,
            error_message: "Unknown attraction: Dumbo".to_string(),
            timestamp: "2026-01-11T12:30:00Z".to_string(),
        };

        let value = serde_json::to_value(response).expect("serialize error response");
        assert_eq!(
            value,
            json!({
                "error_code": "UNKNOWN_ATTRACTION",
                "error_message": "Unknown attraction: Dumbo",
                "timestamp": "2026-01-11T12:30:00Z"
            })
        );
    }

    #[test]
    fn health_status_is_lowercase() {
        let response = HealthSuccessResponse {
            status: HealthStatus::Degraded,
            monitors: 3,
            classified: 1,
            timestamp: "2026-01-11T12:30:00Z".to_string(),
        };

        let value = serde_json::to_value(response).expect("serialize health response");
        assert_eq!(value["status"], json!("degraded"));
    }
}
