use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use std::sync::{Arc, RwLock};

pub mod handlers;
pub mod responses;

pub fn router(state: Arc<RwLock<AppState>>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::get_health))
        .route("/api/monitors", get(handlers::get_monitors))
        .route("/api/monitors/{name}", get(handlers::get_monitor))
        .route("/api/rankings", get(handlers::get_rankings))
        .route("/api/lightning-lanes", get(handlers::get_lanes))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::AttractionId;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn state() -> Arc<RwLock<AppState>> {
        let mut app_state = AppState::new();
        app_state.register(AttractionId::new("Space Mountain"));
        Arc::new(RwLock::new(app_state))
    }

    #[tokio::test]
    async fn monitor_route_decodes_path_names() -> Result<(), Box<dyn std::error::Error>> {
        let response = router(state())
            .oneshot(
                Request::builder()
                    .uri("/api/monitors/Space%20Mountain")
                    .body(Body::empty())?,
            )
            .await?;

        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_route_name_is_not_found() -> Result<(), Box<dyn std::error::Error>> {
        let response = router(state())
            .oneshot(Request::builder().uri("/api/monitors/Autopia").body(Body::empty())?)
            .await?;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn rankings_accept_limit_query() -> Result<(), Box<dyn std::error::Error>> {
        let response = router(state())
            .oneshot(Request::builder().uri("/api/rankings?limit=3").body(Body::empty())?)
            .await?;

        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn lightning_lanes_route_is_served() -> Result<(), Box<dyn std::error::Error>> {
        let response = router(state())
            .oneshot(Request::builder().uri("/api/lightning-lanes").body(Body::empty())?)
            .await?;

        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn health_with_only_pending_monitors_is_unavailable() -> Result<(), Box<dyn std::error::Error>> {
        let response = router(state())
            .oneshot(Request::builder().uri("/api/health").body(Body::empty())?)
            .await?;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        Ok(())
    }
}
