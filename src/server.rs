// src/server.rs

//! HTTP query surface for the presentation layer.
//!
//! - `GET /api/schedule`: current schedule (always renderable)
//! - `GET /api/status`: last update time and data origin
//!
//! Every response disables intermediary caching.

use std::future::Future;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::error::Result;
use crate::models::ServerConfig;
use crate::pipeline::SchedulePipeline;

const NO_CACHE: [(header::HeaderName, &str); 3] = [
    (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
    (header::PRAGMA, "no-cache"),
    (header::EXPIRES, "0"),
];

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<SchedulePipeline>,
    pub refresh_on_request: bool,
}

#[derive(Debug, Serialize)]
struct ErrorPayload {
    error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusPayload {
    last_update: Option<DateTime<Utc>>,
    last_cycle: Option<DateTime<Utc>>,
    fallback: bool,
    fingerprint: Option<String>,
}

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/schedule", get(get_schedule))
        .route("/api/status", get(get_status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until `shutdown` resolves.
pub async fn serve<F>(config: &ServerConfig, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(&config.bind).await?;
    log::info!("Serving schedule on http://{}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn get_schedule(State(state): State<AppState>) -> Response {
    let outcome = if state.refresh_on_request {
        Some(state.pipeline.run_cycle().await)
    } else {
        state.pipeline.latest().await
    };

    match outcome {
        Some(outcome) => (NO_CACHE, Json(outcome.data)).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            NO_CACHE,
            Json(ErrorPayload {
                error: "No schedule available yet".into(),
            }),
        )
            .into_response(),
    }
}

async fn get_status(State(state): State<AppState>) -> Response {
    let latest = state.pipeline.latest().await;
    let payload = StatusPayload {
        last_update: state.pipeline.last_update().await,
        last_cycle: latest.as_ref().map(|o| o.finished_at),
        fallback: latest.as_ref().is_some_and(|o| o.is_fallback()),
        fingerprint: latest.as_ref().map(|o| o.data.fingerprint()),
    };
    (NO_CACHE, Json(payload)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FetcherConfig, NotifierConfig, ParserConfig, ScheduleData};
    use crate::services::{RecordingNotifier, ScheduleFetcher, ScheduleParser};
    use crate::storage::MemoryStorage;
    use crate::test_support::{TestServer, schedule_page};

    fn state(url: &str, refresh_on_request: bool) -> AppState {
        let config = FetcherConfig {
            url: url.to_string(),
            timeout_secs: 5,
            try_alternatives: false,
            ..FetcherConfig::default()
        };
        AppState {
            pipeline: Arc::new(SchedulePipeline::new(
                ScheduleFetcher::new(&config).unwrap(),
                ScheduleParser::new(&ParserConfig::default()).unwrap(),
                Arc::new(MemoryStorage::new()),
                Arc::new(RecordingNotifier::default()),
                NotifierConfig::default(),
            )),
            refresh_on_request,
        }
    }

    async fn spawn(state: AppState) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_schedule_is_fresh_and_uncached() {
        let upstream = TestServer::start(vec![(200, schedule_page(24..36))]).await;
        let base = spawn(state(&upstream.url(), true)).await;

        let response = reqwest::get(format!("{base}/api/schedule")).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "no-cache, no-store, must-revalidate"
        );
        assert_eq!(response.headers()[header::PRAGMA], "no-cache");

        let data: ScheduleData = response.json().await.unwrap();
        assert_eq!(data.date, "16 жовтня 2026 року");
        assert_eq!(data.queue_schedules.len(), 3);

        reqwest::get(format!("{base}/api/schedule")).await.unwrap();
        assert_eq!(upstream.hits(), 2);
    }

    #[tokio::test]
    async fn test_schedule_falls_back_on_upstream_error() {
        let upstream = TestServer::start(vec![(500, String::new())]).await;
        let base = spawn(state(&upstream.url(), true)).await;

        let data: ScheduleData = reqwest::get(format!("{base}/api/schedule"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(data.fallback);
        assert!(data.description.contains("500"));
    }

    #[tokio::test]
    async fn test_cached_mode_without_cycle_is_unavailable() {
        let upstream = TestServer::start(vec![(200, schedule_page(0..0))]).await;
        let base = spawn(state(&upstream.url(), false)).await;

        let response = reqwest::get(format!("{base}/api/schedule")).await.unwrap();
        assert_eq!(response.status(), 503);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"], "No schedule available yet");
        assert_eq!(upstream.hits(), 0);
    }

    #[tokio::test]
    async fn test_status_reports_last_update() {
        let upstream = TestServer::start(vec![(200, schedule_page(0..0))]).await;
        let state = state(&upstream.url(), false);
        state.pipeline.run_cycle().await;
        let base = spawn(state).await;

        let body: serde_json::Value = reqwest::get(format!("{base}/api/status"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(body["lastUpdate"].is_string());
        assert_eq!(body["fallback"], false);
        assert!(body["fingerprint"].is_string());
    }
}
