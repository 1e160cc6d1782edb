//! HTTP surface of the dashboard
//!
//! Every handler reads the cache only; none of them touch the events file.

use std::net::IpAddr;
use std::sync::Arc;

use rocket::config::LogLevel;
use rocket::response::content::RawHtml;
use rocket::serde::json::Json;
use rocket::{get, routes, Build, Rocket, State};
use serde_json::Value;
use tracing::info;

use crate::config::DashboardConfig;
use crate::dashboard::cache::{DashboardStatus, EventCache};
use crate::error::{Result, SubcastError};

const INDEX_HTML: &str = include_str!("index.html");

#[get("/")]
fn index() -> RawHtml<&'static str> {
    RawHtml(INDEX_HTML)
}

/// Entries exactly as they appear in the events file
#[get("/api/events")]
fn events(cache: &State<Arc<EventCache>>) -> Json<Vec<Value>> {
    Json(cache.snapshot().events.clone())
}

#[get("/api/status")]
fn status(cache: &State<Arc<EventCache>>) -> Json<DashboardStatus> {
    Json(cache.status())
}

/// Assemble the server without binding it
///
/// # Errors
///
/// Returns `SubcastError::Dashboard` if the configured address is not an IP.
pub fn build(cache: Arc<EventCache>, config: &DashboardConfig) -> Result<Rocket<Build>> {
    let address: IpAddr = config.address.parse().map_err(|e| {
        SubcastError::Dashboard(format!("Invalid listen address '{}': {}", config.address, e))
    })?;

    // Request logging goes through tracing instead
    let figment = rocket::Config::figment()
        .merge(("address", address))
        .merge(("port", config.port))
        .merge(("log_level", LogLevel::Off));

    Ok(rocket::custom(figment)
        .manage(cache)
        .mount("/", routes![index, events, status]))
}

/// Bind and serve until the server shuts down
pub async fn serve(cache: Arc<EventCache>, config: &DashboardConfig) -> Result<()> {
    let server = build(cache, config)?;
    info!(
        "Dashboard listening on http://{}:{}",
        config.address, config.port
    );
    server
        .launch()
        .await
        .map_err(|e| SubcastError::Dashboard(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::{Attempt, Event, EventStatus};
    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::json;

    fn failed(title: &str) -> Value {
        let event =
            Attempt::start("test", title).rejected(ErrorKind::CommunityNotFound, "gone".to_string());
        serde_json::to_value(event).unwrap()
    }

    async fn client(cache: Arc<EventCache>) -> Client {
        let rocket = build(cache, &DashboardConfig::default()).unwrap();
        Client::tracked(rocket).await.unwrap()
    }

    #[tokio::test]
    async fn test_index_serves_page() {
        let client = client(Arc::new(EventCache::new())).await;
        let response = client.get("/").dispatch().await;

        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.content_type(), Some(ContentType::HTML));
        let body = response.into_string().await.unwrap();
        assert!(body.contains("/api/events"));
        assert!(body.contains("refresh-btn"));
    }

    #[tokio::test]
    async fn test_events_returns_cached_list() {
        let cache = Arc::new(EventCache::new());
        cache.replace(vec![failed("one"), failed("two")]);
        let client = client(Arc::clone(&cache)).await;

        let response = client.get("/api/events").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let events: Vec<Event> = response.into_json().await.unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].title, "one");
        assert_eq!(events[1].status, EventStatus::Failed);
    }

    #[tokio::test]
    async fn test_events_follow_cache_swaps() {
        let cache = Arc::new(EventCache::new());
        let client = client(Arc::clone(&cache)).await;

        let empty: Vec<Value> = client.get("/api/events").dispatch().await.into_json().await.unwrap();
        assert!(empty.is_empty());

        cache.replace(vec![failed("late")]);
        let events: Vec<Value> = client.get("/api/events").dispatch().await.into_json().await.unwrap();
        assert_eq!(events[0]["title"], "late");
    }

    #[tokio::test]
    async fn test_events_are_served_verbatim() {
        // Written by another tool: naive timestamp, extra key, no error_kind
        let entry = json!({
            "timestamp": "2024-01-01T12:00:00.123456",
            "subreddit": "test",
            "title": "legacy",
            "status": "success",
            "post_id": "abc123",
            "post_url": "https://www.reddit.com/r/test/comments/abc123/legacy/",
            "error": null,
            "flair": "news"
        });
        let cache = Arc::new(EventCache::new());
        cache.replace(vec![entry.clone()]);
        let client = client(cache).await;

        let served: Vec<Value> = client
            .get("/api/events")
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();

        assert_eq!(served, vec![entry]);
    }

    #[tokio::test]
    async fn test_status_reports_cache_state() {
        let cache = Arc::new(EventCache::new());
        let snapshot = cache.replace(vec![failed("a"), failed("b"), failed("c")]);
        let client = client(cache).await;

        let status: DashboardStatus = client
            .get("/api/status")
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();

        assert_eq!(status.events_count, 3);
        assert_eq!(status.last_update, snapshot.refreshed_at);
    }

    #[test]
    fn test_build_rejects_bad_address() {
        let config = DashboardConfig {
            address: "not-an-ip".to_string(),
            ..DashboardConfig::default()
        };
        let result = build(Arc::new(EventCache::new()), &config);
        assert!(matches!(result, Err(SubcastError::Dashboard(_))));
    }
}
