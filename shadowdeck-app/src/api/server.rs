use axum::{
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::info;

use shadowdeck_core::Scheduler;
use crate::api::routes::{
    answer_card, create_card, forecast, get_card, get_settings, interval_distribution,
    next_intervals, overall_stats, put_settings, review_queue, today_stats, AppState,
};

pub fn router(scheduler: Scheduler) -> Router {
    let state = Arc::new(AppState {
        scheduler: Mutex::new(scheduler),
    });

    Router::new()
        .route("/queue", get(review_queue))
        .route("/cards", post(create_card))
        .route("/cards/:id", get(get_card))
        .route("/cards/:id/answer", post(answer_card))
        .route("/cards/:id/next-intervals", get(next_intervals))
        .route("/stats", get(overall_stats))
        .route("/stats/today", get(today_stats))
        .route("/stats/forecast", get(forecast))
        .route("/stats/intervals", get(interval_distribution))
        .route("/settings", get(get_settings).put(put_settings))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn run(scheduler: Scheduler, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(scheduler);
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "api listening");
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{TimeZone, Utc};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use shadowdeck_core::{repo::memory::MemoryStore, ManualClock, NoFuzz};
    use tower::ServiceExt;

    async fn app() -> Router {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap());
        let scheduler =
            Scheduler::open_with(Arc::new(MemoryStore::new()), Arc::new(clock), Box::new(NoFuzz)).await;
        router(scheduler)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(v) => Body::from(v.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn create_answer_and_preview() {
        let app = app().await;

        let (status, card) = call(
            &app,
            "POST",
            "/cards",
            Some(json!({ "id": "gonna", "payload": { "en": "gonna", "zh": "將要" } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(card["state"], "new");

        let (_, queue) = call(&app, "GET", "/queue", None).await;
        assert_eq!(queue.as_array().unwrap().len(), 1);

        let (_, preview) = call(&app, "GET", "/cards/gonna/next-intervals", None).await;
        assert_eq!(preview["3"], "10m");
        assert_eq!(preview["4"], "4d");

        let (status, card) = call(&app, "POST", "/cards/gonna/answer", Some(json!({ "quality": 4 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(card["state"], "review");
        assert_eq!(card["interval"], 4);

        let (_, today) = call(&app, "GET", "/stats/today", None).await;
        assert_eq!(today["new_cards"], 1);

        let (_, forecast) = call(&app, "GET", "/stats/forecast?days=5", None).await;
        assert_eq!(forecast[4]["due"], 1);
    }

    #[tokio::test]
    async fn bad_quality_and_unknown_card() {
        let app = app().await;
        call(&app, "POST", "/cards", Some(json!({ "id": "a" }))).await;

        let (status, _) = call(&app, "POST", "/cards/a/answer", Some(json!({ "quality": 5 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, "POST", "/cards/zzz/answer", Some(json!({ "quality": 3 }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, "GET", "/cards/zzz/next-intervals", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn settings_merge() {
        let app = app().await;
        let (status, s) = call(&app, "PUT", "/settings", Some(json!({ "new_cards_per_day": 5 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(s["new_cards_per_day"], 5);
        assert_eq!(s["max_reviews_per_day"], 200);

        let (_, stats) = call(&app, "GET", "/stats", None).await;
        assert_eq!(stats["new_remaining"], 5);
    }
}
