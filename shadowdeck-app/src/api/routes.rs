use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shadowdeck_core::{
    CoreError, DailyStat, ForecastDay, IntervalDistribution, OverallStats, Quality, Scheduler,
    Settings,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::error;

use crate::api::dto::{error_status, intervals_out, AnswerIn, CardIn, CardOut, ForecastQuery, SettingsIn};

/// The scheduler is not safe for concurrent mutation, so requests take turns.
pub struct AppState {
    pub scheduler: Mutex<Scheduler>,
}

type ApiResult<T> = Result<Json<T>, StatusCode>;

fn fail(e: CoreError) -> StatusCode {
    let status = error_status(&e);
    if status.is_server_error() {
        error!(error = %e, "request failed");
    }
    status
}

pub async fn review_queue(State(st): State<Arc<AppState>>) -> ApiResult<Vec<CardOut>> {
    let s = st.scheduler.lock().await;
    Ok(Json(s.review_queue().into_iter().map(CardOut::from).collect()))
}

pub async fn create_card(State(st): State<Arc<AppState>>, Json(body): Json<CardIn>) -> ApiResult<CardOut> {
    let mut s = st.scheduler.lock().await;
    let card = s.get_or_create_card(&body.id, body.payload).await.map_err(fail)?;
    Ok(Json(card.into()))
}

pub async fn get_card(State(st): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<CardOut> {
    let s = st.scheduler.lock().await;
    let card = s.card(&id).cloned().ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(card.into()))
}

pub async fn answer_card(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<AnswerIn>,
) -> ApiResult<CardOut> {
    let quality = Quality::try_from(body.quality).map_err(fail)?;
    let mut s = st.scheduler.lock().await;
    let card = s
        .answer_card(&id, quality)
        .await
        .map_err(fail)?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(card.into()))
}

pub async fn next_intervals(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<BTreeMap<u8, String>> {
    let s = st.scheduler.lock().await;
    let p = s.next_intervals(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(intervals_out(p)))
}

pub async fn overall_stats(State(st): State<Arc<AppState>>) -> ApiResult<OverallStats> {
    Ok(Json(st.scheduler.lock().await.overall_stats()))
}

pub async fn today_stats(State(st): State<Arc<AppState>>) -> ApiResult<DailyStat> {
    Ok(Json(st.scheduler.lock().await.today_stats()))
}

pub async fn forecast(
    State(st): State<Arc<AppState>>,
    Query(q): Query<ForecastQuery>,
) -> ApiResult<Vec<ForecastDay>> {
    let days = q.days.unwrap_or(30).min(366);
    Ok(Json(st.scheduler.lock().await.forecast(days)))
}

pub async fn interval_distribution(State(st): State<Arc<AppState>>) -> ApiResult<IntervalDistribution> {
    Ok(Json(st.scheduler.lock().await.interval_distribution()))
}

pub async fn get_settings(State(st): State<Arc<AppState>>) -> ApiResult<Settings> {
    Ok(Json(st.scheduler.lock().await.settings().clone()))
}

pub async fn put_settings(
    State(st): State<Arc<AppState>>,
    Json(body): Json<SettingsIn>,
) -> ApiResult<Settings> {
    let mut s = st.scheduler.lock().await;
    let merged = body.merge_into(s.settings().clone());
    s.update_settings(merged.clone()).await.map_err(fail)?;
    Ok(Json(merged))
}
