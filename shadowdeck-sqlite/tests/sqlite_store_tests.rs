use chrono::{Duration, NaiveDate, TimeZone, Utc};
use serde_json::json;
use shadowdeck_core::{
    repo::Store, Card, CardState, DailyStat, Due, ManualClock, NoFuzz, Quality, ReviewLogEntry,
    Scheduler, Settings,
};
use shadowdeck_sqlite::SqliteStore;
use std::sync::Arc;

fn t0() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap()
}

fn day() -> NaiveDate {
    t0().date_naive()
}

#[tokio::test]
async fn cards_upsert_and_reload() {
    let store = SqliteStore::open_memory().await.unwrap();
    let mut c = Card::new("on the fence", json!({ "en": "on the fence", "zh": "猶豫不決" }), t0(), day());
    store.put_card(&c).await.unwrap();

    c.state = CardState::Learning;
    c.due = Due::At(t0() + Duration::minutes(10));
    c.step = 1;
    c.reps = 1;
    c.last_review = Some(t0());
    store.put_card(&c).await.unwrap();

    let cards = store.load_cards().await.unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0], c);
}

#[tokio::test]
async fn review_day_due_round_trips() {
    let store = SqliteStore::open_memory().await.unwrap();
    let mut c = Card::new("x", json!(null), t0(), day());
    c.state = CardState::Review;
    c.interval = 6;
    c.due = Due::Day(day() + Duration::days(6));
    store.put_card(&c).await.unwrap();

    let back = store.load_cards().await.unwrap().remove(0);
    assert_eq!(back.due, Due::Day(day() + Duration::days(6)));
}

#[tokio::test]
async fn review_log_keeps_newest() {
    let store = SqliteStore::open_memory().await.unwrap();
    let c = Card::new("x", json!({}), t0(), day());
    let mut ids = Vec::new();
    for i in 0..6 {
        let e = ReviewLogEntry::new(&c, Quality::Good, t0() + Duration::minutes(i));
        ids.push(e.id);
        store.append_review(&e, 4).await.unwrap();
    }

    let log = store.load_review_log().await.unwrap();
    let kept: Vec<_> = log.iter().map(|e| e.id).collect();
    assert_eq!(kept, ids[2..]);
    assert_eq!(log[0].quality, Quality::Good);
    assert_eq!(log[0].prior_state, CardState::New);
}

#[tokio::test]
async fn daily_stats_and_settings() {
    let store = SqliteStore::open_memory().await.unwrap();
    assert!(store.load_settings().await.unwrap().is_none());

    let stat = DailyStat {
        new_cards: 3,
        reviews: 10,
        lapses: 1,
        study_time_ms: 42_000,
    };
    store.put_daily_stat(day(), &stat).await.unwrap();
    store
        .put_daily_stat(day(), &DailyStat { reviews: 11, ..stat })
        .await
        .unwrap();
    let daily = store.load_daily_stats().await.unwrap();
    assert_eq!(daily.len(), 1);
    assert_eq!(daily[&day()].reviews, 11);
    assert_eq!(daily[&day()].study_time_ms, 42_000);

    let s = Settings {
        new_cards_per_day: 0,
        max_reviews_per_day: 50,
        show_answer_timer: false,
    };
    store.put_settings(&s).await.unwrap();
    assert_eq!(store.load_settings().await.unwrap(), Some(s));
}

#[tokio::test]
async fn file_database_persists_scheduler_state() {
    let dir = std::env::temp_dir().join(format!("shadowdeck-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("srs.sqlite3");

    {
        let store = Arc::new(SqliteStore::open_file(&path).await.unwrap());
        let mut s = Scheduler::open_with(store, Arc::new(ManualClock::new(t0())), Box::new(NoFuzz)).await;
        s.get_or_create_card("hit the sack", json!({ "en": "hit the sack" }))
            .await
            .unwrap();
        s.answer_card("hit the sack", Quality::Again).await.unwrap();
    }

    let store = Arc::new(SqliteStore::open_file(&path).await.unwrap());
    let s = Scheduler::open_with(store, Arc::new(ManualClock::new(t0())), Box::new(NoFuzz)).await;
    let c = s.card("hit the sack").unwrap();
    assert_eq!(c.state, CardState::Learning);
    assert_eq!(c.due, Due::At(t0() + Duration::minutes(1)));
    assert_eq!(s.today_stats().new_cards, 1);
    assert_eq!(s.review_log().count(), 1);

    let _ = std::fs::remove_dir_all(&dir);
}
