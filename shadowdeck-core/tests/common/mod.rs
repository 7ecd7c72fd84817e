#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::json;
use shadowdeck_core::repo::memory::MemoryStore;
use shadowdeck_core::{Card, CardState, Due, ManualClock, NoFuzz, Scheduler, Store};
use std::sync::Arc;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap()
}

pub fn today() -> NaiveDate {
    t0().date_naive()
}

pub fn days(n: i64) -> NaiveDate {
    today() + Duration::days(n)
}

pub fn word(en: &str) -> serde_json::Value {
    json!({ "en": en, "zh": "", "category": "idiom" })
}

/// A graduated card with the given interval, due on `due`.
pub fn review_card(id: &str, interval: u32, due: NaiveDate) -> Card {
    let mut c = Card::new(id, word(id), t0() - Duration::days(30), today());
    c.state = CardState::Review;
    c.interval = interval;
    c.due = Due::Day(due);
    c.reps = 3;
    c
}

pub fn learning_card(id: &str, due: DateTime<Utc>) -> Card {
    let mut c = Card::new(id, word(id), t0() - Duration::days(1), today());
    c.state = CardState::Learning;
    c.due = Due::At(due);
    c.reps = 1;
    c
}

pub fn new_card(id: &str, created: DateTime<Utc>) -> Card {
    Card::new(id, word(id), created, today())
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub scheduler: Scheduler,
}

/// Scheduler over a memory store pre-loaded with `cards`, clock at [`t0`],
/// fuzz disabled.
pub async fn harness(cards: Vec<Card>) -> Harness {
    let store = Arc::new(MemoryStore::new());
    for c in &cards {
        store.put_card(c).await.unwrap();
    }
    let clock = Arc::new(ManualClock::new(t0()));
    let scheduler = Scheduler::open_with(store.clone(), clock.clone(), Box::new(NoFuzz)).await;
    Harness {
        store,
        clock,
        scheduler,
    }
}
