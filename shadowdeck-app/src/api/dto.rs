use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shadowdeck_core::{Card, CardState, CoreError, Due, Quality, Settings};
use std::collections::BTreeMap;

#[derive(Serialize)]
pub struct CardOut {
    pub id: String,
    pub payload: Value,
    pub state: CardState,
    pub due: Due,
    pub interval: u32,
    pub ease: f64,
    pub reps: u32,
    pub lapses: u32,
    pub step: usize,
    pub last_review: Option<DateTime<Utc>>,
}

impl From<Card> for CardOut {
    fn from(c: Card) -> Self {
        Self {
            id: c.id,
            payload: c.payload,
            state: c.state,
            due: c.due,
            interval: c.interval,
            ease: c.ease,
            reps: c.reps,
            lapses: c.lapses,
            step: c.step,
            last_review: c.last_review,
        }
    }
}

#[derive(Deserialize)]
pub struct CardIn {
    pub id: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Deserialize)]
pub struct AnswerIn {
    pub quality: u8,
}

#[derive(Deserialize)]
pub struct ForecastQuery {
    pub days: Option<u32>,
}

/// Fields left out keep their current value.
#[derive(Deserialize)]
pub struct SettingsIn {
    pub new_cards_per_day: Option<u32>,
    pub max_reviews_per_day: Option<u32>,
    pub show_answer_timer: Option<bool>,
}

impl SettingsIn {
    pub fn merge_into(self, mut s: Settings) -> Settings {
        if let Some(v) = self.new_cards_per_day {
            s.new_cards_per_day = v;
        }
        if let Some(v) = self.max_reviews_per_day {
            s.max_reviews_per_day = v;
        }
        if let Some(v) = self.show_answer_timer {
            s.show_answer_timer = v;
        }
        s
    }
}

/// Previews keyed by the numeric quality the client sends back.
pub fn intervals_out(p: BTreeMap<Quality, String>) -> BTreeMap<u8, String> {
    p.into_iter().map(|(q, s)| (q.as_score(), s)).collect()
}

pub fn error_status(e: &CoreError) -> StatusCode {
    match e {
        CoreError::InvalidQuality(_) | CoreError::Invalid(_) => StatusCode::BAD_REQUEST,
        CoreError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
