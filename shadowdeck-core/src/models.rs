use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::CoreError;

pub type CardId = String;
pub type ReviewId = Uuid;

/// Learning steps in minutes; a card graduates after the last one.
pub const LEARNING_STEPS: &[i64] = &[1, 10];
pub const RELEARNING_STEPS: &[i64] = &[10];

pub const GRADUATING_INTERVAL: u32 = 1;
pub const EASY_INTERVAL: u32 = 4;

pub const EASE_MIN: f64 = 1.3;
pub const EASE_DEFAULT: f64 = 2.5;
pub const EASY_BONUS: f64 = 1.3;
pub const HARD_MULTIPLIER: f64 = 1.2;
pub const INTERVAL_MODIFIER: f64 = 1.0;

/// Share of a review interval used as the +/- jitter range.
pub const FUZZ_RATIO: f64 = 0.05;
pub const MATURE_INTERVAL: u32 = 21;
/// Upper bound on a review interval in days.
pub const MAX_INTERVAL: u32 = 36_500;
pub const REVIEW_LOG_CAP: usize = 10_000;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CardState {
    New,
    Learning,
    Review,
    Relearning,
}

impl CardState {
    pub fn is_learning(&self) -> bool {
        matches!(self, CardState::Learning | CardState::Relearning)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CardState::New => "new",
            CardState::Learning => "learning",
            CardState::Review => "review",
            CardState::Relearning => "relearning",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum Quality {
    Again = 1,
    Hard = 2,
    Good = 3,
    Easy = 4,
}

impl Quality {
    pub const ALL: [Quality; 4] = [Quality::Again, Quality::Hard, Quality::Good, Quality::Easy];

    pub fn as_score(&self) -> u8 {
        *self as u8
    }

    pub fn label(&self) -> &'static str {
        match self {
            Quality::Again => "again",
            Quality::Hard => "hard",
            Quality::Good => "good",
            Quality::Easy => "easy",
        }
    }
}

impl TryFrom<u8> for Quality {
    type Error = CoreError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Quality::Again),
            2 => Ok(Quality::Hard),
            3 => Ok(Quality::Good),
            4 => Ok(Quality::Easy),
            other => Err(CoreError::InvalidQuality(other)),
        }
    }
}

impl From<Quality> for u8 {
    fn from(q: Quality) -> u8 {
        q.as_score()
    }
}

/// When a card is next due. Learning and relearning cards are due at an
/// instant; new and review cards are due on a calendar day.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Due {
    At(DateTime<Utc>),
    Day(NaiveDate),
}

impl Due {
    pub fn day(&self) -> NaiveDate {
        match self {
            Due::At(t) => t.date_naive(),
            Due::Day(d) => *d,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Card {
    pub id: CardId,
    /// Caller-owned content (word, translation, display data).
    pub payload: Value,

    pub state: CardState,
    pub due: Due,
    pub interval: u32,
    pub ease: f64,
    pub reps: u32,
    pub lapses: u32,
    pub step: usize,
    pub last_review: Option<DateTime<Utc>>,

    pub created: DateTime<Utc>,
}

impl Card {
    pub fn new(id: impl Into<CardId>, payload: Value, created: DateTime<Utc>, today: NaiveDate) -> Self {
        Self {
            id: id.into(),
            payload,
            state: CardState::New,
            due: Due::Day(today),
            interval: 0,
            ease: EASE_DEFAULT,
            reps: 0,
            lapses: 0,
            step: 0,
            last_review: None,
            created,
        }
    }

    pub fn is_new(&self) -> bool {
        self.state == CardState::New
    }

    pub fn is_mature(&self) -> bool {
        self.state == CardState::Review && self.interval >= MATURE_INTERVAL
    }
}

/// Audit record written before a card is mutated by an answer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReviewLogEntry {
    pub id: ReviewId,
    pub card_id: CardId,
    pub quality: Quality,
    pub prior_state: CardState,
    pub prior_ease: f64,
    pub prior_interval: u32,
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewLogEntry {
    pub fn new(card: &Card, quality: Quality, reviewed_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            card_id: card.id.clone(),
            quality,
            prior_state: card.state,
            prior_ease: card.ease,
            prior_interval: card.interval,
            reviewed_at,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DailyStat {
    pub new_cards: u32,
    pub reviews: u32,
    pub lapses: u32,
    pub study_time_ms: u64,
}

impl DailyStat {
    pub fn is_empty(&self) -> bool {
        *self == DailyStat::default()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub new_cards_per_day: u32,
    pub max_reviews_per_day: u32,
    pub show_answer_timer: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            new_cards_per_day: 20,
            max_reviews_per_day: 200,
            show_answer_timer: true,
        }
    }
}
