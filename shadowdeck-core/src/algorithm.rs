//! Card state machine.
//!
//! New cards pass through the learning steps before graduating into review;
//! review cards that are forgotten drop into relearning and graduate back
//! with half their previous interval. Everything here is pure: time comes in
//! as arguments and interval jitter comes from the supplied [`Fuzz`].

use std::collections::BTreeMap;

use chrono::{DateTime, Days, Duration, NaiveDate, Utc};

use crate::fuzz::{Fuzz, NoFuzz};
use crate::{
    Card, CardState, DailyStat, Due, Quality, ReviewLogEntry, EASE_DEFAULT, EASE_MIN, EASY_BONUS,
    EASY_INTERVAL, FUZZ_RATIO, GRADUATING_INTERVAL, HARD_MULTIPLIER, INTERVAL_MODIFIER,
    LEARNING_STEPS, MAX_INTERVAL, RELEARNING_STEPS,
};

/// Which of today's counters an answer contributes to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatBump {
    pub new_cards: bool,
    pub reviews: bool,
    pub lapses: bool,
}

impl StatBump {
    pub fn apply(&self, stat: &mut DailyStat) {
        if self.new_cards {
            stat.new_cards += 1;
        }
        if self.reviews {
            stat.reviews += 1;
        }
        if self.lapses {
            stat.lapses += 1;
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.new_cards || self.reviews || self.lapses)
    }
}

pub struct AnswerOutcome {
    pub updated_card: Card,
    pub review: ReviewLogEntry,
    pub bump: StatBump,
}

pub fn apply_answer(
    mut card: Card,
    quality: Quality,
    now: DateTime<Utc>,
    today: NaiveDate,
    fuzz: &mut dyn Fuzz,
) -> AnswerOutcome {
    // Logged against the pre-answer state.
    let review = ReviewLogEntry::new(&card, quality, now);
    let mut bump = StatBump::default();

    match card.state {
        CardState::New => {
            answer_new(&mut card, quality, now, today);
            bump.new_cards = true;
        }
        CardState::Learning => answer_learning(&mut card, quality, now, today, LEARNING_STEPS),
        CardState::Relearning => answer_learning(&mut card, quality, now, today, RELEARNING_STEPS),
        CardState::Review => {
            bump.lapses = answer_review(&mut card, quality, now, today, fuzz);
            bump.reviews = true;
        }
    }

    card.last_review = Some(now);
    card.reps += 1;

    AnswerOutcome {
        updated_card: card,
        review,
        bump,
    }
}

fn answer_new(card: &mut Card, quality: Quality, now: DateTime<Utc>, today: NaiveDate) {
    match quality {
        Quality::Easy => {
            card.state = CardState::Review;
            card.interval = EASY_INTERVAL;
            card.due = day_due(today, card.interval);
            card.ease = EASE_DEFAULT + 0.15;
        }
        Quality::Again => {
            card.state = CardState::Learning;
            card.step = 0;
            card.due = step_due(now, LEARNING_STEPS[0]);
        }
        Quality::Hard | Quality::Good => {
            card.state = CardState::Learning;
            // Good skips the first step.
            card.step = if quality == Quality::Good { 1 } else { 0 };
            let minutes = LEARNING_STEPS[card.step.min(LEARNING_STEPS.len() - 1)];
            card.due = step_due(now, minutes);
        }
    }
}

fn answer_learning(
    card: &mut Card,
    quality: Quality,
    now: DateTime<Utc>,
    today: NaiveDate,
    steps: &[i64],
) {
    match quality {
        Quality::Again => {
            card.step = 0;
            card.due = step_due(now, steps[0]);
        }
        Quality::Easy => graduate(card, today, true),
        Quality::Hard | Quality::Good => {
            card.step += 1;
            if card.step >= steps.len() {
                graduate(card, today, false);
            } else {
                card.due = step_due(now, steps[card.step]);
            }
        }
    }
}

fn graduate(card: &mut Card, today: NaiveDate, easy: bool) {
    let was_relearning = card.state == CardState::Relearning;
    card.state = CardState::Review;
    card.step = 0;

    card.interval = if was_relearning {
        ((card.interval.min(MAX_INTERVAL) as f64 * 0.5).round() as u32).max(1)
    } else if easy {
        EASY_INTERVAL
    } else {
        GRADUATING_INTERVAL
    };

    card.due = day_due(today, card.interval);
}

/// Returns true when the answer was a lapse.
fn answer_review(
    card: &mut Card,
    quality: Quality,
    now: DateTime<Utc>,
    today: NaiveDate,
    fuzz: &mut dyn Fuzz,
) -> bool {
    let multiplier = match quality {
        Quality::Again => {
            card.ease = (card.ease - 0.2).max(EASE_MIN);
            card.lapses += 1;
            card.state = CardState::Relearning;
            card.step = 0;
            card.due = step_due(now, RELEARNING_STEPS[0]);
            return true;
        }
        Quality::Hard => {
            card.ease = (card.ease - 0.15).max(EASE_MIN);
            HARD_MULTIPLIER
        }
        Quality::Good => card.ease,
        Quality::Easy => {
            let m = card.ease * EASY_BONUS;
            card.ease += 0.15;
            m
        }
    };

    // A card already at the ceiling stays there instead of growing.
    let max = i64::from(MAX_INTERVAL);
    let prev = i64::from(card.interval).min(max);
    let scaled = (prev as f64 * multiplier * INTERVAL_MODIFIER).round() as i64;
    let next = scaled.max(prev + 1).min(max);
    let spread = (next as f64 * FUZZ_RATIO).round() as i64;
    let fuzzed = (next + fuzz.jitter(spread)).clamp((prev + 1).min(max), max);

    card.interval = fuzzed as u32;
    card.due = day_due(today, card.interval);
    false
}

fn step_due(now: DateTime<Utc>, minutes: i64) -> Due {
    Due::At(now + Duration::minutes(minutes))
}

fn day_due(today: NaiveDate, days: u32) -> Due {
    Due::Day(
        today
            .checked_add_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MAX),
    )
}

/// What each answer would do to `card` right now, rendered as the wait until
/// it is next shown ("1m", "10m", "4d").
pub fn preview(card: &Card, now: DateTime<Utc>, today: NaiveDate) -> BTreeMap<Quality, String> {
    Quality::ALL
        .into_iter()
        .map(|q| {
            let out = apply_answer(card.clone(), q, now, today, &mut NoFuzz);
            let label = match out.updated_card.due {
                Due::At(t) => format_minutes((t - now).num_minutes()),
                Due::Day(d) => format!("{}d", (d - today).num_days()),
            };
            (q, label)
        })
        .collect()
}

pub fn format_minutes(minutes: i64) -> String {
    if minutes < 60 {
        format!("{minutes}m")
    } else if minutes < 60 * 24 {
        format!("{}h", minutes / 60)
    } else {
        format!("{}d", minutes / (60 * 24))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minute_labels() {
        assert_eq!(format_minutes(1), "1m");
        assert_eq!(format_minutes(59), "59m");
        assert_eq!(format_minutes(90), "1h");
        assert_eq!(format_minutes(60 * 24 * 3), "3d");
    }

    #[test]
    fn bump_applies_counters() {
        let mut stat = DailyStat::default();
        StatBump { new_cards: false, reviews: true, lapses: true }.apply(&mut stat);
        assert_eq!(stat.reviews, 1);
        assert_eq!(stat.lapses, 1);
        assert_eq!(stat.new_cards, 0);
        assert!(StatBump::default().is_empty());
    }
}
