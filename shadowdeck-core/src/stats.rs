use crate::{Card, CardState, DailyStat, Due, Quality, ReviewLogEntry};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OverallStats {
    pub total: u32,
    pub new: u32,
    /// Learning and relearning together.
    pub learning: u32,
    pub review: u32,
    pub mature: u32,
    pub total_reviews: u32,
    pub total_lapses: u32,
    /// Percent of answers that were not lapses, 0 when nothing was answered.
    pub retention: u32,
    pub due_today: u32,
    pub new_remaining: u32,
}

impl OverallStats {
    /// Counts over the card collection. `due_today` and `new_remaining` depend
    /// on the clock and settings and are left for the caller to fill.
    pub fn from_cards<'a, I>(cards: I) -> Self
    where
        I: IntoIterator<Item = &'a Card>,
    {
        let mut s = OverallStats::default();
        for c in cards {
            s.total += 1;
            match c.state {
                CardState::New => s.new += 1,
                CardState::Learning | CardState::Relearning => s.learning += 1,
                CardState::Review => s.review += 1,
            }
            if c.is_mature() {
                s.mature += 1;
            }
            s.total_reviews += c.reps;
            s.total_lapses += c.lapses;
        }
        s.retention = retention(s.total_reviews, s.total_lapses);
        s
    }
}

pub fn retention(total_reviews: u32, total_lapses: u32) -> u32 {
    if total_reviews == 0 {
        return 0;
    }
    let kept = 1.0 - f64::from(total_lapses) / f64::from(total_reviews);
    (kept * 100.0).round().clamp(0.0, 100.0) as u32
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub due: u32,
}

/// Review cards falling due on each of the next `days` days, today first.
pub fn forecast<'a, I>(cards: I, today: NaiveDate, days: u32) -> Vec<ForecastDay>
where
    I: IntoIterator<Item = &'a Card>,
{
    let mut by_day: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for c in cards {
        if c.state != CardState::Review {
            continue;
        }
        if let Due::Day(d) = c.due {
            *by_day.entry(d).or_default() += 1;
        }
    }

    (0..days)
        .map(|i| {
            let date = today + Duration::days(i64::from(i));
            ForecastDay {
                date,
                due: by_day.get(&date).copied().unwrap_or(0),
            }
        })
        .collect()
}

/// Review cards bucketed by interval: up to a day, a week, a month, three
/// months, and longer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IntervalDistribution {
    pub day: u32,
    pub week: u32,
    pub month: u32,
    pub quarter: u32,
    pub longer: u32,
}

impl IntervalDistribution {
    pub fn record(&mut self, interval: u32) {
        match interval {
            0..=1 => self.day += 1,
            2..=7 => self.week += 1,
            8..=30 => self.month += 1,
            31..=90 => self.quarter += 1,
            _ => self.longer += 1,
        }
    }

    pub fn buckets(&self) -> [(&'static str, u32); 5] {
        [
            ("1d", self.day),
            ("1w", self.week),
            ("1m", self.month),
            ("3m", self.quarter),
            ("3m+", self.longer),
        ]
    }
}

pub fn interval_distribution<'a, I>(cards: I) -> IntervalDistribution
where
    I: IntoIterator<Item = &'a Card>,
{
    let mut dist = IntervalDistribution::default();
    for c in cards.into_iter().filter(|c| c.state == CardState::Review) {
        dist.record(c.interval);
    }
    dist
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct Totals {
    pub total: u32,
    pub again: u32,
    pub hard: u32,
    pub good: u32,
    pub easy: u32,
}

impl Totals {
    pub fn record(&mut self, q: Quality) {
        self.total += 1;
        match q {
            Quality::Again => self.again += 1,
            Quality::Hard => self.hard += 1,
            Quality::Good => self.good += 1,
            Quality::Easy => self.easy += 1,
        }
    }

    /// Share of answers that were not Again.
    pub fn accuracy(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            (self.total - self.again) as f32 / self.total as f32
        }
    }
}

/// Answer counts per quality from the review log, overall and per UTC day.
#[derive(Clone, Debug, Default, Serialize)]
pub struct LogSummary {
    pub totals: Totals,
    pub per_day: BTreeMap<NaiveDate, Totals>,
}

pub fn summarize<'a, I>(log: I) -> LogSummary
where
    I: IntoIterator<Item = &'a ReviewLogEntry>,
{
    let mut summary = LogSummary::default();
    for r in log {
        summary.totals.record(r.quality);
        let d = r.reviewed_at.date_naive();
        summary.per_day.entry(d).or_default().record(r.quality);
    }
    summary
}

/// Consecutive days with recorded activity, counting back from `today`.
pub fn study_streak(daily: &BTreeMap<NaiveDate, DailyStat>, today: NaiveDate) -> u32 {
    let mut streak = 0u32;
    let mut day = today;
    while daily.get(&day).map(|s| !s.is_empty()).unwrap_or(false) {
        streak += 1;
        day -= Duration::days(1);
    }
    streak
}
