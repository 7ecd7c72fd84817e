use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::algorithm::{self, apply_answer};
use crate::queue::{self, DueCard};
use crate::stats::{self, ForecastDay, IntervalDistribution, LogSummary, OverallStats};
use crate::{
    Card, CardId, Clock, CoreError, DailyStat, Fuzz, Quality, RandomFuzz, ReviewLogEntry, Settings,
    Store, SystemClock, REVIEW_LOG_CAP,
};

/// Owns one learner's cards and decides what to review next.
///
/// Calls are expected to be serialized by the caller; nothing here guards
/// against concurrent mutation. Every mutating call updates memory first and
/// then writes through to the [`Store`], so a failed write leaves the
/// in-memory state ahead of the store rather than half-applied.
pub struct Scheduler {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    fuzz: Box<dyn Fuzz>,

    cards: BTreeMap<CardId, Card>,
    review_log: VecDeque<ReviewLogEntry>,
    daily: BTreeMap<NaiveDate, DailyStat>,
    settings: Settings,
}

impl Scheduler {
    pub async fn open(store: Arc<dyn Store>) -> Self {
        Self::open_with(store, Arc::new(SystemClock), Box::new(RandomFuzz::new())).await
    }

    /// Loads every collection from `store`. A collection that cannot be read
    /// starts out empty instead of failing the open.
    pub async fn open_with(store: Arc<dyn Store>, clock: Arc<dyn Clock>, fuzz: Box<dyn Fuzz>) -> Self {
        let cards: BTreeMap<CardId, Card> = or_empty(store.load_cards().await, "cards")
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();

        let mut review_log: VecDeque<ReviewLogEntry> =
            or_empty(store.load_review_log().await, "review log").into();
        while review_log.len() > REVIEW_LOG_CAP {
            review_log.pop_front();
        }

        let daily = or_empty(store.load_daily_stats().await, "daily stats");
        let settings = or_empty(store.load_settings().await, "settings").unwrap_or_default();

        info!(
            cards = cards.len(),
            log_entries = review_log.len(),
            "scheduler opened"
        );

        Self {
            store,
            clock,
            fuzz,
            cards,
            review_log,
            daily,
            settings,
        }
    }

    // ===== Cards =====

    /// Returns the card for `id`, creating a new one around `payload` the first
    /// time the id is seen. An existing card is returned untouched.
    pub async fn get_or_create_card(&mut self, id: &str, payload: Value) -> Result<Card, CoreError> {
        if let Some(card) = self.cards.get(id) {
            return Ok(card.clone());
        }
        if id.trim().is_empty() {
            return Err(CoreError::Invalid("card id must not be empty"));
        }

        let card = Card::new(id, payload, self.clock.now(), self.clock.today());
        self.cards.insert(card.id.clone(), card.clone());
        debug!(card = id, "card created");

        self.store.put_card(&card).await?;
        Ok(card)
    }

    pub fn card(&self, id: &str) -> Option<&Card> {
        self.cards.get(id)
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.cards.values()
    }

    /// Applies an answer. Unknown ids are not an error: they yield `Ok(None)`.
    pub async fn answer_card(&mut self, id: &str, quality: Quality) -> Result<Option<Card>, CoreError> {
        let Some(card) = self.cards.get(id).cloned() else {
            debug!(card = id, "answer for unknown card ignored");
            return Ok(None);
        };

        let now = self.clock.now();
        let today = self.clock.today();
        let out = apply_answer(card, quality, now, today, self.fuzz.as_mut());

        self.review_log.push_back(out.review.clone());
        while self.review_log.len() > REVIEW_LOG_CAP {
            self.review_log.pop_front();
        }

        let card = out.updated_card;
        self.cards.insert(card.id.clone(), card.clone());

        let stat = if out.bump.is_empty() {
            None
        } else {
            let s = self.daily.entry(today).or_default();
            out.bump.apply(s);
            Some(*s)
        };

        debug!(
            card = id,
            quality = quality.label(),
            from = out.review.prior_state.as_str(),
            to = card.state.as_str(),
            interval = card.interval,
            ease = card.ease,
            "card answered"
        );

        // Attempt every write even if an earlier one fails.
        let logged = self.store.append_review(&out.review, REVIEW_LOG_CAP).await;
        let saved = self.store.put_card(&card).await;
        let counted = match stat {
            Some(s) => self.store.put_daily_stat(today, &s).await,
            None => Ok(()),
        };
        logged.and(saved).and(counted)?;

        Ok(Some(card))
    }

    /// Answer previews for `id`, keyed by quality. `None` for unknown ids.
    pub fn next_intervals(&self, id: &str) -> Option<BTreeMap<Quality, String>> {
        let card = self.cards.get(id)?;
        Some(algorithm::preview(card, self.clock.now(), self.clock.today()))
    }

    // ===== Queues =====

    pub fn due_cards(&self) -> Vec<DueCard> {
        queue::due_cards(self.cards.values(), self.clock.now(), self.clock.today())
    }

    pub fn new_cards(&self, limit: Option<usize>) -> Vec<Card> {
        queue::new_cards(self.cards.values(), limit)
    }

    pub fn new_cards_remaining(&self) -> u32 {
        self.settings
            .new_cards_per_day
            .saturating_sub(self.today_stats().new_cards)
    }

    pub fn reviews_remaining(&self) -> u32 {
        self.settings
            .max_reviews_per_day
            .saturating_sub(self.today_stats().reviews)
    }

    /// The session's starting batch: due cards in priority order with new cards
    /// mixed in. Settings are read once here, so later changes only affect the
    /// next queue. Cards failed during the session are the caller's to requeue.
    pub fn review_queue(&self) -> Vec<Card> {
        let due = queue::cap_reviews(self.due_cards(), self.reviews_remaining() as usize);
        let new = self.new_cards(Some(self.new_cards_remaining() as usize));
        queue::interleave(due, new)
    }

    // ===== Statistics =====

    pub fn today_stats(&self) -> DailyStat {
        self.daily
            .get(&self.clock.today())
            .copied()
            .unwrap_or_default()
    }

    pub fn daily_stats(&self) -> &BTreeMap<NaiveDate, DailyStat> {
        &self.daily
    }

    pub fn overall_stats(&self) -> OverallStats {
        let mut s = OverallStats::from_cards(self.cards.values());
        s.due_today = self.due_cards().len() as u32;
        s.new_remaining = self.new_cards_remaining();
        s
    }

    pub fn forecast(&self, days: u32) -> Vec<ForecastDay> {
        stats::forecast(self.cards.values(), self.clock.today(), days)
    }

    pub fn interval_distribution(&self) -> IntervalDistribution {
        stats::interval_distribution(self.cards.values())
    }

    pub fn study_streak(&self) -> u32 {
        stats::study_streak(&self.daily, self.clock.today())
    }

    pub fn review_log(&self) -> impl Iterator<Item = &ReviewLogEntry> {
        self.review_log.iter()
    }

    pub fn log_summary(&self) -> LogSummary {
        stats::summarize(self.review_log.iter())
    }

    /// Adds answering time to today's counters.
    pub async fn record_study_time(&mut self, elapsed: std::time::Duration) -> Result<DailyStat, CoreError> {
        let today = self.clock.today();
        let s = self.daily.entry(today).or_default();
        s.study_time_ms += elapsed.as_millis() as u64;
        let s = *s;
        self.store.put_daily_stat(today, &s).await?;
        Ok(s)
    }

    // ===== Settings =====

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub async fn update_settings(&mut self, settings: Settings) -> Result<(), CoreError> {
        info!(
            new_cards_per_day = settings.new_cards_per_day,
            max_reviews_per_day = settings.max_reviews_per_day,
            show_answer_timer = settings.show_answer_timer,
            "settings updated"
        );
        self.settings = settings;
        self.store.put_settings(&self.settings).await
    }
}

fn or_empty<T: Default>(loaded: Result<T, CoreError>, what: &str) -> T {
    loaded.unwrap_or_else(|e| {
        warn!(error = %e, "could not load {what}, starting empty");
        T::default()
    })
}
