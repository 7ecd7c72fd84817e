use crate::{Card, CardId, CoreError, DailyStat, ReviewLogEntry, Settings};
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Ephemeral store, mostly for tests.
#[derive(Default)]
pub struct MemoryStore {
    cards: RwLock<HashMap<CardId, Card>>,
    review_log: RwLock<VecDeque<ReviewLogEntry>>,
    daily: RwLock<BTreeMap<NaiveDate, DailyStat>>,
    settings: RwLock<Option<Settings>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl crate::repo::Store for MemoryStore {
    async fn load_cards(&self) -> Result<Vec<Card>, CoreError> {
        Ok(self.cards.read().values().cloned().collect())
    }

    async fn put_card(&self, card: &Card) -> Result<(), CoreError> {
        self.cards.write().insert(card.id.clone(), card.clone());
        Ok(())
    }

    async fn load_review_log(&self) -> Result<Vec<ReviewLogEntry>, CoreError> {
        Ok(self.review_log.read().iter().cloned().collect())
    }

    async fn append_review(&self, entry: &ReviewLogEntry, cap: usize) -> Result<(), CoreError> {
        let mut log = self.review_log.write();
        log.push_back(entry.clone());
        while log.len() > cap {
            log.pop_front();
        }
        Ok(())
    }

    async fn load_daily_stats(&self) -> Result<BTreeMap<NaiveDate, DailyStat>, CoreError> {
        Ok(self.daily.read().clone())
    }

    async fn put_daily_stat(&self, day: NaiveDate, stat: &DailyStat) -> Result<(), CoreError> {
        self.daily.write().insert(day, *stat);
        Ok(())
    }

    async fn load_settings(&self) -> Result<Option<Settings>, CoreError> {
        Ok(self.settings.read().clone())
    }

    async fn put_settings(&self, settings: &Settings) -> Result<(), CoreError> {
        *self.settings.write() = Some(settings.clone());
        Ok(())
    }
}
