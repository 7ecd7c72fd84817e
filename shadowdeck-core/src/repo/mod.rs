use crate::{Card, CoreError, DailyStat, ReviewLogEntry, Settings};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub mod memory;

/// Durable home for the scheduler's collections. Each collection is loaded
/// and written independently so one unreadable collection does not take the
/// others down with it.
#[async_trait]
pub trait Store: Send + Sync {
    // Cards
    async fn load_cards(&self) -> Result<Vec<Card>, CoreError>;
    async fn put_card(&self, card: &Card) -> Result<(), CoreError>;

    // Review log, oldest first
    async fn load_review_log(&self) -> Result<Vec<ReviewLogEntry>, CoreError>;
    /// Appends `entry`, then evicts the oldest entries beyond `cap`.
    async fn append_review(&self, entry: &ReviewLogEntry, cap: usize) -> Result<(), CoreError>;

    // Daily stats
    async fn load_daily_stats(&self) -> Result<BTreeMap<NaiveDate, DailyStat>, CoreError>;
    async fn put_daily_stat(&self, day: NaiveDate, stat: &DailyStat) -> Result<(), CoreError>;

    // Settings
    async fn load_settings(&self) -> Result<Option<Settings>, CoreError>;
    async fn put_settings(&self, settings: &Settings) -> Result<(), CoreError>;
}
