use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::{Card, CardState, Due};

/// A new card is slotted in after every this-many due cards.
pub const NEW_CARD_SPACING: usize = 10;

/// A card waiting to be shown, with its place in the due ordering.
#[derive(Clone, Debug, Serialize)]
pub struct DueCard {
    pub card: Card,
    /// 0 for learning/relearning, 1 for review.
    pub priority: u8,
    /// Whole days a review card is past its due day.
    pub overdue: i64,
}

fn is_due(due: &Due, now: DateTime<Utc>, today: NaiveDate) -> bool {
    match due {
        Due::At(t) => *t <= now,
        Due::Day(d) => *d <= today,
    }
}

/// Learning cards due by `now` followed by review cards due by `today`,
/// most overdue first. New cards are never included.
pub fn due_cards<'a, I>(cards: I, now: DateTime<Utc>, today: NaiveDate) -> Vec<DueCard>
where
    I: IntoIterator<Item = &'a Card>,
{
    let mut due: Vec<DueCard> = cards
        .into_iter()
        .filter_map(|c| {
            let priority = match c.state {
                CardState::New => return None,
                CardState::Learning | CardState::Relearning => 0,
                CardState::Review => 1,
            };
            if !is_due(&c.due, now, today) {
                return None;
            }
            let overdue = if priority == 1 {
                (today - c.due.day()).num_days()
            } else {
                0
            };
            Some(DueCard {
                card: c.clone(),
                priority,
                overdue,
            })
        })
        .collect();

    due.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| b.overdue.cmp(&a.overdue))
    });
    due
}

/// New cards, oldest first.
pub fn new_cards<'a, I>(cards: I, limit: Option<usize>) -> Vec<Card>
where
    I: IntoIterator<Item = &'a Card>,
{
    let mut v: Vec<Card> = cards.into_iter().filter(|c| c.is_new()).cloned().collect();
    v.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
    if let Some(n) = limit {
        v.truncate(n);
    }
    v
}

/// Drops review cards beyond `review_limit`; learning cards always stay.
pub fn cap_reviews(due: Vec<DueCard>, review_limit: usize) -> Vec<DueCard> {
    let mut reviews = 0usize;
    due.into_iter()
        .filter(|d| {
            if d.priority == 0 {
                return true;
            }
            reviews += 1;
            reviews <= review_limit
        })
        .collect()
}

/// Walks the due cards in order, placing one new card after each due card
/// whose index is a positive multiple of [`NEW_CARD_SPACING`]. Leftover new
/// cards go at the end.
pub fn interleave(due: Vec<DueCard>, new: Vec<Card>) -> Vec<Card> {
    let mut queue = Vec::with_capacity(due.len() + new.len());
    let mut new = new.into_iter();

    for (i, d) in due.into_iter().enumerate() {
        queue.push(d.card);
        if i > 0 && i % NEW_CARD_SPACING == 0 {
            if let Some(c) = new.next() {
                queue.push(c);
            }
        }
    }

    queue.extend(new);
    queue
}
