mod common;

use chrono::Duration;
use common::*;
use shadowdeck_core::queue::{cap_reviews, due_cards, interleave, new_cards};
use shadowdeck_core::{CardState, Quality, Settings};

#[test]
fn learning_first_then_most_overdue() {
    let cards = vec![
        review_card("r-today", 3, today()),
        review_card("r-late", 3, days(-4)),
        review_card("r-future", 3, days(2)),
        learning_card("l-due", t0() - Duration::minutes(1)),
        learning_card("l-later", t0() + Duration::minutes(5)),
        new_card("n", t0()),
    ];

    let due = due_cards(&cards, t0(), today());
    let ids: Vec<&str> = due.iter().map(|d| d.card.id.as_str()).collect();
    assert_eq!(ids, ["l-due", "r-late", "r-today"]);

    assert_eq!(due[0].priority, 0);
    assert_eq!(due[1].priority, 1);
    assert_eq!(due[1].overdue, 4);
    assert_eq!(due[2].overdue, 0);
}

#[test]
fn learning_due_is_compared_to_the_instant() {
    let cards = vec![learning_card("l", t0() + Duration::seconds(1))];
    assert!(due_cards(&cards, t0(), today()).is_empty());
    assert_eq!(due_cards(&cards, t0() + Duration::seconds(1), today()).len(), 1);
}

#[test]
fn new_cards_oldest_first_and_limited() {
    let cards = vec![
        new_card("c", t0()),
        new_card("a", t0() - Duration::hours(2)),
        new_card("b", t0() - Duration::hours(1)),
        review_card("r", 1, today()),
    ];

    let all = new_cards(&cards, None);
    let ids: Vec<&str> = all.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["a", "b", "c"]);

    assert_eq!(new_cards(&cards, Some(2)).len(), 2);
    assert!(new_cards(&cards, Some(0)).is_empty());
}

#[test]
fn review_cap_spares_learning_cards() {
    let cards = vec![
        learning_card("l1", t0()),
        learning_card("l2", t0()),
        review_card("r1", 1, today()),
        review_card("r2", 1, today()),
        review_card("r3", 1, today()),
    ];
    let capped = cap_reviews(due_cards(&cards, t0(), today()), 1);
    let learning = capped.iter().filter(|d| d.priority == 0).count();
    let reviews = capped.iter().filter(|d| d.priority == 1).count();
    assert_eq!(learning, 2);
    assert_eq!(reviews, 1);
}

#[test]
fn new_cards_follow_due_indices_ten_and_twenty() {
    let mut cards: Vec<_> = (0..25)
        .map(|i| review_card(&format!("r{i:02}"), 5, today()))
        .collect();
    for i in 0..3 {
        cards.push(new_card(&format!("n{i}"), t0() + Duration::seconds(i)));
    }

    let queue = interleave(due_cards(&cards, t0(), today()), new_cards(&cards, None));
    assert_eq!(queue.len(), 28);

    let new_positions: Vec<usize> = queue
        .iter()
        .enumerate()
        .filter(|(_, c)| c.state == CardState::New)
        .map(|(i, _)| i)
        .collect();
    // Eleven due cards (indices 0..=10), a new card, ten more (11..=20), a new
    // card, the last four, and the leftover new card.
    assert_eq!(new_positions, [11, 22, 27]);
    assert_eq!(queue[11].id, "n0");
    assert_eq!(queue[22].id, "n1");
    assert_eq!(queue[27].id, "n2");
}

#[test]
fn short_due_run_puts_new_cards_last() {
    let cards = vec![
        review_card("r", 1, today()),
        new_card("n1", t0()),
        new_card("n2", t0() + Duration::seconds(1)),
    ];
    let queue = interleave(due_cards(&cards, t0(), today()), new_cards(&cards, None));
    let ids: Vec<&str> = queue.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["r", "n1", "n2"]);
}

#[tokio::test]
async fn queue_respects_daily_new_allowance() {
    let cards = (0..5)
        .map(|i| new_card(&format!("n{i}"), t0() + Duration::seconds(i)))
        .collect();
    let mut h = harness(cards).await;
    let s = &mut h.scheduler;
    s.update_settings(Settings {
        new_cards_per_day: 2,
        ..Settings::default()
    })
    .await
    .unwrap();

    assert_eq!(s.new_cards_remaining(), 2);
    assert_eq!(s.review_queue().len(), 2);

    s.answer_card("n0", Quality::Good).await.unwrap();
    assert_eq!(s.new_cards_remaining(), 1);

    // n0 is learning and due in ten minutes, so only one new card remains queued.
    let queue = s.review_queue();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].id, "n1");

    h.clock.advance(Duration::minutes(10));
    let queue = h.scheduler.review_queue();
    let ids: Vec<&str> = queue.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["n0", "n1"]);
}

#[tokio::test]
async fn queue_respects_daily_review_cap() {
    let cards = (0..5)
        .map(|i| review_card(&format!("r{i}"), 2, today()))
        .collect();
    let mut h = harness(cards).await;
    h.scheduler
        .update_settings(Settings {
            max_reviews_per_day: 3,
            ..Settings::default()
        })
        .await
        .unwrap();

    assert_eq!(h.scheduler.review_queue().len(), 3);
    h.scheduler.answer_card("r0", Quality::Good).await.unwrap();
    assert_eq!(h.scheduler.reviews_remaining(), 2);
    assert_eq!(h.scheduler.review_queue().len(), 2);
}

#[tokio::test]
async fn queue_is_a_snapshot() {
    let mut h = harness(vec![review_card("r", 2, today()), new_card("n", t0())]).await;
    let queue = h.scheduler.review_queue();
    h.scheduler
        .update_settings(Settings {
            new_cards_per_day: 0,
            ..Settings::default()
        })
        .await
        .unwrap();

    assert_eq!(queue.len(), 2);
    assert_eq!(h.scheduler.review_queue().len(), 1);
}

#[tokio::test]
async fn review_cards_wait_for_their_day() {
    let mut h = harness(vec![review_card("r", 2, days(1))]).await;
    assert!(h.scheduler.due_cards().is_empty());

    h.clock.advance(Duration::days(1));
    assert_eq!(h.scheduler.due_cards().len(), 1);

    h.clock.advance(Duration::days(2));
    let due = h.scheduler.due_cards();
    assert_eq!(due[0].overdue, 2);

    let c = h.scheduler.answer_card("r", Quality::Good).await.unwrap().unwrap();
    assert!(c.interval > 2);
    assert!(h.scheduler.due_cards().is_empty());
}
