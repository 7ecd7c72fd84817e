use crate::api::server as api_server;
use crate::cli::opts::*;

use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use serde_json::{json, Value};
use shadowdeck_core::algorithm::format_minutes;
use shadowdeck_core::{Card, Due, Quality, Scheduler, Store};
use shadowdeck_json::paths::data_root;
use shadowdeck_json::JsonStore;
use shadowdeck_sqlite::SqliteStore;
use std::collections::VecDeque;
use std::io::{stdin, stdout, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

pub async fn run_cli(args: Cli) -> Result<()> {
    let store = open_store(&args.store, args.data_dir.clone()).await?;
    let mut scheduler = Scheduler::open(store).await;

    match args.cmd {
        Command::Card(cmd) => card_cmd(&mut scheduler, cmd).await,
        Command::Review(cmd) => review_cmd(&mut scheduler, cmd).await,
        Command::Stats => stats_cmd(&scheduler),
        Command::Forecast { days } => {
            for d in scheduler.forecast(days) {
                println!("{}\t{}", d.date, d.due);
            }
            Ok(())
        }
        Command::Intervals => {
            for (label, n) in scheduler.interval_distribution().buckets() {
                println!("{label}\t{n}");
            }
            Ok(())
        }
        Command::Preview { card_id } => {
            let p = scheduler
                .next_intervals(&card_id)
                .ok_or_else(|| anyhow!("card not found: {card_id}"))?;
            for (q, label) in p {
                println!("{} {}\t{}", q.as_score(), q.label(), label);
            }
            Ok(())
        }
        Command::Settings(cmd) => settings_cmd(&mut scheduler, cmd).await,
        Command::Api(api) => {
            let addr: std::net::SocketAddr = api.addr.parse()?;
            api_server::run(scheduler, addr).await
        }
    }
}

pub async fn open_store(store: &StoreKind, data_dir: Option<PathBuf>) -> Result<Arc<dyn Store>> {
    let root = data_dir.unwrap_or_else(data_root);
    match store {
        StoreKind::Json => {
            let s = JsonStore::open_in(&root).await?;
            Ok(Arc::new(s))
        }
        StoreKind::Sqlite => {
            std::fs::create_dir_all(&root)?;
            let s = SqliteStore::open_file(root.join("shadowdeck.sqlite3")).await?;
            Ok(Arc::new(s))
        }
    }
}

async fn card_cmd(s: &mut Scheduler, cmd: CardCmd) -> Result<()> {
    match cmd {
        CardCmd::Add(a) => {
            let payload = match a.payload {
                Some(raw) => serde_json::from_str(&raw)?,
                None => json!({
                    "en": a.word.unwrap_or_else(|| a.card_id.clone()),
                    "zh": a.translation.unwrap_or_default(),
                    "category": a.category.unwrap_or_default(),
                }),
            };
            let c = s.get_or_create_card(&a.card_id, payload).await?;
            println!("{}\t{}", c.id, c.state.as_str());
        }
        CardCmd::List => {
            let mut cards: Vec<&Card> = s.cards().collect();
            cards.sort_by_key(|c| c.created);
            for c in cards {
                println!(
                    "{}\t{}\tinterval={}d\tease={:.2}\treps={}\tlapses={}\t{}",
                    c.id,
                    c.state.as_str(),
                    c.interval,
                    c.ease,
                    c.reps,
                    c.lapses,
                    due_label(&c.due)
                );
            }
        }
        CardCmd::Show { card_id } => {
            let c = s
                .card(&card_id)
                .ok_or_else(|| anyhow!("card not found: {card_id}"))?;
            println!("{}", serde_json::to_string_pretty(c)?);
        }
    }
    Ok(())
}

async fn review_cmd(s: &mut Scheduler, cmd: ReviewCmd) -> Result<()> {
    // Cards failed during the session go back on the end of this queue.
    let mut queue: VecDeque<Card> = s.review_queue().into();
    if queue.is_empty() {
        println!("no cards due");
        return Ok(());
    }

    let mut count = 0usize;
    while let Some(card) = queue.pop_front() {
        if count >= cmd.max {
            break;
        }
        count += 1;
        println!("\n[{}/{}] {} ({})", count, count + queue.len(), card.id, card.state.as_str());
        println!("Q: {}", front_text(&card));
        let started = Instant::now();
        prompt_enter("[enter=show]")?;
        println!("A: {}", back_text(&card));

        if let Some(p) = s.next_intervals(&card.id) {
            let opts: Vec<String> = p
                .iter()
                .map(|(q, label)| format!("{}={} ({})", q.as_score(), q.label(), label))
                .collect();
            println!("[{}, s=skip, q=quit]", opts.join(", "));
        }

        let quality = loop {
            let line = read_line("answer> ")?;
            match line.trim().to_lowercase().as_str() {
                "s" | "skip" => break None,
                "q" | "quit" => {
                    println!("\nreviewed {}", count - 1);
                    return Ok(());
                }
                other => match other.parse::<u8>().map_err(|_| ()).and_then(|n| Quality::try_from(n).map_err(|_| ())) {
                    Ok(q) => break Some(q),
                    Err(()) => println!("enter 1-4, s, or q"),
                },
            }
        };

        let Some(quality) = quality else { continue };
        if s.settings().show_answer_timer {
            s.record_study_time(started.elapsed()).await?;
        }
        let Some(updated) = s.answer_card(&card.id, quality).await? else {
            continue;
        };
        println!("→ {}", due_label(&updated.due));
        if quality == Quality::Again {
            queue.push_back(updated);
        }
    }

    println!("\nreviewed {}", count);
    Ok(())
}

fn stats_cmd(s: &Scheduler) -> Result<()> {
    let o = s.overall_stats();
    let t = s.today_stats();
    println!("cards       {} (new {}, learning {}, review {}, mature {})", o.total, o.new, o.learning, o.review, o.mature);
    println!("retention   {}%", o.retention);
    println!("due today   {} + {} new", o.due_today, o.new_remaining);
    println!(
        "today       {} new, {} reviews, {} lapses, {}s studied",
        t.new_cards,
        t.reviews,
        t.lapses,
        t.study_time_ms / 1000
    );
    println!("streak      {} day(s)", s.study_streak());
    let log = s.log_summary();
    if log.totals.total > 0 {
        println!(
            "answers     {} logged, {:.0}% not again",
            log.totals.total,
            log.totals.accuracy() * 100.0
        );
    }
    Ok(())
}

async fn settings_cmd(s: &mut Scheduler, cmd: SettingsCmd) -> Result<()> {
    match cmd {
        SettingsCmd::Show => {}
        SettingsCmd::Set(set) => {
            if set.new_per_day.is_none() && set.max_reviews.is_none() && set.show_timer.is_none() {
                bail!("nothing to set");
            }
            let mut next = s.settings().clone();
            if let Some(v) = set.new_per_day {
                next.new_cards_per_day = v;
            }
            if let Some(v) = set.max_reviews {
                next.max_reviews_per_day = v;
            }
            if let Some(v) = set.show_timer {
                next.show_answer_timer = v;
            }
            s.update_settings(next).await?;
        }
    }
    println!("{}", serde_json::to_string_pretty(s.settings())?);
    Ok(())
}

// ===== Helpers =====
fn payload_str<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn front_text(card: &Card) -> String {
    payload_str(&card.payload, "en").unwrap_or(&card.id).to_string()
}

fn back_text(card: &Card) -> String {
    let mut out = payload_str(&card.payload, "zh")
        .or_else(|| payload_str(&card.payload, "translation"))
        .unwrap_or("-")
        .to_string();
    if let Some(cat) = payload_str(&card.payload, "category") {
        out.push_str(&format!("  [{cat}]"));
    }
    out
}

fn due_label(due: &Due) -> String {
    match due {
        Due::At(t) => format!("again in {}", format_minutes((*t - Utc::now()).num_minutes().max(0))),
        Due::Day(d) => format!("due {d}"),
    }
}

fn prompt_enter(label: &str) -> Result<()> { print!("{label}"); stdout().flush().ok(); let mut s = String::new(); stdin().read_line(&mut s)?; Ok(()) }
fn read_line(prompt: &str) -> Result<String> { print!("{prompt}"); stdout().flush().ok(); let mut s = String::new(); stdin().read_line(&mut s)?; Ok(s) }
