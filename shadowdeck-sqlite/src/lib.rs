use chrono::{DateTime, NaiveDate, Utc};
use shadowdeck_core::{
    repo::Store, Card, CardState, CoreError, DailyStat, Due, Quality, ReviewLogEntry, Settings,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .map_err(|e| storage("sqlite connect", e))?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Private in-memory database. A single connection that never expires,
    /// since each SQLite memory connection is its own database.
    pub async fn open_memory() -> Result<Self, CoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| storage("sqlite connect", e))?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), CoreError> {
        const STMT: &str = r#"
        CREATE TABLE IF NOT EXISTS cards (
          id           TEXT PRIMARY KEY,
          payload      TEXT NOT NULL,
          state        TEXT NOT NULL,
          due_kind     TEXT NOT NULL,
          due          TEXT NOT NULL,
          interval     INTEGER NOT NULL DEFAULT 0,
          ease         REAL    NOT NULL DEFAULT 2.5,
          reps         INTEGER NOT NULL DEFAULT 0,
          lapses       INTEGER NOT NULL DEFAULT 0,
          step         INTEGER NOT NULL DEFAULT 0,
          last_review  TEXT,
          created      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS review_log (
          seq             INTEGER PRIMARY KEY AUTOINCREMENT,
          id              TEXT NOT NULL UNIQUE,
          card_id         TEXT NOT NULL,
          quality         INTEGER NOT NULL,
          prior_state     TEXT NOT NULL,
          prior_ease      REAL NOT NULL,
          prior_interval  INTEGER NOT NULL,
          reviewed_at     TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS daily_stats (
          day            TEXT PRIMARY KEY,
          new_cards      INTEGER NOT NULL DEFAULT 0,
          reviews        INTEGER NOT NULL DEFAULT 0,
          lapses         INTEGER NOT NULL DEFAULT 0,
          study_time_ms  INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS settings (
          id                   INTEGER PRIMARY KEY CHECK (id = 1),
          new_cards_per_day    INTEGER,
          max_reviews_per_day  INTEGER,
          show_answer_timer    INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_cards_state_due ON cards (state, due);
        CREATE INDEX IF NOT EXISTS idx_review_log_card ON review_log (card_id, reviewed_at);
        "#;

        // Execute statements one by one for compatibility.
        for chunk in STMT.split(';') {
            let sql = chunk.trim();
            if sql.is_empty() {
                continue;
            }
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| storage("sqlite schema", e))?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Store for SqliteStore {
    // ===== Cards =====
    async fn load_cards(&self) -> Result<Vec<Card>, CoreError> {
        let rows = sqlx::query(
            r#"SELECT id,payload,state,due_kind,due,interval,ease,reps,lapses,step,
                      last_review,created
               FROM cards ORDER BY created ASC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage("list cards", e))?;

        let mut v = Vec::with_capacity(rows.len());
        for row in rows {
            match row_into_card(&row) {
                Ok(c) => v.push(c),
                Err(e) => {
                    let id: String = row.get("id");
                    warn!(card = %id, error = %e, "skipping unreadable card row");
                }
            }
        }
        Ok(v)
    }

    async fn put_card(&self, card: &Card) -> Result<(), CoreError> {
        let (due_kind, due) = due_to_cols(&card.due);
        sqlx::query(
            r#"
            INSERT INTO cards (
              id, payload, state, due_kind, due, interval, ease, reps, lapses, step,
              last_review, created
            )
            VALUES (?,?,?,?,?,?,?,?,?,?,?,?)
            ON CONFLICT(id) DO UPDATE SET
              payload=excluded.payload, state=excluded.state, due_kind=excluded.due_kind,
              due=excluded.due, interval=excluded.interval, ease=excluded.ease,
              reps=excluded.reps, lapses=excluded.lapses, step=excluded.step,
              last_review=excluded.last_review
            "#,
        )
        .bind(&card.id)
        .bind(card.payload.to_string())
        .bind(card.state.as_str())
        .bind(due_kind)
        .bind(due)
        .bind(i64::from(card.interval))
        .bind(card.ease)
        .bind(i64::from(card.reps))
        .bind(i64::from(card.lapses))
        .bind(card.step as i64)
        .bind(card.last_review.map(dt_to_str))
        .bind(dt_to_str(card.created))
        .execute(&self.pool)
        .await
        .map_err(|e| storage("upsert card", e))?;
        Ok(())
    }

    // ===== Review log =====
    async fn load_review_log(&self) -> Result<Vec<ReviewLogEntry>, CoreError> {
        let rows = sqlx::query(
            r#"SELECT id,card_id,quality,prior_state,prior_ease,prior_interval,reviewed_at
               FROM review_log ORDER BY seq ASC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage("list review log", e))?;

        let mut v = Vec::with_capacity(rows.len());
        for row in rows {
            match row_into_review(&row) {
                Ok(e) => v.push(e),
                Err(e) => {
                    let id: String = row.get("id");
                    warn!(review = %id, error = %e, "skipping unreadable review row");
                }
            }
        }
        Ok(v)
    }

    async fn append_review(&self, entry: &ReviewLogEntry, cap: usize) -> Result<(), CoreError> {
        let mut tx = self.pool.begin().await.map_err(|e| storage("tx", e))?;

        sqlx::query(
            r#"INSERT INTO review_log
                 (id,card_id,quality,prior_state,prior_ease,prior_interval,reviewed_at)
               VALUES (?,?,?,?,?,?,?)"#,
        )
        .bind(entry.id.to_string())
        .bind(&entry.card_id)
        .bind(i64::from(entry.quality.as_score()))
        .bind(entry.prior_state.as_str())
        .bind(entry.prior_ease)
        .bind(i64::from(entry.prior_interval))
        .bind(dt_to_str(entry.reviewed_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| storage("insert review", e))?;

        sqlx::query(
            "DELETE FROM review_log WHERE seq NOT IN (SELECT seq FROM review_log ORDER BY seq DESC LIMIT ?)",
        )
        .bind(cap as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| storage("trim review log", e))?;

        tx.commit().await.map_err(|e| storage("tx commit", e))
    }

    // ===== Daily stats =====
    async fn load_daily_stats(&self) -> Result<BTreeMap<NaiveDate, DailyStat>, CoreError> {
        let rows = sqlx::query("SELECT day,new_cards,reviews,lapses,study_time_ms FROM daily_stats")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage("list daily stats", e))?;

        let mut m = BTreeMap::new();
        for row in rows {
            let raw: String = row.get("day");
            match day_from_str(&raw) {
                Ok(day) => {
                    m.insert(day, row_into_daily(&row));
                }
                Err(e) => warn!(day = %raw, error = %e, "skipping unreadable daily stats row"),
            }
        }
        Ok(m)
    }

    async fn put_daily_stat(&self, day: NaiveDate, stat: &DailyStat) -> Result<(), CoreError> {
        sqlx::query(
            r#"INSERT INTO daily_stats (day,new_cards,reviews,lapses,study_time_ms)
               VALUES (?,?,?,?,?)
               ON CONFLICT(day) DO UPDATE SET
                 new_cards=excluded.new_cards, reviews=excluded.reviews,
                 lapses=excluded.lapses, study_time_ms=excluded.study_time_ms"#,
        )
        .bind(day_to_str(day))
        .bind(i64::from(stat.new_cards))
        .bind(i64::from(stat.reviews))
        .bind(i64::from(stat.lapses))
        .bind(stat.study_time_ms as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| storage("upsert daily stat", e))?;
        Ok(())
    }

    // ===== Settings =====
    async fn load_settings(&self) -> Result<Option<Settings>, CoreError> {
        let row = sqlx::query(
            "SELECT new_cards_per_day,max_reviews_per_day,show_answer_timer FROM settings WHERE id=1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage("read settings", e))?;

        Ok(row.map(|row| {
            let d = Settings::default();
            Settings {
                new_cards_per_day: row
                    .get::<Option<i64>, _>("new_cards_per_day")
                    .map_or(d.new_cards_per_day, |v| v as u32),
                max_reviews_per_day: row
                    .get::<Option<i64>, _>("max_reviews_per_day")
                    .map_or(d.max_reviews_per_day, |v| v as u32),
                show_answer_timer: row
                    .get::<Option<i64>, _>("show_answer_timer")
                    .map_or(d.show_answer_timer, |v| v != 0),
            }
        }))
    }

    async fn put_settings(&self, settings: &Settings) -> Result<(), CoreError> {
        sqlx::query(
            r#"INSERT INTO settings (id,new_cards_per_day,max_reviews_per_day,show_answer_timer)
               VALUES (1,?,?,?)
               ON CONFLICT(id) DO UPDATE SET
                 new_cards_per_day=excluded.new_cards_per_day,
                 max_reviews_per_day=excluded.max_reviews_per_day,
                 show_answer_timer=excluded.show_answer_timer"#,
        )
        .bind(i64::from(settings.new_cards_per_day))
        .bind(i64::from(settings.max_reviews_per_day))
        .bind(bool_to_i(settings.show_answer_timer))
        .execute(&self.pool)
        .await
        .map_err(|e| storage("upsert settings", e))?;
        Ok(())
    }
}

// ===== Helpers =====
fn storage(what: &str, e: sqlx::Error) -> CoreError {
    CoreError::Persistence(format!("{what}: {e}"))
}

fn uuid_from_str(s: String) -> Result<uuid::Uuid, CoreError> {
    uuid::Uuid::parse_str(&s).map_err(|_| CoreError::Invalid("uuid"))
}

fn dt_to_str(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn dt_from_str(s: String) -> Result<DateTime<Utc>, CoreError> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map_err(|_| CoreError::Invalid("datetime"))
        .map(|dt| dt.with_timezone(&Utc))
}

fn day_to_str(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn day_from_str(s: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| CoreError::Invalid("date"))
}

fn due_to_cols(due: &Due) -> (&'static str, String) {
    match due {
        Due::At(t) => ("at", dt_to_str(*t)),
        Due::Day(d) => ("day", day_to_str(*d)),
    }
}

fn due_from_cols(kind: &str, value: String) -> Result<Due, CoreError> {
    match kind {
        "at" => Ok(Due::At(dt_from_str(value)?)),
        "day" => Ok(Due::Day(day_from_str(&value)?)),
        _ => Err(CoreError::Invalid("due kind")),
    }
}

fn state_from_str(s: &str) -> Result<CardState, CoreError> {
    match s {
        "new" => Ok(CardState::New),
        "learning" => Ok(CardState::Learning),
        "review" => Ok(CardState::Review),
        "relearning" => Ok(CardState::Relearning),
        _ => Err(CoreError::Invalid("card state")),
    }
}

fn bool_to_i(b: bool) -> i64 {
    if b {
        1
    } else {
        0
    }
}

fn row_into_card(row: &SqliteRow) -> Result<Card, CoreError> {
    let payload: String = row.get("payload");
    let payload = serde_json::from_str(&payload).map_err(|_| CoreError::Invalid("payload"))?;

    Ok(Card {
        id: row.get::<String, _>("id"),
        payload,
        state: state_from_str(&row.get::<String, _>("state"))?,
        due: due_from_cols(&row.get::<String, _>("due_kind"), row.get::<String, _>("due"))?,
        interval: row.get::<i64, _>("interval") as u32,
        ease: row.get::<f64, _>("ease"),
        reps: row.get::<i64, _>("reps") as u32,
        lapses: row.get::<i64, _>("lapses") as u32,
        step: row.get::<i64, _>("step") as usize,
        last_review: row
            .get::<Option<String>, _>("last_review")
            .map(dt_from_str)
            .transpose()?,
        created: dt_from_str(row.get::<String, _>("created"))?,
    })
}

fn row_into_review(row: &SqliteRow) -> Result<ReviewLogEntry, CoreError> {
    let quality = u8::try_from(row.get::<i64, _>("quality"))
        .map_err(|_| CoreError::Invalid("quality"))
        .and_then(Quality::try_from)?;
    Ok(ReviewLogEntry {
        id: uuid_from_str(row.get::<String, _>("id"))?,
        card_id: row.get::<String, _>("card_id"),
        quality,
        prior_state: state_from_str(&row.get::<String, _>("prior_state"))?,
        prior_ease: row.get::<f64, _>("prior_ease"),
        prior_interval: row.get::<i64, _>("prior_interval") as u32,
        reviewed_at: dt_from_str(row.get::<String, _>("reviewed_at"))?,
    })
}

fn row_into_daily(row: &SqliteRow) -> DailyStat {
    DailyStat {
        new_cards: row.get::<i64, _>("new_cards") as u32,
        reviews: row.get::<i64, _>("reviews") as u32,
        lapses: row.get::<i64, _>("lapses") as u32,
        study_time_ms: row.get::<i64, _>("study_time_ms") as u64,
    }
}
