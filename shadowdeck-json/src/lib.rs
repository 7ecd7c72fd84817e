use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shadowdeck_core::{repo::Store, Card, CardId, CoreError, DailyStat, ReviewLogEntry, Settings};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::task;
use tracing::{debug, warn};

pub mod paths;

const FILE_VERSION: u32 = 1;

const CARDS_FILE: &str = "cards.json";
const REVIEW_LOG_FILE: &str = "review_log.json";
const DAILY_FILE: &str = "daily_stats.json";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Serialize, Deserialize)]
struct FileImage<T> {
    version: u32,
    updated_at: DateTime<Utc>,
    data: T,
}

#[derive(Default)]
struct State {
    cards: BTreeMap<CardId, Card>,
    review_log: VecDeque<ReviewLogEntry>,
    daily: BTreeMap<NaiveDate, DailyStat>,
    settings: Option<Settings>,
    /// Files that existed but could not be parsed at open. Loading one of
    /// these reports an error until it is written again.
    unreadable: HashSet<&'static str>,
}

/// One JSON file per collection in a directory. Writes go through a temp file
/// and a rename; every card write also leaves a timestamped backup.
pub struct JsonStore {
    dir: PathBuf,
    backups_dir: PathBuf,
    max_backups: usize,
    state: RwLock<State>,
}

impl JsonStore {
    pub async fn open_default() -> Result<Self, CoreError> {
        let (dir, backups) = paths::store_dirs(&paths::data_root());
        Self::open_with(dir, backups, 10).await
    }

    pub async fn open_in(root: impl AsRef<Path>) -> Result<Self, CoreError> {
        let (dir, backups) = paths::store_dirs(root.as_ref());
        Self::open_with(dir, backups, 10).await
    }

    pub async fn open_with(dir: PathBuf, backups_dir: PathBuf, max_backups: usize) -> Result<Self, CoreError> {
        ensure_dir(&dir)?;
        ensure_dir(&backups_dir)?;

        let d = dir.clone();
        let state = task::spawn_blocking(move || load_all(&d))
            .await
            .map_err(CoreError::persistence)?;

        Ok(Self {
            dir,
            backups_dir,
            max_backups: max_backups.max(1),
            state: RwLock::new(state),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn check_readable(&self, file: &'static str) -> Result<(), CoreError> {
        if self.state.read().unreadable.contains(file) {
            return Err(CoreError::Persistence(format!("{file} could not be parsed")));
        }
        Ok(())
    }

    async fn write<T: Serialize>(&self, file: &'static str, data: &T, backup: bool) -> Result<(), CoreError> {
        let json = serde_json::to_vec_pretty(&FileImage {
            version: FILE_VERSION,
            updated_at: Utc::now(),
            data,
        })
        .map_err(CoreError::persistence)?;
        let path = self.dir.join(file);
        let backups = backup.then(|| (self.backups_dir.clone(), self.max_backups));

        task::spawn_blocking(move || write_with_backup(&path, backups, &json))
            .await
            .map_err(CoreError::persistence)?
            .map_err(CoreError::persistence)?;

        self.state.write().unreadable.remove(file);
        debug!(file, "collection written");
        Ok(())
    }
}

fn ensure_dir(path: &Path) -> Result<(), CoreError> {
    fs::create_dir_all(path).map_err(CoreError::persistence)
}

fn load_all(dir: &Path) -> State {
    let mut st = State::default();

    match read_image::<BTreeMap<CardId, Card>>(&dir.join(CARDS_FILE)) {
        Ok(v) => st.cards = v.unwrap_or_default(),
        Err(e) => mark_unreadable(&mut st, dir, CARDS_FILE, e),
    }
    match read_image::<VecDeque<ReviewLogEntry>>(&dir.join(REVIEW_LOG_FILE)) {
        Ok(v) => st.review_log = v.unwrap_or_default(),
        Err(e) => mark_unreadable(&mut st, dir, REVIEW_LOG_FILE, e),
    }
    match read_image::<BTreeMap<NaiveDate, DailyStat>>(&dir.join(DAILY_FILE)) {
        Ok(v) => st.daily = v.unwrap_or_default(),
        Err(e) => mark_unreadable(&mut st, dir, DAILY_FILE, e),
    }
    match read_image::<Settings>(&dir.join(SETTINGS_FILE)) {
        Ok(v) => st.settings = v,
        Err(e) => mark_unreadable(&mut st, dir, SETTINGS_FILE, e),
    }

    st
}

/// `Ok(None)` when the file does not exist yet.
fn read_image<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, io::Error> {
    if !path.exists() {
        return Ok(None);
    }
    let buf = fs::read_to_string(path)?;
    let img = serde_json::from_str::<FileImage<T>>(&buf)?;
    Ok(Some(img.data))
}

/// Keeps the bad file around as `<name>.corrupt` so the next write does not
/// destroy it.
fn mark_unreadable(st: &mut State, dir: &Path, file: &'static str, e: io::Error) {
    let path = dir.join(file);
    let aside = path.with_extension("json.corrupt");
    warn!(file, error = %e, "unreadable collection moved to {}", aside.display());
    let _ = fs::rename(&path, &aside);
    st.unreadable.insert(file);
}

fn write_with_backup(path: &Path, backups: Option<(PathBuf, usize)>, json: &[u8]) -> Result<(), io::Error> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(json)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;

    if let Some((backups_dir, keep)) = backups {
        fs::create_dir_all(&backups_dir)?;
        let ts = chrono::Local::now().format("%Y%m%d-%H%M%S%.3f");
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("collection");
        let backup_path = backups_dir.join(format!("{stem}-{ts}.json"));
        let mut btmp = NamedTempFile::new_in(&backups_dir)?;
        btmp.write_all(json)?;
        btmp.flush()?;
        btmp.persist(&backup_path).map_err(|e| e.error)?;

        rotate_backups(&backups_dir, keep)?;
    }

    Ok(())
}

fn rotate_backups(dir: &Path, keep: usize) -> Result<(), io::Error> {
    let mut entries: Vec<_> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    // Names embed the timestamp, so name order is age order.
    entries.sort_by_key(|e| e.file_name());
    if entries.len() > keep {
        for e in &entries[0..entries.len() - keep] {
            let _ = fs::remove_file(e.path());
        }
    }
    Ok(())
}

#[async_trait]
impl Store for JsonStore {
    async fn load_cards(&self) -> Result<Vec<Card>, CoreError> {
        self.check_readable(CARDS_FILE)?;
        Ok(self.state.read().cards.values().cloned().collect())
    }

    async fn put_card(&self, card: &Card) -> Result<(), CoreError> {
        let snapshot = {
            let mut s = self.state.write();
            s.cards.insert(card.id.clone(), card.clone());
            s.cards.clone()
        };
        self.write(CARDS_FILE, &snapshot, true).await
    }

    async fn load_review_log(&self) -> Result<Vec<ReviewLogEntry>, CoreError> {
        self.check_readable(REVIEW_LOG_FILE)?;
        Ok(self.state.read().review_log.iter().cloned().collect())
    }

    async fn append_review(&self, entry: &ReviewLogEntry, cap: usize) -> Result<(), CoreError> {
        let snapshot = {
            let mut s = self.state.write();
            s.review_log.push_back(entry.clone());
            while s.review_log.len() > cap {
                s.review_log.pop_front();
            }
            s.review_log.clone()
        };
        self.write(REVIEW_LOG_FILE, &snapshot, false).await
    }

    async fn load_daily_stats(&self) -> Result<BTreeMap<NaiveDate, DailyStat>, CoreError> {
        self.check_readable(DAILY_FILE)?;
        Ok(self.state.read().daily.clone())
    }

    async fn put_daily_stat(&self, day: NaiveDate, stat: &DailyStat) -> Result<(), CoreError> {
        let snapshot = {
            let mut s = self.state.write();
            s.daily.insert(day, *stat);
            s.daily.clone()
        };
        self.write(DAILY_FILE, &snapshot, false).await
    }

    async fn load_settings(&self) -> Result<Option<Settings>, CoreError> {
        self.check_readable(SETTINGS_FILE)?;
        Ok(self.state.read().settings.clone())
    }

    async fn put_settings(&self, settings: &Settings) -> Result<(), CoreError> {
        self.state.write().settings = Some(settings.clone());
        self.write(SETTINGS_FILE, settings, false).await
    }
}
