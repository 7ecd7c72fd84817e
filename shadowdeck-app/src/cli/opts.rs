use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, ValueEnum)]
pub enum StoreKind {
    Json,
    Sqlite,
}

#[derive(Debug, Parser, Clone)]
#[command(name = "shadowdeck", version, about = "ShadowDeck spaced-repetition CLI/API")]
pub struct Cli {
    /// Storage backend
    #[arg(long, value_enum, default_value_t = StoreKind::Json)]
    pub store: StoreKind,

    /// Data directory (defaults to the platform app data dir)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Card operations
    #[command(subcommand)]
    Card(CardCmd),
    /// Review today's queue
    Review(ReviewCmd),
    /// Overall and today's statistics
    Stats,
    /// Review cards due per day
    Forecast {
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Review cards grouped by interval
    Intervals,
    /// What each answer would do to a card
    Preview { card_id: String },
    /// Daily limits and display options
    #[command(subcommand)]
    Settings(SettingsCmd),
    /// Launch Axum HTTP API
    Api(ApiCmd),
}

#[derive(Debug, Subcommand, Clone)]
pub enum CardCmd {
    Add(CardAdd),
    List,
    Show { card_id: String },
}

#[derive(Debug, Args, Clone)]
pub struct CardAdd {
    /// Stable card id, usually the phrase itself
    pub card_id: String,
    #[arg(long)]
    pub word: Option<String>,
    #[arg(long)]
    pub translation: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    /// Raw JSON payload; overrides --word/--translation/--category
    #[arg(long)]
    pub payload: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct ReviewCmd {
    #[arg(long, default_value_t = 100)]
    pub max: usize,
}

#[derive(Debug, Subcommand, Clone)]
pub enum SettingsCmd {
    Show,
    Set(SettingsSet),
}

#[derive(Debug, Args, Clone)]
pub struct SettingsSet {
    #[arg(long)]
    pub new_per_day: Option<u32>,
    #[arg(long)]
    pub max_reviews: Option<u32>,
    #[arg(long)]
    pub show_timer: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct ApiCmd {
    /// Bind address (host:port)
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub addr: String,
}
