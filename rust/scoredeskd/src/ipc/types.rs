use std::sync::mpsc::Sender;

use rusqlite::Connection;
use serde::Deserialize;

use crate::config::Settings;
use crate::query::{FilterCriteria, SortSpec};
use crate::record::ScoreRecord;
use crate::selection::SelectionSet;
use crate::source::{FetchTracker, SourceEvent};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Everything the owner thread reacts to, in arrival order.
#[derive(Debug)]
pub enum Event {
    Line(String),
    Source(SourceEvent),
    InputClosed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

/// The single source of truth. Filtered rows, page windows and summaries are
/// derived from it on every request and never stored.
pub struct AppState {
    pub settings: Settings,
    pub records: Vec<ScoreRecord>,
    pub load: LoadStatus,
    /// Most recent load failure, kept while older records stay on display.
    pub last_error: Option<String>,
    pub filters: FilterCriteria,
    pub sort: SortSpec,
    pub page: usize,
    pub page_size: usize,
    pub pins: SelectionSet,
    pub fetches: FetchTracker,
    pub mirror: Option<Connection>,
    pub events: Sender<Event>,
}
