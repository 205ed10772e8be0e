use std::sync::mpsc::Sender;

use tracing::{info, warn};

use super::types::{AppState, Event, LoadStatus};
use crate::config::Settings;
use crate::mirror;
use crate::pagination::{self, PageWindow};
use crate::query::{self, FilterCriteria, SortSpec};
use crate::record::ScoreRecord;
use crate::selection::SelectionSet;
use crate::source::FetchTracker;
use crate::stats::{self, Summary};

impl AppState {
    pub fn new(settings: Settings, events: Sender<Event>) -> Self {
        let page_size = settings.default_page_size;
        let pins = SelectionSet::with_capacity(settings.pin_capacity);
        Self {
            settings,
            records: Vec::new(),
            load: LoadStatus::Idle,
            last_error: None,
            filters: FilterCriteria::new(),
            sort: SortSpec::default(),
            page: 1,
            page_size,
            pins,
            fetches: FetchTracker::default(),
            mirror: None,
            events,
        }
    }

    /// Best-effort: the daemon keeps running without a mirror.
    pub fn open_mirror(&mut self) {
        let Some(path) = self.settings.mirror_path.clone() else {
            return;
        };
        match mirror::open_mirror(&path) {
            Ok(conn) => {
                info!(path = %path.display(), "opened submission mirror");
                self.mirror = Some(conn);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "submission mirror unavailable"),
        }
    }

    /// Swaps in a freshly normalized record set. The page goes back to 1 and
    /// pins whose record disappeared are dropped.
    pub fn replace_records(&mut self, records: Vec<ScoreRecord>) {
        if !self.pins.is_empty() {
            let dropped = self
                .pins
                .retain(|id| records.iter().any(|r| r.id == id));
            if dropped > 0 {
                info!(dropped, "unpinned records missing from the new record set");
            }
        }
        info!(count = records.len(), "record set replaced");
        self.records = records;
        self.load = LoadStatus::Ready;
        self.last_error = None;
        self.page = 1;
    }

    pub fn set_filters(&mut self, filters: FilterCriteria) {
        self.filters = filters;
        self.page = 1;
    }

    pub fn set_sort(&mut self, sort: SortSpec) {
        self.sort = sort;
        self.page = 1;
    }

    pub fn set_page_size(&mut self, size: usize) {
        self.page_size = size;
        self.page = 1;
    }

    pub fn filtered(&self) -> Vec<ScoreRecord> {
        query::query(&self.records, &self.filters, self.sort)
    }

    /// Clamps and remembers the requested page against the current results.
    pub fn set_page(&mut self, page: i64) -> PageWindow<ScoreRecord> {
        let window = pagination::paginate(&self.filtered(), page, self.page_size);
        self.page = window.current_page;
        window
    }

    pub fn summary(&self, rows: &[ScoreRecord]) -> Summary {
        stats::summarize(rows, &self.settings.target_year)
    }

    /// "loading", "error", "empty" and "ready" are distinct display states;
    /// "idle" means nothing has been loaded yet.
    pub fn display_state(&self, filtered_len: usize) -> &'static str {
        if self.records.is_empty() {
            return match self.load {
                LoadStatus::Idle => "idle",
                LoadStatus::Loading => "loading",
                LoadStatus::Failed(_) => "error",
                LoadStatus::Ready => "empty",
            };
        }
        if filtered_len == 0 {
            "empty"
        } else {
            "ready"
        }
    }

    pub fn load_json(&self) -> serde_json::Value {
        let (status, message) = match &self.load {
            LoadStatus::Idle => ("idle", None),
            LoadStatus::Loading => ("loading", None),
            LoadStatus::Ready => ("ready", None),
            LoadStatus::Failed(m) => ("error", Some(m.clone())),
        };
        serde_json::json!({
            "status": status,
            "message": message,
            "lastError": self.last_error,
            "recordCount": self.records.len(),
            "latestRequestId": self.fetches.latest(),
            "inFlight": self.fetches.in_flight(),
            "mirror": self.mirror.is_some(),
        })
    }
}
