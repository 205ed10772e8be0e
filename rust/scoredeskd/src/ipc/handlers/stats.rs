use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

/// Summary over the currently filtered rows, not the whole record set.
fn handle_stats_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let rows = state.filtered();
    let summary = state.summary(&rows);
    let mut result = json!(summary);
    result["state"] = json!(state.display_state(rows.len()));
    result["loadedCount"] = json!(state.records.len());
    ok(&req.id, result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "stats.summary" => Some(handle_stats_summary(state, req)),
        _ => None,
    }
}
