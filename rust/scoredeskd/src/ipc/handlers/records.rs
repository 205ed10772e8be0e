use crate::ipc::error::{err, event, fail, ok};
use crate::ipc::types::{AppState, Event, LoadStatus, Request};
use crate::mirror::{self, SubmissionStatus};
use crate::record::normalize_rows;
use crate::source::{self, SourceEvent};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn timeout(state: &AppState) -> Duration {
    Duration::from_secs(state.settings.fetch_timeout_secs.max(1))
}

fn apply_rows(state: &mut AppState, rows: &[serde_json::Value]) -> serde_json::Value {
    let normalized = normalize_rows(rows);
    if normalized.skipped > 0 {
        warn!(skipped = normalized.skipped, "some record rows were not objects");
    }
    let count = normalized.records.len();
    state.replace_records(normalized.records);
    json!({ "count": count, "skipped": normalized.skipped })
}

fn handle_records_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    let rows = if let Some(path) = req.params.get("path").and_then(|v| v.as_str()) {
        match source::load_file(&PathBuf::from(path)) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(%path, error = %e, "record file could not be loaded");
                return fail(&req.id, &e);
            }
        }
    } else if let Some(rows) = req.params.get("records").and_then(|v| v.as_array()) {
        rows.clone()
    } else {
        return err(&req.id, "bad_params", "missing path or records", None);
    };

    // A direct load wins over any fetch still in flight.
    state.fetches.supersede();
    let result = apply_rows(state, &rows);
    ok(&req.id, result)
}

fn handle_records_fetch(state: &mut AppState, req: &Request) -> serde_json::Value {
    let url = req
        .params
        .get("url")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .or_else(|| state.settings.source_url.clone());
    let Some(url) = url else {
        return err(
            &req.id,
            "no_source",
            "no record source configured; pass params.url or set source_url",
            None,
        );
    };

    let request_id = state.fetches.begin();
    state.load = LoadStatus::Loading;
    info!(request_id, %url, "record fetch started");

    let tx = state.events.clone();
    source::spawn_fetch(url, timeout(state), request_id, move |ev| {
        let _ = tx.send(Event::Source(ev));
    });

    ok(&req.id, json!({ "requestId": request_id, "status": "loading" }))
}

fn handle_records_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let payload = match source::build_submission(
        req.params.get("record"),
        &state.settings.catalog,
        chrono::Utc::now(),
    ) {
        Ok(v) => v,
        Err(e) => return fail(&req.id, &e),
    };
    let submission_id = Uuid::new_v4().to_string();

    let mirrored = match state.mirror.as_ref() {
        Some(conn) => match mirror::insert_submission(conn, &submission_id, &payload, &now_rfc3339()) {
            Ok(()) => true,
            Err(e) => {
                warn!(submission = %submission_id, error = %e, "could not mirror submission");
                false
            }
        },
        None => false,
    };

    let delivery = match state.settings.source_url.clone() {
        Some(url) => {
            let tx = state.events.clone();
            source::spawn_submit(
                url,
                timeout(state),
                submission_id.clone(),
                payload.clone(),
                move |ev| {
                    let _ = tx.send(Event::Source(ev));
                },
            );
            "pending"
        }
        None => "skipped",
    };
    info!(submission = %submission_id, mirrored, delivery, "submission accepted");

    ok(
        &req.id,
        json!({
            "submissionId": submission_id,
            "mirrored": mirrored,
            "delivery": delivery,
            "record": payload,
        }),
    )
}

fn handle_records_restore_mirror(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.mirror.as_ref() else {
        return err(&req.id, "no_mirror", "no submission mirror is open", None);
    };
    let submissions = match mirror::list_submissions(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows: Vec<serde_json::Value> = submissions.into_iter().map(|s| s.payload).collect();

    state.fetches.supersede();
    let result = apply_rows(state, &rows);
    info!(count = rows.len(), "restored records from submission mirror");
    ok(&req.id, result)
}

fn handle_records_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, state.load_json())
}

/// Folds a background completion into the state; returns the event line to
/// emit, if any.
pub fn apply_source_event(state: &mut AppState, ev: SourceEvent) -> Option<serde_json::Value> {
    match ev {
        SourceEvent::Fetched { request_id, result } => {
            if !state.fetches.finish(request_id) {
                debug!(request_id, latest = state.fetches.latest(), "discarding stale fetch result");
                return Some(event(
                    "records.fetchDiscarded",
                    json!({ "requestId": request_id, "latestRequestId": state.fetches.latest() }),
                ));
            }
            match result {
                Ok(rows) => {
                    let mut result = apply_rows(state, &rows);
                    result["requestId"] = json!(request_id);
                    Some(event("records.loaded", result))
                }
                Err(message) => {
                    warn!(request_id, error = %message, "record fetch failed");
                    if state.records.is_empty() {
                        state.load = LoadStatus::Failed(message.clone());
                    } else {
                        state.load = LoadStatus::Ready;
                        state.last_error = Some(message.clone());
                    }
                    Some(event(
                        "records.loadFailed",
                        json!({
                            "requestId": request_id,
                            "message": message,
                            "keptRecords": state.records.len(),
                        }),
                    ))
                }
            }
        }
        SourceEvent::Submitted {
            submission_id,
            result,
        } => {
            let status = if result.is_ok() {
                SubmissionStatus::Sent
            } else {
                SubmissionStatus::Failed
            };
            if let Some(conn) = state.mirror.as_ref() {
                if let Err(e) = mirror::mark_submission(conn, &submission_id, status, &now_rfc3339()) {
                    warn!(submission = %submission_id, error = %e, "could not update mirrored submission");
                }
            }
            if let Err(message) = &result {
                warn!(submission = %submission_id, error = %message, "submission delivery failed");
            }
            Some(event(
                "records.submitted",
                json!({
                    "submissionId": submission_id,
                    "ok": result.is_ok(),
                    "status": status.as_str(),
                    "message": result.err(),
                }),
            ))
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "records.load" => Some(handle_records_load(state, req)),
        "records.fetch" => Some(handle_records_fetch(state, req)),
        "records.submit" => Some(handle_records_submit(state, req)),
        "records.restoreMirror" => Some(handle_records_restore_mirror(state, req)),
        "records.status" => Some(handle_records_status(state, req)),
        _ => None,
    }
}
