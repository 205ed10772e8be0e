use super::required_str;
use super::view::row_json;
use crate::error::Error;
use crate::ipc::error::{err, fail, ok};
use crate::ipc::types::{AppState, Request};
use crate::selection::{self, Toggle};
use serde_json::json;
use tracing::warn;

fn pins_json(state: &AppState) -> serde_json::Value {
    let pinned: Vec<serde_json::Value> = state
        .pins
        .resolve(&state.records)
        .into_iter()
        .map(|r| row_json(r, &state.pins))
        .collect();
    json!({
        "ids": state.pins.ids(),
        "count": state.pins.len(),
        "capacity": state.pins.capacity(),
        "records": pinned,
    })
}

fn handle_pins_toggle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    if !state.records.iter().any(|r| r.id == id) {
        return fail(&req.id, &Error::NotFound(format!("record {}", id)));
    }

    let outcome = state.pins.toggle(&id);
    let mut result = pins_json(state);
    match outcome {
        Toggle::Added | Toggle::Removed => {
            result["accepted"] = json!(true);
            result["pinned"] = json!(state.pins.contains(&id));
        }
        Toggle::Rejected { capacity } => {
            warn!(%id, capacity, "pin rejected, comparison set is full");
            result["accepted"] = json!(false);
            result["pinned"] = json!(false);
            result["notice"] = json!({
                "code": "pin_capacity",
                "message": format!("at most {} records can be compared at once", capacity),
            });
        }
    }
    ok(&req.id, result)
}

fn handle_pins_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let removed = state.pins.remove(&id);
    let mut result = pins_json(state);
    result["removed"] = json!(removed);
    ok(&req.id, result)
}

fn handle_pins_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.pins.clear();
    ok(&req.id, pins_json(state))
}

fn handle_pins_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, pins_json(state))
}

fn handle_pins_compare(state: &mut AppState, req: &Request) -> serde_json::Value {
    let pinned = state.pins.resolve(&state.records);
    ok(&req.id, selection::comparison(&pinned))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "pins.toggle" => Some(handle_pins_toggle(state, req)),
        "pins.remove" => Some(handle_pins_remove(state, req)),
        "pins.clear" => Some(handle_pins_clear(state, req)),
        "pins.list" => Some(handle_pins_list(state, req)),
        "pins.compare" => Some(handle_pins_compare(state, req)),
        _ => None,
    }
}
