use serde_json::json;

use crate::error::Error;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn fail(id: &str, e: &Error) -> serde_json::Value {
    err(id, e.code(), e.to_string(), None)
}

/// Id-less line pushed when background work completes.
pub fn event(name: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "event": name,
        "result": result
    })
}
