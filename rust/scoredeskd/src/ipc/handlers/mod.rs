pub mod core;
pub mod export;
pub mod pins;
pub mod records;
pub mod stats;
pub mod view;

use crate::ipc::types::Request;

/// Integer param that may be absent; anything present must be an integer.
pub(crate) fn optional_i64(req: &Request, key: &str) -> Result<Option<i64>, String> {
    match req.params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| format!("{} must be an integer", key)),
    }
}

pub(crate) fn required_str(req: &Request, key: &str) -> Result<String, String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("missing {}", key))
}
