use crate::config::Catalog;
use crate::error::{Error, Result};
use crate::record::{Grade, RecordField, Subject};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Completion of work done off the state-owning thread.
#[derive(Debug)]
pub enum SourceEvent {
    Fetched {
        request_id: u64,
        result: std::result::Result<Vec<serde_json::Value>, String>,
    },
    Submitted {
        submission_id: String,
        result: std::result::Result<(), String>,
    },
}

/// Monotonic request ids for record fetches. Only the most recently issued
/// fetch may replace the record set; older completions are stale.
#[derive(Debug, Clone, Default)]
pub struct FetchTracker {
    latest: u64,
    in_flight: usize,
}

impl FetchTracker {
    pub fn begin(&mut self) -> u64 {
        self.latest += 1;
        self.in_flight += 1;
        self.latest
    }

    /// Records a completion and reports whether it should be applied.
    pub fn finish(&mut self, request_id: u64) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        request_id == self.latest
    }

    /// Makes every fetch issued so far stale, e.g. after a direct load.
    pub fn supersede(&mut self) {
        self.latest += 1;
    }

    pub fn latest(&self) -> u64 {
        self.latest
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

fn rows_from_body(body: serde_json::Value) -> Result<Vec<serde_json::Value>> {
    match body {
        serde_json::Value::Array(rows) => Ok(rows),
        other => Err(Error::Source(format!(
            "expected a JSON array of records, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

fn client(timeout: Duration) -> Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder().timeout(timeout).build()?)
}

/// One-shot GET of the record endpoint. No retries.
pub fn fetch_records(url: &str, timeout: Duration) -> Result<Vec<serde_json::Value>> {
    debug!(%url, "fetching records");
    let body: serde_json::Value = client(timeout)?
        .get(url)
        .send()?
        .error_for_status()?
        .json()?;
    let rows = rows_from_body(body)?;
    info!(%url, rows = rows.len(), "fetched records");
    Ok(rows)
}

/// Posts a submission as a plain-text JSON body, which the spreadsheet
/// script endpoint accepts without a preflight.
pub fn post_submission(url: &str, payload: &serde_json::Value, timeout: Duration) -> Result<()> {
    client(timeout)?
        .post(url)
        .header(reqwest::header::CONTENT_TYPE, "text/plain;charset=utf-8")
        .body(payload.to_string())
        .send()?
        .error_for_status()?;
    Ok(())
}

pub fn load_file(path: &Path) -> Result<Vec<serde_json::Value>> {
    let raw = std::fs::read_to_string(path)?;
    rows_from_body(serde_json::from_str(&raw)?)
}

pub fn spawn_fetch<F>(url: String, timeout: Duration, request_id: u64, done: F)
where
    F: FnOnce(SourceEvent) + Send + 'static,
{
    std::thread::spawn(move || {
        let result = fetch_records(&url, timeout).map_err(|e| e.to_string());
        done(SourceEvent::Fetched { request_id, result });
    });
}

pub fn spawn_submit<F>(url: String, timeout: Duration, submission_id: String, payload: serde_json::Value, done: F)
where
    F: FnOnce(SourceEvent) + Send + 'static,
{
    std::thread::spawn(move || {
        let result = post_submission(&url, &payload, timeout).map_err(|e| e.to_string());
        done(SourceEvent::Submitted {
            submission_id,
            result,
        });
    });
}

/// Builds the outgoing submission from a partial canonical record.
///
/// Region must come from the catalog and subject grades must be grade
/// tokens; everything else is passed through as text. The timestamp is
/// always stamped here.
pub fn build_submission(
    raw: Option<&serde_json::Value>,
    catalog: &Catalog,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<serde_json::Value> {
    let Some(obj) = raw.and_then(|v| v.as_object()) else {
        return Err(Error::invalid("record must be an object"));
    };
    let text = |field: RecordField| -> Result<Option<String>> {
        match obj.get(field.canonical_key()) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(serde_json::Value::String(s)) => Ok(Some(s.trim().to_string())),
            Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
            Some(_) => Err(Error::invalid(format!(
                "record.{} must be a string or number",
                field.canonical_key()
            ))),
        }
    };

    let mut out = serde_json::Map::new();
    for field in RecordField::ALL {
        if field == RecordField::Timestamp {
            continue;
        }
        if let Some(v) = text(field)? {
            out.insert(field.canonical_key().to_string(), serde_json::Value::String(v));
        }
    }

    match out.get("region").and_then(|v| v.as_str()) {
        Some(region) if catalog.has_region(region) => {}
        Some(region) => return Err(Error::invalid(format!("record.region '{}' is not a known region", region))),
        None => return Err(Error::invalid("record.region is required")),
    }
    for subject in Subject::ALL {
        let key = subject.field().canonical_key();
        let Some(raw) = out.get(key).and_then(|v| v.as_str()) else {
            continue;
        };
        let Some(grade) = Grade::parse(raw) else {
            return Err(Error::invalid(format!("record.{} has unknown grade '{}'", key, raw)));
        };
        out.insert(key.to_string(), serde_json::Value::String(grade.as_str().to_string()));
    }

    out.insert(
        RecordField::Timestamp.canonical_key().to_string(),
        serde_json::Value::String(now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
    );
    Ok(serde_json::Value::Object(out))
}
