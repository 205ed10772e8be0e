use crate::export::{self, ExportFormat};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

fn param_path(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Exports every filtered row regardless of the current page. With `outPath`
/// the file is written there; with `outDir` a dated default name is used;
/// otherwise the content comes back inline. Workbooks are binary and always
/// go to a file.
fn handle_export(state: &mut AppState, req: &Request, format: ExportFormat) -> serde_json::Value {
    let rows = state.filtered();

    let out = match (param_path(req, "outPath"), param_path(req, "outDir")) {
        (Some(p), _) => Some(PathBuf::from(p)),
        (None, Some(dir)) => Some(
            PathBuf::from(dir).join(export::default_file_name(format, chrono::Local::now().date_naive())),
        ),
        (None, None) => None,
    };

    let Some(out) = out else {
        let content = match format {
            ExportFormat::Csv => Ok(export::to_csv(&rows)),
            ExportFormat::Json => export::to_json(&rows),
            ExportFormat::Xlsx => {
                return err(&req.id, "bad_params", "export.xlsx needs outPath or outDir", None)
            }
        };
        let content = match content {
            Ok(v) => v,
            Err(e) => return err(&req.id, "export_failed", format!("{:#}", e), None),
        };
        return ok(
            &req.id,
            json!({
                "rowCount": rows.len(),
                "fileName": export::default_file_name(format, chrono::Local::now().date_naive()),
                "content": content,
            }),
        );
    };

    let bytes = match export::write_export(&out, format, &rows) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "io_failed",
                format!("{:#}", e),
                Some(json!({ "path": out.to_string_lossy() })),
            )
        }
    };
    info!(path = %out.display(), rows = rows.len(), format = format.extension(), "export written");

    ok(
        &req.id,
        json!({
            "path": out.to_string_lossy(),
            "rowCount": rows.len(),
            "bytes": bytes,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "export.csv" => Some(handle_export(state, req, ExportFormat::Csv)),
        "export.json" => Some(handle_export(state, req, ExportFormat::Json)),
        "export.xlsx" => Some(handle_export(state, req, ExportFormat::Xlsx)),
        _ => None,
    }
}
