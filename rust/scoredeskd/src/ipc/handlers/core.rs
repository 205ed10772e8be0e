use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use crate::query::{FilterField, SortField};
use serde_json::json;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "load": state.load_json(),
            "sourceConfigured": state.settings.source_url.is_some(),
        }),
    )
}

fn handle_catalog_options(state: &mut AppState, req: &Request) -> serde_json::Value {
    let catalog = &state.settings.catalog;
    ok(
        &req.id,
        json!({
            "regions": catalog.regions,
            "years": catalog.years,
            "grades": catalog.grades(),
            "filterFields": FilterField::ALL.iter().map(|f| f.as_str()).collect::<Vec<_>>(),
            "sortFields": SortField::ALL.iter().map(|f| f.as_str()).collect::<Vec<_>>(),
            "pageSizes": state.settings.page_sizes,
            "defaultPageSize": state.settings.default_page_size,
            "pinCapacity": state.pins.capacity(),
            "targetYear": state.settings.target_year,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "catalog.options" => Some(handle_catalog_options(state, req)),
        _ => None,
    }
}
