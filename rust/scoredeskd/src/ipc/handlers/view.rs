use super::{optional_i64, required_str};
use crate::error::Error;
use crate::ipc::error::{err, fail, ok};
use crate::ipc::types::{AppState, Request};
use crate::pagination::{self, check_page_size};
use crate::query::{self, FilterCriteria, SortField, SortOrder, SortSpec};
use crate::record::ScoreRecord;
use crate::search;
use crate::selection::SelectionSet;
use serde_json::json;

pub(crate) fn row_json(r: &ScoreRecord, pins: &SelectionSet) -> serde_json::Value {
    let mut v = json!(r);
    v["pinned"] = json!(pins.contains(&r.id));
    v["aCount"] = json!(r.a_count());
    v["ratioDisplay"] = json!(r.ratio_display());
    v["rankIntervalDisplay"] = json!(r.rank_interval_display());
    v
}

fn view_json(state: &AppState) -> serde_json::Value {
    let rows = state.filtered();
    let window = pagination::paginate(&rows, state.page as i64, state.page_size);
    let items: Vec<serde_json::Value> = window
        .items
        .iter()
        .map(|r| row_json(r, &state.pins))
        .collect();
    json!({
        "state": state.display_state(rows.len()),
        "load": state.load_json(),
        "filters": state.filters.to_json(),
        "sort": state.sort.to_json(),
        "items": items,
        "currentPage": window.current_page,
        "totalPages": window.total_pages,
        "totalRows": window.total_rows,
        "pageSize": window.page_size,
        "pinnedIds": state.pins.ids(),
    })
}

fn parse_sort(req: &Request, current: SortSpec) -> Result<SortSpec, Error> {
    let field = match req.params.get("field").and_then(|v| v.as_str()) {
        Some(f) => f.parse::<SortField>()?,
        None => current.field,
    };
    let order = match req.params.get("order").and_then(|v| v.as_str()) {
        Some(o) => o.parse::<SortOrder>()?,
        None => SortOrder::Desc,
    };
    Ok(SortSpec { field, order })
}

fn handle_view_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, view_json(state))
}

fn handle_view_set_filters(state: &mut AppState, req: &Request) -> serde_json::Value {
    let parsed = match FilterCriteria::from_json(req.params.get("filters"), &state.settings.catalog) {
        Ok(v) => v,
        Err(e) => return fail(&req.id, &e),
    };
    let merge = req
        .params
        .get("merge")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let filters = if merge {
        // Explicitly emptied fields must clear the current constraint too.
        let mut next = state.filters.clone();
        if let Some(obj) = req.params.get("filters").and_then(|v| v.as_object()) {
            for key in obj.keys() {
                if let Ok(field) = key.parse() {
                    next.set(field, Vec::<String>::new());
                }
            }
        }
        next.merge(parsed);
        next
    } else {
        parsed
    };
    state.set_filters(filters);
    ok(&req.id, view_json(state))
}

fn handle_view_reset_filters(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.set_filters(FilterCriteria::new());
    ok(&req.id, view_json(state))
}

fn handle_view_search(state: &mut AppState, req: &Request) -> serde_json::Value {
    let term = match req.params.get("term") {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(v) => match v.as_str() {
            Some(s) => s.to_string(),
            None => return err(&req.id, "bad_params", "term must be a string", None),
        },
    };
    let mapping = search::map_search(&term, &state.settings.catalog);
    state.set_filters(mapping.filters.clone());
    let mut view = view_json(state);
    view["search"] = json!({
        "term": term,
        "matched": mapping.matched,
        "ambiguous": mapping.ambiguous,
        "ignored": mapping.ignored,
    });
    ok(&req.id, view)
}

fn handle_view_sort(state: &mut AppState, req: &Request) -> serde_json::Value {
    let field = match required_str(req, "field") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let field = match field.parse::<SortField>() {
        Ok(v) => v,
        Err(e) => return fail(&req.id, &e),
    };
    state.set_sort(state.sort.toggled(field));
    ok(&req.id, view_json(state))
}

fn handle_view_set_sort(state: &mut AppState, req: &Request) -> serde_json::Value {
    let sort = match parse_sort(req, state.sort) {
        Ok(v) => v,
        Err(e) => return fail(&req.id, &e),
    };
    state.set_sort(sort);
    ok(&req.id, view_json(state))
}

fn handle_view_set_page(state: &mut AppState, req: &Request) -> serde_json::Value {
    let page = match optional_i64(req, "page") {
        Ok(v) => v.unwrap_or(1),
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    state.set_page(page);
    ok(&req.id, view_json(state))
}

fn handle_view_set_page_size(state: &mut AppState, req: &Request) -> serde_json::Value {
    let size = match optional_i64(req, "pageSize") {
        Ok(Some(v)) if v > 0 => v as usize,
        Ok(_) => return err(&req.id, "bad_params", "missing pageSize", None),
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let size = match check_page_size(size, &state.settings.page_sizes) {
        Ok(v) => v,
        Err(e) => return fail(&req.id, &e),
    };
    state.set_page_size(size);
    ok(&req.id, view_json(state))
}

/// Runs filters/sort/pagination from the params against the loaded records
/// without touching the stored view.
fn handle_query_run(state: &mut AppState, req: &Request) -> serde_json::Value {
    let filters = match FilterCriteria::from_json(req.params.get("filters"), &state.settings.catalog) {
        Ok(v) => v,
        Err(e) => return fail(&req.id, &e),
    };
    let sort = match req.params.get("sort") {
        Some(s) if !s.is_null() => {
            let inner = Request {
                id: req.id.clone(),
                method: req.method.clone(),
                params: s.clone(),
            };
            match parse_sort(&inner, SortSpec::default()) {
                Ok(v) => v,
                Err(e) => return fail(&req.id, &e),
            }
        }
        _ => SortSpec::default(),
    };
    let page = match optional_i64(req, "page") {
        Ok(v) => v.unwrap_or(1),
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let page_size = match optional_i64(req, "pageSize") {
        Ok(None) => state.settings.default_page_size,
        Ok(Some(v)) if v > 0 => match check_page_size(v as usize, &state.settings.page_sizes) {
            Ok(v) => v,
            Err(e) => return fail(&req.id, &e),
        },
        Ok(Some(_)) => return err(&req.id, "bad_params", "pageSize must be positive", None),
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };

    let rows = query::query(&state.records, &filters, sort);
    let window = pagination::paginate(&rows, page, page_size);
    let items: Vec<serde_json::Value> = window
        .items
        .iter()
        .map(|r| row_json(r, &state.pins))
        .collect();
    ok(
        &req.id,
        json!({
            "items": items,
            "currentPage": window.current_page,
            "totalPages": window.total_pages,
            "totalRows": window.total_rows,
            "pageSize": window.page_size,
            "sort": sort.to_json(),
            "filters": filters.to_json(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "view.get" => Some(handle_view_get(state, req)),
        "view.setFilters" => Some(handle_view_set_filters(state, req)),
        "view.resetFilters" => Some(handle_view_reset_filters(state, req)),
        "view.search" => Some(handle_view_search(state, req)),
        "view.sort" => Some(handle_view_sort(state, req)),
        "view.setSort" => Some(handle_view_set_sort(state, req)),
        "view.setPage" => Some(handle_view_set_page(state, req)),
        "view.setPageSize" => Some(handle_view_set_page_size(state, req)),
        "query.run" => Some(handle_query_run(state, req)),
        _ => None,
    }
}
