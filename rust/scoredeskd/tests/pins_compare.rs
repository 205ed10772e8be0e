mod test_support;

use serde_json::json;
use test_support::spawn_sidecar;

fn ids(view: &serde_json::Value) -> Vec<String> {
    view["items"]
        .as_array()
        .expect("items")
        .iter()
        .map(|r| r["id"].as_str().expect("id").to_string())
        .collect()
}

#[test]
fn pins_are_capped_and_compared_in_pin_order() {
    let rows: Vec<serde_json::Value> = ["基北區", "桃連區", "竹苗區", "中投區", "雲林區"]
        .iter()
        .map(|r| json!({ "region": r, "examYear": "114", "mathScore": "A", "minRatio": "3" }))
        .collect();
    let mut sc = spawn_sidecar();
    sc.request_ok("1", "records.load", json!({ "records": rows }));
    let view = sc.request_ok("2", "view.setSort", json!({ "field": "region", "order": "asc" }));
    let all = ids(&view);
    assert_eq!(all.len(), 5);

    for (i, id) in all.iter().take(4).enumerate() {
        let r = sc.request_ok(&format!("p{}", i), "pins.toggle", json!({ "id": id }));
        assert_eq!(r["accepted"], true);
        assert_eq!(r["pinned"], true);
    }

    let full = sc.request_ok("3", "pins.toggle", json!({ "id": all[4] }));
    assert_eq!(full["accepted"], false);
    assert_eq!(full["notice"]["code"], "pin_capacity");
    assert_eq!(full["count"], 4);

    let unpinned = sc.request_ok("4", "pins.toggle", json!({ "id": all[1] }));
    assert_eq!(unpinned["pinned"], false);
    assert_eq!(unpinned["count"], 3);

    let listed = sc.request_ok("5", "pins.list", json!({}));
    assert_eq!(listed["ids"], json!([all[0], all[2], all[3]]));
    assert_eq!(listed["records"][0]["pinned"], true);

    let view = sc.request_ok("6", "view.get", json!({}));
    let flags: Vec<bool> = view["items"]
        .as_array()
        .expect("items")
        .iter()
        .map(|r| r["pinned"].as_bool().unwrap_or(false))
        .collect();
    assert_eq!(flags, [true, false, true, true, false]);

    let table = sc.request_ok("7", "pins.compare", json!({}));
    assert_eq!(table["columns"], json!([all[0], all[2], all[3]]));
    let rows = table["rows"].as_array().expect("rows");
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[0]["key"], "region");
    assert_eq!(rows[2]["key"], "ratio");
    assert_eq!(rows[2]["values"][0], "3%");

    let removed = sc.request_ok("8", "pins.remove", json!({ "id": all[0] }));
    assert_eq!(removed["removed"], true);
    let again = sc.request_ok("9", "pins.remove", json!({ "id": all[0] }));
    assert_eq!(again["removed"], false);

    let cleared = sc.request_ok("10", "pins.clear", json!({}));
    assert_eq!(cleared["count"], 0);
    let empty = sc.request_ok("11", "pins.compare", json!({}));
    assert_eq!(empty["columns"], json!([]));

    assert_eq!(
        sc.request_err("12", "pins.toggle", json!({ "id": "0000000000000000" })),
        "not_found"
    );
    assert_eq!(sc.request_err("13", "pins.toggle", json!({})), "bad_params");
}

#[test]
fn reload_drops_pins_for_records_that_vanished() {
    let mut sc = spawn_sidecar();
    let first = json!([
        { "region": "基北區", "examYear": "114" },
        { "region": "桃連區", "examYear": "114" }
    ]);
    sc.request_ok("1", "records.load", json!({ "records": first }));
    let view = sc.request_ok("2", "view.setSort", json!({ "field": "region", "order": "asc" }));
    let all = ids(&view);
    sc.request_ok("3", "pins.toggle", json!({ "id": all[0] }));
    sc.request_ok("4", "pins.toggle", json!({ "id": all[1] }));

    // Same content hashes to the same id, so the surviving pin is kept.
    let second = json!([{ "region": "桃連區", "examYear": "114" }]);
    sc.request_ok("5", "records.load", json!({ "records": second }));
    let listed = sc.request_ok("6", "pins.list", json!({}));
    assert_eq!(listed["count"], 1);
}
