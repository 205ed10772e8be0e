mod test_support;

use serde_json::json;
use test_support::{json_response, spawn_sidecar_with, status_response, temp_dir, MockSource};

#[test]
fn submission_is_mirrored_delivered_and_restorable() {
    let workspace = temp_dir("scoredesk-submit");
    let mirror = workspace.path().join("mirror.sqlite3");
    let source = MockSource::start();
    source.mount("POST", "/records", json_response(json!({ "result": "success" })));
    let url = source.url("/records");
    let mut sc = spawn_sidecar_with(&[
        "--source-url",
        &url,
        "--mirror",
        mirror.to_str().expect("utf8 path"),
    ]);

    let submitted = sc.request_ok(
        "1",
        "records.submit",
        json!({ "record": {
            "region": "竹苗區",
            "examYear": "114",
            "mathScore": "a+",
            "chineseScore": "A",
            "minRatio": 5,
            "maxRatio": "6"
        } }),
    );
    assert_eq!(submitted["mirrored"], true);
    assert_eq!(submitted["delivery"], "pending");
    assert_eq!(submitted["record"]["mathScore"], "A+");
    assert!(submitted["record"]["timestamp"].is_string());
    let submission_id = submitted["submissionId"].as_str().expect("id").to_string();

    let delivered = sc.wait_event("records.submitted");
    assert_eq!(delivered["submissionId"], submission_id);
    assert_eq!(delivered["ok"], true);
    assert_eq!(delivered["status"], "sent");

    let posted = source.bodies("/records");
    assert_eq!(posted.len(), 1);
    let body: serde_json::Value = serde_json::from_str(&posted[0]).expect("posted json");
    assert_eq!(body["region"], "竹苗區");
    assert_eq!(body["mathScore"], "A+");

    let restored = sc.request_ok("2", "records.restoreMirror", json!({}));
    assert_eq!(restored["count"], 1);
    let view = sc.request_ok("3", "view.get", json!({}));
    assert_eq!(view["items"][0]["region"], "竹苗區");
    assert_eq!(view["items"][0]["ratioDisplay"], "5% - 6%");
    assert_eq!(view["items"][0]["aCount"], 2);
}

#[test]
fn failed_delivery_is_reported_and_mirror_survives_restart() {
    let workspace = temp_dir("scoredesk-submit-fail");
    let mirror = workspace.path().join("mirror.sqlite3");
    let mirror_arg = mirror.to_str().expect("utf8 path").to_string();
    let source = MockSource::start();
    source.mount("POST", "/records", status_response(500));
    let url = source.url("/records");

    {
        let mut sc = spawn_sidecar_with(&["--source-url", &url, "--mirror", &mirror_arg]);
        sc.request_ok("1", "records.submit", json!({ "record": { "region": "基北區" } }));
        let delivered = sc.wait_event("records.submitted");
        assert_eq!(delivered["ok"], false);
        assert_eq!(delivered["status"], "failed");
        assert!(delivered["message"].is_string());
    }

    let mut sc = spawn_sidecar_with(&["--mirror", &mirror_arg]);
    let offline = sc.request_ok("1", "records.submit", json!({ "record": { "region": "桃連區" } }));
    assert_eq!(offline["delivery"], "skipped");
    let restored = sc.request_ok("2", "records.restoreMirror", json!({}));
    assert_eq!(restored["count"], 2);
}

#[test]
fn invalid_submissions_are_rejected_before_anything_is_stored() {
    let workspace = temp_dir("scoredesk-submit-invalid");
    let mirror = workspace.path().join("mirror.sqlite3");
    let mut sc = spawn_sidecar_with(&["--mirror", mirror.to_str().expect("utf8 path")]);

    assert_eq!(
        sc.request_err("1", "records.submit", json!({ "record": { "mathScore": "A" } })),
        "bad_params"
    );
    assert_eq!(
        sc.request_err(
            "2",
            "records.submit",
            json!({ "record": { "region": "基北區", "scienceScore": "Z" } })
        ),
        "bad_params"
    );
    assert_eq!(sc.request_err("3", "records.submit", json!({})), "bad_params");

    let restored = sc.request_ok("4", "records.restoreMirror", json!({}));
    assert_eq!(restored["count"], 0);
    let view = sc.request_ok("5", "view.get", json!({}));
    assert_eq!(view["state"], "empty");
}
