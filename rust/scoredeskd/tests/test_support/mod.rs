#![allow(dead_code)]

use serde_json::json;
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn temp_dir(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("create temp dir")
}

/// A running sidecar. Event lines that arrive while waiting for a reply are
/// queued so `wait_event` can still see them.
pub struct Sidecar {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    events: VecDeque<serde_json::Value>,
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub fn spawn_sidecar() -> Sidecar {
    spawn_sidecar_with(&[])
}

pub fn spawn_sidecar_with(args: &[&str]) -> Sidecar {
    let exe = env!("CARGO_BIN_EXE_scoredeskd");
    let mut child = Command::new(exe)
        .args(args)
        .env_remove("SCOREDESK_SOURCE_URL")
        .env_remove("SCOREDESK_MIRROR")
        .env_remove("SCOREDESK_CONFIG")
        .env_remove("HTTP_PROXY")
        .env_remove("http_proxy")
        .env_remove("ALL_PROXY")
        .env_remove("all_proxy")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn scoredeskd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    Sidecar {
        child,
        stdin,
        reader: BufReader::new(stdout),
        events: VecDeque::new(),
    }
}

impl Sidecar {
    fn read_value(&mut self) -> serde_json::Value {
        let mut line = String::new();
        self.reader.read_line(&mut line).expect("read line");
        assert!(!line.trim().is_empty(), "sidecar closed its output");
        serde_json::from_str(line.trim()).expect("parse line json")
    }

    pub fn send_raw(&mut self, line: &str) {
        writeln!(self.stdin, "{}", line).expect("write line");
        self.stdin.flush().expect("flush line");
    }

    /// Next line that is not an event, e.g. the reply to a malformed line.
    pub fn next_reply(&mut self) -> serde_json::Value {
        loop {
            let value = self.read_value();
            if value.get("event").is_some() {
                self.events.push_back(value);
                continue;
            }
            return value;
        }
    }

    pub fn request(&mut self, id: &str, method: &str, params: serde_json::Value) -> serde_json::Value {
        let payload = json!({
            "id": id,
            "method": method,
            "params": params,
        });
        self.send_raw(&payload.to_string());
        let value = self.next_reply();
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
        if value.get("ok").and_then(|v| v.as_bool()) == Some(false) {
            let code = value
                .get("error")
                .and_then(|e| e.get("code"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            assert_ne!(code, "not_implemented", "unexpected unknown method for {}", method);
        }
        value
    }

    pub fn request_ok(&mut self, id: &str, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.request(id, method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(true),
            "{} failed: {}",
            method,
            value
        );
        value.get("result").cloned().unwrap_or(serde_json::Value::Null)
    }

    pub fn request_err(&mut self, id: &str, method: &str, params: serde_json::Value) -> String {
        let value = self.request(id, method, params);
        assert_eq!(value.get("ok").and_then(|v| v.as_bool()), Some(false), "{} unexpectedly ok", method);
        value["error"]["code"].as_str().unwrap_or("").to_string()
    }

    /// Blocks until the named event arrives; returns its `result`.
    pub fn wait_event(&mut self, name: &str) -> serde_json::Value {
        if let Some(pos) = self.events.iter().position(|e| e["event"] == name) {
            let ev = self.events.remove(pos).expect("queued event");
            return ev["result"].clone();
        }
        loop {
            let value = self.read_value();
            if value["event"] == name {
                return value["result"].clone();
            }
            assert!(value.get("event").is_some(), "unexpected reply while waiting: {}", value);
            self.events.push_back(value);
        }
    }
}

/// Record endpoint stand-in. The runtime outlives the server so mocks keep
/// being served while the sidecar's worker threads call in.
pub struct MockSource {
    server: MockServer,
    runtime: tokio::runtime::Runtime,
}

impl MockSource {
    pub fn start() -> Self {
        let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
        let server = runtime.block_on(MockServer::start());
        Self { server, runtime }
    }

    pub fn url(&self, route: &str) -> String {
        format!("{}{}", self.server.uri(), route)
    }

    pub fn mount(&self, http_method: &str, route: &str, response: ResponseTemplate) {
        self.runtime.block_on(
            Mock::given(method(http_method))
                .and(path(route))
                .respond_with(response)
                .mount(&self.server),
        );
    }

    /// Bodies of every request received on `route`, in arrival order.
    pub fn bodies(&self, route: &str) -> Vec<String> {
        self.runtime
            .block_on(self.server.received_requests())
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == route)
            .map(|r| String::from_utf8_lossy(&r.body).into_owned())
            .collect()
    }
}

pub fn json_response(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

pub fn delayed_json_response(body: serde_json::Value, delay: Duration) -> ResponseTemplate {
    json_response(body).set_delay(delay)
}

pub fn status_response(status: u16) -> ResponseTemplate {
    ResponseTemplate::new(status)
}

pub fn sample_rows() -> serde_json::Value {
    json!([
        {
            "timestamp": "2025-06-01T08:00:00Z",
            "region": "基北區",
            "examYear": "114",
            "chineseScore": "A++",
            "mathScore": "A",
            "englishScore": "B",
            "socialScore": "B",
            "scienceScore": "C",
            "essayScore": "5",
            "minRatio": "1.2",
            "maxRatio": "1.5",
            "minRankInterval": "100",
            "maxRankInterval": "200"
        },
        {
            "時間戳記": "2024-06-01 09:00:00",
            "區域": "桃連區",
            "會考年度": 113,
            "國文成績": "B",
            "數學成績": "B",
            "英文成績": "B",
            "社會成績": "C",
            "自然成績": "C",
            "作文成績": 4,
            "全區序位最小比率(%)": 40,
            "全區序位最大比率(%)": 40
        },
        {
            "timestamp": "2025-06-02T08:00:00Z",
            "region": "基北區",
            "examYear": "113",
            "chineseScore": "A+",
            "mathScore": "A++",
            "englishScore": "A",
            "socialScore": "A",
            "scienceScore": "A+",
            "essayScore": "6",
            "minRatio": "0.5",
            "maxRatio": "0.8"
        }
    ])
}
