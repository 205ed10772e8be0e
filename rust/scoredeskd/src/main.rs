mod config;
mod error;
mod export;
mod ipc;
mod mirror;
mod pagination;
mod query;
mod record;
mod search;
mod selection;
mod source;
mod stats;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// JSON-lines sidecar serving the exam-score browser.
#[derive(Parser, Debug)]
#[command(name = "scoredeskd")]
#[command(version)]
struct Args {
    /// TOML settings file
    #[arg(short, long, env = "SCOREDESK_CONFIG")]
    config: Option<PathBuf>,

    /// Record endpoint used by records.fetch and records.submit
    #[arg(long, env = "SCOREDESK_SOURCE_URL")]
    source_url: Option<String>,

    /// SQLite file mirroring local submissions
    #[arg(long, env = "SCOREDESK_MIRROR")]
    mirror: Option<PathBuf>,

    /// Year counted by the latest-year summary
    #[arg(long)]
    target_year: Option<String>,

    /// Start a fetch from the configured source immediately
    #[arg(long)]
    fetch_on_start: bool,
}

fn write_line(stdout: &mut io::Stdout, value: &serde_json::Value) {
    let _ = writeln!(
        stdout,
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{\"ok\":false}".to_string())
    );
    let _ = stdout.flush();
}

fn main() -> Result<()> {
    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scoredeskd=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();
    let settings = config::Settings::resolve(
        args.config.as_deref(),
        config::Overrides {
            source_url: args.source_url,
            mirror_path: args.mirror,
            target_year: args.target_year,
        },
    )
    .context("failed to load settings")?;
    info!(
        source = settings.source_url.as_deref().unwrap_or("-"),
        target_year = %settings.target_year,
        "scoredeskd starting"
    );

    let (tx, rx) = mpsc::channel::<ipc::Event>();
    let mut state = ipc::AppState::new(settings, tx.clone());
    state.open_mirror();

    let reader_tx = tx.clone();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if reader_tx.send(ipc::Event::Line(line)).is_err() {
                return;
            }
        }
        let _ = reader_tx.send(ipc::Event::InputClosed);
    });
    drop(tx);

    let mut stdout = io::stdout();

    if args.fetch_on_start {
        let req = ipc::Request {
            id: "startup".to_string(),
            method: "records.fetch".to_string(),
            params: json!({}),
        };
        let resp = ipc::handle_request(&mut state, req);
        if resp["ok"] != json!(true) {
            let error = resp["error"].to_string();
            warn!(%error, "startup fetch not started");
        }
    }

    for ev in rx {
        match ev {
            ipc::Event::Line(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let req: ipc::Request = match serde_json::from_str(&line) {
                    Ok(v) => v,
                    Err(e) => {
                        // No id to reply to.
                        write_line(
                            &mut stdout,
                            &json!({
                                "ok": false,
                                "error": { "code": "bad_json", "message": e.to_string() }
                            }),
                        );
                        continue;
                    }
                };
                debug!(id = %req.id, method = %req.method, "request");
                let resp = ipc::handle_request(&mut state, req);
                write_line(&mut stdout, &resp);
            }
            ipc::Event::Source(ev) => {
                if let Some(line) = ipc::apply_source_event(&mut state, ev) {
                    write_line(&mut stdout, &line);
                }
            }
            ipc::Event::InputClosed => break,
        }
    }

    info!("input closed, exiting");
    Ok(())
}
